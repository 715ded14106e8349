//! Components relating to the syntax of MiniASM.
//!
//! These components are used by the grammar engine to classify tokens
//! ([`TokenType`]) and by the skeleton encoder to describe instructions
//! (registers, operators, addressing modes, and store names).
//!
//! The executable form of a line is held in [`sim::Skeleton`].

pub mod sim;

use std::str::FromStr;

/// A register. Must be between 0 and 16.
///
/// Registers are written `r0` through `r16` (case-insensitive).
///
/// ## Examples
///
/// ```text
/// load r1, =5
///      ~~
/// add r1, r2
///     ~~  ~~
/// blt r1, r2, loop
///     ~~  ~~
/// ```
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct Reg(pub(crate) u8);

impl Reg {
    /// The highest register number.
    pub const MAX: u8 = 16;

    /// The key this register occupies in the register store (e.g. `"r5"`).
    pub fn key(self) -> String {
        self.to_string()
    }
}
impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}
impl TryFrom<u8> for Reg {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0..=Reg::MAX => Ok(Reg(value)),
            _ => Err(()),
        }
    }
}
impl FromStr for Reg {
    type Err = ();

    /// Parses `r0`-`r9` and `r10`-`r16`.
    ///
    /// Leading zeroes are not accepted (`r05` is not a register).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = match s.as_bytes() {
            [b'r' | b'R', rest @ ..] => rest,
            _ => return Err(()),
        };
        match digits {
            [d @ b'0'..=b'9'] => Ok(Reg(d - b'0')),
            [b'1', d @ b'0'..=b'6'] => Ok(Reg(10 + (d - b'0'))),
            _ => Err(()),
        }
    }
}

/// The single-character symbols that introduce an addressing mode
/// or separate operands.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum Symbol {
    /// `$` (relative addressing)
    Dollar,
    /// `@` (indirect addressing)
    At,
    /// `[` (start of indexed addressing)
    LBracket,
    /// `]` (end of indexed addressing)
    RBracket,
    /// `=` (immediate addressing)
    Equals,
    /// `,` (operand separator)
    Comma,
}
impl Symbol {
    /// Looks up the symbol for a given character.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '$' => Some(Symbol::Dollar),
            '@' => Some(Symbol::At),
            '[' => Some(Symbol::LBracket),
            ']' => Some(Symbol::RBracket),
            '=' => Some(Symbol::Equals),
            ',' => Some(Symbol::Comma),
            _ => None,
        }
    }

    /// The character this symbol is written as.
    pub fn as_char(self) -> char {
        match self {
            Symbol::Dollar => '$',
            Symbol::At => '@',
            Symbol::LBracket => '[',
            Symbol::RBracket => ']',
            Symbol::Equals => '=',
            Symbol::Comma => ',',
        }
    }

    /// The addressing mode this symbol introduces, if it introduces one.
    ///
    /// `]` and `,` do not introduce a mode.
    pub fn addr_mode(self) -> Option<AddrMode> {
        match self {
            Symbol::Dollar => Some(AddrMode::Relative),
            Symbol::At => Some(AddrMode::Indirect),
            Symbol::LBracket => Some(AddrMode::Index),
            Symbol::Equals => Some(AddrMode::Immediate),
            Symbol::RBracket | Symbol::Comma => None,
        }
    }
}
impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use std::fmt::Write;
        f.write_char(self.as_char())
    }
}

/// The syntactic type of a token.
///
/// Every token is classified into exactly one type by [`Grammar::classify`].
///
/// [`Grammar::classify`]: crate::parse::Grammar::classify
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum TokenType {
    /// A label declaration (e.g., `loop:`)
    Label,
    /// A register (`r0`-`r16`)
    Reg,
    /// An unsigned decimal number
    Num,
    /// An identifier (e.g., a reference to a label)
    Id,
    /// A data-motion keyword (`load`, `store`, `read`, `write`)
    Data(DataOp),
    /// An arithmetic keyword (`add`, `sub`, `div`, `mul`)
    Arithmetic,
    /// A conditional branch keyword (`blt`, `bgt`, `bleq`, `bgeq`, `beq`, `bneq`)
    Branch,
    /// An addressing or separator symbol
    Symbol(Symbol),
    /// `br`
    Br,
    /// `skip`
    Skip,
    /// `halt`
    Halt,
    /// `inc`
    Inc,
}
impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Label => f.write_str("label"),
            TokenType::Reg => f.write_str("reg"),
            TokenType::Num => f.write_str("num"),
            TokenType::Id => f.write_str("id"),
            TokenType::Data(op) => op.fmt(f),
            TokenType::Arithmetic => f.write_str("arithmetic"),
            TokenType::Branch => f.write_str("branch"),
            TokenType::Symbol(s) => s.fmt(f),
            TokenType::Br => f.write_str("br"),
            TokenType::Skip => f.write_str("skip"),
            TokenType::Halt => f.write_str("halt"),
            TokenType::Inc => f.write_str("inc"),
        }
    }
}

/// Defines a keyword enum with its spelling and a case-insensitive [`FromStr`].
macro_rules! keyword_enum {
    (
        $(#[$m:meta])*
        $Name:ident { $($(#[$vm:meta])* $Variant:ident = $text:literal),+ $(,)? }
    ) => {
        $(#[$m])*
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
        pub enum $Name {
            $($(#[$vm])* $Variant),+
        }

        impl $Name {
            /// All keywords of this kind.
            pub const ALL: &'static [$Name] = &[$($Name::$Variant),+];

            /// How this keyword is written in source.
            pub fn keyword(self) -> &'static str {
                match self {
                    $($Name::$Variant => $text),+
                }
            }
        }

        impl FromStr for $Name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match &*s.to_lowercase() {
                    $($text => Ok($Name::$Variant)),+,
                    _ => Err(())
                }
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.keyword())
            }
        }
    };
}

keyword_enum! {
    /// Instructions that move data between a register and a store.
    DataOp {
        /// `load reg, address`: memory (or register) into register
        Load = "load",
        /// `store reg, address`: register into memory (or register)
        Store = "store",
        /// `read reg, address`: disk (or register) into register
        Read = "read",
        /// `write reg, address`: register into disk (or register)
        Write = "write",
    }
}
impl DataOp {
    /// Whether this instruction moves data *into* its register operand
    /// (`load`, `read`) rather than out of it (`store`, `write`).
    pub fn into_register(self) -> bool {
        matches!(self, DataOp::Load | DataOp::Read)
    }

    /// The store this instruction addresses when its operand is not a register.
    pub fn default_store(self) -> StoreName {
        match self {
            DataOp::Load | DataOp::Store => StoreName::Memory,
            DataOp::Read | DataOp::Write => StoreName::Disk,
        }
    }
}

keyword_enum! {
    /// Register-to-register arithmetic.
    ArithOp {
        #[allow(missing_docs)]
        Add = "add",
        #[allow(missing_docs)]
        Sub = "sub",
        #[allow(missing_docs)]
        Div = "div",
        #[allow(missing_docs)]
        Mul = "mul",
    }
}
impl ArithOp {
    /// The operator symbol used when describing this instruction.
    pub fn operator(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Div => "/",
            ArithOp::Mul => "*",
        }
    }
}

keyword_enum! {
    /// Conditional branches, comparing two registers.
    BranchOp {
        #[allow(missing_docs)]
        Blt = "blt",
        #[allow(missing_docs)]
        Bgt = "bgt",
        #[allow(missing_docs)]
        Bleq = "bleq",
        #[allow(missing_docs)]
        Bgeq = "bgeq",
        #[allow(missing_docs)]
        Beq = "beq",
        #[allow(missing_docs)]
        Bneq = "bneq",
    }
}
impl BranchOp {
    /// The comparison operator used when describing this instruction.
    pub fn operator(self) -> &'static str {
        match self {
            BranchOp::Blt => "<",
            BranchOp::Bgt => ">",
            BranchOp::Bleq => "<=",
            BranchOp::Bgeq => ">=",
            BranchOp::Beq => "==",
            BranchOp::Bneq => "!=",
        }
    }

    /// Whether the branch is taken for the given ordering of left vs. right.
    pub fn holds(self, ord: std::cmp::Ordering) -> bool {
        match self {
            BranchOp::Blt => ord.is_lt(),
            BranchOp::Bgt => ord.is_gt(),
            BranchOp::Bleq => ord.is_le(),
            BranchOp::Bgeq => ord.is_ge(),
            BranchOp::Beq => ord.is_eq(),
            BranchOp::Bneq => ord.is_ne(),
        }
    }
}

keyword_enum! {
    /// How a data-motion instruction resolves its address operand.
    ///
    /// | syntax          | mode        |
    /// |-----------------|-------------|
    /// | `load r1, 5`    | `direct`    |
    /// | `load r1, =5`   | `immediate` |
    /// | `load r1, $5`   | `relative`  |
    /// | `load r1, @5`   | `indirect`  |
    /// | `load r1, [5, r2]` | `index`  |
    AddrMode {
        #[allow(missing_docs)]
        Direct = "direct",
        #[allow(missing_docs)]
        Immediate = "immediate",
        #[allow(missing_docs)]
        Relative = "relative",
        #[allow(missing_docs)]
        Indirect = "indirect",
        #[allow(missing_docs)]
        Index = "index",
    }
}

keyword_enum! {
    /// The three independent namespaces the simulator reads and writes.
    StoreName {
        #[allow(missing_docs)]
        Registers = "registers",
        #[allow(missing_docs)]
        Memory = "memory",
        #[allow(missing_docs)]
        Disk = "disk",
    }
}
