//! The executable form of a MiniASM line.
//!
//! The skeleton encoder ([`crate::asm`]) turns every validated source line into exactly one [`Skeleton`].
//! The simulator ([`crate::sim`]) executes skeletons by their index in the operation log.
use super::{AddrMode, ArithOp, BranchOp, DataOp, Reg, StoreName};

/// An operand of a data-motion instruction.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Operand {
    /// A register operand (e.g., `r2`).
    Reg(Reg),
    /// A numeric operand, kept as written (e.g., `100`).
    Num(String),
    /// An indexed operand (e.g., `[100, r2]`): a base plus the value of an offset register.
    Indexed {
        /// The base address (a number or a register).
        base: Box<Operand>,
        /// The register holding the offset.
        offset: Reg,
    },
}
impl Operand {
    /// Creates an operand from a `var` token (a register or a number).
    pub fn from_var(token: &str) -> Self {
        match token.parse::<Reg>() {
            Ok(r) => Operand::Reg(r),
            Err(()) => Operand::Num(token.to_string()),
        }
    }
}
impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Reg(r) => r.fmt(f),
            Operand::Num(n) => f.write_str(n),
            Operand::Indexed { base, offset } => write!(f, "[{base}, {offset}]"),
        }
    }
}

/// One executable operation.
///
/// | source                 | skeleton |
/// |------------------------|----------|
/// | `load r1, =5`          | `Data { op: Load, mode: Immediate, dst_store: Registers, src_store: Memory, dst: r1, src: 5 }` |
/// | `store r1, [100, r2]`  | `Data { op: Store, mode: Index, dst_store: Memory, src_store: Registers, dst: [100, r2], src: r1 }` |
/// | `add r1, r2`           | `Arith { op: Add, dr: r1, sr: r2 }` |
/// | `blt r1, r2, loop`     | `Branch { op: Blt, left: r1, right: r2, target: "loop" }` |
/// | `br done`              | `Jump { target: "done" }` |
/// | `inc r3`               | `Inc { reg: r3 }` |
/// | `skip`, `halt`         | `Skip`, `Halt` |
///
/// Label declarations do not produce a skeleton of their own;
/// the label is registered and the rest of the line is encoded.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Skeleton {
    /// Data motion (`load`, `store`, `read`, `write`).
    Data {
        /// The instruction.
        op: DataOp,
        /// The addressing mode of the address operand.
        mode: AddrMode,
        /// The store written to.
        dst_store: StoreName,
        /// The store read from.
        src_store: StoreName,
        /// The written operand.
        dst: Operand,
        /// The read operand.
        src: Operand,
    },
    /// Arithmetic: `dr = dr <op> sr`.
    Arith {
        #[allow(missing_docs)]
        op: ArithOp,
        #[allow(missing_docs)]
        dr: Reg,
        #[allow(missing_docs)]
        sr: Reg,
    },
    /// Conditional branch to `target` if `left <op> right`.
    Branch {
        #[allow(missing_docs)]
        op: BranchOp,
        #[allow(missing_docs)]
        left: Reg,
        #[allow(missing_docs)]
        right: Reg,
        /// The label name (without the trailing `:`).
        target: String,
    },
    /// Unconditional jump (`br`).
    Jump {
        /// The label name (without the trailing `:`).
        target: String,
    },
    /// `inc reg`.
    Inc {
        #[allow(missing_docs)]
        reg: Reg,
    },
    /// `skip`.
    Skip,
    /// `halt`.
    Halt,
}
impl Skeleton {
    /// The instruction's name, as shown in step descriptions.
    pub fn name(&self) -> &'static str {
        match self {
            Skeleton::Data { op, .. } => op.keyword(),
            Skeleton::Arith { op, .. } => op.keyword(),
            Skeleton::Branch { op, .. } => op.keyword(),
            Skeleton::Jump { .. } => "br",
            Skeleton::Inc { .. } => "inc",
            Skeleton::Skip => "skip",
            Skeleton::Halt => "halt",
        }
    }

    /// Human-readable description of this operation.
    ///
    /// The first line is always `Instruction: <name>`.
    /// Data-motion instructions add their addressing mode and bus motion;
    /// other instructions add a single expression line (empty for `skip` and `halt`).
    ///
    /// ```
    /// use miniasm::asm::load_src;
    ///
    /// let program = load_src("load r1, $5\nblt r1, r2, end\nend: halt").unwrap();
    /// assert_eq!(program.op(0).unwrap().describe(), [
    ///     "Instruction: load",
    ///     "Addressing Mode: relative",
    ///     "Bus Motion: memory -> registers",
    /// ]);
    /// assert_eq!(program.op(1).unwrap().describe(), [
    ///     "Instruction: blt",
    ///     "Expression: if r1 < r2 -> goto(end)",
    /// ]);
    /// ```
    pub fn describe(&self) -> Vec<String> {
        let head = format!("Instruction: {}", self.name());
        match self {
            Skeleton::Data { mode, dst_store, src_store, .. } => vec![
                head,
                format!("Addressing Mode: {mode}"),
                format!("Bus Motion: {src_store} -> {dst_store}"),
            ],
            Skeleton::Arith { op, dr, sr } => vec![head, format!("Expression: {dr} {} {sr}", op.operator())],
            Skeleton::Branch { op, left, right, target } => vec![
                head,
                format!("Expression: if {left} {} {right} -> goto({target})", op.operator()),
            ],
            Skeleton::Jump { target } => vec![head, format!("Expression: goto({target})")],
            Skeleton::Inc { reg } => vec![head, format!("Expression: {reg}++")],
            Skeleton::Skip | Skeleton::Halt => vec![head, String::new()],
        }
    }
}
