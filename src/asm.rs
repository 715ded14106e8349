//! Loading MiniASM source into an executable [`Program`].
//!
//! This module is used to convert MiniASM source text into the operation log
//! the simulator executes.
//!
//! The module notably consists of:
//! - [`load_src`] and [`load_file`]: the main functions, which tokenize, validate, and encode every line.
//! - [`Loader`]: the reusable loader, which owns the grammar engine (and therefore the declared labels).
//! - [`Program`]: the loaded program, holding the operation log, the label map, and every line's tokens.
//! - [`Program::encode`]: the skeleton encoder, turning one validated line into a [`Skeleton`].

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

use crate::ast::sim::{Operand, Skeleton};
use crate::ast::{AddrMode, Reg, StoreName, TokenType};
use crate::parse::lex::tokenize;
use crate::parse::{Grammar, ParseErr, LABEL_MARKER};

/// The message reported when a program loads without errors.
pub const SUCCESS_MESSAGE: &str = "Looks good! No syntax errors found!";

/// Loads a program from MiniASM source text.
///
/// # Example
/// ```
/// use miniasm::asm::load_src;
///
/// let src = "
///     loop: inc r1
///     blt r1, r2, loop
///     halt
/// ";
/// let program = load_src(src).unwrap();
/// assert_eq!(program.len(), 3);
/// assert_eq!(program.lookup_label("loop"), Some(0));
/// ```
pub fn load_src(src: &str) -> Result<Program, AsmErr> {
    Loader::new().load_src(src)
}
/// Loads a program from a UTF-8 MiniASM source file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Program, AsmErr> {
    Loader::new().load_file(path)
}

/// Error from loading a program.
#[derive(Debug)]
pub enum AsmErr {
    /// A line was rejected by the grammar.
    Parse(ParseErr),
    /// The last instruction of the program is not `halt`.
    MissingHalt {
        /// The source line of the last instruction.
        line: usize,
    },
    /// The source has no instructions at all.
    EmptyProgram,
    /// The source file could not be read.
    Io(std::io::Error),
}
impl std::fmt::Display for AsmErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AsmErr::Parse(e) => e.fmt(f),
            AsmErr::MissingHalt { .. } => f.write_str("all programs must end with a halt instruction"),
            AsmErr::EmptyProgram => f.write_str("program has no instructions"),
            AsmErr::Io(e) => write!(f, "could not read program: {e}"),
        }
    }
}
impl std::error::Error for AsmErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AsmErr::Parse(e) => Some(e),
            AsmErr::Io(e) => Some(e),
            _ => None,
        }
    }
}
impl crate::err::Error for AsmErr {
    fn line(&self) -> Option<usize> {
        match self {
            AsmErr::Parse(e) => Some(e.line),
            AsmErr::MissingHalt { line } => Some(*line),
            AsmErr::EmptyProgram | AsmErr::Io(_) => None,
        }
    }

    fn help(&self) -> Option<Cow<str>> {
        match self {
            AsmErr::Parse(e) => crate::err::Error::help(e),
            AsmErr::MissingHalt { .. } => Some("add a halt instruction as the last line".into()),
            AsmErr::EmptyProgram => Some("a program needs at least a halt instruction".into()),
            AsmErr::Io(_) => None,
        }
    }
}
impl From<ParseErr> for AsmErr {
    fn from(value: ParseErr) -> Self {
        AsmErr::Parse(value)
    }
}

/// A loaded program.
///
/// The operation log is indexed from 0, one operation per accepted line,
/// and the index of an operation is its program counter basis
/// (displayed as the byte offset `4 * index`).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Program {
    /// The operation log.
    ops: Vec<Skeleton>,
    /// Label name (lowercase, without marker) to operation index.
    labels: HashMap<String, usize>,
    /// Tokens of every accepted line.
    lines: Vec<Vec<String>>,
    /// Source line number of every accepted line.
    src_lines: Vec<usize>,
}

impl Program {
    /// Creates an empty program.
    pub fn new() -> Self {
        Default::default()
    }

    /// The number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }
    /// Whether the program has no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
    /// The operation log.
    pub fn ops(&self) -> &[Skeleton] {
        &self.ops
    }
    /// The operation at the given index.
    pub fn op(&self, index: usize) -> Option<&Skeleton> {
        self.ops.get(index)
    }
    /// The tokens of every accepted line, in source order.
    pub fn lines(&self) -> &[Vec<String>] {
        &self.lines
    }
    /// The tokens of the line at the given operation index.
    pub fn line(&self, index: usize) -> Option<&[String]> {
        self.lines.get(index).map(Vec::as_slice)
    }
    /// The 1-based source line of the operation at the given index.
    pub fn source_line(&self, index: usize) -> Option<usize> {
        self.src_lines.get(index).copied()
    }

    /// Finds the operation index a label refers to.
    ///
    /// The name may be given with or without its trailing marker.
    pub fn lookup_label(&self, name: &str) -> Option<usize> {
        self.labels.get(&label_key(name)).copied()
    }
    /// Finds the label declared on the line at the given operation index.
    pub fn label_at(&self, index: usize) -> Option<&str> {
        self.labels.iter()
            .find(|&(_, &i)| i == index)
            .map(|(name, _)| name.as_str())
    }
    /// Iterates over every label and the operation index it refers to, in index order.
    pub fn labels(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        let mut labels: Vec<_> = self.labels.iter()
            .map(|(name, &i)| (name.as_str(), i))
            .collect();
        labels.sort_by_key(|&(_, i)| i);
        labels.into_iter()
    }

    /// Encodes one validated line and appends it to the operation log.
    ///
    /// `types` must be the result of validating `tokens` ([`Grammar::validate`]),
    /// and `line` is the 1-based position of this line among the accepted lines,
    /// so a label declared on it refers to operation `line - 1`.
    ///
    /// # Panics
    ///
    /// This panics if the tokens were not accepted by the grammar.
    pub fn encode(&mut self, tokens: &[String], types: &[TokenType], line: usize) {
        self.encode_at(tokens, types, line, 0);
    }

    fn encode_at(&mut self, tokens: &[String], types: &[TokenType], line: usize, offset: usize) {
        let tok = |i: usize| tokens[offset + i].as_str();

        let skel = match types[offset] {
            TokenType::Label => {
                let index = line - 1;
                debug_assert_eq!(index, self.ops.len(), "label should refer to the next operation");
                self.labels.insert(label_key(tok(0)), index);
                return self.encode_at(tokens, types, line, offset + 1);
            },
            TokenType::Data(op) => {
                let reg = Operand::Reg(validated_reg(tok(1)));

                // The address operand starts after `op reg ,`.
                // A leading symbol selects the mode, and the source follows it.
                let (mode, src_at) = match types[offset + 3] {
                    TokenType::Symbol(sym) => match sym.addr_mode() {
                        Some(mode) => (mode, 4),
                        None => (AddrMode::Direct, 3),
                    },
                    _ => (AddrMode::Direct, 3),
                };
                let addr = match mode {
                    AddrMode::Index => Operand::Indexed {
                        base: Box::new(Operand::from_var(tok(src_at))),
                        offset: validated_reg(tok(src_at + 2)),
                    },
                    AddrMode::Immediate => Operand::Num(tok(src_at).to_string()),
                    _ => Operand::from_var(tok(src_at)),
                };

                let mut store = op.default_store();
                if types[offset + src_at] == TokenType::Reg && mode != AddrMode::Relative {
                    store = StoreName::Registers;
                }

                match op.into_register() {
                    true => Skeleton::Data {
                        op, mode,
                        dst_store: StoreName::Registers, src_store: store,
                        dst: reg, src: addr,
                    },
                    false => Skeleton::Data {
                        op, mode,
                        dst_store: store, src_store: StoreName::Registers,
                        dst: addr, src: reg,
                    },
                }
            },
            TokenType::Arithmetic => Skeleton::Arith {
                op: tok(0).parse().unwrap_or_else(|()| unreachable!("{:?} was validated as arithmetic", tok(0))),
                dr: validated_reg(tok(1)),
                sr: validated_reg(tok(3)),
            },
            TokenType::Branch => Skeleton::Branch {
                op: tok(0).parse().unwrap_or_else(|()| unreachable!("{:?} was validated as a branch", tok(0))),
                left: validated_reg(tok(1)),
                right: validated_reg(tok(3)),
                target: tok(5).to_string(),
            },
            TokenType::Br => Skeleton::Jump { target: tok(1).to_string() },
            TokenType::Inc => Skeleton::Inc { reg: validated_reg(tok(1)) },
            TokenType::Halt => Skeleton::Halt,
            TokenType::Skip => Skeleton::Skip,
            t => unreachable!("{t} cannot begin a line"),
        };

        tracing::trace!(index = self.ops.len(), skeleton = ?skel, "encoded operation");
        self.ops.push(skel);
    }
}

/// The label map key for a label declaration or reference.
fn label_key(name: &str) -> String {
    let name = name.strip_suffix(LABEL_MARKER).unwrap_or(name);
    name.to_lowercase()
}
fn validated_reg(token: &str) -> Reg {
    token.parse()
        .unwrap_or_else(|()| unreachable!("{token:?} was validated as a register"))
}

/// Loads programs.
///
/// The loader owns the grammar engine, and with it the set of declared labels.
/// That set is cleared at the start of every load and after a failed load,
/// so one loader can be reused for any number of independent loads.
#[derive(Debug, Default)]
pub struct Loader {
    grammar: Grammar,
}

impl Loader {
    /// Creates a new loader.
    pub fn new() -> Self {
        Default::default()
    }

    /// Loads a program from a UTF-8 source file.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<Program, AsmErr> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading program");

        match std::fs::read_to_string(path) {
            Ok(src) => self.load_src(&src),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read program");
                Err(AsmErr::Io(e))
            },
        }
    }

    /// Loads a program from source text.
    ///
    /// Each line is tokenized, validated, and encoded in order.
    /// Loading stops at the first rejected line,
    /// and the last accepted line must end in `halt`.
    pub fn load_src(&mut self, src: &str) -> Result<Program, AsmErr> {
        self.grammar.clear_labels();

        let result = self.load_lines(src);
        match &result {
            Ok(program) => tracing::debug!(ops = program.len(), "program loaded"),
            Err(e) => {
                tracing::warn!(error = %e, "program failed to load");
                self.grammar.clear_labels();
            },
        }
        result
    }

    fn load_lines(&mut self, src: &str) -> Result<Program, AsmErr> {
        let mut program = Program::new();
        let mut last = None;

        for (lno, text) in (1..).zip(src.lines()) {
            let tokens = tokenize(text);
            if tokens.is_empty() { continue; }

            let types = self.grammar.validate(&tokens, lno)?;
            program.encode(&tokens, &types, program.len() + 1);
            program.lines.push(tokens);
            program.src_lines.push(lno);

            last = Some((lno, types));
        }

        match last {
            None => Err(AsmErr::EmptyProgram),
            Some((line, types)) if types.last() != Some(&TokenType::Halt) => Err(AsmErr::MissingHalt { line }),
            Some(_) => Ok(program),
        }
    }
}
