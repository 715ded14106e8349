//! Parsing MiniASM lines.
//!
//! This module is used to classify tokens ([`Grammar::classify`]) and to
//! verify that a line's tokens follow the MiniASM grammar ([`Grammar::validate`]).
//!
//! The grammar is a table of productions. Each production is a list of [`Rule`]s,
//! and each rule either requires one exact token type ([`Rule::Terminal`])
//! or accepts any type in a set ([`Rule::Choice`]). When a choice matches,
//! validation continues into the production keyed by the *matched* type,
//! so a single token can pull in a whole sub-production
//! (e.g. `$` in `load r1, $5` pulls in the `var` that must follow it).
//!
//! The module's key data structure is [`Grammar`], which also keeps the set of
//! labels declared so far in a program.
pub mod lex;

use std::borrow::Cow;
use std::collections::HashSet;

use crate::ast::{ArithOp, BranchOp, DataOp, Reg, Symbol, TokenType};

/// The marker that ends a label declaration (`loop:`).
pub const LABEL_MARKER: char = ':';

/// A set of token types accepted at some point of a production.
///
/// Each choice doubles as a set of production keys:
/// once a token of type `t` is accepted, the production for `t` is followed.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Choice {
    /// Any type that can begin a statement.
    Production,
    /// The operand of `load` (`num`, `reg`, `$`, `@`, `[`, `=`).
    Address,
    /// The operand of `store` (`reg`, `$`, `[`).
    Address1,
    /// The operand of `read` and `write` (`num`, `reg`, `[`).
    Address2,
    /// A register or a number.
    Var,
}
impl Choice {
    /// The token types this choice accepts.
    pub fn accepts(self) -> &'static [TokenType] {
        use crate::ast::DataOp::*;
        use crate::ast::Symbol::*;
        use crate::ast::TokenType as T;

        match self {
            Choice::Production => &[
                T::Skip, T::Data(Load), T::Data(Read), T::Data(Write), T::Data(Store),
                T::Arithmetic, T::Halt, T::Branch, T::Inc, T::Br,
            ],
            Choice::Address => &[T::Num, T::Reg, T::Symbol(Dollar), T::Symbol(At), T::Symbol(LBracket), T::Symbol(Equals)],
            Choice::Address1 => &[T::Reg, T::Symbol(Dollar), T::Symbol(LBracket)],
            Choice::Address2 => &[T::Num, T::Reg, T::Symbol(LBracket)],
            Choice::Var => &[T::Num, T::Reg],
        }
    }
}

/// One expected element of a production.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Rule {
    /// The next token must have exactly this type.
    Terminal(TokenType),
    /// The next token must have one of these types,
    /// and the production keyed by its type is followed next.
    Choice(Choice),
}

/// The production for a given token type.
///
/// Types with no production (e.g. `num`, `reg`, `skip`) produce nothing further.
pub fn production(ty: TokenType) -> &'static [Rule] {
    use crate::ast::DataOp::*;
    use crate::ast::Symbol::*;
    use crate::ast::TokenType as T;

    const COMMA: Rule = Rule::Terminal(T::Symbol(Comma));
    const REG: Rule = Rule::Terminal(T::Reg);

    match ty {
        T::Label => &[Rule::Choice(Choice::Production)],
        T::Data(Load) => &[REG, COMMA, Rule::Choice(Choice::Address)],
        T::Data(Store) => &[REG, COMMA, Rule::Choice(Choice::Address1)],
        T::Data(Read | Write) => &[REG, COMMA, Rule::Choice(Choice::Address2)],
        T::Arithmetic => &[REG, COMMA, REG],
        T::Inc => &[REG],
        T::Br => &[Rule::Terminal(T::Id)],
        T::Branch => &[REG, COMMA, REG, COMMA, Rule::Terminal(T::Id)],
        T::Symbol(Dollar | At) => &[Rule::Choice(Choice::Var)],
        T::Symbol(Equals) => &[Rule::Terminal(T::Num)],
        T::Symbol(LBracket) => &[Rule::Choice(Choice::Var), COMMA, REG, Rule::Terminal(T::Symbol(RBracket))],
        _ => &[],
    }
}

/// What a failed rule expected to see.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Expected {
    /// Exactly this type.
    Type(TokenType),
    /// Any type in this choice.
    OneOf(Choice),
}
impl From<Rule> for Expected {
    fn from(value: Rule) -> Self {
        match value {
            Rule::Terminal(t) => Expected::Type(t),
            Rule::Choice(c) => Expected::OneOf(c),
        }
    }
}
impl std::fmt::Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expected::Type(t) => write!(f, "\"{t}\""),
            Expected::OneOf(c) => {
                f.write_str("one of {")?;
                for (i, t) in c.accepts().iter().enumerate() {
                    if i != 0 { f.write_str(", ")?; }
                    write!(f, "\"{t}\"")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Kinds of errors that can occur while validating a line.
///
/// See [`ParseErr`] for this error type with the line number included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum ParseErrKind {
    /// The label was declared earlier in the program.
    DuplicateLabel(String),
    /// The line ended before its production was complete.
    UnexpectedEndOfTokens {
        /// What the next token should have been.
        expected: Expected,
    },
    /// A token was present, but its type is not accepted here.
    TypeMismatch {
        /// The offending token.
        token: String,
        /// The type of the offending token.
        found: TokenType,
        /// What the token should have been.
        expected: Expected,
    },
    /// The first token of the line cannot begin any production.
    InvalidLineStart(String),
}
impl std::fmt::Display for ParseErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateLabel(label) => write!(f, "the label \"{label}\" has already been defined elsewhere"),
            Self::UnexpectedEndOfTokens { expected } => write!(f, "reached end of token sequence, expected {expected}"),
            Self::TypeMismatch { token, found, expected } => write!(f, "got token \"{token}\" of type \"{found}\", expected {expected}"),
            Self::InvalidLineStart(token) => write!(f, "got token \"{token}\", which is not a valid start to a production"),
        }
    }
}

/// Error from validating a line.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ParseErr {
    /// The 1-based source line of the error.
    pub line: usize,
    /// The kind of error.
    pub kind: ParseErrKind,
}
impl ParseErr {
    /// Creates a new [`ParseErr`].
    pub fn new(line: usize, kind: ParseErrKind) -> Self {
        ParseErr { line, kind }
    }
}
impl std::fmt::Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for ParseErr {}
impl crate::err::Error for ParseErr {
    fn line(&self) -> Option<usize> {
        Some(self.line)
    }

    fn help(&self) -> Option<Cow<str>> {
        match &self.kind {
            ParseErrKind::DuplicateLabel(_) => Some("no two labels can have the same name, try renaming one of them".into()),
            ParseErrKind::UnexpectedEndOfTokens { .. } => Some("this line is missing an operand".into()),
            ParseErrKind::TypeMismatch { found: TokenType::Label, .. } => Some("labels can only be declared at the start of a line".into()),
            ParseErrKind::TypeMismatch { .. } => None,
            ParseErrKind::InvalidLineStart(_) => Some("a line must start with a label or an instruction".into()),
        }
    }
}

/// Whether a (lowercased) token has the shape of a label declaration:
/// at least one character followed by the label marker.
fn is_label_decl(token: &str) -> bool {
    token.len() > LABEL_MARKER.len_utf8() && token.ends_with(LABEL_MARKER)
}
fn is_num(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

/// The grammar engine.
///
/// This holds the labels declared so far, so a single [`Grammar`]
/// should be used per program load and cleared between loads
/// (see [`Grammar::clear_labels`]).
///
/// # Example
/// ```
/// use miniasm::ast::TokenType;
/// use miniasm::parse::Grammar;
/// use miniasm::parse::lex::tokenize;
///
/// let mut grammar = Grammar::new();
/// let types = grammar.validate(&tokenize("inc r3"), 1).unwrap();
/// assert_eq!(types, [TokenType::Inc, TokenType::Reg]);
///
/// assert!(grammar.validate(&tokenize("inc 3"), 2).is_err());
/// ```
#[derive(Debug, Default, Clone)]
pub struct Grammar {
    /// Declared labels, lowercase, including the marker.
    labels: HashSet<String>,
}

impl Grammar {
    /// Creates a grammar engine with no declared labels.
    pub fn new() -> Self {
        Default::default()
    }

    /// Forgets every declared label.
    pub fn clear_labels(&mut self) {
        self.labels.clear();
    }

    /// Checks whether a label (with or without its marker) has been declared.
    pub fn is_declared(&self, label: &str) -> bool {
        let mut key = label.to_lowercase();
        if !key.ends_with(LABEL_MARKER) {
            key.push(LABEL_MARKER);
        }
        self.labels.contains(&key)
    }

    /// Classifies a token into its syntactic type.
    ///
    /// Classification is case-insensitive and tries the following in order,
    /// returning the first match:
    /// 1. label declaration (`loop:`), which is recorded as declared
    /// 2. register (`r0`-`r16`)
    /// 3. number (digits only)
    /// 4. data-motion keyword (`load`, `store`, `read`, `write`)
    /// 5. arithmetic keyword (`add`, `sub`, `div`, `mul`)
    /// 6. branch keyword (`blt`, `bgt`, `bleq`, `bgeq`, `beq`, `bneq`)
    /// 7. symbol (`$`, `@`, `[`, `]`, `=`, `,`)
    /// 8. reference to a declared label
    /// 9. `br`, `skip`, `halt`, `inc`
    /// 10. any other identifier
    ///
    /// This fails only if the token declares a label that was already declared.
    pub fn classify(&mut self, token: &str) -> Result<TokenType, ParseErrKind> {
        let lower = token.to_lowercase();

        if is_label_decl(&lower) {
            if !self.labels.insert(lower) {
                return Err(ParseErrKind::DuplicateLabel(token.to_string()));
            }
            tracing::trace!(label = token, "declared label");
            return Ok(TokenType::Label);
        }

        let ty = if lower.parse::<Reg>().is_ok() {
            TokenType::Reg
        } else if is_num(&lower) {
            TokenType::Num
        } else if let Ok(op) = lower.parse::<DataOp>() {
            TokenType::Data(op)
        } else if lower.parse::<ArithOp>().is_ok() {
            TokenType::Arithmetic
        } else if lower.parse::<BranchOp>().is_ok() {
            TokenType::Branch
        } else if let Some(sym) = single_char(&lower).and_then(Symbol::from_char) {
            TokenType::Symbol(sym)
        } else if self.is_declared(&lower) {
            TokenType::Id
        } else {
            match &*lower {
                "br" => TokenType::Br,
                "skip" => TokenType::Skip,
                "halt" => TokenType::Halt,
                "inc" => TokenType::Inc,
                _ => TokenType::Id,
            }
        };
        Ok(ty)
    }

    /// Validates one line of tokens against the grammar,
    /// returning the type of every token that was examined.
    ///
    /// The first token must be a label declaration or begin a production.
    /// `line` is the source line number used in errors.
    pub fn validate(&mut self, tokens: &[String], line: usize) -> Result<Vec<TokenType>, ParseErr> {
        let err = |kind| ParseErr::new(line, kind);

        let Some(first) = tokens.first() else {
            return Err(err(ParseErrKind::UnexpectedEndOfTokens { expected: Expected::OneOf(Choice::Production) }));
        };

        let first_ty = self.classify(first).map_err(err)?;
        if first_ty != TokenType::Label && !Choice::Production.accepts().contains(&first_ty) {
            return Err(err(ParseErrKind::InvalidLineStart(first.clone())));
        }

        let mut types = vec![first_ty];
        let mut cursor = 1;
        self.follow(first_ty, tokens, &mut cursor, &mut types)
            .map_err(err)?;

        tracing::trace!(line, ?types, "validated line");
        Ok(types)
    }

    /// Follows the production keyed by `ty`, consuming tokens from `cursor`.
    fn follow(
        &mut self,
        ty: TokenType,
        tokens: &[String],
        cursor: &mut usize,
        types: &mut Vec<TokenType>,
    ) -> Result<(), ParseErrKind> {
        for &rule in production(ty) {
            let Some(token) = tokens.get(*cursor) else {
                return Err(ParseErrKind::UnexpectedEndOfTokens { expected: rule.into() });
            };
            let found = self.classify(token)?;
            types.push(found);
            *cursor += 1;

            let accepted = match rule {
                Rule::Terminal(t) => t == found,
                Rule::Choice(c) => c.accepts().contains(&found),
            };
            if !accepted {
                return Err(ParseErrKind::TypeMismatch {
                    token: token.clone(),
                    found,
                    expected: rule.into(),
                });
            }

            if let Rule::Choice(_) = rule {
                self.follow(found, tokens, cursor, types)?;
            }
        }

        Ok(())
    }
}

/// The only character of a one-character string.
fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
