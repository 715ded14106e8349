//! Tokenizing MiniASM.
//!
//! A MiniASM line is split on a small set of separator characters:
//! whitespace, which is discarded, and the symbols `[ ] = $ @ ,`,
//! which each become a token of their own.
//! Every run of other characters becomes one token.
//!
//! The key function of this module is [`tokenize`], which never fails.

use logos::Logos;

/// A unit of information in MiniASM source code.
///
/// Tokens carry no classification beyond being a symbol or not.
/// The grammar engine ([`crate::parse::Grammar`]) decides what a word means.
#[derive(Debug, Logos, PartialEq, Eq, Clone, Copy)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    /// `$`
    #[token("$")]
    Dollar,

    /// `@`
    #[token("@")]
    At,

    /// `[`
    #[token("[")]
    LBracket,

    /// `]`
    #[token("]")]
    RBracket,

    /// `=`
    #[token("=")]
    Equals,

    /// `,`
    #[token(",")]
    Comma,

    /// Any run of characters that are neither whitespace nor a symbol
    /// (e.g., `load`, `r1`, `100`, `loop:`).
    #[regex(r"[^\[\]=$@, \t\r\n]+")]
    Word,
}

/// Splits one source line into its tokens.
///
/// Whitespace is discarded, each separator symbol becomes its own token,
/// and runs of other characters become one token.
/// The empty string (or a whitespace-only string) yields no tokens.
///
/// ```
/// use miniasm::parse::lex::tokenize;
///
/// assert_eq!(tokenize("load r1, [5, r2]"), ["load", "r1", ",", "[", "5", ",", "r2", "]"]);
/// assert_eq!(tokenize("loop: add r1,r2"), ["loop:", "add", "r1", ",", "r2"]);
/// assert!(tokenize("   ").is_empty());
/// ```
pub fn tokenize(line: &str) -> Vec<String> {
    let mut lexer = Token::lexer(line);
    let mut tokens = vec![];

    // Every character is either skipped or covered by a token,
    // so an error slice can only be a stray word and is kept as one.
    while lexer.next().is_some() {
        tokens.push(lexer.slice().to_string());
    }
    tokens
}
