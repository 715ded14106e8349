//! Error interface for MiniASM.
//!
//! Every error produced by this crate (while loading or while simulating)
//! implements the [`Error`] trait, which extends [`std::error::Error`]
//! with the source line the error refers to and an optional hint for the user.
//!
//! The error kinds themselves live next to the component that raises them
//! and are re-exported here for convenience:
//! - [`ParseErr`]: a line was rejected by the grammar engine
//! - [`AsmErr`]: a program could not be loaded
//! - [`SimErr`]: a step could not be executed
use std::borrow::Cow;

pub use crate::asm::AsmErr;
pub use crate::parse::{Expected, ParseErr, ParseErrKind};
pub use crate::sim::SimErr;

/// Unified error interface for all errors in this crate.
///
/// Drivers use this trait to display errors uniformly,
/// regardless of which stage raised them.
pub trait Error: std::error::Error {
    /// The 1-based source line this error refers to, if any.
    fn line(&self) -> Option<usize> {
        None
    }

    /// A suggestion on how to fix the error.
    fn help(&self) -> Option<Cow<str>> {
        None
    }

    /// Renders the error as a multi-line report
    /// (the error, its line, and its help message if present).
    fn report(&self) -> String {
        let mut out = String::from("Error:");
        if let Some(line) = self.line() {
            out.push_str(&format!(" line {line} ->"));
        }
        out.push_str(&format!(" {self}"));
        if let Some(help) = self.help() {
            out.push_str(&format!("\nhelp: {help}"));
        }
        out
    }
}
