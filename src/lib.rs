//! A MiniASM syntax checker and step-by-step simulator.
//!
//! MiniASM is a small instructional assembly language with sixteen registers,
//! a memory store, and a disk store. This crate validates MiniASM programs
//! against its grammar, and executes them one instruction at a time,
//! with the ability to undo each step.
//!
//! # Usage
//!
//! To check a program, it must be loaded:
//! ```
//! use miniasm::asm::load_src;
//!
//! let code = "
//!     load r1, =5
//!     loop: inc r1
//!     store r1, [100, r2]
//!     halt
//! ";
//! let program = load_src(code).unwrap();
//! assert_eq!(program.len(), 4);
//!
//! // Errors report the line they occurred on:
//! let err = load_src("load r1, =5\nadd r1, 5\nhalt").unwrap_err();
//! # use miniasm::err::Error;
//! assert_eq!(err.line(), Some(2));
//! ```
//!
//! Once a program has been loaded, it can be executed with the simulator:
//! ```
//! # use miniasm::asm::load_src;
//! # let program = load_src("load r1, =5\nhalt").unwrap();
//! use miniasm::sim::Simulator;
//!
//! let mut simulator = Simulator::new(Default::default());
//! simulator.load_program(program);
//! simulator.run(0).unwrap(); // <-- Result can be handled accordingly
//! ```
//!
//! If more granularity is needed for simulation, there are also step and revert functions.
//! See the [`sim`] module for more details.
//!
//! Front ends which work on program files should use [`session::Session`],
//! which bundles loading, stepping, presets, and step descriptions.
#![warn(missing_docs)]

pub mod parse;
pub mod ast;
pub mod asm;
pub mod sim;
pub mod session;
pub mod err;
