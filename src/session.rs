//! The entry points a front end drives.
//!
//! A [`Session`] bundles a [`Loader`] and a [`Simulator`],
//! and exposes the operations a step-by-step visualizer needs:
//! loading a program file, stepping forward and back,
//! reading the stores, editing presets, and describing each step.
//!
//! ```no_run
//! use miniasm::session::Session;
//!
//! let mut session = Session::default();
//! let (message, lines) = session.load_program("program.asm");
//! println!("{message}");
//!
//! let mut index = 0;
//! while !lines.is_empty() && !session.is_halt(index) {
//!     let next = session.step(index).unwrap();
//!     session.record_visited_index(index);
//!     index = next;
//! }
//! ```

use std::path::Path;

use crate::asm::{AsmErr, Loader, Program, SUCCESS_MESSAGE};
use crate::ast::StoreName;
use crate::err::Error;
use crate::sim::mem::{MemStore, PresetStore};
use crate::sim::{SimErr, SimFlags, Simulator};

/// A front end's view of one program and its run.
#[derive(Debug, Default)]
pub struct Session {
    loader: Loader,
    sim: Simulator,
}

impl Session {
    /// Creates a session with no program, using the given simulator flags.
    pub fn new(flags: SimFlags) -> Self {
        Self { loader: Loader::new(), sim: Simulator::new(flags) }
    }

    /// Loads a program file and starts a new run from the presets.
    ///
    /// On success, this returns [`SUCCESS_MESSAGE`] and every accepted line's tokens in source order.
    /// On failure, this returns the error report and no lines,
    /// and no program is loaded.
    pub fn load_program(&mut self, path: impl AsRef<Path>) -> (String, Vec<Vec<String>>) {
        match self.try_load_program(path) {
            Ok(program) => (SUCCESS_MESSAGE.to_string(), program.lines().to_vec()),
            Err(e) => (e.report(), vec![]),
        }
    }

    /// Loads a program file and starts a new run from the presets.
    ///
    /// On failure, no program is loaded.
    pub fn try_load_program(&mut self, path: impl AsRef<Path>) -> Result<&Program, AsmErr> {
        let result = self.loader.load_file(path);
        self.install(result)
    }

    /// Loads a program from source text and starts a new run from the presets.
    ///
    /// On failure, no program is loaded.
    pub fn load_src(&mut self, src: &str) -> Result<&Program, AsmErr> {
        let result = self.loader.load_src(src);
        self.install(result)
    }

    fn install(&mut self, result: Result<Program, AsmErr>) -> Result<&Program, AsmErr> {
        match result {
            Ok(program) => {
                self.sim.load_program(program);
                Ok(self.sim.program())
            },
            Err(e) => {
                self.sim.load_program(Program::new());
                Err(e)
            },
        }
    }

    /// The loaded program.
    pub fn program(&self) -> &Program {
        self.sim.program()
    }
    /// The underlying simulator.
    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }
    /// The underlying simulator, mutably (e.g., to edit its flags).
    pub fn simulator_mut(&mut self) -> &mut Simulator {
        &mut self.sim
    }

    /// Executes the instruction at `index`, returning the index to execute next.
    pub fn step(&mut self, index: usize) -> Result<usize, SimErr> {
        self.sim.step(index)
    }
    /// Undoes the instruction at `index`, returning the previously visited index.
    pub fn revert(&mut self, index: usize) -> usize {
        self.sim.revert(index)
    }
    /// Records that `index` was visited.
    pub fn record_visited_index(&mut self, index: usize) {
        self.sim.record_visited_index(index)
    }
    /// Whether the instruction at `index` is `halt`.
    pub fn is_halt(&self, index: usize) -> bool {
        self.sim.is_halt(index)
    }

    /// The register store.
    pub fn registers(&self) -> &MemStore {
        self.sim.registers()
    }
    /// The memory store.
    pub fn memory(&self) -> &MemStore {
        self.sim.memory()
    }
    /// The disk store.
    pub fn disk(&self) -> &MemStore {
        self.sim.disk()
    }

    /// The presets.
    pub fn presets(&self) -> &PresetStore {
        self.sim.presets()
    }
    /// Sets the baseline value of an address.
    pub fn set_preset(&mut self, store: StoreName, addr: &str, value: impl Into<String>) {
        self.sim.set_preset(store, addr, value)
    }
    /// Removes the baseline value of an address.
    pub fn remove_preset(&mut self, store: StoreName, addr: &str) {
        self.sim.remove_preset(store, addr)
    }

    /// Resets the stores to the presets, keeping the program.
    pub fn reset_to_presets(&mut self) {
        self.sim.reset_to_presets()
    }
    /// Empties the stores and unloads the program, keeping the presets.
    pub fn clear_all(&mut self) {
        self.sim.clear_all()
    }

    /// Describes the instruction at `index` (see [`crate::ast::sim::Skeleton::describe`]).
    pub fn describe_step(&self, index: usize) -> Option<Vec<String>> {
        self.sim.program().op(index).map(|op| op.describe())
    }
    /// The display header of the instruction at `index` (see [`Simulator::step_header`]).
    pub fn step_header(&self, index: usize) -> Option<String> {
        self.sim.step_header(index)
    }
}

#[cfg(test)]
mod tests {
    use crate::asm::SUCCESS_MESSAGE;
    use crate::ast::StoreName;

    use super::Session;

    #[test]
    fn test_load_failure_unloads() {
        let mut session = Session::default();
        session.load_src("inc r1\nhalt").unwrap();
        assert_eq!(session.program().len(), 2);

        assert!(session.load_src("inc r1").is_err());
        assert!(session.program().is_empty());
    }

    #[test]
    fn test_load_program_missing_file() {
        let mut session = Session::default();
        let (message, lines) = session.load_program("/definitely/not/a/real/path.asm");
        assert!(message.starts_with("Error: could not read program"), "{message}");
        assert!(lines.is_empty());
        assert_ne!(message, SUCCESS_MESSAGE);
    }

    #[test]
    fn test_describe() {
        let mut session = Session::default();
        session.load_src("x: store r1, [100, r2]\nadd r1, r2\nhalt").unwrap();

        assert_eq!(session.step_header(0).unwrap(), "Line 1, PC = x, Label = x:");
        assert_eq!(session.describe_step(0).unwrap(), [
            "Instruction: store",
            "Addressing Mode: index",
            "Bus Motion: registers -> memory",
        ]);
        assert_eq!(session.describe_step(1).unwrap(), ["Instruction: add", "Expression: r1 + r2"]);
        assert_eq!(session.describe_step(2).unwrap(), ["Instruction: halt", ""]);
        assert_eq!(session.describe_step(3), None);
    }

    #[test]
    fn test_presets_survive_clear() {
        let mut session = Session::default();
        session.set_preset(StoreName::Memory, "5", "five");
        session.load_src("load r1, 5\nhalt").unwrap();

        let next = session.step(0).unwrap();
        session.record_visited_index(0);
        assert_eq!(session.registers().get("r1"), "five");
        assert!(session.is_halt(next));

        session.clear_all();
        assert!(session.memory().is_empty());
        assert!(session.program().is_empty());

        session.load_src("halt").unwrap();
        assert_eq!(session.memory().get("5"), "five");

        session.remove_preset(StoreName::Memory, "5");
        session.reset_to_presets();
        assert!(session.memory().is_empty());
        assert_eq!(session.presets().get(StoreName::Memory, "5"), None);
    }
}
