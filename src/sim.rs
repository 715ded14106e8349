//! Simulating and execution for MiniASM programs.
//!
//! This module is focused on executing loaded programs (i.e., [`Program`]).
//!
//! This module consists of:
//! - [`Simulator`]: The struct that simulates loaded programs.
//! - [`mem`]: The module handling the state stores and presets.
//!
//! # Usage
//!
//! To simulate some code, you need to instantiate a Simulator and load a program into it:
//!
//! ```
//! use miniasm::asm::load_src;
//! use miniasm::sim::Simulator;
//!
//! let program = load_src("load r1, =5\nhalt").unwrap();
//!
//! let mut sim = Simulator::new(Default::default());
//! sim.load_program(program);
//! sim.run(0).unwrap();
//! assert_eq!(sim.registers().get("r1"), "5");
//! ```
//!
//! ## Flags
//!
//! Here, we define `sim` to have the default flags.
//! We could also configure the simulator by editing the flags. For example,
//! if every visit of an instruction should be undoable, we can edit the flags like so:
//!
//! ```
//! # use miniasm::sim::{Simulator, SimFlags};
//! let mut sim = Simulator::new(SimFlags { refresh_undo_on_revisit: true, ..Default::default() });
//! ```
//!
//! All of the available flags can be found in [`SimFlags`].
//!
//! ## Execution
//!
//! Execution is driven by instruction index. A driver stepping through a program
//! executes the instruction at an index with [`Simulator::step`]
//! (which returns the index to execute next)
//! and then records that the index was visited with [`Simulator::record_visited_index`].
//! [`Simulator::revert`] undoes the most recently visited instruction
//! and returns the index visited before it.
//!
//! ```
//! use miniasm::asm::load_src;
//! use miniasm::ast::StoreName;
//! use miniasm::sim::Simulator;
//!
//! let program = load_src("inc r1\ninc r1\nhalt").unwrap();
//! let mut sim = Simulator::new(Default::default());
//! sim.set_preset(StoreName::Registers, "r1", "0");
//! sim.load_program(program);
//!
//! let next = sim.step(0).unwrap();
//! sim.record_visited_index(0);
//! let _ = sim.step(next).unwrap();
//! sim.record_visited_index(next);
//! assert_eq!(sim.registers().get("r1"), "2");
//!
//! // undo the second increment
//! assert_eq!(sim.revert(1), 0);
//! assert_eq!(sim.registers().get("r1"), "1");
//! ```
//!
//! [`Simulator::run`] steps until `halt`.

pub mod mem;

use std::borrow::Cow;
use std::collections::HashMap;

use crate::asm::Program;
use crate::ast::sim::{Operand, Skeleton};
use crate::ast::{AddrMode, ArithOp, StoreName};

use self::mem::{MemStore, PresetStore, SessionState};

/// Errors that can occur during simulation.
///
/// A step that fails leaves the state stores and the undo log as they were.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SimErr {
    /// A branch or jump referred to a label that was never declared.
    UnknownLabelReference(String),
    /// A value used as a number was not an integer.
    MalformedNumericOperand(String),
    /// A `div` instruction divided by zero.
    DivisionByZero,
    /// An arithmetic result did not fit in a 64-bit integer.
    ArithmeticOverflow,
    /// The index to execute is past the end of the program.
    IndexOutOfRange(usize),
    /// [`Simulator::run`] executed its maximum number of steps without halting.
    StepLimitExceeded(u64),
}
impl std::fmt::Display for SimErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimErr::UnknownLabelReference(l)   => write!(f, "label \"{l}\" is not defined in the program"),
            SimErr::MalformedNumericOperand(v) => write!(f, "value \"{v}\" is not an integer"),
            SimErr::DivisionByZero             => f.write_str("division by zero"),
            SimErr::ArithmeticOverflow         => f.write_str("arithmetic result out of range"),
            SimErr::IndexOutOfRange(i)         => write!(f, "no instruction at index {i}"),
            SimErr::StepLimitExceeded(n)       => write!(f, "program did not halt within {n} steps"),
        }
    }
}
impl std::error::Error for SimErr {}
impl crate::err::Error for SimErr {
    fn help(&self) -> Option<Cow<str>> {
        match self {
            SimErr::UnknownLabelReference(l) => Some(format!("declare the label with \"{l}:\" at the start of a line").into()),
            SimErr::MalformedNumericOperand(_) => Some("preset or load an integer before using it in arithmetic or addressing".into()),
            SimErr::StepLimitExceeded(_) => Some("check for an infinite loop, or raise the step limit".into()),
            _ => None,
        }
    }
}

/// Configuration flags for [`Simulator`].
///
/// These can be modified after the `Simulator` is created with [`Simulator::new`]
/// and their effects should still apply.
///
/// Read the field descriptions for more details.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SimFlags {
    /// Whether every execution of an instruction records an undo entry.
    ///
    /// When `false`, only the first execution of an index records an undo entry,
    /// and that entry is kept until the run is reset. Reverting any visit of the index
    /// (e.g., a later iteration of a loop) restores the value from before the *first* visit.
    ///
    /// When `true`, each execution is recorded, and each revert consumes the entry
    /// of the most recent visit, so reverts undo visits in reverse order.
    ///
    /// By default, this flag is `false`.
    pub refresh_undo_on_revisit: bool,

    /// The maximum number of steps [`Simulator::run`] executes before giving up.
    ///
    /// By default, this is `10_000`.
    pub max_steps: u64,
}

impl Default for SimFlags {
    fn default() -> Self {
        Self {
            refresh_undo_on_revisit: false,
            max_steps: 10_000,
        }
    }
}

/// How to undo one executed instruction.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum UndoRecord {
    /// The instruction changed no state.
    Unchanged,
    /// The instruction wrote to a key.
    Write {
        /// The store written to.
        store: StoreName,
        /// The key written to.
        key: String,
        /// The key's value before the write, or `None` if the key was unset.
        prior: Option<String>,
    },
}

/// A write an instruction performs, computed before any state is touched.
struct Write {
    store: StoreName,
    key: String,
    value: String,
}

/// Executes MiniASM programs.
///
/// The simulator owns the loaded [`Program`], the [`SessionState`] it mutates,
/// the [`PresetStore`] the state is reset to, and the undo and index logs.
#[derive(Debug)]
pub struct Simulator {
    /// The configuration flags.
    pub flags: SimFlags,

    program: Program,
    state: SessionState,
    presets: PresetStore,

    /// Undo entries per index. The last entry is undone first.
    undo_log: HashMap<usize, Vec<UndoRecord>>,
    /// Visited indexes, in visit order. Never empty.
    index_log: Vec<usize>,
}

impl Simulator {
    /// Creates a new simulator with the provided initializers,
    /// no program, and no presets.
    pub fn new(flags: SimFlags) -> Self {
        Self {
            flags,
            program: Program::new(),
            state: SessionState::new(),
            presets: PresetStore::new(),
            undo_log: HashMap::new(),
            index_log: vec![0],
        }
    }

    /// Loads a program and starts a new run from the presets.
    pub fn load_program(&mut self, program: Program) {
        tracing::debug!(ops = program.len(), "loading program into simulator");
        self.program = program;
        self.reset_to_presets();
    }

    /// The loaded program.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Resets the state to the presets and clears the undo and index logs.
    ///
    /// The loaded program is kept.
    pub fn reset_to_presets(&mut self) {
        self.state = self.presets.as_state().clone();
        self.clear_logs();
    }

    /// Empties every store, clears the undo and index logs, and unloads the program.
    ///
    /// The presets are kept.
    pub fn clear_all(&mut self) {
        self.state.clear();
        self.program = Program::new();
        self.clear_logs();
    }

    fn clear_logs(&mut self) {
        self.undo_log.clear();
        self.index_log.clear();
        self.index_log.push(0);
    }

    /// The current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }
    /// The register store.
    pub fn registers(&self) -> &MemStore {
        &self.state.registers
    }
    /// The memory store.
    pub fn memory(&self) -> &MemStore {
        &self.state.memory
    }
    /// The disk store.
    pub fn disk(&self) -> &MemStore {
        &self.state.disk
    }

    /// The presets.
    pub fn presets(&self) -> &PresetStore {
        &self.presets
    }
    /// Sets the baseline value of an address.
    ///
    /// This does not affect the current state until the next reset.
    pub fn set_preset(&mut self, store: StoreName, addr: &str, value: impl Into<String>) {
        self.presets.set(store, addr, value);
    }
    /// Removes the baseline value of an address.
    ///
    /// This does not affect the current state until the next reset.
    pub fn remove_preset(&mut self, store: StoreName, addr: &str) {
        self.presets.remove(store, addr);
    }

    /// The visited indexes, oldest first.
    pub fn index_log(&self) -> &[usize] {
        &self.index_log
    }
    /// The most recently visited index.
    pub fn current_index(&self) -> usize {
        self.index_log.last().copied().unwrap_or(0)
    }
    /// The undo entry that reverting `index` would apply.
    pub fn undo_record(&self, index: usize) -> Option<&UndoRecord> {
        self.undo_log.get(&index)?.last()
    }

    /// Whether the instruction at `index` is `halt`.
    pub fn is_halt(&self, index: usize) -> bool {
        matches!(self.program.op(index), Some(Skeleton::Halt))
    }

    /// The display header of the instruction at `index`:
    /// its line number, its program counter, and its label (if it declares one).
    ///
    /// ```
    /// use miniasm::asm::load_src;
    /// use miniasm::sim::Simulator;
    ///
    /// let mut sim = Simulator::new(Default::default());
    /// sim.load_program(load_src("skip\nend: halt").unwrap());
    /// assert_eq!(sim.step_header(0).unwrap(), "Line 1, PC = x");
    /// assert_eq!(sim.step_header(1).unwrap(), "Line 2, PC = x+4, Label = end:");
    /// ```
    pub fn step_header(&self, index: usize) -> Option<String> {
        let tokens = self.program.line(index)?;

        let mut header = format!("Line {}, PC = x", index + 1);
        if index > 0 {
            header.push_str(&format!("+{}", 4 * index));
        }
        if self.program.label_at(index).is_some() {
            if let Some(label) = tokens.first() {
                header.push_str(&format!(", Label = {label}"));
            }
        }
        Some(header)
    }

    /// Records that `index` was visited (unless it was also the last visited index).
    pub fn record_visited_index(&mut self, index: usize) {
        if self.index_log.last() != Some(&index) {
            self.index_log.push(index);
        }
    }

    /// Executes the instruction at `index`, returning the index to execute next.
    ///
    /// The next index is `index + 1` unless a branch is taken or a jump is executed.
    /// If execution fails, no state is changed.
    pub fn step(&mut self, index: usize) -> Result<usize, SimErr> {
        let op = self.program.op(index).ok_or(SimErr::IndexOutOfRange(index))?;
        let (write, next) = self.execute(index, op)?;

        let record = match write {
            Some(Write { store, key, value }) => {
                let prior = self.state.store_mut(store).set(key.clone(), value);
                UndoRecord::Write { store, key, prior }
            },
            None => UndoRecord::Unchanged,
        };
        tracing::debug!(index, next, "executed instruction");

        let records = self.undo_log.entry(index).or_default();
        if records.is_empty() || self.flags.refresh_undo_on_revisit {
            tracing::trace!(index, ?record, "recorded undo entry");
            records.push(record);
        }
        Ok(next)
    }

    /// Undoes the instruction at `index` and returns the previously visited index.
    ///
    /// If `index` has no undo entry, the state is unchanged.
    /// The first visited index is never removed from the index log.
    ///
    /// Without [`SimFlags::refresh_undo_on_revisit`], an index keeps its first-visit entry
    /// for the whole run, so every revert of that index restores the same prior value.
    /// With it, each revert consumes the entry of the most recent visit.
    pub fn revert(&mut self, index: usize) -> usize {
        let record = match self.flags.refresh_undo_on_revisit {
            true => self.undo_log.get_mut(&index).and_then(Vec::pop),
            false => self.undo_log.get(&index).and_then(|records| records.last()).cloned(),
        };
        match record {
            Some(UndoRecord::Write { store, key, prior }) => {
                let store = self.state.store_mut(store);
                match prior {
                    Some(value) => { store.set(key, value); },
                    None => { store.remove(&key); },
                }
            },
            Some(UndoRecord::Unchanged) | None => {},
        }

        if self.index_log.len() > 1 {
            self.index_log.pop();
        }
        let prev = self.current_index();
        tracing::debug!(index, prev, "reverted instruction");
        prev
    }

    /// Steps from `from` until `halt` is executed, returning the index of the `halt`.
    ///
    /// Every executed index is recorded as visited.
    /// This fails if more than [`SimFlags::max_steps`] steps are executed.
    pub fn run(&mut self, from: usize) -> Result<usize, SimErr> {
        let mut index = from;
        for _ in 0..self.flags.max_steps {
            let halting = self.is_halt(index);
            let next = self.step(index)?;
            self.record_visited_index(index);

            if halting { return Ok(index); }
            index = next;
        }

        Err(SimErr::StepLimitExceeded(self.flags.max_steps))
    }

    /// Computes the effect of an instruction without applying it.
    fn execute(&self, index: usize, op: &Skeleton) -> Result<(Option<Write>, usize), SimErr> {
        let regs = &self.state.registers;

        match op {
            Skeleton::Data { op, mode, dst_store, src_store, dst, src } => {
                // The address operand is the source of loads and reads,
                // and the destination of stores and writes.
                let into_reg = op.into_register();
                let key_of = |operand: &Operand, is_addr: bool| match (mode, is_addr) {
                    (AddrMode::Relative, true) => self.relative_key(operand, index),
                    _ => self.address(operand),
                };

                let key = key_of(dst, !into_reg)?;
                let value = match mode {
                    AddrMode::Immediate => src.to_string(),
                    AddrMode::Indirect => {
                        let ptr = self.state.store(*src_store).get(&key_of(src, into_reg)?);
                        self.state.memory.get(ptr).to_string()
                    },
                    _ => self.state.store(*src_store).get(&key_of(src, into_reg)?).to_string(),
                };

                let write = Write { store: *dst_store, key, value };
                Ok((Some(write), index + 1))
            },
            Skeleton::Arith { op, dr, sr } => {
                let a = parse_int(regs.get(&dr.key()))?;
                let b = parse_int(regs.get(&sr.key()))?;
                let value = match op {
                    ArithOp::Add => a.checked_add(b).ok_or(SimErr::ArithmeticOverflow)?.to_string(),
                    ArithOp::Sub => a.checked_sub(b).ok_or(SimErr::ArithmeticOverflow)?.to_string(),
                    ArithOp::Mul => a.checked_mul(b).ok_or(SimErr::ArithmeticOverflow)?.to_string(),
                    ArithOp::Div => divide(a, b)?,
                };

                let write = Write { store: StoreName::Registers, key: dr.key(), value };
                Ok((Some(write), index + 1))
            },
            Skeleton::Branch { op, left, right, target } => {
                let target = self.resolve_label(target)?;
                let l = regs.get(&left.key());
                let r = regs.get(&right.key());

                let ord = match (l.trim().parse::<i64>(), r.trim().parse::<i64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                let next = match op.holds(ord) {
                    true => target,
                    false => index + 1,
                };
                Ok((None, next))
            },
            Skeleton::Jump { target } => Ok((None, self.resolve_label(target)?)),
            Skeleton::Inc { reg } => {
                let value = parse_int(regs.get(&reg.key()))?
                    .checked_add(1)
                    .ok_or(SimErr::ArithmeticOverflow)?;

                let write = Write { store: StoreName::Registers, key: reg.key(), value: value.to_string() };
                Ok((Some(write), index + 1))
            },
            Skeleton::Skip | Skeleton::Halt => Ok((None, index + 1)),
        }
    }

    /// The key an operand addresses.
    fn address(&self, operand: &Operand) -> Result<String, SimErr> {
        match operand {
            Operand::Reg(r) => Ok(r.key()),
            Operand::Num(n) => Ok(n.clone()),
            Operand::Indexed { base, offset } => {
                let base = self.value_of(base)?;
                let offset = parse_int(self.state.registers.get(&offset.key()))?;
                let addr = base.checked_add(offset).ok_or(SimErr::ArithmeticOverflow)?;
                Ok(addr.to_string())
            },
        }
    }

    /// The key a PC-relative operand addresses from the instruction at `index`.
    ///
    /// With `n = value + 4 * index`, the key is `x` when `n` is zero, `x+n` when it is positive,
    /// and `x-n` (e.g., `x-4`) when it is negative.
    fn relative_key(&self, operand: &Operand, index: usize) -> Result<String, SimErr> {
        let pc_offset = i64::try_from(index)
            .ok()
            .and_then(|i| i.checked_mul(4))
            .ok_or(SimErr::ArithmeticOverflow)?;
        let n = self.value_of(operand)?
            .checked_add(pc_offset)
            .ok_or(SimErr::ArithmeticOverflow)?;

        match n {
            0 => Ok(String::from("x")),
            n => Ok(format!("x{n:+}")),
        }
    }

    /// The integer an operand stands for: a literal, or the contents of a register.
    fn value_of(&self, operand: &Operand) -> Result<i64, SimErr> {
        match operand {
            Operand::Reg(r) => parse_int(self.state.registers.get(&r.key())),
            Operand::Num(n) => parse_int(n),
            Operand::Indexed { .. } => parse_int(&self.address(operand)?),
        }
    }

    fn resolve_label(&self, label: &str) -> Result<usize, SimErr> {
        self.program.lookup_label(label)
            .ok_or_else(|| SimErr::UnknownLabelReference(label.to_string()))
    }
}
impl Default for Simulator {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

fn parse_int(text: &str) -> Result<i64, SimErr> {
    text.trim()
        .parse()
        .map_err(|_| SimErr::MalformedNumericOperand(text.to_string()))
}

/// Divides two integers, giving an integer when the division is exact
/// and a decimal otherwise.
fn divide(a: i64, b: i64) -> Result<String, SimErr> {
    if b == 0 {
        return Err(SimErr::DivisionByZero);
    }
    match a.checked_rem(b) {
        Some(0) => Ok(a.checked_div(b).ok_or(SimErr::ArithmeticOverflow)?.to_string()),
        Some(_) => Ok((a as f64 / b as f64).to_string()),
        None => Err(SimErr::ArithmeticOverflow),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::asm::load_src;
    use crate::ast::StoreName;

    use super::{SimErr, SimFlags, Simulator, UndoRecord};

    fn sim_with(src: &str, presets: &[(StoreName, &str, &str)]) -> Simulator {
        sim_with_flags(src, presets, Default::default())
    }
    fn sim_with_flags(src: &str, presets: &[(StoreName, &str, &str)], flags: SimFlags) -> Simulator {
        let mut sim = Simulator::new(flags);
        for &(store, addr, value) in presets {
            sim.set_preset(store, addr, value);
        }
        sim.load_program(load_src(src).unwrap());
        sim
    }
    /// Steps and records `index`, as a driver would.
    fn visit(sim: &mut Simulator, index: usize) -> usize {
        let next = sim.step(index).unwrap();
        sim.record_visited_index(index);
        next
    }

    #[test]
    fn test_load_immediate() {
        let mut sim = sim_with("load r1, =5\nhalt", &[]);
        assert_eq!(sim.step(0), Ok(1));
        assert_eq!(sim.registers().get("r1"), "5");
        assert!(sim.memory().is_empty());
    }

    #[test]
    fn test_store_index() {
        let mut sim = sim_with("store r1, [100, r2]\nhalt", &[
            (StoreName::Registers, "r1", "42"),
            (StoreName::Registers, "r2", "3"),
        ]);
        sim.step(0).unwrap();
        assert_eq!(sim.memory().get("103"), "42");
        assert_eq!(sim.undo_record(0), Some(&UndoRecord::Write {
            store: StoreName::Memory,
            key: "103".into(),
            prior: None,
        }));
    }

    #[test]
    fn test_load_index() {
        let mut sim = sim_with("load r1, [5, r2]\nhalt", &[
            (StoreName::Registers, "r2", "-2"),
            (StoreName::Memory, "3", "hello"),
        ]);
        sim.step(0).unwrap();
        assert_eq!(sim.registers().get("r1"), "hello");
    }

    #[test]
    fn test_load_direct() {
        let mut sim = sim_with("load r1, 100\nload r3, r1\nhalt", &[
            (StoreName::Memory, "100", "9"),
        ]);
        visit(&mut sim, 0);
        visit(&mut sim, 1);
        assert_eq!(sim.registers().get("r1"), "9");
        assert_eq!(sim.registers().get("r3"), "9");
    }

    #[test]
    fn test_disk() {
        let mut sim = sim_with("read r1, 7\nwrite r1, 8\nhalt", &[
            (StoreName::Disk, "7", "abc"),
        ]);
        visit(&mut sim, 0);
        visit(&mut sim, 1);
        assert_eq!(sim.registers().get("r1"), "abc");
        assert_eq!(sim.disk().get("8"), "abc");
        assert!(sim.memory().is_empty());
    }

    #[test]
    fn test_relative() {
        let src = "
            store r1, $8
            skip
            here: load r2, $r3
            load r4, $r5
            halt
        ";
        let mut sim = sim_with(src, &[
            (StoreName::Registers, "r1", "11"),
            (StoreName::Registers, "r3", "-4"),
            (StoreName::Registers, "r5", "-8"),
            (StoreName::Memory, "x+4", "hi"),
            (StoreName::Memory, "x+12", "nope"),
        ]);

        // index 0: x + (8 + 0)
        visit(&mut sim, 0);
        assert_eq!(sim.memory().get("x+8"), "11");

        // index 2: x + (-4 + 8)
        visit(&mut sim, 1);
        visit(&mut sim, 2);
        assert_eq!(sim.registers().get("r2"), "hi");

        // index 3: x + (-8 + 12)
        visit(&mut sim, 3);
        assert_eq!(sim.registers().get("r4"), "hi");
    }

    #[test]
    fn test_relative_zero_and_negative() {
        let mut sim = sim_with("store r1, $0\nstore r1, $r2\nhalt", &[
            (StoreName::Registers, "r1", "1"),
            (StoreName::Registers, "r2", "-8"),
        ]);
        visit(&mut sim, 0);
        visit(&mut sim, 1);
        assert_eq!(sim.memory().get("x"), "1");
        assert_eq!(sim.memory().get("x-4"), "1");
    }

    #[test]
    fn test_indirect() {
        let mut sim = sim_with("load r1, @r2\nload r3, @100\nhalt", &[
            (StoreName::Registers, "r2", "200"),
            (StoreName::Memory, "100", "200"),
            (StoreName::Memory, "200", "deep"),
        ]);
        visit(&mut sim, 0);
        visit(&mut sim, 1);
        assert_eq!(sim.registers().get("r1"), "deep");
        assert_eq!(sim.registers().get("r3"), "deep");
    }

    #[test]
    fn test_arithmetic() {
        let src = "add r1, r2\nsub r1, r3\nmul r1, r2\ndiv r1, r3\ndiv r1, r2\nhalt";
        let mut sim = sim_with(src, &[
            (StoreName::Registers, "r1", "1"),
            (StoreName::Registers, "r2", "4"),
            (StoreName::Registers, "r3", "2"),
        ]);

        let mut results = vec![];
        let mut index = 0;
        while !sim.is_halt(index) {
            index = visit(&mut sim, index);
            results.push(sim.registers().get("r1").to_string());
        }
        assert_eq!(results, ["5", "3", "12", "6", "1.5"]);
    }

    #[test]
    fn test_arithmetic_errors() {
        let mut sim = sim_with("div r1, r2\nhalt", &[
            (StoreName::Registers, "r1", "1"),
            (StoreName::Registers, "r2", "0"),
        ]);
        assert_eq!(sim.step(0), Err(SimErr::DivisionByZero));

        let mut sim = sim_with("add r1, r2\nhalt", &[
            (StoreName::Registers, "r1", "1"),
            (StoreName::Registers, "r2", "two"),
        ]);
        assert_eq!(sim.step(0), Err(SimErr::MalformedNumericOperand("two".into())));

        // unset registers are not numbers either
        let mut sim = sim_with("inc r5\nhalt", &[]);
        assert_eq!(sim.step(0), Err(SimErr::MalformedNumericOperand("".into())));

        let max = i64::MAX.to_string();
        let mut sim = sim_with("inc r1\nhalt", &[(StoreName::Registers, "r1", &max)]);
        assert_eq!(sim.step(0), Err(SimErr::ArithmeticOverflow));
    }

    #[test]
    fn test_failed_step_changes_nothing() {
        let mut sim = sim_with("load r1, [5, r2]\nhalt", &[
            (StoreName::Registers, "r2", "x"),
        ]);
        let before = sim.state().clone();
        assert!(sim.step(0).is_err());
        assert_eq!(sim.state(), &before);
        assert_eq!(sim.undo_record(0), None);
    }

    #[test]
    fn test_branches() {
        let cases = [
            ("blt", "1", "2", true),
            ("blt", "2", "2", false),
            ("bgt", "10", "9", true),
            ("bleq", "2", "2", true),
            ("bgeq", "1", "2", false),
            ("beq", "5", "5", true),
            ("beq", "5", "6", false),
            ("bneq", "5", "6", true),
            // non-numeric values compare as text
            ("blt", "apple", "banana", true),
            ("bgt", "10", "9x", false),
        ];

        for (op, l, r, taken) in cases {
            let src = format!("{op} r1, r2, end\nskip\nend: halt");
            let mut sim = sim_with(&src, &[
                (StoreName::Registers, "r1", l),
                (StoreName::Registers, "r2", r),
            ]);
            let expected = if taken { 2 } else { 1 };
            assert_eq!(sim.step(0), Ok(expected), "{op} {l:?} {r:?}");
            assert_eq!(sim.undo_record(0), Some(&UndoRecord::Unchanged));
        }
    }

    #[test]
    fn test_jump() {
        let mut sim = sim_with("br END\nskip\nend: halt", &[]);
        assert_eq!(sim.step(0), Ok(2));
    }

    #[test]
    fn test_unknown_label() {
        let mut sim = sim_with("br nowhere\nhalt", &[]);
        assert_eq!(sim.step(0), Err(SimErr::UnknownLabelReference("nowhere".into())));

        // resolved even when the branch would not be taken
        let mut sim = sim_with("blt r1, r2, nowhere\nhalt", &[
            (StoreName::Registers, "r1", "2"),
            (StoreName::Registers, "r2", "1"),
        ]);
        assert_eq!(sim.step(0), Err(SimErr::UnknownLabelReference("nowhere".into())));
    }

    #[test]
    fn test_index_out_of_range() {
        let mut sim = sim_with("halt", &[]);
        assert_eq!(sim.step(1), Err(SimErr::IndexOutOfRange(1)));
    }

    #[test]
    fn test_loop() {
        let src = "
            loop: inc r1
            blt r1, r2, loop
            add r1, r2
            halt
        ";
        let mut sim = sim_with(src, &[
            (StoreName::Registers, "r1", "0"),
            (StoreName::Registers, "r2", "3"),
        ]);

        let mut taken = 0;
        let mut index = 0;
        while !sim.is_halt(index) {
            let next = visit(&mut sim, index);
            if index == 1 && next == 0 {
                taken += 1;
            }
            index = next;
        }
        assert_eq!(taken, 2);
        assert_eq!(sim.registers().get("r1"), "6");
        assert_eq!(sim.registers().get("r2"), "3");
    }

    #[test]
    fn test_loop_falls_through() {
        // the add runs before the comparison, so the branch is never taken
        let src = "
            loop: add r1, r2
            inc r1
            blt r1, r2, loop
            halt
        ";
        let mut sim = sim_with(src, &[
            (StoreName::Registers, "r1", "0"),
            (StoreName::Registers, "r2", "3"),
        ]);

        assert_eq!(sim.run(0), Ok(3));
        assert_eq!(sim.index_log(), [0, 1, 2, 3]);
        assert_eq!(sim.registers().get("r1"), "4");
        assert_eq!(sim.registers().get("r2"), "3");
    }

    #[test]
    fn test_revert() {
        let mut sim = sim_with("load r1, =5\nstore r1, 100\nhalt", &[
            (StoreName::Registers, "r1", "1"),
        ]);
        let start = sim.state().clone();

        let next = visit(&mut sim, 0);
        let after_load = sim.state().clone();
        visit(&mut sim, next);
        assert_eq!(sim.memory().get("100"), "5");
        assert_eq!(sim.index_log(), [0, 1]);

        // store created the key, so reverting removes it
        assert_eq!(sim.revert(1), 0);
        assert!(!sim.memory().contains("100"));
        assert_eq!(sim.state(), &after_load);

        // load overwrote the preset, so reverting restores it
        assert_eq!(sim.revert(0), 0);
        assert_eq!(sim.state(), &start);
        assert_eq!(sim.index_log(), [0]);

        // reverting at the start does nothing
        assert_eq!(sim.revert(0), 0);
        assert_eq!(sim.state(), &start);
    }

    #[test]
    fn test_record_visited_index() {
        let mut sim = sim_with("skip\nhalt", &[]);
        sim.record_visited_index(0);
        assert_eq!(sim.index_log(), [0]);
        sim.record_visited_index(1);
        sim.record_visited_index(1);
        assert_eq!(sim.index_log(), [0, 1]);
        assert_eq!(sim.current_index(), 1);
    }

    #[test]
    fn test_revisit_keeps_first_record() {
        let src = "top: inc r1\nblt r1, r2, top\nhalt";
        let presets = [
            (StoreName::Registers, "r1", "0"),
            (StoreName::Registers, "r2", "2"),
        ];
        let mut sim = sim_with(src, &presets);
        for index in [0, 1, 0] {
            visit(&mut sim, index);
        }
        assert_eq!(sim.registers().get("r1"), "2");

        // reverting the second visit restores the value from before the first
        sim.revert(0);
        assert_eq!(sim.registers().get("r1"), "0");
    }

    #[test]
    fn test_revert_trail_through_loop() {
        let src = "top: inc r1\ninc r1\nbr top\nhalt";
        let mut sim = sim_with(src, &[(StoreName::Registers, "r1", "0")]);
        for index in [0, 1, 2, 0, 1] {
            visit(&mut sim, index);
        }
        assert_eq!(sim.registers().get("r1"), "4");

        // first-visit entries stay, so reverting index 1 again restores "1" once more
        let mut index = 1;
        let mut trail = vec![];
        for _ in 0..4 {
            index = sim.revert(index);
            trail.push((index, sim.registers().get("r1").to_string()));
        }
        assert_eq!(trail, [
            (0, "1".to_string()),
            (2, "0".to_string()),
            (1, "0".to_string()),
            (0, "1".to_string()),
        ]);
        assert_eq!(sim.undo_record(1), Some(&UndoRecord::Write {
            store: StoreName::Registers,
            key: "r1".into(),
            prior: Some("1".into()),
        }));
    }

    #[test]
    fn test_revisit_refresh() {
        let src = "top: inc r1\nblt r1, r2, top\nhalt";
        let presets = [
            (StoreName::Registers, "r1", "0"),
            (StoreName::Registers, "r2", "2"),
        ];
        let flags = SimFlags { refresh_undo_on_revisit: true, ..Default::default() };
        let mut sim = sim_with_flags(src, &presets, flags);
        for index in [0, 1, 0] {
            visit(&mut sim, index);
        }

        assert_eq!(sim.revert(0), 1);
        assert_eq!(sim.registers().get("r1"), "1");
        assert_eq!(sim.revert(1), 0);
        assert_eq!(sim.revert(0), 0);
        assert_eq!(sim.registers().get("r1"), "0");
    }

    #[test]
    fn test_run() {
        let mut sim = sim_with("inc r1\nbr end\ninc r1\nend: halt", &[
            (StoreName::Registers, "r1", "0"),
        ]);
        assert_eq!(sim.run(0), Ok(3));
        assert_eq!(sim.registers().get("r1"), "1");
        assert_eq!(sim.index_log(), [0, 1, 3]);
    }

    #[test]
    fn test_run_limit() {
        let flags = SimFlags { max_steps: 50, ..Default::default() };
        let mut sim = sim_with_flags("top: br top\nhalt", &[], flags);
        assert_eq!(sim.run(0), Err(SimErr::StepLimitExceeded(50)));
    }

    #[test]
    fn test_presets_and_resets() {
        let mut sim = sim_with("load r1, =5\nhalt", &[
            (StoreName::Memory, "100", "7"),
        ]);
        assert_eq!(sim.memory().get("100"), "7");

        // editing presets does not touch the running state
        sim.set_preset(StoreName::Disk, "1", "d");
        sim.remove_preset(StoreName::Memory, "100");
        assert_eq!(sim.memory().get("100"), "7");
        assert!(sim.disk().is_empty());

        visit(&mut sim, 0);
        sim.reset_to_presets();
        assert!(sim.registers().is_empty());
        assert!(sim.memory().is_empty());
        assert_eq!(sim.disk().get("1"), "d");
        assert_eq!(sim.index_log(), [0]);
        assert_eq!(sim.undo_record(0), None);
        assert_eq!(sim.program().len(), 2);

        visit(&mut sim, 0);
        sim.clear_all();
        assert!(sim.state().registers.is_empty());
        assert!(sim.disk().is_empty());
        assert!(sim.program().is_empty());
        assert_eq!(sim.presets().get(StoreName::Disk, "1"), Some("d"));
    }

    #[test]
    fn test_step_header() {
        let sim = sim_with("skip\nskip\nLoop: halt", &[]);
        assert_eq!(sim.step_header(0).unwrap(), "Line 1, PC = x");
        assert_eq!(sim.step_header(1).unwrap(), "Line 2, PC = x+4");
        assert_eq!(sim.step_header(2).unwrap(), "Line 3, PC = x+8, Label = Loop:");
        assert_eq!(sim.step_header(3), None);
    }

    const ROUND_TRIP_SRC: &str = "
        load r1, =5
        load r2, 100
        load r3, $r1
        load r4, @r2
        load r5, [100, r2]
        store r1, [100, r2]
        store r2, $4
        store r1, 200
        read r6, 7
        write r1, 7
        add r1, r2
        sub r1, r2
        mul r1, r2
        div r1, r2
        inc r1
        top: blt r1, r2, top
        br top
        skip
        halt
    ";

    proptest! {
        #[test]
        fn test_step_revert_round_trip(r1 in -1000i64..1000, r2 in -1000i64..1000, m in -50i64..50) {
            let (r1, r2, m) = (r1.to_string(), r2.to_string(), m.to_string());
            let presets = [
                (StoreName::Registers, "r1", r1.as_str()),
                (StoreName::Registers, "r2", r2.as_str()),
                (StoreName::Memory, "100", m.as_str()),
                (StoreName::Disk, "7", "disk"),
            ];
            let mut sim = sim_with(ROUND_TRIP_SRC, &presets);

            for index in 0..sim.program().len() {
                sim.reset_to_presets();
                let before = sim.state().clone();

                if sim.step(index).is_ok() {
                    sim.record_visited_index(index);
                    sim.revert(index);
                }
                prop_assert_eq!(sim.state(), &before, "index {}", index);
            }
        }
    }
}
