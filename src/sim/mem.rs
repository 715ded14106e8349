//! State stores for the MiniASM simulator.
//!
//! This module consists of:
//! - [`MemStore`]: One named store (registers, memory, or disk), mapping keys to string values.
//! - [`SessionState`]: The three stores a run mutates.
//! - [`PresetStore`]: The user's baseline values, which a run starts from.

use std::collections::BTreeMap;

use crate::ast::StoreName;

/// A store of string values, keyed by address.
///
/// Keys and values are kept as written by the program:
/// registers are keyed by their canonical name (`r1`),
/// memory and disk by their address text (`100`, `x+8`).
/// A key that was never written reads as the empty string.
///
/// Iteration is ordered by key, which is the order drivers display stores in.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemStore(BTreeMap<String, String>);

impl MemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Default::default()
    }

    /// Reads the value at a key (or the empty string if the key is unset).
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map_or("", String::as_str)
    }
    /// Reads the value at a key, if the key is set.
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
    /// Whether the key is set.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Writes a value at a key, returning the value that was there before.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }
    /// Unsets a key, returning the value that was there.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }
    /// Unsets every key.
    pub fn clear(&mut self) {
        self.0.clear()
    }

    /// The number of set keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }
    /// Whether no keys are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Iterates over every key and its value, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemStore {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The mutable state of one run: registers, memory, and disk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// The register store.
    pub registers: MemStore,
    /// The memory store.
    pub memory: MemStore,
    /// The disk store.
    pub disk: MemStore,
}

impl SessionState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Default::default()
    }

    /// Gets a store by name.
    pub fn store(&self, name: StoreName) -> &MemStore {
        match name {
            StoreName::Registers => &self.registers,
            StoreName::Memory => &self.memory,
            StoreName::Disk => &self.disk,
        }
    }
    /// Gets a store by name, mutably.
    pub fn store_mut(&mut self, name: StoreName) -> &mut MemStore {
        match name {
            StoreName::Registers => &mut self.registers,
            StoreName::Memory => &mut self.memory,
            StoreName::Disk => &mut self.disk,
        }
    }

    /// Unsets every key in every store.
    pub fn clear(&mut self) {
        self.registers.clear();
        self.memory.clear();
        self.disk.clear();
    }
}

/// Baseline values a run starts from.
///
/// Presets are independent of any run:
/// editing them does not affect the current state until the simulator is reset to them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PresetStore(SessionState);

impl PresetStore {
    /// Creates a preset store with no presets.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the baseline value of an address.
    ///
    /// Register addresses are normalized to their canonical name,
    /// so `R1` and `r1` preset the same register.
    pub fn set(&mut self, store: StoreName, addr: &str, value: impl Into<String>) -> Option<String> {
        self.0.store_mut(store).set(normalize(store, addr), value)
    }
    /// Removes the baseline value of an address.
    pub fn remove(&mut self, store: StoreName, addr: &str) -> Option<String> {
        self.0.store_mut(store).remove(&normalize(store, addr))
    }
    /// Gets the baseline value of an address, if it has one.
    pub fn get(&self, store: StoreName, addr: &str) -> Option<&str> {
        self.0.store(store).get_raw(&normalize(store, addr))
    }
    /// Removes every preset.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// The presets, as the state a run starts from.
    pub fn as_state(&self) -> &SessionState {
        &self.0
    }
}

fn normalize(store: StoreName, addr: &str) -> String {
    match (store, addr.parse::<crate::ast::Reg>()) {
        (StoreName::Registers, Ok(r)) => r.key(),
        _ => addr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::StoreName;

    use super::{MemStore, PresetStore, SessionState};

    #[test]
    fn test_store_get_set() {
        let mut store = MemStore::new();
        assert_eq!(store.get("100"), "");
        assert_eq!(store.get_raw("100"), None);

        assert_eq!(store.set("100", "5"), None);
        assert_eq!(store.set("100", "6"), Some("5".to_string()));
        assert_eq!(store.get("100"), "6");
        assert!(store.contains("100"));

        assert_eq!(store.remove("100"), Some("6".to_string()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_ordered() {
        let store: MemStore = [("r2", "b"), ("r1", "a"), ("r10", "c")].into_iter().collect();
        let keys: Vec<_> = store.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["r1", "r10", "r2"]);
    }

    #[test]
    fn test_state_by_name() {
        let mut state = SessionState::new();
        state.store_mut(StoreName::Disk).set("4", "x");
        assert_eq!(state.disk.get("4"), "x");
        assert_eq!(state.store(StoreName::Disk).get("4"), "x");
        assert!(state.memory.is_empty());

        state.clear();
        assert_eq!(state, SessionState::new());
    }

    #[test]
    fn test_presets() {
        let mut presets = PresetStore::new();
        presets.set(StoreName::Registers, "R1", "0");
        presets.set(StoreName::Memory, "100", "7");

        assert_eq!(presets.get(StoreName::Registers, "r1"), Some("0"));
        assert_eq!(presets.as_state().registers.get("r1"), "0");
        assert_eq!(presets.get(StoreName::Memory, "100"), Some("7"));
        assert_eq!(presets.get(StoreName::Disk, "100"), None);

        assert_eq!(presets.remove(StoreName::Registers, "r1"), Some("0".to_string()));
        assert!(presets.as_state().registers.is_empty());

        presets.clear();
        assert_eq!(presets, PresetStore::new());
    }
}
