use log::debug;
use mprof_common::MAX_FUNC_NAME_LEN;
use std::collections::HashMap;

use super::SymbolSource;
use crate::domain::{Address, ProfilerError};

/// Cut `name` to at most [`MAX_FUNC_NAME_LEN`] bytes on a char boundary
#[must_use]
pub fn truncate_name(mut name: String) -> String {
    if name.len() > MAX_FUNC_NAME_LEN {
        let mut end = MAX_FUNC_NAME_LEN;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
    name
}

/// Memoized address ↔ name table
///
/// Iteration follows insertion order, which keeps dump output reproducible
/// for a given event sequence.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: Vec<(Address, String)>,
    by_address: HashMap<Address, usize>,
    by_name: HashMap<String, Address>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure every frame of `stack` has a name
    ///
    /// Returns how many addresses were newly inserted. If any frame is
    /// missing, the whole stack goes to `source` in one call and only the
    /// missing frames are recorded.
    ///
    /// # Errors
    /// Returns `ProfilerError::SymbolizationFailed` if the source fails or
    /// answers with a different number of names than frames
    pub fn ensure_resolved(
        &mut self,
        stack: &[Address],
        source: &dyn SymbolSource,
    ) -> Result<usize, ProfilerError> {
        if stack.iter().all(|addr| self.by_address.contains_key(addr)) {
            return Ok(0);
        }

        let names = source
            .resolve(stack)
            .map_err(|e| ProfilerError::SymbolizationFailed(format!("{e:#}")))?;
        if names.len() != stack.len() {
            return Err(ProfilerError::SymbolizationFailed(format!(
                "{} names returned for {} frames",
                names.len(),
                stack.len()
            )));
        }

        let mut inserted = 0;
        for (&addr, name) in stack.iter().zip(names) {
            if self.insert(addr, name) {
                inserted += 1;
            }
        }
        debug!("Resolved {inserted} new symbols ({} total)", self.entries.len());
        Ok(inserted)
    }

    fn insert(&mut self, addr: Address, name: String) -> bool {
        if self.by_address.contains_key(&addr) {
            return false;
        }
        let name = truncate_name(name);
        self.by_address.insert(addr, self.entries.len());
        self.by_name.insert(name.clone(), addr);
        self.entries.push((addr, name));
        true
    }

    #[must_use]
    pub fn name_of(&self, addr: Address) -> Option<&str> {
        self.by_address.get(&addr).map(|&idx| self.entries[idx].1.as_str())
    }

    /// Most recently resolved address carrying `name`
    #[must_use]
    pub fn address_of(&self, name: &str) -> Option<Address> {
        self.by_name.get(name).copied()
    }

    /// (address, name) pairs in resolution order
    pub fn iter(&self) -> impl Iterator<Item = (Address, &str)> {
        self.entries.iter().map(|(addr, name)| (*addr, name.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use std::cell::Cell;

    fn named(addrs: &[Address]) -> Result<Vec<String>> {
        Ok(addrs.iter().map(|a| format!("fn_{:x}", a.0)).collect())
    }

    #[test]
    fn test_resolves_and_memoizes() {
        let calls = Cell::new(0);
        let source = |addrs: &[Address]| {
            calls.set(calls.get() + 1);
            named(addrs)
        };
        let mut table = SymbolTable::new();
        let stack = [Address(0xAA), Address(0xBB)];

        assert_eq!(table.ensure_resolved(&stack, &source).unwrap(), 2);
        assert_eq!(table.ensure_resolved(&stack, &source).unwrap(), 0);
        assert_eq!(calls.get(), 1);
        assert_eq!(table.name_of(Address(0xBB)), Some("fn_bb"));
        assert_eq!(table.address_of("fn_aa"), Some(Address(0xAA)));
    }

    #[test]
    fn test_partial_stack_inserts_only_missing_frames() {
        let mut table = SymbolTable::new();
        table.ensure_resolved(&[Address(1)], &named).unwrap();

        let renamed = |addrs: &[Address]| -> Result<Vec<String>> {
            Ok(addrs.iter().map(|a| format!("other_{}", a.0)).collect())
        };
        assert_eq!(table.ensure_resolved(&[Address(1), Address(2)], &renamed).unwrap(), 1);
        assert_eq!(table.name_of(Address(1)), Some("fn_1"));
        assert_eq!(table.name_of(Address(2)), Some("other_2"));

        let order: Vec<Address> = table.iter().map(|(addr, _)| addr).collect();
        assert_eq!(order, vec![Address(1), Address(2)]);
    }

    #[test]
    fn test_recursive_frames_are_recorded_once() {
        let mut table = SymbolTable::new();
        table.ensure_resolved(&[Address(5), Address(5), Address(6)], &named).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_source_failure_is_symbolization_error() {
        let failing = |_: &[Address]| -> Result<Vec<String>> { bail!("no debug info") };
        let mut table = SymbolTable::new();
        let err = table.ensure_resolved(&[Address(1)], &failing).unwrap_err();
        assert!(matches!(err, ProfilerError::SymbolizationFailed(_)));
        assert!(table.is_empty());
    }

    #[test]
    fn test_short_answer_is_symbolization_error() {
        let short = |_: &[Address]| -> Result<Vec<String>> { Ok(vec!["only".to_string()]) };
        let mut table = SymbolTable::new();
        let err = table.ensure_resolved(&[Address(1), Address(2)], &short).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_truncate_name_respects_char_boundary() {
        let long = "é".repeat(60);
        let cut = truncate_name(long);
        assert!(cut.len() <= MAX_FUNC_NAME_LEN);
        assert_eq!(cut.len(), 80);

        let odd = format!("a{}", "é".repeat(60));
        assert_eq!(truncate_name(odd).len(), 79);
        assert_eq!(truncate_name("short".to_string()), "short");
    }
}
