//! Memory mapping utilities for process address space analysis
//!
//! This module provides functionality for parsing /proc/pid/maps to determine
//! the memory ranges of loaded binaries, which is essential for symbolizing
//! addresses from position-independent executables (PIE).

use anyhow::{Context, Result};
use log::info;
use std::fs;

/// Memory range of a loaded binary in a process's address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: u64,
    pub end: u64,
}

impl MemoryRange {
    /// Check if an address falls within this memory range
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }
}

/// Find the memory range of `binary_path` in the text of a maps file
///
/// All mappings of the binary are merged, returning the range from the
/// minimum start address to the maximum end address.
///
/// # Errors
/// Returns an error if a matching line has an unparseable address range or
/// if the binary is not mapped at all
pub fn parse_memory_maps(maps: &str, binary_path: &str) -> Result<MemoryRange> {
    let mut range: Option<MemoryRange> = None;

    for line in maps.lines() {
        // "start-end perms offset dev inode pathname"
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 || parts[5] != binary_path {
            continue;
        }

        let Some((start, end)) = parts[0].split_once('-') else {
            continue;
        };
        let start = u64::from_str_radix(start, 16).context("Failed to parse range start")?;
        let end = u64::from_str_radix(end, 16).context("Failed to parse range end")?;

        range = Some(match range {
            Some(r) => MemoryRange { start: r.start.min(start), end: r.end.max(end) },
            None => MemoryRange { start, end },
        });
    }

    range.with_context(|| format!("Could not find memory range for {binary_path}"))
}

/// Read `/proc/<pid>/maps` (or `/proc/self/maps` when `pid` is `None`) and
/// locate `binary_path` in it
///
/// # Errors
/// Returns an error if the maps file cannot be read or the binary is not found
pub fn read_memory_range(pid: Option<u32>, binary_path: &str) -> Result<MemoryRange> {
    let maps_path = match pid {
        Some(pid) => format!("/proc/{pid}/maps"),
        None => "/proc/self/maps".to_string(),
    };
    let maps = fs::read_to_string(&maps_path).context(format!("Failed to read {maps_path}"))?;
    let range = parse_memory_maps(&maps, binary_path)?;

    info!(
        "Executable memory range: 0x{:x} - 0x{:x} (size: {} KB)",
        range.start,
        range.end,
        (range.end - range.start) / 1024
    );
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPS: &str = "\
55f3a2b4c000-55f3a2b4d000 r--p 00000000 08:01 1234 /usr/bin/app
55f3a2b4d000-55f3a2b5e000 r-xp 00001000 08:01 1234 /usr/bin/app
55f3a2b5e000-55f3a2b5f000 rw-p 00012000 08:01 1234 /usr/bin/app
7f8b3c1a0000-7f8b3c1c0000 r-xp 00000000 08:01 99 /usr/lib/libc.so.6
7ffd1c000000-7ffd1c021000 rw-p 00000000 00:00 0 [stack]
";

    #[test]
    fn test_memory_range_contains() {
        let range = MemoryRange { start: 0x1000, end: 0x2000 };

        assert!(range.contains(0x1000));
        assert!(range.contains(0x1500));
        assert!(range.contains(0x1FFF));
        assert!(!range.contains(0x0FFF));
        assert!(!range.contains(0x2000));
        assert!(!range.contains(0x2001));
    }

    #[test]
    fn test_parse_merges_all_mappings() {
        let range = parse_memory_maps(MAPS, "/usr/bin/app").unwrap();
        assert_eq!(range, MemoryRange { start: 0x55f3_a2b4_c000, end: 0x55f3_a2b5_f000 });
    }

    #[test]
    fn test_parse_requires_exact_path() {
        assert!(parse_memory_maps(MAPS, "/usr/bin/ap").is_err());
    }

    #[test]
    fn test_read_own_maps() {
        let exe = std::env::current_exe().expect("Failed to get current exe");
        let exe_path = exe.to_str().expect("Failed to convert exe path to string");

        // Depends on the test environment exposing /proc, so only exercise it
        let _result = read_memory_range(None, exe_path);
    }
}
