//! Full text dump of a report.
//!
//! ```text
//! FuncId  :  FuncName
//! 4198400 :  main [0x401000]
//! --------------------------------------------------------------------
//! AllocBytes  FreeBytes  AllocObjs  FreeObjs  :  Backtrace
//! 96          32         3          1         :  4198400 -> 4198912
//! ```
//!
//! Backtraces run from the outermost frame to the allocating one. Function
//! ids and frames are printed as decimal addresses.

use std::fmt::Write;

use crate::export::{BucketRecord, Report};

const SECTION_RULE: &str = "--------------------------------------------------------------------";

/// Render the function table and every bucket, most in-use bytes first
#[must_use]
pub fn format_details(report: &Report) -> String {
    let mut out = String::from("FuncId\t:\tFuncName\n");

    let mut functions: Vec<_> = report.functions.iter().collect();
    functions.sort_by_key(|f| f.address);
    for function in functions {
        let _ = writeln!(out, "{}\t:\t{}", function.address, function.name);
    }
    out.push_str(SECTION_RULE);
    out.push('\n');

    let mut buckets: Vec<&BucketRecord> = report.buckets.iter().collect();
    buckets.sort_by_key(|b| std::cmp::Reverse(b.inuse_bytes()));

    out.push_str("AllocBytes\tFreeBytes\tAllocObjs\tFreeObjs\t:\tBacktrace\n");
    for bucket in buckets {
        let backtrace: Vec<String> = bucket.stack.iter().rev().map(u64::to_string).collect();
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t:\t{}",
            bucket.alloc_bytes,
            bucket.free_bytes,
            bucket.alloc_objects,
            bucket.free_objects,
            backtrace.join(" -> ")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::FunctionEntry;

    fn bucket(alloc: (u32, u32), free: (u32, u32), stack: &[u64]) -> BucketRecord {
        BucketRecord {
            alloc_objects: alloc.0,
            alloc_bytes: alloc.1,
            free_objects: free.0,
            free_bytes: free.1,
            stack: stack.to_vec(),
        }
    }

    #[test]
    fn test_function_table_sorted_by_id() {
        let report = Report {
            functions: vec![
                FunctionEntry { name: "caller".to_string(), address: 30 },
                FunctionEntry { name: "leaf".to_string(), address: 10 },
            ],
            buckets: Vec::new(),
        };
        let text = format_details(&report);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "FuncId\t:\tFuncName");
        assert_eq!(lines[1], "10\t:\tleaf");
        assert_eq!(lines[2], "30\t:\tcaller");
        assert_eq!(lines[3], SECTION_RULE);
        assert_eq!(lines[4], "AllocBytes\tFreeBytes\tAllocObjs\tFreeObjs\t:\tBacktrace");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_samples_sorted_by_inuse_bytes() {
        let report = Report {
            functions: Vec::new(),
            buckets: vec![
                bucket((2, 64), (2, 64), &[1]),
                bucket((4, 96), (1, 32), &[1, 2]),
                bucket((1, 100), (0, 0), &[3, 2, 5]),
            ],
        };
        let text = format_details(&report);
        let samples: Vec<&str> = text.lines().skip(3).collect();

        assert_eq!(
            samples,
            vec!["100\t0\t1\t0\t:\t5 -> 2 -> 3", "96\t32\t4\t1\t:\t2 -> 1", "64\t64\t2\t2\t:\t1"]
        );
    }

    #[test]
    fn test_empty_stack_has_empty_backtrace() {
        let report = Report { functions: Vec::new(), buckets: vec![bucket((1, 8), (0, 0), &[])] };
        let text = format_details(&report);
        assert_eq!(text.lines().last(), Some("8\t0\t1\t0\t:\t"));
    }
}
