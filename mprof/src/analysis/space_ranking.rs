//! Leaf-frame space ranking.
//!
//! Attributes every bucket of a report to the innermost frame of its stack
//! (`stack[0]`, the function that called the allocator) and ranks those
//! functions by bytes.
//!
//! ```text
//! -----------alloc space ranking----------
//! 1th   512.0(kb)  80.0%   4096  myapp::cache::insert [0x55f3a2b4c780]
//! 2th   128.0(kb)  20.0%     16  0x7f12aa001240
//! ```
//!
//! # Modes
//!
//! - **Alloc**: everything ever allocated at the call-site
//! - **InUse**: allocated minus freed, over buckets that still hold memory

// Percentages intentionally convert i64 to f64
#![allow(clippy::cast_precision_loss)]

use crossterm::style::Stylize;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write;

use crate::export::Report;

/// Name given to buckets whose stack carried no frames
pub const EMPTY_STACK_NAME: &str = "<empty stack>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RankMode {
    /// Total allocated bytes and objects
    Alloc,
    /// Bytes and objects not yet freed at dump time
    InUse,
}

impl RankMode {
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Alloc => "alloc space ranking",
            Self::InUse => "inuse space ranking",
        }
    }
}

/// One ranked leaf function
#[derive(Debug, Clone, Serialize)]
pub struct LeafRank {
    /// Leaf frame address; `None` for buckets with an empty stack
    pub address: Option<u64>,

    /// Name from the report's function table, or the hex address
    pub name: String,

    /// Bytes attributed to this function (may be negative in `InUse` mode
    /// once the 32-bit report counters have wrapped)
    pub bytes: i64,

    pub objects: i64,

    /// Share of all ranked bytes (0.0 - 100.0)
    pub percentage: f64,
}

/// Rank leaf functions of `report` by bytes, then objects, both descending
#[must_use]
pub fn rank_leaf_functions(report: &Report, mode: RankMode) -> Vec<LeafRank> {
    let names = report.function_names();

    // First-seen order keeps ties deterministic
    let mut order: Vec<Option<u64>> = Vec::new();
    let mut totals: HashMap<Option<u64>, (i64, i64)> = HashMap::new();
    let mut total_bytes: i64 = 0;

    for bucket in &report.buckets {
        let (bytes, objects) = match mode {
            RankMode::Alloc => (i64::from(bucket.alloc_bytes), i64::from(bucket.alloc_objects)),
            RankMode::InUse if bucket.alloc_bytes != bucket.free_bytes => {
                (bucket.inuse_bytes(), bucket.inuse_objects())
            }
            RankMode::InUse => continue,
        };

        let leaf = bucket.stack.first().copied();
        let entry = totals.entry(leaf).or_insert_with(|| {
            order.push(leaf);
            (0, 0)
        });
        entry.0 += bytes;
        entry.1 += objects;
        total_bytes += bytes;
    }

    let mut ranks: Vec<LeafRank> = order
        .into_iter()
        .map(|leaf| {
            let (bytes, objects) = totals[&leaf];
            let name = match leaf {
                Some(addr) => names.get(&addr).map_or_else(|| format!("0x{addr:x}"), ToString::to_string),
                None => EMPTY_STACK_NAME.to_string(),
            };
            let percentage =
                if total_bytes == 0 { 0.0 } else { (bytes as f64 / total_bytes as f64) * 100.0 };
            LeafRank { address: leaf, name, bytes, objects, percentage }
        })
        .collect();

    ranks.sort_by(|a, b| b.bytes.cmp(&a.bytes).then(b.objects.cmp(&a.objects)));
    ranks
}

/// Entries at the head of the table drawn in red when highlighting
pub const HIGHLIGHTED_ENTRIES: usize = 5;

/// Render `ranks` as the text table printed by `mprof inspect`
///
/// With `highlight`, the first [`HIGHLIGHTED_ENTRIES`] entries holding a
/// positive byte count are drawn in red.
#[must_use]
pub fn format_ranking(ranks: &[LeafRank], mode: RankMode, top: Option<usize>, highlight: bool) -> String {
    let mut out = format!("-----------{}----------\n", mode.title());
    for (i, rank) in ranks.iter().take(top.unwrap_or(usize::MAX)).enumerate() {
        let line = format!(
            "{}th\t{:.1}(kb)\t{:.1}%\t{}\t{}",
            i + 1,
            rank.bytes as f64 / 1024.0,
            rank.percentage,
            rank.objects,
            rank.name
        );
        if highlight && i < HIGHLIGHTED_ENTRIES && rank.bytes > 0 {
            let _ = writeln!(out, "{}", line.red());
        } else {
            let _ = writeln!(out, "{line}");
        }
    }
    out
}
