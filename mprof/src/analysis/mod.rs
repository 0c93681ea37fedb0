//! Analysis of parsed dump reports
//!
//! Pure functions over [`crate::export::Report`]; nothing here touches the
//! live profiler.

pub mod detail;
pub mod space_ranking;

pub use detail::format_details;
pub use space_ranking::{format_ranking, rank_leaf_functions, LeafRank, RankMode, EMPTY_STACK_NAME};
