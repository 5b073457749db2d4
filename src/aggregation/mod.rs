//! Daily statistics for each monitored city
//!
//! - daily: folding observations into a stored per-day summary
//! - dominant: most frequent condition label of a day

pub mod daily;
pub mod dominant;

pub use daily::{DailyAggregator, fold};
pub use dominant::resolve as resolve_dominant;
