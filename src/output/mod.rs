//! Output module for benchmark statistics and stored results
//!
//! This module handles:
//! - Aggregating run statistics and printing summaries
//! - Persisting successful results for later comparison

pub mod persister;
pub mod stats;

pub use persister::{index_path, result_path, ResultPersister};
pub use stats::{format_summary, print_summary, DurationStats, RunStatistics, RunSummary};
