//! Output module for reports
//!
//! This module prints the `--stats` report and the summary of each pass.

pub mod stats;

pub use stats::{load_statistics, print_pass_report, print_statistics, WatchStatistics};
