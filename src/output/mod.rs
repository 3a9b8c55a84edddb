//! Output module for reporting on crawl results
//!
//! The result file itself is written by the storage layer; this module only
//! summarizes it for the command line.

pub mod stats;

pub use stats::{load_statistics, print_statistics, ResultStatistics};
