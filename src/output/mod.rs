//! Output module for reporting on harvested data
//!
//! This module handles:
//! - Loading and printing stored record statistics
//! - Exporting stored records as JSON Lines

mod export;
pub mod stats;

pub use export::export_jsonl;
pub use stats::{load_statistics, print_statistics, HarvestStatistics};
