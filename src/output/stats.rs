//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! stored record counts and run status from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::HarvestError;
use std::collections::BTreeMap;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Stored records per `data_type`
    pub records_by_type: BTreeMap<String, u64>,

    /// Total number of stored records
    pub total_records: u64,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// A checkpoint is stored, so the next run resumes
    pub pending_checkpoint: bool,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<HarvestStatistics, HarvestError> {
    let records_by_type: BTreeMap<String, u64> =
        storage.count_records_by_type()?.into_iter().collect();
    let total_records = records_by_type.values().sum();

    Ok(HarvestStatistics {
        records_by_type,
        total_records,
        latest_run: storage.get_latest_run()?,
        pending_checkpoint: storage.load_checkpoint()?.is_some(),
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Records by Type:");
    if stats.records_by_type.is_empty() {
        println!("  (none)");
    }
    for (data_type, count) in &stats.records_by_type {
        let percentage = if stats.total_records > 0 {
            (*count as f64 / stats.total_records as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", data_type, count, percentage);
    }
    println!("  Total: {}", stats.total_records);
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  ID: {}", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
        }
        None => println!("No harvest runs recorded"),
    }

    if stats.pending_checkpoint {
        println!();
        println!("A checkpoint is stored; the next run resumes from it (use --fresh to discard)");
    }
}
