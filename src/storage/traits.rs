//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::records::OutputRecord;
use crate::state::Checkpoint;
use crate::storage::{RunRecord, RunStatus, StoreOutcome};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Empty record batch")]
    EmptyBatch,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The harvest treats storage as a black box that durably keeps an arbitrary
/// record or a named scalar.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new harvest run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Records =====

    /// Stores the records of one item atomically
    ///
    /// The first record is the item's primary record. When that record was
    /// already written by run `collected_since` or a later run, nothing is
    /// written and the outcome reports it as existing. Otherwise every record
    /// replaces any older row with the same identity.
    fn store_records(
        &mut self,
        records: &[OutputRecord],
        run_id: Option<i64>,
        collected_since: Option<i64>,
    ) -> StorageResult<StoreOutcome>;

    /// Counts stored records grouped by `data_type`
    fn count_records_by_type(&self) -> StorageResult<HashMap<String, u64>>;

    /// Loads stored payloads, optionally restricted to one `data_type`
    fn load_records(&self, data_type: Option<&str>) -> StorageResult<Vec<serde_json::Value>>;

    // ===== Checkpoint Slot =====

    /// Loads the persisted checkpoint, if any
    fn load_checkpoint(&self) -> StorageResult<Option<Checkpoint>>;

    /// Overwrites the checkpoint slot; `None` clears it
    fn save_checkpoint(&mut self, checkpoint: Option<&Checkpoint>) -> StorageResult<()>;
}
