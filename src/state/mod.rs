//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `Checkpoint`: the persisted cursor used to resume an interrupted run
//! - `Checkpointer`: owns the checkpoint and writes it at every transition
//! - `RunContext`: run mode, global budget and counters for one process

mod checkpoint;
mod run_context;

// Re-export main types
pub use checkpoint::{Checkpoint, CheckpointPhase, Checkpointer};
pub use run_context::{GlobalBudget, HarvestStats, RunContext, RunMode, MAX_RESULTS};
