//! Per-item outcomes, the item record sink and per-pair progress
//!
//! Pipelines never touch the run counters directly. Each listing page hands
//! its item outcomes to [`Progress::page_done`], which updates the budget and
//! the counters and then persists the page cursor before the next page starts.

use crate::config::{DiscoverConfig, ExtrasConfig};
use crate::records::OutputRecord;
use crate::state::{Checkpointer, RunContext, RunMode};
use crate::storage::{lock, SharedStorage, Storage};
use crate::HarvestError;

/// Settings shared by the API and web content pipelines
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub concurrency: usize,
    pub max_pages: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub extras: ExtrasConfig,
    pub discover: DiscoverConfig,
}

/// What one fetch-and-store task achieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Primary record written along with `extras` auxiliary records
    Stored { extras: u32 },
    /// Primary record was already stored earlier in this harvest
    Duplicate,
    Failed,
}

impl ItemOutcome {
    /// True when the item counts toward the pair's yield
    pub fn counts(&self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// Writes the records of one item as a single unit
#[derive(Clone)]
pub struct RecordSink {
    storage: SharedStorage,
    run_id: Option<i64>,
    harvest_start: Option<i64>,
}

impl RecordSink {
    pub fn new(storage: SharedStorage, run_id: Option<i64>) -> Self {
        Self {
            storage,
            run_id,
            harvest_start: run_id,
        }
    }

    /// Treats records written since `run_id` as already collected
    ///
    /// A resumed harvest passes the run that started it, so pages replayed
    /// after an interruption are not stored twice.
    pub fn with_harvest_start(mut self, run_id: i64) -> Self {
        self.harvest_start = Some(run_id);
        self
    }

    /// Stores `records`, primary record first, in one transaction
    pub fn store_item(&self, records: &[OutputRecord]) -> Result<ItemOutcome, HarvestError> {
        let outcome =
            lock(&self.storage)?.store_records(records, self.run_id, self.harvest_start)?;
        if outcome.primary_existed {
            tracing::debug!(
                "{} {} already stored, counting it as collected",
                records[0].data_type(),
                records[0].record_key()
            );
            return Ok(ItemOutcome::Duplicate);
        }
        Ok(ItemOutcome::Stored {
            extras: outcome.written.saturating_sub(1) as u32,
        })
    }
}

/// Progress of one (content type, query) dispatch
pub struct Progress<'a> {
    checkpointer: &'a mut Checkpointer,
    context: &'a mut RunContext,
    limit: u32,
    stored: u32,
}

impl<'a> Progress<'a> {
    pub fn new(checkpointer: &'a mut Checkpointer, context: &'a mut RunContext, limit: u32) -> Self {
        Self {
            checkpointer,
            context,
            limit,
            stored: 0,
        }
    }

    pub fn mode(&self) -> RunMode {
        self.context.mode()
    }

    /// Items still wanted from this dispatch
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.stored)
    }

    pub fn is_satisfied(&self) -> bool {
        self.remaining() == 0
    }

    pub fn stored(&self) -> u32 {
        self.stored
    }

    /// Listing page the pair continues from
    pub fn next_page(&self) -> u32 {
        self.checkpointer.checkpoint().current_page.max(1)
    }

    /// Accounts for a processed listing page and persists the cursor
    ///
    /// Returns the page's yield.
    pub fn page_done(&mut self, next_page: u32, outcomes: &[ItemOutcome]) -> Result<u32, HarvestError> {
        let mut yielded = 0;
        for outcome in outcomes {
            match outcome {
                ItemOutcome::Stored { extras } => {
                    yielded += 1;
                    self.context.stats.contents += 1;
                    self.context.stats.extra_items += u64::from(*extras);
                }
                ItemOutcome::Duplicate => yielded += 1,
                ItemOutcome::Failed => self.context.stats.item_failures += 1,
            }
        }

        self.stored += yielded;
        self.context.budget_mut().spend(yielded);

        let collected = self.checkpointer.checkpoint().collected_for_current_query + yielded;
        self.checkpointer
            .update(|c| c.record_page(next_page, collected))?;
        Ok(yielded)
    }

    /// Switches the run to web mode; persisted on the first switch only
    pub fn fail_over(&mut self) -> Result<bool, HarvestError> {
        if !self.context.fail_over() {
            return Ok(false);
        }
        self.checkpointer.update(|c| c.mark_api_unavailable())?;
        Ok(true)
    }
}
