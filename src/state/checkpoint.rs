//! Resumable checkpoint state
//!
//! The checkpoint is the only state that outlives a process. It is written at
//! every state-machine transition (type entered, query entered, page done,
//! people page done) and cleared once the whole run completes. Every write
//! happens after the progress it describes, never before, so the persisted page
//! cursor can trail the processed one but never lead it.

use crate::media::{ContentType, Query};
use crate::storage::{lock, SharedStorage, Storage};
use crate::HarvestError;
use serde::{Deserialize, Serialize};

/// Durable cursor describing how far a run has progressed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub current_type: Option<ContentType>,
    pub current_query: Option<Query>,
    /// Next listing page to process for the current query
    pub current_page: u32,
    pub collected_for_current_query: u32,
    pub api_available: bool,
    pub people_current_query: Option<String>,
    /// Next people search page to process for the current person query
    pub people_page: u32,
    pub people_collected: u32,
    /// Remaining global budget when the current query started
    #[serde(default)]
    pub budget_at_query_start: Option<u32>,
    /// Every content (type, query) pair is finished; only people remain
    #[serde(default)]
    pub content_done: bool,
    /// Run that started this harvest; resumed runs keep it
    #[serde(default)]
    pub started_by_run: Option<i64>,
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            current_type: None,
            current_query: None,
            current_page: 1,
            collected_for_current_query: 0,
            api_available: true,
            people_current_query: None,
            people_page: 1,
            people_collected: 0,
            budget_at_query_start: None,
            content_done: false,
            started_by_run: None,
        }
    }
}

/// Coarse position of a run in the checkpoint state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointPhase {
    Idle,
    TypeActive,
    QueryActive,
    PageInProgress,
    PeopleActive,
    Done,
}

impl Checkpoint {
    /// Derives the phase from the recorded cursor
    pub fn phase(&self) -> CheckpointPhase {
        if self.content_done || self.people_current_query.is_some() {
            CheckpointPhase::PeopleActive
        } else if self.current_query.is_some()
            && (self.current_page > 1 || self.collected_for_current_query > 0)
        {
            CheckpointPhase::PageInProgress
        } else if self.current_query.is_some() {
            CheckpointPhase::QueryActive
        } else if self.current_type.is_some() {
            CheckpointPhase::TypeActive
        } else {
            CheckpointPhase::Idle
        }
    }

    /// Starts a content type: the query cursor is reset
    pub fn enter_type(&mut self, content_type: ContentType, remaining_budget: u32) {
        self.current_type = Some(content_type);
        self.current_query = None;
        self.current_page = 1;
        self.collected_for_current_query = 0;
        self.budget_at_query_start = Some(remaining_budget);
    }

    /// Run that started this harvest, claiming it for `run_id` when unset
    pub fn harvest_start(&mut self, run_id: i64) -> i64 {
        *self.started_by_run.get_or_insert(run_id)
    }

    /// Starts a query within the current type: the page cursor is reset
    pub fn enter_query(&mut self, query: Query, remaining_budget: u32) {
        self.current_query = Some(query);
        self.current_page = 1;
        self.collected_for_current_query = 0;
        self.budget_at_query_start = Some(remaining_budget);
    }

    /// Records a processed listing page
    pub fn record_page(&mut self, next_page: u32, collected_for_query: u32) {
        self.current_page = next_page;
        self.collected_for_current_query = collected_for_query;
    }

    pub fn mark_api_unavailable(&mut self) {
        self.api_available = false;
    }

    pub fn finish_content(&mut self) {
        self.content_done = true;
    }

    /// Starts a person query: the people page cursor is reset
    pub fn enter_people_query(&mut self, query: &str) {
        self.people_current_query = Some(query.to_string());
        self.people_page = 1;
        self.people_collected = 0;
    }

    /// Records a processed people search page
    pub fn record_people_page(&mut self, next_page: u32, collected: u32) {
        self.people_page = next_page;
        self.people_collected = collected;
    }
}

/// Owns the in-memory checkpoint and writes it to its storage slot
pub struct Checkpointer {
    storage: SharedStorage,
    checkpoint: Checkpoint,
    finished: bool,
}

impl Checkpointer {
    /// Loads the persisted checkpoint, or starts from defaults
    pub fn load(storage: SharedStorage) -> Result<Self, HarvestError> {
        let loaded = {
            let guard = lock(&storage)?;
            guard.load_checkpoint()?
        };

        Ok(Self {
            storage,
            checkpoint: loaded.unwrap_or_default(),
            finished: false,
        })
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// Run that started the harvest in progress
    ///
    /// A checkpoint without one is claimed for `run_id`. The claim is written
    /// with the next transition.
    pub fn claim_harvest(&mut self, run_id: i64) -> i64 {
        self.checkpoint.harvest_start(run_id)
    }

    /// Applies a transition and persists the result before returning
    pub fn update<F>(&mut self, transition: F) -> Result<(), HarvestError>
    where
        F: FnOnce(&mut Checkpoint),
    {
        transition(&mut self.checkpoint);
        self.persist()
    }

    /// Writes the current checkpoint to storage
    pub fn persist(&self) -> Result<(), HarvestError> {
        let mut guard = lock(&self.storage)?;
        guard.save_checkpoint(Some(&self.checkpoint))?;
        Ok(())
    }

    /// Clears the stored checkpoint so the next run starts fresh
    pub fn finish(&mut self) -> Result<(), HarvestError> {
        {
            let mut guard = lock(&self.storage)?;
            guard.save_checkpoint(None)?;
        }
        self.checkpoint = Checkpoint::default();
        self.finished = true;
        Ok(())
    }

    pub fn phase(&self) -> CheckpointPhase {
        if self.finished {
            CheckpointPhase::Done
        } else {
            self.checkpoint.phase()
        }
    }
}
