//! Run-scoped mutable state threaded through the coordinator
//!
//! Holds the acquisition mode, the global result budget and the counters
//! reported at the end of a run.

use std::fmt;

/// Hard ceiling on the global result budget
pub const MAX_RESULTS: u32 = 100;

/// Which acquisition strategy the run is currently using
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMode {
    Api,
    Web,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => write!(f, "api"),
            Self::Web => write!(f, "web"),
        }
    }
}

/// Remaining number of content records the run may still store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalBudget {
    initial: u32,
    remaining: u32,
}

impl GlobalBudget {
    /// Creates a budget capped at [`MAX_RESULTS`]
    pub fn new(requested: u32) -> Self {
        let initial = requested.min(MAX_RESULTS);
        Self {
            initial,
            remaining: initial,
        }
    }

    pub fn initial(&self) -> u32 {
        self.initial
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Restores the remaining budget recorded at a resumed query's start
    pub fn restore(&mut self, remaining: u32) {
        self.remaining = remaining.min(self.initial);
    }

    /// Deducts items actually stored
    pub fn spend(&mut self, stored: u32) {
        self.remaining = self.remaining.saturating_sub(stored);
    }
}

/// Counters reported in the end-of-run summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestStats {
    pub contents: u64,
    pub extra_items: u64,
    pub people: u64,
    pub api_failures: u64,
    pub item_failures: u64,
}

/// Mode, budget and counters for one run
#[derive(Debug, Clone)]
pub struct RunContext {
    mode: RunMode,
    budget: GlobalBudget,
    pub stats: HarvestStats,
}

impl RunContext {
    /// Starts in API mode only when credentials exist, API-first is requested
    /// and a resumed checkpoint has not already recorded a failover
    pub fn new(has_credentials: bool, api_first: bool, api_available: bool, budget: u32) -> Self {
        let mode = if has_credentials && api_first && api_available {
            RunMode::Api
        } else {
            RunMode::Web
        };
        Self {
            mode,
            budget: GlobalBudget::new(budget),
            stats: HarvestStats::default(),
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Switches to web scraping for the rest of the run
    ///
    /// Returns true only on the first call; the switch is never undone.
    pub fn fail_over(&mut self) -> bool {
        if self.mode == RunMode::Web {
            return false;
        }
        self.mode = RunMode::Web;
        self.stats.api_failures += 1;
        true
    }

    pub fn budget(&self) -> &GlobalBudget {
        &self.budget
    }

    pub fn budget_mut(&mut self) -> &mut GlobalBudget {
        &mut self.budget
    }
}
