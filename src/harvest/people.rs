//! People sub-pipeline
//!
//! Runs after every content pair is done. Queries, pages and items are
//! processed strictly one at a time, and the people cursor is checkpointed
//! after each search page.

use crate::harvest::api::ApiClient;
use crate::harvest::batch::random_delay;
use crate::harvest::progress::{ItemOutcome, RecordSink};
use crate::records::OutputRecord;
use crate::state::{Checkpointer, HarvestStats};
use crate::HarvestError;
use chrono::Utc;

/// Search result pages walked per person query
pub const MAX_PERSON_PAGES: u32 = 5;

pub struct PeoplePipeline {
    client: ApiClient,
    sink: RecordSink,
    results_wanted: u32,
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl PeoplePipeline {
    pub fn new(
        client: ApiClient,
        sink: RecordSink,
        results_wanted: u32,
        min_delay_ms: u64,
        max_delay_ms: u64,
    ) -> Self {
        Self {
            client,
            sink,
            results_wanted,
            min_delay_ms,
            max_delay_ms,
        }
    }

    /// Collects every person query, resuming from the people cursor
    pub async fn collect(
        &self,
        queries: &[String],
        checkpointer: &mut Checkpointer,
        stats: &mut HarvestStats,
    ) -> Result<(), HarvestError> {
        let resume = checkpointer.checkpoint().people_current_query.clone();
        let start = match resume.as_deref() {
            Some(current) => match queries.iter().position(|q| q == current) {
                Some(index) => index,
                None => {
                    tracing::warn!(
                        "Checkpointed person query \"{}\" is no longer configured, starting people from the top",
                        current
                    );
                    0
                }
            },
            None => 0,
        };

        for (index, query) in queries.iter().enumerate().skip(start) {
            let resuming = index == start && resume.as_deref() == Some(query.as_str());
            if resuming {
                tracing::info!(
                    "Resuming person query \"{}\" at page {}",
                    query,
                    checkpointer.checkpoint().people_page
                );
            } else {
                checkpointer.update(|c| c.enter_people_query(query))?;
            }

            self.collect_query(query, checkpointer, stats).await?;
        }

        Ok(())
    }

    async fn collect_query(
        &self,
        query: &str,
        checkpointer: &mut Checkpointer,
        stats: &mut HarvestStats,
    ) -> Result<(), HarvestError> {
        let mut page = checkpointer.checkpoint().people_page.max(1);
        let mut collected = checkpointer.checkpoint().people_collected;

        while collected < self.results_wanted && page <= MAX_PERSON_PAGES {
            let listing = match self.client.search_people(query, page).await {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::warn!(query = %query, page, error = %e, "Person search failed");
                    break;
                }
            };
            if listing.results.is_empty() {
                break;
            }
            let last_page = listing.is_last_page(page);

            for item in listing.results.into_iter().filter(|item| item.id > 0) {
                if collected >= self.results_wanted {
                    break;
                }
                match self.fetch_and_store(item.id).await {
                    Ok(outcome) => {
                        collected += 1;
                        if outcome != ItemOutcome::Duplicate {
                            stats.people += 1;
                        }
                        random_delay(self.min_delay_ms, self.max_delay_ms).await;
                    }
                    Err(e) => {
                        stats.item_failures += 1;
                        tracing::warn!(query = %query, page, id = item.id, error = %e, "Failed to collect person");
                    }
                }
            }

            page += 1;
            checkpointer.update(|c| c.record_people_page(page, collected))?;
            if last_page {
                break;
            }
        }

        tracing::info!("Collected {} people for \"{}\"", collected, query);
        Ok(())
    }

    async fn fetch_and_store(&self, id: u64) -> Result<ItemOutcome, HarvestError> {
        let mut person = self.client.person(id).await?;
        if person.id == 0 {
            person.id = id;
        }
        let record = OutputRecord::Person(person.into_record(Utc::now()));
        self.sink.store_item(&[record])
    }
}
