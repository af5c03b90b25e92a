//! Harvest coordinator - main run orchestration logic
//!
//! This module contains the run loop that ties the pipelines together:
//! - Iterating content types, then queries, under one global budget
//! - Dispatching each pair to the API pipeline or the web pipeline
//! - Failing over to the web pipeline, once, when an API listing fails
//! - Resuming from the stored checkpoint
//! - Handling termination signals

use crate::config::Config;
use crate::harvest::api::{ApiClient, ApiPipeline};
use crate::harvest::fetcher::build_web_client;
use crate::harvest::people::PeoplePipeline;
use crate::harvest::progress::{PipelineSettings, Progress, RecordSink};
use crate::harvest::web::WebPipeline;
use crate::media::{ContentType, Query};
use crate::state::{CheckpointPhase, Checkpointer, HarvestStats, RunContext, RunMode};
use crate::storage::{lock, open_storage, RunStatus, SharedStorage, Storage};
use crate::HarvestError;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// How a harvest invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestOutcome {
    Completed(HarvestStats),
    /// A termination signal arrived; the checkpoint was persisted
    Interrupted,
}

/// Where a stored checkpoint asks the content phase to pick up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResumePoint {
    type_index: usize,
    query_index: Option<usize>,
}

/// Main harvest coordinator structure
pub struct Coordinator {
    config: Config,
    storage: SharedStorage,
    checkpointer: Checkpointer,
    context: RunContext,
    api: Option<ApiPipeline>,
    web: WebPipeline,
    people: Option<PeoplePipeline>,
    run_id: i64,
}

impl Coordinator {
    /// Opens the configured database and prepares a run
    ///
    /// # Arguments
    ///
    /// * `config` - The validated harvest configuration
    /// * `config_hash` - Identity of the configuration, recorded on the run
    /// * `fresh` - Discard any stored checkpoint before starting
    pub fn new(config: Config, config_hash: &str, fresh: bool) -> Result<Self, HarvestError> {
        let storage = open_storage(Path::new(&config.output.database_path))?;
        Self::with_storage(config, config_hash, fresh, Arc::new(Mutex::new(storage)))
    }

    /// Prepares a run against an already opened storage
    pub fn with_storage(
        config: Config,
        config_hash: &str,
        fresh: bool,
        storage: SharedStorage,
    ) -> Result<Self, HarvestError> {
        if fresh {
            lock(&storage)?.save_checkpoint(None)?;
            tracing::info!("Discarded stored checkpoint, starting fresh");
        }

        let mut checkpointer = Checkpointer::load(storage.clone())?;
        let run_id = lock(&storage)?.create_run(config_hash)?;
        let harvest_start = checkpointer.claim_harvest(run_id);

        let checkpoint = checkpointer.checkpoint();
        if checkpoint.phase() != CheckpointPhase::Idle {
            tracing::info!(
                "Resuming from checkpoint: type {:?}, {:?}, page {}, {} collected",
                checkpoint.current_type,
                checkpoint.current_query,
                checkpoint.current_page,
                checkpoint.collected_for_current_query
            );
        }

        let api_client = ApiClient::from_config(&config.network)?;
        if api_client.is_none() && config.harvest.use_api_first {
            tracing::info!("No TMDb API key configured, collecting from the website");
        }
        let context = RunContext::new(
            api_client.is_some(),
            config.harvest.use_api_first,
            checkpoint.api_available,
            config.harvest.results_wanted,
        );

        let mut extras = config.extras.clone();
        if api_client.is_none()
            && (extras.collect_reviews || extras.collect_images || extras.collect_collections)
        {
            tracing::warn!(
                "Reviews, images and collections require a TMDb API key. Skipping those extras."
            );
            extras.collect_reviews = false;
            extras.collect_images = false;
            extras.collect_collections = false;
        }

        let settings = PipelineSettings {
            concurrency: config.harvest.max_concurrency.max(1) as usize,
            max_pages: config.harvest.max_pages,
            min_delay_ms: config.network.min_delay_ms,
            max_delay_ms: config.network.max_delay_ms,
            extras,
            discover: config.discover.clone(),
        };
        let sink = RecordSink::new(storage.clone(), Some(run_id)).with_harvest_start(harvest_start);

        let web = WebPipeline::new(
            build_web_client(&config.network)?,
            &config.network.web_base,
            settings.clone(),
            sink.clone(),
        );
        let people = api_client.clone().map(|client| {
            PeoplePipeline::new(
                client,
                sink.clone(),
                config.people.results_wanted,
                config.network.min_delay_ms,
                config.network.max_delay_ms,
            )
        });
        let api = api_client.map(|client| ApiPipeline::new(client, settings, sink));

        Ok(Self {
            config,
            storage,
            checkpointer,
            context,
            api,
            web,
            people,
            run_id,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    pub fn storage(&self) -> SharedStorage {
        self.storage.clone()
    }

    /// Runs the content phase and the people phase to completion
    ///
    /// The checkpoint is cleared only when both phases finish.
    pub async fn run(&mut self) -> Result<HarvestStats, HarvestError> {
        tracing::info!(
            "Starting harvest run {} in {} mode with a budget of {}",
            self.run_id,
            self.context.mode(),
            self.context.budget().initial()
        );

        match self.run_phases().await {
            Ok(stats) => Ok(stats),
            Err(e) => {
                tracing::error!("Harvest run {} failed: {}", self.run_id, e);
                if let Err(status_error) = self.mark_run(RunStatus::Failed) {
                    tracing::warn!("Could not mark run {} as failed: {}", self.run_id, status_error);
                }
                Err(e)
            }
        }
    }

    async fn run_phases(&mut self) -> Result<HarvestStats, HarvestError> {
        if self.checkpointer.checkpoint().content_done {
            tracing::info!("Content already collected, continuing with people");
        } else {
            self.collect_content().await?;
            self.checkpointer.update(|c| c.finish_content())?;
        }

        self.collect_people().await?;

        let stats = self.context.stats.clone();
        if stats.contents == 0 {
            tracing::warn!("No content items were stored in this run");
        }
        tracing::info!(
            "Harvest complete: {} content items, {} extra records, {} people, mode {}, {} API failures, {} item failures",
            stats.contents,
            stats.extra_items,
            stats.people,
            self.context.mode(),
            stats.api_failures,
            stats.item_failures
        );

        self.checkpointer.finish()?;
        lock(&self.storage)?.complete_run(self.run_id)?;
        Ok(stats)
    }

    /// Persists the checkpoint and marks the run interrupted
    pub fn interrupt(&mut self) -> Result<(), HarvestError> {
        self.checkpointer.persist()?;
        self.mark_run(RunStatus::Interrupted)?;
        tracing::info!("Checkpoint saved, run {} interrupted", self.run_id);
        Ok(())
    }

    fn mark_run(&self, status: RunStatus) -> Result<(), HarvestError> {
        lock(&self.storage)?.update_run_status(self.run_id, status)?;
        Ok(())
    }

    async fn collect_content(&mut self) -> Result<(), HarvestError> {
        let types = self.config.harvest.content_type.content_types();
        let queries = self.config.content_queries();
        let per_query = self.config.harvest.results_wanted;
        let resume = self.resume_point(&types, &queries);

        if self.config.harvest.search_queries.is_empty() && self.config.discover.is_unfiltered() {
            tracing::info!("Running in discover mode without filters");
        }

        for (type_index, content_type) in types.iter().copied().enumerate() {
            let resuming_type = match resume {
                Some(point) if type_index < point.type_index => continue,
                Some(point) => point.type_index == type_index,
                None => false,
            };

            // interrupted between entering the type and its first query
            if resuming_type && resume.and_then(|p| p.query_index).is_none() {
                if let Some(remaining) = self.checkpointer.checkpoint().budget_at_query_start {
                    self.context.budget_mut().restore(remaining);
                }
            }

            if self.context.budget().is_exhausted() {
                tracing::info!("Global budget exhausted, skipping remaining content types");
                break;
            }

            if !resuming_type {
                let remaining = self.context.budget().remaining();
                self.checkpointer
                    .update(|c| c.enter_type(content_type, remaining))?;
            }
            tracing::info!("Collecting {}", content_type);

            for (query_index, query) in queries.iter().enumerate() {
                let resuming_pair = match resume.and_then(|p| p.query_index) {
                    Some(resume_index) if resuming_type && query_index < resume_index => continue,
                    Some(resume_index) => resuming_type && query_index == resume_index,
                    None => false,
                };
                self.collect_pair(content_type, query, per_query, resuming_pair)
                    .await?;
            }
        }

        Ok(())
    }

    /// Maps the stored checkpoint onto the configured iteration order
    fn resume_point(&self, types: &[ContentType], queries: &[Query]) -> Option<ResumePoint> {
        let checkpoint = self.checkpointer.checkpoint();
        let current_type = checkpoint.current_type?;

        let Some(type_index) = types.iter().position(|t| *t == current_type) else {
            tracing::warn!(
                "Checkpointed content type {} is not selected anymore, ignoring resume point",
                current_type
            );
            return None;
        };

        let query_index = match &checkpoint.current_query {
            Some(current) => match queries.iter().position(|q| q == current) {
                Some(index) => Some(index),
                None => {
                    tracing::warn!(
                        "Checkpointed {} is not configured anymore, ignoring resume point",
                        current
                    );
                    return None;
                }
            },
            None => None,
        };

        Some(ResumePoint {
            type_index,
            query_index,
        })
    }

    async fn collect_pair(
        &mut self,
        content_type: ContentType,
        query: &Query,
        per_query: u32,
        resuming: bool,
    ) -> Result<(), HarvestError> {
        let (base, collected) = if resuming {
            let checkpoint = self.checkpointer.checkpoint();
            let base = checkpoint
                .budget_at_query_start
                .unwrap_or_else(|| self.context.budget().remaining());
            (base, checkpoint.collected_for_current_query)
        } else {
            (self.context.budget().remaining(), 0)
        };

        if resuming {
            self.context
                .budget_mut()
                .restore(base.saturating_sub(collected));
        }

        let limit = base.min(per_query).saturating_sub(collected);
        if limit == 0 {
            tracing::debug!("Nothing left to collect for {} {}", content_type, query);
            return Ok(());
        }

        if resuming {
            tracing::info!(
                "Resuming {} {} at page {} with {} already collected",
                content_type,
                query,
                self.checkpointer.checkpoint().current_page,
                collected
            );
        } else {
            let remaining = self.context.budget().remaining();
            self.checkpointer
                .update(|c| c.enter_query(query.clone(), remaining))?;
        }

        let mut progress = Progress::new(&mut self.checkpointer, &mut self.context, limit);

        let mut done = false;
        if progress.mode() == RunMode::Api {
            if let Some(api) = &self.api {
                match api.collect(content_type, query, &mut progress).await {
                    Ok(()) => done = true,
                    Err(e) if e.is_source_error() => {
                        tracing::warn!(
                            content_type = %content_type,
                            query = %query,
                            page = progress.next_page(),
                            error = %e,
                            "API listing failed, switching to website scraping for the rest of the run"
                        );
                        progress.fail_over()?;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if !done {
            self.web.collect(content_type, query, &mut progress).await?;
        }

        tracing::info!(
            "Finished {} {}: {} collected, {} short of the limit",
            content_type,
            query,
            progress.stored(),
            progress.remaining()
        );
        Ok(())
    }

    async fn collect_people(&mut self) -> Result<(), HarvestError> {
        let queries = self.config.people_queries();
        if queries.is_empty() {
            return Ok(());
        }

        let Some(people) = &self.people else {
            tracing::warn!("People collection requires a TMDb API key. Skipping people data.");
            return Ok(());
        };

        tracing::info!("Collecting people for {} queries", queries.len());
        people
            .collect(queries, &mut self.checkpointer, &mut self.context.stats)
            .await
    }
}

/// Runs the harvest until it completes or a termination signal arrives
pub async fn run_harvest(coordinator: &mut Coordinator) -> Result<HarvestOutcome, HarvestError> {
    run_until(coordinator, wait_for_shutdown()).await
}

/// Runs the harvest until it completes or `shutdown` resolves
///
/// On shutdown the in-flight batch is dropped and the current checkpoint is
/// persisted before returning.
pub async fn run_until<S>(
    coordinator: &mut Coordinator,
    shutdown: S,
) -> Result<HarvestOutcome, HarvestError>
where
    S: Future<Output = ()>,
{
    let completed = tokio::select! {
        result = coordinator.run() => Some(result?),
        _ = shutdown => None,
    };

    match completed {
        Some(stats) => Ok(HarvestOutcome::Completed(stats)),
        None => {
            tracing::warn!("Shutdown requested, saving checkpoint");
            coordinator.interrupt()?;
            Ok(HarvestOutcome::Interrupted)
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A listener that cannot be installed never resolves, so the run continues.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C"),
            Err(error) => {
                tracing::warn!(%error, "failed to capture Ctrl+C signal");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                if term.recv().await.is_none() {
                    std::future::pending::<()>().await;
                }
                tracing::info!("Received SIGTERM");
            }
            Err(error) => {
                tracing::warn!(%error, "failed to capture SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = sigterm => {},
    }
}
