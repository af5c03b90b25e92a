//! Website scraping pipeline
//!
//! Used when the API is unavailable. Listing pages are walked by following
//! their next-page links; every candidate id is fetched at most once per
//! (content type, query) pair.

use crate::config::DiscoverConfig;
use crate::harvest::batch::{random_delay, run_bounded};
use crate::harvest::extras::{fan_out, ExtrasSource, ExtrasTarget};
use crate::harvest::fetcher::{fetch_text, random_user_agent, WEB_RETRIES};
use crate::harvest::parser::{parse_detail, parse_listing, WebDetail};
use crate::harvest::progress::{ItemOutcome, PipelineSettings, Progress, RecordSink};
use crate::media::{CandidateItem, ContentType, DataSource, Query};
use crate::records::{join_list, CastMember, ContentDetails, ContentRecord, CrewMember, Keyword, OutputRecord};
use crate::HarvestError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::collections::HashSet;
use url::Url;

/// Builds the first listing URL for a (content type, query) pair
pub fn build_listing_url(
    base: &str,
    content_type: ContentType,
    query: &Query,
    discover: &DiscoverConfig,
    page: u32,
) -> Result<Url, HarvestError> {
    let base = base.trim_end_matches('/');
    let segment = content_type.path_segment();
    let page = page.to_string();

    let url = match query {
        Query::Search(text) => Url::parse_with_params(
            &format!("{}/search/{}", base, segment),
            [("query", text.as_str()), ("page", page.as_str())],
        )?,
        Query::Discover => {
            let mut params = vec![
                ("page".to_string(), page),
                ("sort_by".to_string(), discover.sort_by.clone()),
            ];
            if let Some(genres) = discover.genre_list() {
                params.push(("with_genres".to_string(), genres));
            }
            params.extend(discover.date_range(content_type));
            Url::parse_with_params(&format!("{}/discover/{}", base, segment), params)?
        }
    };
    Ok(url)
}

/// Content record from a scraped detail page
///
/// Fields the page did not yield fall back to the listing card.
pub fn web_content_record(
    content_type: ContentType,
    item: &CandidateItem,
    detail: &WebDetail,
    fetched_at: DateTime<Utc>,
) -> ContentRecord {
    let title = detail
        .title
        .clone()
        .or_else(|| Some(item.title.clone()).filter(|t| !t.is_empty()));
    let listing_date = item.release_or_air_date.clone();

    let details = match content_type {
        ContentType::Movie => ContentDetails::Movie {
            release_date: detail.release_date.clone().or(listing_date),
            runtime: detail.runtime,
            budget: None,
            revenue: None,
        },
        ContentType::Series => ContentDetails::Series {
            first_air_date: detail.first_air_date.clone().or(listing_date),
            last_air_date: detail.last_air_date.clone(),
            number_of_seasons: None,
            number_of_episodes: None,
            episode_run_time: None,
            networks: join_list(&detail.networks),
            created_by: join_list(&detail.created_by),
            origin_country: None,
        },
    };

    ContentRecord {
        source: DataSource::Web,
        content_type,
        tmdb_id: item.id,
        original_title: title.clone(),
        title,
        overview: detail.overview.clone().or_else(|| item.overview.clone()),
        status: detail.status.clone(),
        vote_average: detail.rating,
        poster_path: detail.poster_path.clone().or_else(|| item.poster_ref.clone()),
        backdrop_path: detail.backdrop_path.clone(),
        genres: join_list(&detail.genres),
        fetched_at,
        details,
        ..ContentRecord::default()
    }
}

/// Credits and keywords scraped from a detail page
pub struct WebExtras<'a> {
    detail: &'a WebDetail,
}

impl<'a> WebExtras<'a> {
    pub fn new(detail: &'a WebDetail) -> Self {
        Self { detail }
    }
}

#[async_trait]
impl<'a> ExtrasSource for WebExtras<'a> {
    async fn credits(&self) -> Result<(Vec<CastMember>, Vec<CrewMember>), HarvestError> {
        let cast = self
            .detail
            .cast
            .iter()
            .enumerate()
            .map(|(order, member)| CastMember {
                id: member.id,
                name: Some(member.name.clone()),
                character: member.character.clone(),
                order: Some(order as u32),
                gender: None,
                profile_path: member.profile_path.clone(),
            })
            .collect();
        Ok((cast, Vec::new()))
    }

    async fn keywords(&self) -> Result<Vec<Keyword>, HarvestError> {
        Ok(self
            .detail
            .keywords
            .iter()
            .map(|keyword| Keyword {
                id: keyword.id,
                name: Some(keyword.name.clone()),
            })
            .collect())
    }
}

/// Walks website listing pages and stores each scraped item
pub struct WebPipeline {
    client: Client,
    base: String,
    settings: PipelineSettings,
    sink: RecordSink,
}

impl WebPipeline {
    pub fn new(client: Client, base: &str, settings: PipelineSettings, sink: RecordSink) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            settings,
            sink,
        }
    }

    /// Collects one (content type, query) pair
    ///
    /// Pagination follows next links until the limit is met, a page lists no
    /// cards, or no unvisited next link remains. A listing page that cannot be
    /// fetched ends pagination for the pair.
    pub async fn collect(
        &self,
        content_type: ContentType,
        query: &Query,
        progress: &mut Progress<'_>,
    ) -> Result<(), HarvestError> {
        let mut page = progress.next_page();
        let mut seen: HashSet<u64> = HashSet::new();
        let mut visited: HashSet<Url> = HashSet::new();
        let mut next = Some(build_listing_url(
            &self.base,
            content_type,
            query,
            &self.settings.discover,
            page,
        )?);

        while let Some(url) = next.take() {
            if progress.is_satisfied() {
                break;
            }
            if !visited.insert(url.clone()) {
                tracing::debug!("Next link for {} {} loops back to {}", content_type, query, url);
                break;
            }

            let label = format!("{} web listing ({}) page {}", content_type, query, page);
            let fetched = match fetch_text(
                &self.client,
                &url,
                &label,
                WEB_RETRIES,
                Some(random_user_agent()),
            )
            .await
            {
                Ok(fetched) => fetched,
                Err(e) => {
                    tracing::warn!(
                        content_type = %content_type,
                        query = %query,
                        page,
                        error = %e,
                        "Listing page failed, ending pagination"
                    );
                    break;
                }
            };

            let listing = parse_listing(&fetched.body, &fetched.final_url, content_type);
            if listing.items.is_empty() {
                tracing::info!("No {} results on web page {} for {}", content_type, page, query);
                break;
            }

            let candidates: Vec<CandidateItem> = listing
                .items
                .into_iter()
                .filter(|item| seen.insert(item.id))
                .collect();
            let outcomes = if candidates.is_empty() {
                tracing::debug!(
                    "Web page {} for {} {} only repeats earlier results",
                    page,
                    content_type,
                    query
                );
                Vec::new()
            } else {
                run_bounded(
                    candidates,
                    self.settings.concurrency,
                    progress.remaining() as usize,
                    |item| self.process_item(content_type, query, page, item),
                    ItemOutcome::counts,
                )
                .await
            };

            let current = page;
            page += 1;
            let yielded = progress.page_done(page, &outcomes)?;
            tracing::info!(
                "Web page {} for {} {}: {} collected, {} still wanted",
                current,
                content_type,
                query,
                yielded,
                progress.remaining()
            );

            next = listing.next_url;
        }

        Ok(())
    }

    async fn process_item(
        &self,
        content_type: ContentType,
        query: &Query,
        page: u32,
        item: CandidateItem,
    ) -> ItemOutcome {
        let id = item.id;
        match self.fetch_and_store(content_type, item).await {
            Ok(outcome) => {
                random_delay(self.settings.min_delay_ms, self.settings.max_delay_ms).await;
                outcome
            }
            Err(e) => {
                tracing::warn!(
                    content_type = %content_type,
                    query = %query,
                    page,
                    id,
                    error = %e,
                    "Failed to scrape item"
                );
                ItemOutcome::Failed
            }
        }
    }

    async fn fetch_and_store(
        &self,
        content_type: ContentType,
        item: CandidateItem,
    ) -> Result<ItemOutcome, HarvestError> {
        let url = match &item.detail_locator {
            Some(url) => url.clone(),
            None => Url::parse(&format!(
                "{}/{}/{}",
                self.base,
                content_type.path_segment(),
                item.id
            ))?,
        };
        let label = format!("{} {} web detail", content_type, item.id);
        let fetched = fetch_text(
            &self.client,
            &url,
            &label,
            WEB_RETRIES,
            Some(random_user_agent()),
        )
        .await?;

        let detail = parse_detail(&fetched.body, content_type);
        let fetched_at = Utc::now();
        let content = web_content_record(content_type, &item, &detail, fetched_at);
        let target = ExtrasTarget {
            source: DataSource::Web,
            content_type,
            content_id: item.id,
            content_title: content.title.clone(),
            fetched_at,
        };

        let mut records = vec![OutputRecord::Content(content)];
        records.extend(fan_out(&WebExtras::new(&detail), &self.settings.extras, &target).await?);

        self.sink.store_item(&records)
    }
}
