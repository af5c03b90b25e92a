//! TMDb API client and the API content pipeline

use crate::config::{DiscoverConfig, ExtrasConfig, NetworkConfig};
use crate::harvest::batch::{random_delay, run_bounded};
use crate::harvest::extras::{fan_out, ExtrasSource, ExtrasTarget};
use crate::harvest::fetcher::{build_api_client, get_json, API_RETRIES};
use crate::harvest::progress::{ItemOutcome, PipelineSettings, Progress, RecordSink};
use crate::harvest::wire::{
    ApiCollection, ApiDetail, ApiListing, ApiPerson, ApiReviewPage,
};
use crate::media::{CandidateItem, ContentType, DataSource, Query};
use crate::records::{CastMember, CollectionRecord, CrewMember, Image, Keyword, OutputRecord, Review};
use crate::HarvestError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

type Params = Vec<(String, String)>;

/// Authenticated client for the structured-data API
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: String,
    api_key: String,
}

impl ApiClient {
    pub fn new(client: Client, base: &str, api_key: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Builds a client when an API key is configured
    pub fn from_config(config: &NetworkConfig) -> Result<Option<Self>, HarvestError> {
        let Some(key) = config.active_api_key() else {
            return Ok(None);
        };
        let client = build_api_client(config)?;
        Ok(Some(Self::new(client, &config.api_base, key)))
    }

    fn endpoint(&self, path: &str, params: &[(String, String)]) -> Result<Url, HarvestError> {
        let mut pairs: Vec<(&str, &str)> = vec![("api_key", self.api_key.as_str())];
        pairs.extend(
            params
                .iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(key, value)| (key.as_str(), value.as_str())),
        );
        Ok(Url::parse_with_params(&format!("{}{}", self.base, path), pairs)?)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
        label: &str,
    ) -> Result<T, HarvestError> {
        let url = self.endpoint(path, params)?;
        get_json(&self.client, &url, label, API_RETRIES).await
    }

    /// Fetches one search or discover listing page
    pub async fn listing(
        &self,
        content_type: ContentType,
        query: &Query,
        discover: &DiscoverConfig,
        page: u32,
    ) -> Result<ApiListing, HarvestError> {
        let segment = content_type.path_segment();
        let (path, params) = match query {
            Query::Search(text) => (format!("/search/{}", segment), search_params(text, page)),
            Query::Discover => (
                format!("/discover/{}", segment),
                discover_params(content_type, discover, page),
            ),
        };
        let label = format!("{} listing ({}) page {}", content_type, query, page);
        self.get(&path, &params, &label).await
    }

    /// Fetches full detail with the requested extras blocks appended
    pub async fn detail(
        &self,
        content_type: ContentType,
        id: u64,
        extras: &ExtrasConfig,
    ) -> Result<ApiDetail, HarvestError> {
        let path = format!("/{}/{}", content_type.path_segment(), id);
        let label = format!("{} {} detail", content_type, id);
        self.get(&path, &detail_params(extras), &label).await
    }

    pub async fn reviews_page(
        &self,
        content_type: ContentType,
        id: u64,
        page: u32,
    ) -> Result<ApiReviewPage, HarvestError> {
        let path = format!("/{}/{}/reviews", content_type.path_segment(), id);
        let label = format!("{} {} reviews page {}", content_type, id, page);
        self.get(&path, &[("page".to_string(), page.to_string())], &label)
            .await
    }

    pub async fn collection(&self, id: u64) -> Result<ApiCollection, HarvestError> {
        let label = format!("collection {}", id);
        self.get(&format!("/collection/{}", id), &[], &label).await
    }

    pub async fn search_people(&self, query: &str, page: u32) -> Result<ApiListing, HarvestError> {
        let params = vec![
            ("query".to_string(), query.to_string()),
            ("page".to_string(), page.to_string()),
        ];
        let label = format!("person search \"{}\" page {}", query, page);
        self.get("/search/person", &params, &label).await
    }

    pub async fn person(&self, id: u64) -> Result<ApiPerson, HarvestError> {
        let params = vec![(
            "append_to_response".to_string(),
            "combined_credits,images,external_ids".to_string(),
        )];
        let label = format!("person {} detail", id);
        self.get(&format!("/person/{}", id), &params, &label).await
    }
}

fn search_params(text: &str, page: u32) -> Params {
    vec![
        ("query".to_string(), text.to_string()),
        ("page".to_string(), page.to_string()),
        ("include_adult".to_string(), "false".to_string()),
    ]
}

/// Discover filters for one listing page
pub fn discover_params(content_type: ContentType, discover: &DiscoverConfig, page: u32) -> Params {
    let mut params = vec![
        ("page".to_string(), page.to_string()),
        ("sort_by".to_string(), discover.sort_by.clone()),
        ("include_adult".to_string(), "false".to_string()),
    ];
    if let Some(genres) = discover.genre_list() {
        params.push(("with_genres".to_string(), genres));
    }
    params.extend(discover.date_range(content_type));
    params
}

fn detail_params(extras: &ExtrasConfig) -> Params {
    let appended: Vec<&str> = [
        (extras.collect_credits, "credits"),
        (extras.collect_reviews, "reviews"),
        (extras.collect_keywords, "keywords"),
        (extras.collect_images, "images"),
    ]
    .into_iter()
    .filter_map(|(wanted, block)| wanted.then_some(block))
    .collect();

    if appended.is_empty() {
        return Vec::new();
    }
    vec![
        ("append_to_response".to_string(), appended.join(",")),
        ("include_image_language".to_string(), "en,null".to_string()),
    ]
}

/// Extras read from an API detail response
///
/// Credits, keywords and images come from the appended blocks. Further review
/// pages and the collection are separate requests.
pub struct ApiExtras<'a> {
    client: &'a ApiClient,
    content_type: ContentType,
    detail: &'a ApiDetail,
    fetched_at: DateTime<Utc>,
}

impl<'a> ApiExtras<'a> {
    pub fn new(
        client: &'a ApiClient,
        content_type: ContentType,
        detail: &'a ApiDetail,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            client,
            content_type,
            detail,
            fetched_at,
        }
    }
}

#[async_trait]
impl<'a> ExtrasSource for ApiExtras<'a> {
    async fn credits(&self) -> Result<(Vec<CastMember>, Vec<CrewMember>), HarvestError> {
        let credits = self.detail.credits.clone().unwrap_or_default();
        Ok((credits.cast, credits.crew))
    }

    async fn reviews(&self, cap: usize) -> Result<Vec<Review>, HarvestError> {
        let first = self.detail.reviews.clone().unwrap_or_default();
        let total_pages = first.total_pages.unwrap_or(1);
        let mut reviews = first.results;
        let mut page = 1;

        while reviews.len() < cap && page < total_pages {
            page += 1;
            let next = self
                .client
                .reviews_page(self.content_type, self.detail.id, page)
                .await?;
            if next.results.is_empty() {
                break;
            }
            reviews.extend(next.results);
        }

        reviews.truncate(cap);
        Ok(reviews)
    }

    async fn keywords(&self) -> Result<Vec<Keyword>, HarvestError> {
        Ok(self.detail.keywords_for(self.content_type))
    }

    async fn images(&self, cap: usize) -> Result<(Vec<Image>, Vec<Image>), HarvestError> {
        let images = self.detail.images.clone().unwrap_or_default();
        let posters = images.posters.into_iter().take(cap).collect();
        let backdrops = images.backdrops.into_iter().take(cap).collect();
        Ok((posters, backdrops))
    }

    async fn collection(&self) -> Result<Option<CollectionRecord>, HarvestError> {
        let Some(id) = self.detail.collection_id() else {
            return Ok(None);
        };
        let collection = self.client.collection(id).await?;
        Ok(Some(collection.into_record(self.fetched_at)))
    }
}

/// Walks API listing pages and stores each item with its extras
pub struct ApiPipeline {
    client: ApiClient,
    settings: PipelineSettings,
    sink: RecordSink,
}

impl ApiPipeline {
    pub fn new(client: ApiClient, settings: PipelineSettings, sink: RecordSink) -> Self {
        Self {
            client,
            settings,
            sink,
        }
    }

    /// Collects one (content type, query) pair
    ///
    /// A listing failure is returned to the caller; item failures only reduce
    /// the page's yield.
    pub async fn collect(
        &self,
        content_type: ContentType,
        query: &Query,
        progress: &mut Progress<'_>,
    ) -> Result<(), HarvestError> {
        let mut page = progress.next_page();

        while !progress.is_satisfied() && page <= self.settings.max_pages {
            let listing = self
                .client
                .listing(content_type, query, &self.settings.discover, page)
                .await?;
            let last_page = listing.is_last_page(page);

            let mut candidates: Vec<CandidateItem> = listing
                .results
                .into_iter()
                .filter(|item| item.id > 0)
                .map(|item| item.into_candidate())
                .collect();
            if candidates.is_empty() {
                tracing::info!("No {} results on page {} for {}", content_type, page, query);
                break;
            }
            candidates.truncate(progress.remaining() as usize);

            let outcomes = run_bounded(
                candidates,
                self.settings.concurrency,
                progress.remaining() as usize,
                |item| self.process_item(content_type, query, page, item),
                ItemOutcome::counts,
            )
            .await;

            let current = page;
            page += 1;
            let yielded = progress.page_done(page, &outcomes)?;
            tracing::info!(
                "API page {} for {} {}: {} collected, {} still wanted",
                current,
                content_type,
                query,
                yielded,
                progress.remaining()
            );

            if last_page {
                break;
            }
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
                    "Failed to collect item"
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
        let detail = self
            .client
            .detail(content_type, item.id, &self.settings.extras)
            .await?;
        let fetched_at = Utc::now();

        let mut content = detail.to_content_record(content_type, fetched_at);
        content.tmdb_id = item.id;
        let target = ExtrasTarget {
            source: DataSource::Api,
            content_type,
            content_id: item.id,
            content_title: content.title.clone(),
            fetched_at,
        };

        let source = ApiExtras::new(&self.client, content_type, &detail, fetched_at);
        let mut records = vec![OutputRecord::Content(content)];
        records.extend(fan_out(&source, &self.settings.extras, &target).await?);

        self.sink.store_item(&records)
    }
}
