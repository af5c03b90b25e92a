use crate::media::{ContentType, Query};
use serde::{Deserialize, Deserializer};

/// Main configuration structure for a harvest run
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub discover: DiscoverConfig,
    #[serde(default)]
    pub extras: ExtrasConfig,
    #[serde(default)]
    pub people: PeopleConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Queries iterated per content type; discover mode when none are given
    pub fn content_queries(&self) -> Vec<Query> {
        if self.harvest.search_queries.is_empty() {
            vec![Query::Discover]
        } else {
            self.harvest
                .search_queries
                .iter()
                .cloned()
                .map(Query::Search)
                .collect()
        }
    }

    /// Person queries; a person selection reuses the search queries
    pub fn people_queries(&self) -> &[String] {
        if self.harvest.content_type == ContentSelection::Person
            && !self.harvest.search_queries.is_empty()
        {
            &self.harvest.search_queries
        } else {
            &self.people.queries
        }
    }
}

/// Which content the run collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSelection {
    Movie,
    #[serde(alias = "tv")]
    Series,
    Both,
    Person,
}

impl ContentSelection {
    /// Content types to iterate, in fixed order
    pub fn content_types(&self) -> Vec<ContentType> {
        match self {
            Self::Movie => vec![ContentType::Movie],
            Self::Series => vec![ContentType::Series],
            Self::Both => vec![ContentType::Movie, ContentType::Series],
            Self::Person => vec![],
        }
    }
}

/// Harvest behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    #[serde(rename = "content-type", default = "default_content_type")]
    pub content_type: ContentSelection,

    /// Free-text queries; empty means discover mode
    #[serde(
        rename = "search-queries",
        default,
        deserialize_with = "string_or_list"
    )]
    pub search_queries: Vec<String>,

    /// Results wanted per query, and the global budget (capped at 100)
    #[serde(rename = "results-wanted", default = "default_results_wanted")]
    pub results_wanted: u32,

    /// Maximum listing pages walked per query
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Detail fetches started together in one batch
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: u32,

    #[serde(rename = "use-api-first", default = "default_true")]
    pub use_api_first: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            content_type: default_content_type(),
            search_queries: Vec::new(),
            results_wanted: default_results_wanted(),
            max_pages: default_max_pages(),
            max_concurrency: default_max_concurrency(),
            use_api_first: true,
        }
    }
}

/// Discover-mode filters, used when no search query is given
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverConfig {
    #[serde(rename = "genre-ids", default, deserialize_with = "number_or_list")]
    pub genre_ids: Vec<u32>,

    #[serde(rename = "year-from", default)]
    pub year_from: Option<i32>,

    #[serde(rename = "year-to", default)]
    pub year_to: Option<i32>,

    #[serde(rename = "sort-by", default = "default_sort_by")]
    pub sort_by: String,
}

impl DiscoverConfig {
    /// `with_genres` value, when any genre is selected
    pub fn genre_list(&self) -> Option<String> {
        (!self.genre_ids.is_empty()).then(|| {
            self.genre_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",")
        })
    }

    /// Date-range filter keys for `content_type`, spanning whole years
    pub fn date_range(&self, content_type: ContentType) -> Vec<(String, String)> {
        let field = content_type.date_filter_field();
        let mut params = Vec::new();
        if let Some(from) = self.year_from {
            params.push((format!("{}.gte", field), format!("{}-01-01", from)));
        }
        if let Some(to) = self.year_to {
            params.push((format!("{}.lte", field), format!("{}-12-31", to)));
        }
        params
    }

    /// True when no filter narrows discover mode
    pub fn is_unfiltered(&self) -> bool {
        self.genre_ids.is_empty() && self.year_from.is_none() && self.year_to.is_none()
    }
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            genre_ids: Vec::new(),
            year_from: None,
            year_to: None,
            sort_by: default_sort_by(),
        }
    }
}

/// Enrichment dimensions requested for every content record
#[derive(Debug, Clone, Deserialize)]
pub struct ExtrasConfig {
    #[serde(rename = "collect-credits", default)]
    pub collect_credits: bool,

    #[serde(rename = "collect-reviews", default)]
    pub collect_reviews: bool,

    #[serde(rename = "collect-keywords", default)]
    pub collect_keywords: bool,

    #[serde(rename = "collect-images", default)]
    pub collect_images: bool,

    #[serde(rename = "collect-collections", default)]
    pub collect_collections: bool,

    #[serde(rename = "max-reviews-per-content", default = "default_max_reviews")]
    pub max_reviews_per_content: usize,

    #[serde(rename = "max-images-per-content", default = "default_max_images")]
    pub max_images_per_content: usize,
}

impl Default for ExtrasConfig {
    fn default() -> Self {
        Self {
            collect_credits: false,
            collect_reviews: false,
            collect_keywords: false,
            collect_images: false,
            collect_collections: false,
            max_reviews_per_content: default_max_reviews(),
            max_images_per_content: default_max_images(),
        }
    }
}

/// People sub-pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PeopleConfig {
    #[serde(default, deserialize_with = "string_or_list")]
    pub queries: Vec<String>,

    #[serde(rename = "results-wanted", default = "default_people_results")]
    pub results_wanted: u32,
}

impl Default for PeopleConfig {
    fn default() -> Self {
        Self {
            queries: Vec::new(),
            results_wanted: default_people_results(),
        }
    }
}

/// Network endpoints, credentials and pacing
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    #[serde(rename = "api-base", default = "default_api_base")]
    pub api_base: String,

    #[serde(rename = "web-base", default = "default_web_base")]
    pub web_base: String,

    #[serde(rename = "request-timeout-secs", default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(rename = "min-delay-ms", default = "default_min_delay")]
    pub min_delay_ms: u64,

    #[serde(rename = "max-delay-ms", default = "default_max_delay")]
    pub max_delay_ms: u64,

    #[serde(rename = "proxy-url", default)]
    pub proxy_url: Option<String>,
}

impl NetworkConfig {
    /// The API key, if one is configured and non-blank
    pub fn active_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Per-request timeout, never below five seconds
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs.max(5))
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            web_base: default_web_base(),
            request_timeout_secs: default_timeout_secs(),
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
            proxy_url: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_content_type() -> ContentSelection {
    ContentSelection::Series
}

fn default_results_wanted() -> u32 {
    5
}

fn default_max_pages() -> u32 {
    5
}

fn default_max_concurrency() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_sort_by() -> String {
    "popularity.desc".to_string()
}

fn default_max_reviews() -> usize {
    25
}

fn default_max_images() -> usize {
    20
}

fn default_people_results() -> u32 {
    3
}

fn default_api_base() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_web_base() -> String {
    "https://www.themoviedb.org".to_string()
}

fn default_timeout_secs() -> u64 {
    35
}

fn default_min_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    3000
}

fn default_database_path() -> String {
    "./tmdb-harvest.db".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrList {
    One(u32),
    Text(String),
    Many(Vec<u32>),
}

/// Accepts either `["a", "b"]` or `"a, b"`; blank entries are dropped
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match StringOrList::deserialize(deserializer)? {
        StringOrList::One(text) => text.split(',').map(str::to_string).collect(),
        StringOrList::Many(items) => items,
    };
    Ok(raw
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

/// Accepts `28`, `[28, 12]` or `"28, 12"`; unparseable entries are dropped
fn number_or_list<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match NumberOrList::deserialize(deserializer)? {
        NumberOrList::One(id) => vec![id],
        NumberOrList::Many(ids) => ids,
        NumberOrList::Text(text) => text
            .split(',')
            .filter_map(|item| item.trim().parse().ok())
            .collect(),
    })
}
