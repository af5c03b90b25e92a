//! Output record shapes
//!
//! One record per stored object, tagged by `data_type`. Every record names the
//! source that produced it and the time it was fetched; auxiliary records point
//! back at their primary content item through `content_id`.

use crate::media::{ContentType, DataSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Any record the harvest stores
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "data_type", rename_all = "snake_case")]
pub enum OutputRecord {
    Content(ContentRecord),
    Credits(CreditsRecord),
    Reviews(ReviewsRecord),
    Keywords(KeywordsRecord),
    Images(ImagesRecord),
    Collection(CollectionRecord),
    Person(PersonRecord),
}

impl OutputRecord {
    /// The `data_type` tag as stored
    pub fn data_type(&self) -> &'static str {
        match self {
            Self::Content(_) => "content",
            Self::Credits(_) => "credits",
            Self::Reviews(_) => "reviews",
            Self::Keywords(_) => "keywords",
            Self::Images(_) => "images",
            Self::Collection(_) => "collection",
            Self::Person(_) => "person",
        }
    }

    pub fn source(&self) -> DataSource {
        match self {
            Self::Content(r) => r.source,
            Self::Credits(r) => r.source,
            Self::Reviews(r) => r.source,
            Self::Keywords(r) => r.source,
            Self::Images(r) => r.source,
            Self::Collection(r) => r.source,
            Self::Person(r) => r.source,
        }
    }

    /// Content type tag; collections and people have none
    pub fn content_type(&self) -> Option<ContentType> {
        match self {
            Self::Content(r) => Some(r.content_type),
            Self::Credits(r) => Some(r.content_type),
            Self::Reviews(r) => Some(r.content_type),
            Self::Keywords(r) => Some(r.content_type),
            Self::Images(r) => Some(r.content_type),
            Self::Collection(_) | Self::Person(_) => None,
        }
    }

    /// Primary content item this record belongs to
    pub fn content_id(&self) -> Option<u64> {
        match self {
            Self::Content(r) => Some(r.tmdb_id),
            Self::Credits(r) => Some(r.content_id),
            Self::Reviews(r) => Some(r.content_id),
            Self::Keywords(r) => Some(r.content_id),
            Self::Images(r) => Some(r.content_id),
            Self::Collection(_) | Self::Person(_) => None,
        }
    }

    /// Identity of the record within its (data_type, source, content_type)
    pub fn record_key(&self) -> u64 {
        match self {
            Self::Collection(r) => r.collection_id,
            Self::Person(r) => r.person_id,
            other => other.content_id().unwrap_or_default(),
        }
    }
}

/// Primary record for a movie or series
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentRecord {
    pub source: DataSource,
    pub content_type: ContentType,
    pub tmdb_id: u64,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub homepage: Option<String>,
    pub status: Option<String>,
    pub in_production: Option<bool>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub popularity: Option<f64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub adult: bool,
    pub genres: Option<String>,
    pub genre_ids: Option<String>,
    pub spoken_languages: Option<String>,
    pub production_companies: Option<String>,
    pub production_countries: Option<String>,
    pub fetched_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: ContentDetails,
}

/// Fields that only exist for one content type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentDetails {
    Movie {
        release_date: Option<String>,
        runtime: Option<u32>,
        budget: Option<u64>,
        revenue: Option<u64>,
    },
    Series {
        first_air_date: Option<String>,
        last_air_date: Option<String>,
        number_of_seasons: Option<u32>,
        number_of_episodes: Option<u32>,
        episode_run_time: Option<String>,
        networks: Option<String>,
        created_by: Option<String>,
        origin_country: Option<String>,
    },
}

impl Default for ContentDetails {
    fn default() -> Self {
        Self::Movie {
            release_date: None,
            runtime: None,
            budget: None,
            revenue: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub character: Option<String>,
    pub order: Option<u32>,
    pub gender: Option<u8>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub job: Option<String>,
    pub department: Option<String>,
    pub gender: Option<u8>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditsRecord {
    pub source: DataSource,
    pub content_type: ContentType,
    pub content_id: u64,
    pub content_title: Option<String>,
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Option<String>,
    pub author: Option<String>,
    pub author_details: Option<serde_json::Value>,
    pub content: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewsRecord {
    pub source: DataSource,
    pub content_type: ContentType,
    pub content_id: u64,
    pub content_title: Option<String>,
    pub reviews: Vec<Review>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: Option<u64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordsRecord {
    pub source: DataSource,
    pub content_type: ContentType,
    pub content_id: u64,
    pub content_title: Option<String>,
    pub keywords: Vec<Keyword>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub file_path: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub aspect_ratio: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub iso_639_1: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagesRecord {
    pub source: DataSource,
    pub content_type: ContentType,
    pub content_id: u64,
    pub content_title: Option<String>,
    pub posters: Vec<Image>,
    pub backdrops: Vec<Image>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionPart {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub popularity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub source: DataSource,
    pub collection_id: u64,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub parts: Vec<CollectionPart>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonCastCredit {
    pub id: Option<u64>,
    pub media_type: Option<String>,
    pub title: Option<String>,
    pub character: Option<String>,
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonCrewCredit {
    pub id: Option<u64>,
    pub media_type: Option<String>,
    pub title: Option<String>,
    pub job: Option<String>,
    pub department: Option<String>,
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedCredits {
    pub cast: Vec<PersonCastCredit>,
    pub crew: Vec<PersonCrewCredit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub source: DataSource,
    pub person_id: u64,
    pub name: Option<String>,
    pub biography: Option<String>,
    pub birthday: Option<String>,
    pub deathday: Option<String>,
    pub gender: Option<u8>,
    pub known_for_department: Option<String>,
    pub place_of_birth: Option<String>,
    pub also_known_as: Vec<String>,
    pub popularity: Option<f64>,
    pub profile_path: Option<String>,
    pub homepage: Option<String>,
    pub combined_credits: CombinedCredits,
    pub fetched_at: DateTime<Utc>,
}

/// Joins trimmed, non-empty values with ", "; `None` when nothing remains
pub fn join_list<I, S>(values: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = values
        .into_iter()
        .map(|value| value.as_ref().trim().to_string())
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    (!joined.is_empty()).then_some(joined)
}
