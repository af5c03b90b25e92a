//! Domain tags shared by every pipeline
//!
//! Content types, queries, record sources and the lightweight listing
//! reference handed from a pagination step to the fetch-and-store step.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Content domain handled by the content pipelines
///
/// The person domain has its own sub-pipeline and is not part of this enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Movie,
    #[serde(alias = "tv")]
    Series,
}

impl ContentType {
    /// Path segment used by both the API and the website (`movie` / `tv`)
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "tv",
        }
    }

    /// Date field the discover endpoint filters on for this content type
    pub fn date_filter_field(&self) -> &'static str {
        match self {
            Self::Movie => "primary_release_date",
            Self::Series => "first_air_date",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Series => write!(f, "series"),
        }
    }
}

/// A user search string or the discover sentinel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Query {
    Search(String),
    Discover,
}

impl Query {
    /// Returns the search text, or `None` in discover mode
    pub fn search_text(&self) -> Option<&str> {
        match self {
            Self::Search(text) => Some(text),
            Self::Discover => None,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search(text) => write!(f, "query \"{}\"", text),
            Self::Discover => write!(f, "discover mode"),
        }
    }
}

/// Which acquisition strategy produced a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    #[default]
    #[serde(rename = "tmdb_api")]
    Api,
    #[serde(rename = "tmdb_web")]
    Web,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "tmdb_api",
            Self::Web => "tmdb_web",
        }
    }
}

/// Listing-page reference to a full detail fetch
///
/// Produced by a pagination step and consumed by the fetch-and-store step of
/// the same page. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateItem {
    pub id: u64,
    pub title: String,
    pub overview: Option<String>,
    pub release_or_air_date: Option<String>,
    pub poster_ref: Option<String>,
    /// API items carry no locator; web items carry the absolute detail URL
    pub detail_locator: Option<Url>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_path_segments() {
        assert_eq!(ContentType::Movie.path_segment(), "movie");
        assert_eq!(ContentType::Series.path_segment(), "tv");
    }

    #[test]
    fn test_series_accepts_tv_alias() {
        let parsed: ContentType = serde_json::from_str("\"tv\"").unwrap();
        assert_eq!(parsed, ContentType::Series);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"series\"");
    }

    #[test]
    fn test_query_serialization() {
        let search = serde_json::to_string(&Query::Search("x".to_string())).unwrap();
        assert_eq!(search, r#"{"search":"x"}"#);
        let discover = serde_json::to_string(&Query::Discover).unwrap();
        assert_eq!(discover, "\"discover\"");
    }

    #[test]
    fn test_data_source_tags() {
        assert_eq!(serde_json::to_string(&DataSource::Api).unwrap(), "\"tmdb_api\"");
        assert_eq!(DataSource::Web.as_str(), "tmdb_web");
    }
}
