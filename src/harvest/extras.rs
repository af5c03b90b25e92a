//! Extras fan-out
//!
//! Enriches one primary content record with auxiliary records. Dimensions run
//! in a fixed order (credits, reviews, keywords, images, collection) and the
//! first failing dimension fails the whole item: the caller stores either the
//! full set of records or none of them.

use crate::config::ExtrasConfig;
use crate::media::{ContentType, DataSource};
use crate::records::{
    CastMember, CollectionRecord, CreditsRecord, CrewMember, Image, ImagesRecord, Keyword,
    KeywordsRecord, OutputRecord, Review, ReviewsRecord,
};
use crate::HarvestError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Where the data of each enrichment dimension comes from for one item
///
/// Sources return empty payloads for dimensions they cannot provide.
#[async_trait]
pub trait ExtrasSource: Send + Sync {
    async fn credits(&self) -> Result<(Vec<CastMember>, Vec<CrewMember>), HarvestError>;

    /// Reviews in source order, at most `cap`
    async fn reviews(&self, _cap: usize) -> Result<Vec<Review>, HarvestError> {
        Ok(Vec::new())
    }

    async fn keywords(&self) -> Result<Vec<Keyword>, HarvestError>;

    /// Posters and backdrops, each at most `cap`
    async fn images(&self, _cap: usize) -> Result<(Vec<Image>, Vec<Image>), HarvestError> {
        Ok((Vec::new(), Vec::new()))
    }

    /// The collection the item belongs to, if any
    async fn collection(&self) -> Result<Option<CollectionRecord>, HarvestError> {
        Ok(None)
    }
}

/// The primary record auxiliary records point back at
#[derive(Debug, Clone)]
pub struct ExtrasTarget {
    pub source: DataSource,
    pub content_type: ContentType,
    pub content_id: u64,
    pub content_title: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Builds the auxiliary records requested by `config`
///
/// A dimension with no data yields no record. Collections are only looked up
/// for movies collected through the API.
pub async fn fan_out(
    source: &dyn ExtrasSource,
    config: &ExtrasConfig,
    target: &ExtrasTarget,
) -> Result<Vec<OutputRecord>, HarvestError> {
    let mut records = Vec::new();

    if config.collect_credits {
        let (cast, crew) = source.credits().await?;
        if !cast.is_empty() || !crew.is_empty() {
            records.push(OutputRecord::Credits(CreditsRecord {
                source: target.source,
                content_type: target.content_type,
                content_id: target.content_id,
                content_title: target.content_title.clone(),
                cast,
                crew,
                fetched_at: target.fetched_at,
            }));
        }
    }

    if config.collect_reviews && config.max_reviews_per_content > 0 {
        let reviews = source.reviews(config.max_reviews_per_content).await?;
        if !reviews.is_empty() {
            records.push(OutputRecord::Reviews(ReviewsRecord {
                source: target.source,
                content_type: target.content_type,
                content_id: target.content_id,
                content_title: target.content_title.clone(),
                reviews,
                fetched_at: target.fetched_at,
            }));
        }
    }

    if config.collect_keywords {
        let keywords = source.keywords().await?;
        if !keywords.is_empty() {
            records.push(OutputRecord::Keywords(KeywordsRecord {
                source: target.source,
                content_type: target.content_type,
                content_id: target.content_id,
                content_title: target.content_title.clone(),
                keywords,
                fetched_at: target.fetched_at,
            }));
        }
    }

    if config.collect_images && config.max_images_per_content > 0 {
        let (posters, backdrops) = source.images(config.max_images_per_content).await?;
        if !posters.is_empty() || !backdrops.is_empty() {
            records.push(OutputRecord::Images(ImagesRecord {
                source: target.source,
                content_type: target.content_type,
                content_id: target.content_id,
                content_title: target.content_title.clone(),
                posters,
                backdrops,
                fetched_at: target.fetched_at,
            }));
        }
    }

    if config.collect_collections
        && target.content_type == ContentType::Movie
        && target.source == DataSource::Api
    {
        if let Some(collection) = source.collection().await? {
            records.push(OutputRecord::Collection(collection));
        }
    }

    Ok(records)
}
