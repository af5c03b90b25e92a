//! TMDb API response shapes and their mapping onto output records

use crate::media::{CandidateItem, ContentType, DataSource};
use crate::records::{
    join_list, CastMember, CollectionPart, CollectionRecord, CombinedCredits, ContentDetails,
    ContentRecord, CrewMember, Image, Keyword, PersonCastCredit, PersonCrewCredit, PersonRecord,
    Review,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Combined credits kept per person, each for cast and crew
pub const PERSON_CREDIT_CAP: usize = 15;

/// One page of a search or discover listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiListing {
    pub results: Vec<ApiListingItem>,
    pub total_pages: Option<u32>,
}

impl ApiListing {
    /// True when `page` is the last page the source reports
    pub fn is_last_page(&self, page: u32) -> bool {
        self.total_pages.unwrap_or(1) <= page
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiListingItem {
    pub id: u64,
    pub title: Option<String>,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub poster_path: Option<String>,
}

impl ApiListingItem {
    pub fn into_candidate(self) -> CandidateItem {
        CandidateItem {
            id: self.id,
            title: self.title.or(self.name).unwrap_or_default(),
            overview: self.overview,
            release_or_air_date: self.release_date.or(self.first_air_date),
            poster_ref: self.poster_path,
            detail_locator: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Named {
    pub id: Option<u64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Language {
    pub english_name: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiCredits {
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiReviewPage {
    pub results: Vec<Review>,
    pub total_pages: Option<u32>,
}

/// Movies list keywords under `keywords`, series under `results`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiKeywords {
    pub keywords: Vec<Keyword>,
    pub results: Vec<Keyword>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiImages {
    pub posters: Vec<Image>,
    pub backdrops: Vec<Image>,
}

/// Full detail for a movie or series, with any appended blocks
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiDetail {
    pub id: u64,
    pub title: Option<String>,
    pub name: Option<String>,
    pub original_title: Option<String>,
    pub original_name: Option<String>,
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
    pub adult: Option<bool>,
    pub genres: Vec<Named>,
    pub spoken_languages: Vec<Language>,
    pub production_companies: Vec<Named>,
    pub production_countries: Vec<Named>,
    pub release_date: Option<String>,
    pub runtime: Option<u32>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    pub first_air_date: Option<String>,
    pub last_air_date: Option<String>,
    pub number_of_seasons: Option<u32>,
    pub number_of_episodes: Option<u32>,
    pub episode_run_time: Vec<u32>,
    pub networks: Vec<Named>,
    pub created_by: Vec<Named>,
    pub origin_country: Vec<String>,
    pub belongs_to_collection: Option<Named>,
    pub credits: Option<ApiCredits>,
    pub reviews: Option<ApiReviewPage>,
    pub keywords: Option<ApiKeywords>,
    pub images: Option<ApiImages>,
}

fn names(values: &[Named]) -> Option<String> {
    join_list(values.iter().filter_map(|v| v.name.as_deref()))
}

impl ApiDetail {
    /// Display title for `content_type`
    pub fn display_title(&self, content_type: ContentType) -> Option<String> {
        match content_type {
            ContentType::Movie => self.title.clone().or_else(|| self.name.clone()),
            ContentType::Series => self.name.clone().or_else(|| self.title.clone()),
        }
    }

    pub fn keywords_for(&self, content_type: ContentType) -> Vec<Keyword> {
        let Some(block) = &self.keywords else {
            return Vec::new();
        };
        match content_type {
            ContentType::Movie => block.keywords.clone(),
            ContentType::Series => block.results.clone(),
        }
    }

    pub fn collection_id(&self) -> Option<u64> {
        self.belongs_to_collection.as_ref()?.id
    }

    pub fn to_content_record(
        &self,
        content_type: ContentType,
        fetched_at: DateTime<Utc>,
    ) -> ContentRecord {
        let title = self.display_title(content_type);
        let details = match content_type {
            ContentType::Movie => ContentDetails::Movie {
                release_date: self.release_date.clone(),
                runtime: self.runtime,
                budget: self.budget,
                revenue: self.revenue,
            },
            ContentType::Series => ContentDetails::Series {
                first_air_date: self.first_air_date.clone(),
                last_air_date: self.last_air_date.clone(),
                number_of_seasons: self.number_of_seasons,
                number_of_episodes: self.number_of_episodes,
                episode_run_time: join_list(self.episode_run_time.iter().map(|m| m.to_string())),
                networks: names(&self.networks),
                created_by: names(&self.created_by),
                origin_country: join_list(&self.origin_country),
            },
        };

        ContentRecord {
            source: DataSource::Api,
            content_type,
            tmdb_id: self.id,
            original_title: self
                .original_title
                .clone()
                .or_else(|| self.original_name.clone())
                .or_else(|| title.clone()),
            title,
            overview: self.overview.clone(),
            tagline: self.tagline.clone(),
            homepage: self.homepage.clone(),
            status: self.status.clone(),
            in_production: self.in_production,
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            popularity: self.popularity,
            poster_path: self.poster_path.clone(),
            backdrop_path: self.backdrop_path.clone(),
            adult: self.adult.unwrap_or(false),
            genres: names(&self.genres),
            genre_ids: join_list(self.genres.iter().filter_map(|g| g.id).map(|id| id.to_string())),
            spoken_languages: join_list(self.spoken_languages.iter().filter_map(|lang| {
                lang.english_name
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .or(lang.name.as_deref())
            })),
            production_companies: names(&self.production_companies),
            production_countries: names(&self.production_countries),
            fetched_at,
            details,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiCollectionPart {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub popularity: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiCollection {
    pub id: u64,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub parts: Vec<ApiCollectionPart>,
}

impl ApiCollection {
    pub fn into_record(self, fetched_at: DateTime<Utc>) -> CollectionRecord {
        CollectionRecord {
            source: DataSource::Api,
            collection_id: self.id,
            name: self.name,
            overview: self.overview,
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            parts: self
                .parts
                .into_iter()
                .map(|part| CollectionPart {
                    id: part.id,
                    title: part.title.or(part.name),
                    release_date: part.release_date.or(part.first_air_date),
                    vote_average: part.vote_average,
                    vote_count: part.vote_count,
                    popularity: part.popularity,
                })
                .collect(),
            fetched_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiPersonCredit {
    pub id: Option<u64>,
    pub media_type: Option<String>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub character: Option<String>,
    pub job: Option<String>,
    pub department: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiCombinedCredits {
    pub cast: Vec<ApiPersonCredit>,
    pub crew: Vec<ApiPersonCredit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiPerson {
    pub id: u64,
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
    pub combined_credits: ApiCombinedCredits,
}

impl ApiPerson {
    /// Maps to a record keeping the first [`PERSON_CREDIT_CAP`] credits of each kind
    pub fn into_record(self, fetched_at: DateTime<Utc>) -> PersonRecord {
        let cast = self
            .combined_credits
            .cast
            .into_iter()
            .take(PERSON_CREDIT_CAP)
            .map(|credit| PersonCastCredit {
                id: credit.id,
                media_type: credit.media_type,
                title: credit.title.or(credit.name),
                character: credit.character,
                release_date: credit.release_date.or(credit.first_air_date),
            })
            .collect();
        let crew = self
            .combined_credits
            .crew
            .into_iter()
            .take(PERSON_CREDIT_CAP)
            .map(|credit| PersonCrewCredit {
                id: credit.id,
                media_type: credit.media_type,
                title: credit.title.or(credit.name),
                job: credit.job,
                department: credit.department,
                release_date: credit.release_date.or(credit.first_air_date),
            })
            .collect();

        PersonRecord {
            source: DataSource::Api,
            person_id: self.id,
            name: self.name,
            biography: self.biography,
            birthday: self.birthday,
            deathday: self.deathday,
            gender: self.gender,
            known_for_department: self.known_for_department,
            place_of_birth: self.place_of_birth,
            also_known_as: self.also_known_as,
            popularity: self.popularity,
            profile_path: self.profile_path,
            homepage: self.homepage,
            combined_credits: CombinedCredits { cast, crew },
            fetched_at,
        }
    }
}
