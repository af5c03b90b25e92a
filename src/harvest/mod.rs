//! Collection engine
//!
//! This module contains the harvest logic including:
//! - HTTP fetching with retry and browser-like headers
//! - HTML listing and detail extraction
//! - The API and web content pipelines sharing one batch combinator
//! - The extras fan-out and the people sub-pipeline
//! - The coordinator that dispatches (content type, query) pairs

pub mod api;
pub mod batch;
pub mod coordinator;
pub mod extras;
pub mod fetcher;
pub mod parser;
pub mod people;
pub mod progress;
pub mod web;
pub mod wire;

pub use api::{ApiClient, ApiPipeline};
pub use batch::{random_delay, run_bounded};
pub use coordinator::{run_harvest, run_until, Coordinator, HarvestOutcome};
pub use extras::{fan_out, ExtrasSource, ExtrasTarget};
pub use fetcher::{build_api_client, build_web_client, fetch_text, Fetched};
pub use parser::{parse_detail, parse_listing, ListingPage, WebDetail};
pub use people::PeoplePipeline;
pub use progress::{ItemOutcome, PipelineSettings, Progress, RecordSink};
pub use web::WebPipeline;
