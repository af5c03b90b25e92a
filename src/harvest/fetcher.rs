//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvest, including:
//! - Building the API client and the browser-like web client
//! - Retry logic for transient failures
//! - Error classification (status >= 400 is an error carrying the label)

use crate::config::NetworkConfig;
use crate::HarvestError;
use rand::seq::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA};
use reqwest::{Client, Proxy, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Retries after the first attempt for API requests
pub const API_RETRIES: u32 = 2;

/// Retries after the first attempt for website requests
pub const WEB_RETRIES: u32 = 1;

const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Desktop Chrome profiles the web client rotates through
const DESKTOP_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
];

/// A fetched body and the URL it was finally served from
#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: String,
    pub final_url: Url,
}

/// Builds the client used for the structured-data API
pub fn build_api_client(config: &NetworkConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("tmdb-harvest/", env!("CARGO_PKG_VERSION")))
        .timeout(config.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds the browser-like client used for website scraping
///
/// A proxy that cannot be configured is logged and skipped; the run continues
/// without one.
pub fn build_web_client(config: &NetworkConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .default_headers(browser_headers())
        .timeout(config.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy_url) = config.proxy_url.as_deref().filter(|p| !p.trim().is_empty()) {
        match Proxy::all(proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => {
                tracing::warn!(
                    "Proxy configuration failed ({}), continuing without proxy",
                    e
                );
            }
        }
    }

    builder.build()
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// Picks a desktop Chrome user agent for one request
pub fn random_user_agent() -> &'static str {
    DESKTOP_USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
}

/// Fetches `url` as text
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 5xx | Retry up to `retries` times |
/// | Transport error | Retry up to `retries` times |
/// | Other HTTP >= 400 | Immediate error |
pub async fn fetch_text(
    client: &Client,
    url: &Url,
    label: &str,
    retries: u32,
    user_agent: Option<&str>,
) -> Result<Fetched, HarvestError> {
    let mut attempt = 0;

    loop {
        let mut request = client.get(url.clone());
        if let Some(agent) = user_agent {
            request = request.header(reqwest::header::USER_AGENT, agent);
        }

        let outcome = match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_server_error() && attempt < retries {
                    Err(status_error(label, status))
                } else if status.as_u16() >= 400 {
                    return Err(status_error(label, status));
                } else {
                    let final_url = response.url().clone();
                    response
                        .text()
                        .await
                        .map(|body| Fetched { body, final_url })
                        .map_err(|source| HarvestError::Http {
                            url: url.to_string(),
                            source,
                        })
                }
            }
            Err(source) => Err(HarvestError::Http {
                url: url.to_string(),
                source,
            }),
        };

        match outcome {
            Ok(fetched) => return Ok(fetched),
            Err(e) if attempt < retries => {
                attempt += 1;
                tracing::debug!("{} failed ({}), retry {}/{}", label, e, attempt, retries);
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fetches `url` and decodes the JSON body
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &Url,
    label: &str,
    retries: u32,
) -> Result<T, HarvestError> {
    let fetched = fetch_text(client, url, label, retries, None).await?;
    serde_json::from_str(&fetched.body).map_err(|source| HarvestError::Decode {
        label: label.to_string(),
        source,
    })
}

fn status_error(label: &str, status: StatusCode) -> HarvestError {
    HarvestError::Status {
        label: label.to_string(),
        status: status.as_u16(),
    }
}
