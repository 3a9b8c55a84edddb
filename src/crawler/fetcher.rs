//! HTTP fetcher implementation
//!
//! This module handles all network access for the crawler:
//! - Building the HTTP client with a proper user agent string
//! - GET requests for index and product pages
//! - Classifying failures for the engine's error policy

use crate::config::{FetchConfig, UserAgentConfig};
use crate::CrawlError;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// The server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, unreadable body, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// The body of a successful fetch, or a [`CrawlError::Fetch`] naming `url`
    pub fn into_body(self, url: &str) -> Result<String, CrawlError> {
        match self {
            FetchResult::Success { body, .. } => Ok(body),
            FetchResult::HttpError { status_code } => Err(CrawlError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", status_code),
            }),
            FetchResult::NetworkError { error } => Err(CrawlError::Fetch {
                url: url.to_string(),
                reason: error,
            }),
        }
    }
}

/// Network collaborator of the crawl engine
pub trait Fetcher: Send + Sync {
    /// GETs `url` and classifies the outcome
    fn fetch(&self, url: &str) -> impl Future<Output = FetchResult> + Send;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use reef_crawler::config::{FetchConfig, UserAgentConfig};
/// use reef_crawler::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "ReefCrawler".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, &FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    fetch: &FetchConfig,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        user_agent.crawler_name,
        user_agent.crawler_version,
        user_agent.contact_url,
        user_agent.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(fetch.timeout_secs))
        .connect_timeout(Duration::from_secs(fetch.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = FetchResult> + Send {
        fetch_url(&self.client, url)
    }
}

/// Fetches a URL with a single GET
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | Success with body |
/// | any other status | HttpError |
/// | timeout / connect / body read failure | NetworkError |
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();

            if !status.is_success() {
                tracing::error!("Failed to fetch {}: HTTP {}", url, status.as_u16());
                return FetchResult::HttpError {
                    status_code: status.as_u16(),
                };
            }

            match response.text().await {
                Ok(body) => {
                    tracing::debug!("Fetched {} ({} bytes)", url, body.len());
                    FetchResult::Success {
                        status_code: status.as_u16(),
                        body,
                    }
                }
                Err(e) => FetchResult::NetworkError {
                    error: e.to_string(),
                },
            }
        }
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                "Connection refused".to_string()
            } else {
                e.to_string()
            };
            tracing::error!("Failed to fetch {}: {}", url, error);
            FetchResult::NetworkError { error }
        }
    }
}
