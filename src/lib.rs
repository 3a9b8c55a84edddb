//! Reef-Crawler: a resumable catalogue crawler
//!
//! This crate walks the paginated category listings of a single shop site,
//! visits every product page, extracts its care metadata and accumulates the
//! records in a durable result store. Progress is checkpointed after every
//! product so the process can be killed at any point and resumed without
//! re-fetching pages or duplicating records.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Reef-Crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Pagination error: {0}")]
    Pagination(String),

    #[error("Cursor invariant violated: {0}")]
    Cursor(#[from] state::CursorError),

    #[error("Category list changed since the cursor was saved (stored {stored}, current {current})")]
    CategoryMismatch { stored: String, current: String },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Reef-Crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Engine;
pub use extract::{Extractor, ProductRecord};
pub use state::{Advance, Cursor};
