//! Configuration module for Reef-Crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use reef_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawling {} categories", config.site.categories.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CacheBackend, Config, CursorSeed, FetchConfig, OutputConfig, ProductErrorPolicy, SiteConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{category_fingerprint, compute_config_hash, load_config, load_config_with_hash};
