use serde::Deserialize;

/// Main configuration structure for Reef-Crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub output: OutputConfig,
    /// Starting position for a crawl that has no persisted cursor yet
    #[serde(default)]
    pub cursor: Option<CursorSeed>,
}

/// The crawled site and its category listing
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Base URL, e.g. `https://shop.example.com`
    pub host: String,

    /// Ordered category paths, relative to the host and without `.html`
    pub categories: Vec<String>,

    /// Number of products requested per index page
    #[serde(rename = "index-list-limit")]
    pub index_list_limit: u32,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// What to do when a product page cannot be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductErrorPolicy {
    /// Stop the run without advancing; a restart retries the same product
    #[default]
    Abort,
    /// Log the failure, record nothing and advance to the next product
    Skip,
}

/// Network fetch behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Whole-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "on-product-error", default)]
    pub on_product_error: ProductErrorPolicy,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            on_product_error: ProductErrorPolicy::default(),
        }
    }
}

/// Which backend holds raw page bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Filesystem,
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding the cursor
    #[serde(rename = "state-path")]
    pub state_path: String,

    /// Path to the JSON result file
    #[serde(rename = "result-path")]
    pub result_path: String,

    /// Root directory of the filesystem page cache
    #[serde(rename = "cache-dir", default = "default_cache_dir")]
    pub cache_dir: String,

    #[serde(rename = "cache-backend", default)]
    pub cache_backend: CacheBackend,
}

fn default_cache_dir() -> String {
    "./cache".to_string()
}

/// Seed values for the cursor of a brand new crawl
#[derive(Debug, Clone, Deserialize)]
pub struct CursorSeed {
    #[serde(rename = "curr-category", default)]
    pub curr_category: usize,

    #[serde(rename = "index-page", default = "one")]
    pub index_page: u32,

    #[serde(rename = "product-page", default = "one")]
    pub product_page: u32,

    #[serde(rename = "total-pages", default)]
    pub total_pages: u32,

    #[serde(default)]
    pub completed: bool,
}

fn one() -> u32 {
    1
}
