//! Extraction of product links and product metadata from raw HTML
//!
//! Extraction is best-effort: a missing element leaves the matching field
//! empty and never fails the crawl. The one exception is a pagination control
//! that is present but unreadable, since the engine cannot walk a category
//! without knowing its page count.

mod catalog;
pub mod html;

pub use catalog::{CatalogExtractor, Field, Label};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("malformed pagination control: {0}")]
    MalformedPagination(String),
}

/// Where a product page was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductContext {
    pub category: String,
    pub index_page: u32,
    pub product_position: u32,
}

/// Metadata extracted from one product page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub category: String,
    pub species: Option<String>,
    pub family: Option<String>,
    pub description: Option<String>,
    pub care_description: Option<String>,
    pub location: Option<String>,
    pub lighting: Option<String>,
    pub water_flow: Option<String>,
    pub feeding: Option<String>,
    pub propagation: Option<String>,
    pub index_page: u32,
    pub product_position: u32,
    /// Section headings that matched no known field
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unrecognized_labels: Vec<String>,
}

impl ProductRecord {
    /// An empty record stamped with where the product was found
    pub fn new(context: &ProductContext) -> Self {
        Self {
            category: context.category.clone(),
            index_page: context.index_page,
            product_position: context.product_position,
            ..Default::default()
        }
    }

    /// Names of the fields that received a value, for logging
    pub fn filled_fields(&self) -> Vec<&'static str> {
        [
            ("species", self.species.is_some()),
            ("family", self.family.is_some()),
            ("description", self.description.is_some()),
            ("care_description", self.care_description.is_some()),
            ("location", self.location.is_some()),
            ("lighting", self.lighting.is_some()),
            ("water_flow", self.water_flow.is_some()),
            ("feeding", self.feeding.is_some()),
            ("propagation", self.propagation.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, filled)| filled.then_some(name))
        .collect()
    }
}

/// Turns raw pages of one site into product links and records
pub trait Extractor: Send + Sync {
    /// Product links on an index page, in page order
    ///
    /// Links are returned as written in the markup; the caller resolves them.
    fn extract_index(&self, html: &str) -> Vec<String>;

    /// Number of index pages in the category, read from the pagination control
    fn extract_total_pages(&self, html: &str) -> Result<u32, ExtractError>;

    /// Record for one product page
    fn extract_product(&self, html: &str, context: &ProductContext) -> ProductRecord;
}
