//! Statistics over the result store
//!
//! This module provides functionality for summarizing extracted records
//! and displaying them together with the persisted cursor.

use crate::storage::{PersistedCursor, ResultStore};
use std::collections::BTreeMap;

/// Result store summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultStatistics {
    /// Total number of records
    pub total_records: u64,

    /// Record count per category
    pub records_by_category: BTreeMap<String, u64>,

    /// Number of records with at least one unrecognized section
    pub records_with_unrecognized: u64,

    /// How often each unrecognized section heading occurred
    pub unrecognized_labels: BTreeMap<String, u64>,

    /// URLs of records without a species name
    pub missing_species: Vec<String>,
}

/// Summarizes every record in `results`
///
/// # Arguments
///
/// * `results` - The result store to summarize
pub fn load_statistics(results: &dyn ResultStore) -> ResultStatistics {
    let mut stats = ResultStatistics::default();

    for (url, record) in results.records() {
        stats.total_records += 1;
        *stats
            .records_by_category
            .entry(record.category.clone())
            .or_insert(0) += 1;

        if !record.unrecognized_labels.is_empty() {
            stats.records_with_unrecognized += 1;
        }
        for label in &record.unrecognized_labels {
            *stats.unrecognized_labels.entry(label.clone()).or_insert(0) += 1;
        }

        if record.species.is_none() {
            stats.missing_species.push(url);
        }
    }

    stats
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
/// * `cursor` - The persisted cursor, if a crawl has started
/// * `categories` - Configured category list, for naming the cursor's category
pub fn print_statistics(
    stats: &ResultStatistics,
    cursor: Option<&PersistedCursor>,
    categories: &[String],
) {
    println!("=== Crawl Statistics ===\n");

    println!("Cursor:");
    match cursor {
        Some(saved) if saved.cursor.is_terminal() => {
            println!("  Completed (saved {})", saved.updated_at);
        }
        Some(saved) => {
            let category = categories
                .get(saved.cursor.category_index)
                .map(String::as_str)
                .unwrap_or("?");
            println!("  Category: {} ({})", category, saved.cursor.category_index);
            println!(
                "  Index page: {} of {}",
                saved.cursor.index_page, saved.cursor.total_pages
            );
            println!("  Product position: {}", saved.cursor.product_position);
            println!("  Saved: {}", saved.updated_at);
        }
        None => println!("  No crawl started"),
    }
    println!();

    println!("Records: {}", stats.total_records);
    println!();

    if !stats.records_by_category.is_empty() {
        println!("Records by Category:");
        for (category, count) in &stats.records_by_category {
            let percentage = if stats.total_records > 0 {
                (*count as f64 / stats.total_records as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", category, count, percentage);
        }
        println!();
    }

    if !stats.unrecognized_labels.is_empty() {
        println!(
            "Unrecognized Sections ({} records):",
            stats.records_with_unrecognized
        );
        // most frequent first
        let mut label_counts: Vec<_> = stats.unrecognized_labels.iter().collect();
        label_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (label, count) in label_counts {
            println!("  {}: {}", label, count);
        }
        println!();
    }

    if !stats.missing_species.is_empty() {
        println!("Missing Species ({}):", stats.missing_species.len());
        for url in &stats.missing_species {
            println!("  - {}", url);
        }
        println!();
    }
}
