//! Crawl engine - the checkpointed walk over the catalogue
//!
//! Each step processes exactly one product slot:
//! 1. Load the current index page (cache first, network on a miss)
//! 2. Correct the cursor's page count from the pager, persisting on change
//! 3. Pick the product link at the cursor's position
//! 4. Unless it is already recorded, load the product page, extract and append
//! 5. Advance the cursor and persist it
//!
//! All writes are synchronous, so a process killed at any instant resumes at
//! the last completed step.

use crate::config::{category_fingerprint, Config, ProductErrorPolicy, SiteConfig};
use crate::crawler::fetcher::Fetcher;
use crate::extract::{Extractor, ProductContext};
use crate::state::{Advance, Cursor};
use crate::storage::{get_or_fetch, get_or_fetch_checked, CacheKey, ResultStore, Stores};
use crate::CrawlError;
use std::time::Instant;
use url::Url;

/// What a single step did with its product slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Product fetched, extracted and appended
    Recorded,
    /// Product URL was already in the result store; nothing fetched
    AlreadyRecorded,
    /// Product page could not be fetched and the policy says skip
    Skipped,
    /// The index page has no product at the cursor's position
    NoProduct,
    /// The cursor was already terminal
    Finished,
}

/// Counters for one [`Engine::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: u64,
    pub recorded: u64,
    pub already_recorded: u64,
    pub skipped: u64,
    pub empty_slots: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Recorded => self.recorded += 1,
            StepOutcome::AlreadyRecorded => self.already_recorded += 1,
            StepOutcome::Skipped => self.skipped += 1,
            StepOutcome::NoProduct => self.empty_slots += 1,
            StepOutcome::Finished => return,
        }
        self.steps += 1;
    }
}

/// Single-writer crawl orchestrator
pub struct Engine<F, E> {
    site: SiteConfig,
    policy: ProductErrorPolicy,
    fingerprint: String,
    fetcher: F,
    extractor: E,
    cursor: Cursor,
    stores: Stores,
}

async fn fetch_body<F: Fetcher>(fetcher: &F, url: &str) -> Result<String, CrawlError> {
    fetcher.fetch(url).await.into_body(url)
}

/// Page count read from an index page
///
/// A listing that reports fewer pages than the page being read is malformed.
fn checked_total_pages<E: Extractor>(
    extractor: &E,
    html: &str,
    category: &str,
    index_page: u32,
) -> Result<u32, CrawlError> {
    let total_pages = extractor.extract_total_pages(html).map_err(|e| {
        CrawlError::Pagination(format!(
            "{} on page {} of category '{}'",
            e, index_page, category
        ))
    })?;

    if total_pages < index_page {
        return Err(CrawlError::Pagination(format!(
            "page {} of category '{}' reports only {} pages",
            index_page, category, total_pages
        )));
    }

    Ok(total_pages)
}

impl<F: Fetcher, E: Extractor> Engine<F, E> {
    /// Creates an engine, resuming from the saved cursor when there is one
    ///
    /// # Arguments
    ///
    /// * `config` - Validated crawler configuration
    /// * `fetcher` - Network collaborator
    /// * `extractor` - Site markup collaborator
    /// * `stores` - Cursor store, page cache and result store
    /// * `fresh` - Discard the saved cursor and start from the configured seed
    ///
    /// # Returns
    ///
    /// * `Ok(Engine)` - Ready to run; a brand new cursor has already been saved
    /// * `Err(CrawlError)` - Saved state is unusable or storage failed
    pub fn new(
        config: &Config,
        fetcher: F,
        extractor: E,
        mut stores: Stores,
        fresh: bool,
    ) -> Result<Self, CrawlError> {
        let site = config.site.clone();
        let fingerprint = category_fingerprint(&site.categories);

        if fresh {
            tracing::info!("Discarding saved cursor");
            stores.cursor.clear()?;
        }

        let (cursor, is_new) = match stores.cursor.load()? {
            Some(saved) => {
                if saved.category_fingerprint != fingerprint {
                    return Err(CrawlError::CategoryMismatch {
                        stored: saved.category_fingerprint,
                        current: fingerprint,
                    });
                }
                tracing::info!(
                    "Resuming from saved cursor: {} (saved {})",
                    saved.cursor,
                    saved.updated_at
                );
                (saved.cursor, false)
            }
            None => {
                let cursor = config
                    .cursor
                    .as_ref()
                    .map(Cursor::from_seed)
                    .unwrap_or_default();
                tracing::info!("No saved cursor, starting at {}", cursor);
                (cursor, true)
            }
        };

        cursor.validate(site.categories.len())?;

        if is_new {
            stores.cursor.save(&cursor, &fingerprint)?;
        }

        Ok(Self {
            site,
            policy: config.fetch.on_product_error,
            fingerprint,
            fetcher,
            extractor,
            cursor,
            stores,
        })
    }

    /// Current cursor; the in-memory value only changes once it has been saved
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn results(&self) -> &dyn ResultStore {
        self.stores.results.as_ref()
    }

    /// URL of an index page
    pub fn index_url(&self, category: &str, index_page: u32) -> String {
        format!(
            "{}/{}.html?p={}&product_list_limit={}",
            self.site.host.trim_end_matches('/'),
            category.trim_matches('/'),
            index_page,
            self.site.index_list_limit
        )
    }

    /// Runs steps until the cursor is terminal
    ///
    /// Any error stops the run immediately. Nothing after the failing write
    /// has happened, so a restart re-attempts the same step.
    pub async fn run(&mut self) -> Result<RunSummary, CrawlError> {
        let mut summary = RunSummary::default();

        if self.cursor.is_terminal() {
            tracing::info!("Crawl already completed, nothing to do");
            return Ok(summary);
        }

        let start_time = Instant::now();
        tracing::info!(
            "Starting crawl of {} categories at {}",
            self.site.categories.len(),
            self.cursor
        );

        while !self.cursor.is_terminal() {
            let outcome = match self.step().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Crawl stopped at {}: {}", self.cursor, e);
                    return Err(e);
                }
            };
            summary.record(outcome);

            if summary.steps % 25 == 0 {
                let elapsed = start_time.elapsed();
                tracing::info!(
                    "Progress: {} steps, {} recorded, {} in store, {:.2} steps/sec",
                    summary.steps,
                    summary.recorded,
                    self.stores.results.len(),
                    summary.steps as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
                );
            }
        }

        tracing::info!(
            "Crawl completed: {} steps, {} recorded, {} already present, {} skipped in {:?}",
            summary.steps,
            summary.recorded,
            summary.already_recorded,
            summary.skipped,
            start_time.elapsed()
        );

        Ok(summary)
    }

    /// Processes the product slot under the cursor and advances past it
    pub async fn step(&mut self) -> Result<StepOutcome, CrawlError> {
        if self.cursor.is_terminal() {
            return Ok(StepOutcome::Finished);
        }

        let category = self.site.categories[self.cursor.category_index].clone();
        let index_page = self.cursor.index_page;

        let index_url = self.index_url(&category, index_page);
        let index_key = CacheKey::index(&category, index_page);
        let fetcher = &self.fetcher;
        let extractor = &self.extractor;
        let (index_html, total_pages) = get_or_fetch_checked(
            self.stores.cache.as_mut(),
            &index_key,
            || fetch_body(fetcher, &index_url),
            |html| checked_total_pages(extractor, html, &category, index_page),
        )
        .await?;

        let mut refreshed = self.cursor;
        if refreshed.refresh_total_pages(total_pages) {
            self.commit(refreshed)?;
            tracing::info!("Category '{}' has {} index pages", category, total_pages);
        }

        let base = Url::parse(&index_url)?;
        let product_urls: Vec<String> = self
            .extractor
            .extract_index(&index_html)
            .into_iter()
            .map(|href| match base.join(&href) {
                Ok(url) => url.to_string(),
                Err(_) => href,
            })
            .collect();
        tracing::debug!(
            "Index page {} of '{}' lists {} products",
            index_page,
            category,
            product_urls.len()
        );

        let position = self.cursor.product_position;
        let slot = (position as usize)
            .checked_sub(1)
            .and_then(|i| product_urls.get(i));

        let outcome = match slot {
            None => {
                tracing::warn!(
                    "No product at position {} of page {} in '{}'",
                    position,
                    index_page,
                    category
                );
                StepOutcome::NoProduct
            }
            Some(url) if self.stores.results.contains(url) => {
                tracing::debug!("Already recorded: {}", url);
                StepOutcome::AlreadyRecorded
            }
            Some(url) => self.process_product(&category, url).await?,
        };

        let mut next = self.cursor;
        let transition = next.advance(product_urls.len(), self.site.categories.len())?;
        self.commit(next)?;
        self.log_transition(transition, &category);

        Ok(outcome)
    }

    async fn process_product(
        &mut self,
        category: &str,
        url: &str,
    ) -> Result<StepOutcome, CrawlError> {
        let context = ProductContext {
            category: category.to_string(),
            index_page: self.cursor.index_page,
            product_position: self.cursor.product_position,
        };
        let key = CacheKey::product(category, context.index_page, context.product_position);

        let fetcher = &self.fetcher;
        let html =
            match get_or_fetch(self.stores.cache.as_mut(), &key, || fetch_body(fetcher, url))
                .await
            {
                Ok(html) => html,
                Err(e @ CrawlError::Fetch { .. }) if self.policy == ProductErrorPolicy::Skip => {
                    tracing::warn!("Skipping product: {}", e);
                    return Ok(StepOutcome::Skipped);
                }
                Err(e) => return Err(e),
            };

        let record = self.extractor.extract_product(&html, &context);
        if !record.unrecognized_labels.is_empty() {
            tracing::warn!(
                "Unrecognized sections on {}: {:?}",
                url,
                record.unrecognized_labels
            );
        }
        tracing::info!("Extracted {}: {:?}", url, record.filled_fields());

        self.stores.results.append(url, record)?;
        Ok(StepOutcome::Recorded)
    }

    /// Saves `next` and only then makes it the current cursor
    fn commit(&mut self, next: Cursor) -> Result<(), CrawlError> {
        self.stores.cursor.save(&next, &self.fingerprint)?;
        self.cursor = next;
        Ok(())
    }

    fn log_transition(&self, transition: Advance, finished_category: &str) {
        match transition {
            Advance::NextProduct => tracing::info!("Next product: {}", self.cursor),
            Advance::NextIndexPage => {
                tracing::info!("End of index page, moving to {}", self.cursor)
            }
            Advance::NextCategory => tracing::info!(
                "End of category '{}', moving to '{}'",
                finished_category,
                self.site.categories[self.cursor.category_index]
            ),
            Advance::Completed => tracing::info!("End of crawl"),
            Advance::Idle => {}
        }
    }
}
