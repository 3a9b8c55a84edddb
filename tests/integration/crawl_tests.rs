//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small storefront and run the full
//! crawl cycle end-to-end against real on-disk stores.

use reef_crawler::config::{
    load_config, CacheBackend, Config, FetchConfig, OutputConfig, ProductErrorPolicy, SiteConfig,
    UserAgentConfig,
};
use reef_crawler::crawler::crawl;
use reef_crawler::storage::{CacheKey, CursorStore, FsPageCache, SqliteStorage};
use reef_crawler::{CrawlError, ProductRecord};
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIMIT: u32 = 10;

/// Category name and, per index page, the product slugs on it
type SiteLayout<'a> = &'a [(&'a str, &'a [&'a [&'a str]])];

const CATALOGUE: SiteLayout<'static> = &[
    ("corals", &[&["acro", "monti"], &["pocillopora"]]),
    ("fish", &[&["tang"]]),
];

/// Creates a test configuration writing into `dir`
fn create_test_config(host: &str, categories: &[&str], dir: &Path) -> Config {
    Config {
        site: SiteConfig {
            host: host.to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            index_list_limit: LIMIT,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        fetch: FetchConfig {
            timeout_secs: 5,
            on_product_error: ProductErrorPolicy::Abort,
        },
        output: OutputConfig {
            state_path: dir.join("state.db").display().to_string(),
            result_path: dir.join("results.json").display().to_string(),
            cache_dir: dir.join("cache").display().to_string(),
            cache_backend: CacheBackend::Filesystem,
        },
        cursor: None,
    }
}

fn categories_of(layout: SiteLayout<'_>) -> Vec<&str> {
    layout.iter().map(|(name, _)| *name).collect()
}

fn index_html(base_url: &str, slugs: &[&str], total_pages: usize) -> String {
    let items: String = slugs
        .iter()
        .map(|slug| {
            format!(
                r#"<li class="item product product-item">
                    <a class="product-item-photo" href="{base}/{slug}.html"><img/></a>
                    <a class="product-item-link" href="{base}/{slug}.html">{slug}</a>
                </li>"#,
                base = base_url,
                slug = slug
            )
        })
        .collect();
    let pager = if total_pages > 1 {
        let spans: String = (1..=total_pages)
            .map(|n| format!("<li><a><span>Page</span><span>{}</span></a></li>", n))
            .collect();
        format!(
            r#"<ul class="items pages-items">{}<li><a><span>Next</span></a></li></ul>"#,
            spans
        )
    } else {
        String::new()
    };
    format!(
        r#"<html><body><ol class="products list items product-items">{}</ol>{}</body></html>"#,
        items, pager
    )
}

fn product_html(slug: &str) -> String {
    let heading = |label: &str| {
        format!(
            r#"<b style="font-size: 1.75em; font-family: questrial;">{}</b>"#,
            label
        )
    };
    format!(
        r#"<html><body>
            <h1 class="page-title"><span>{slug} specimen</span></h1>
            <div class="value" itemprop="description">About {slug}.</div>
            <div data-content-type="block">{care}<p>Stable water.</p></div>
            <div data-content-type="block">{lighting}<p>Moderate to high.</p></div>
            <div data-content-type="block">{flow}<p>Water Flow</p><p>Medium.</p></div>
            <div data-content-type="block">{tips}<p>Give it room.</p></div>
        </body></html>"#,
        slug = slug,
        care = heading("Stony Care"),
        lighting = heading("Lighting"),
        flow = heading("Water Flow"),
        tips = heading("Placement Tips"),
    )
}

fn index_mock(category: &str, page: usize) -> wiremock::MockBuilder {
    Mock::given(method("GET"))
        .and(path(format!("/{}.html", category)))
        .and(query_param("p", page.to_string()))
        .and(query_param("product_list_limit", LIMIT.to_string()))
}

fn product_mock(slug: &str) -> wiremock::MockBuilder {
    Mock::given(method("GET")).and(path(format!("/{}.html", slug)))
}

/// Mounts every index and product page of `layout`
async fn mount_site(server: &MockServer, layout: SiteLayout<'_>) {
    let base_url = server.uri();
    for (category, pages) in layout {
        for (i, slugs) in pages.iter().enumerate() {
            index_mock(category, i + 1)
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(index_html(&base_url, slugs, pages.len())),
                )
                .mount(server)
                .await;
            for slug in slugs.iter() {
                product_mock(slug)
                    .respond_with(ResponseTemplate::new(200).set_body_string(product_html(slug)))
                    .mount(server)
                    .await;
            }
        }
    }
}

fn read_results(config: &Config) -> BTreeMap<String, ProductRecord> {
    let content = std::fs::read_to_string(&config.output.result_path).unwrap();
    serde_json::from_str(&content).unwrap()
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

#[tokio::test]
async fn test_full_crawl_from_toml_config() {
    let server = MockServer::start().await;
    mount_site(&server, CATALOGUE).await;
    let dir = TempDir::new().unwrap();

    let toml = format!(
        r#"
[site]
host = "{host}"
categories = ["corals", "fish"]
index-list-limit = {limit}

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
state-path = '{dir}/state.db'
result-path = '{dir}/results.json'
cache-dir = '{dir}/cache'
"#,
        host = server.uri(),
        limit = LIMIT,
        dir = dir.path().display()
    );
    let config_path = dir.path().join("crawler.toml");
    std::fs::write(&config_path, toml).unwrap();
    let config = load_config(&config_path).unwrap();

    let summary = crawl(&config, false).await.unwrap();
    assert_eq!(summary.recorded, 4);
    assert_eq!(summary.steps, 4);

    let results = read_results(&config);
    assert_eq!(results.len(), 4);

    let acro = &results[&format!("{}/acro.html", server.uri())];
    assert_eq!(acro.category, "corals");
    assert_eq!(acro.index_page, 1);
    assert_eq!(acro.product_position, 1);
    assert_eq!(acro.species.as_deref(), Some("acro specimen"));
    assert_eq!(acro.description.as_deref(), Some("About acro."));
    assert_eq!(acro.family.as_deref(), Some("Stony"));
    assert_eq!(acro.care_description.as_deref(), Some("Stable water."));
    assert_eq!(acro.lighting.as_deref(), Some("Moderate to high."));
    assert_eq!(acro.water_flow.as_deref(), Some("Medium."));
    assert_eq!(acro.location, None);
    assert_eq!(acro.unrecognized_labels, vec!["PLACEMENT TIPS"]);

    let pocillopora = &results[&format!("{}/pocillopora.html", server.uri())];
    assert_eq!(pocillopora.index_page, 2);
    assert_eq!(pocillopora.product_position, 1);

    let saved = SqliteStorage::new(Path::new(&config.output.state_path))
        .unwrap()
        .load()
        .unwrap()
        .unwrap();
    assert!(saved.cursor.completed);
    assert_eq!(saved.cursor.category_index, 2);

    let cache = FsPageCache::new(&dir.path().join("cache")).unwrap();
    assert!(cache.path_for(&CacheKey::index("corals", 2)).exists());
    assert!(cache.path_for(&CacheKey::product("fish", 1, 1)).exists());
}

#[tokio::test]
async fn test_rerun_makes_no_requests() {
    let server = MockServer::start().await;
    mount_site(&server, CATALOGUE).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &categories_of(CATALOGUE), dir.path());

    crawl(&config, false).await.unwrap();
    let requests = request_count(&server).await;
    // 3 index pages and 4 products
    assert_eq!(requests, 7);
    let results = read_results(&config);

    let summary = crawl(&config, false).await.unwrap();
    assert_eq!(summary.steps, 0);
    assert_eq!(request_count(&server).await, requests);

    // re-walking from scratch is served by the cache and the result guard
    let summary = crawl(&config, true).await.unwrap();
    assert_eq!(summary.already_recorded, 4);
    assert_eq!(summary.recorded, 0);
    assert_eq!(request_count(&server).await, requests);
    assert_eq!(read_results(&config), results);
}

#[tokio::test]
async fn test_interrupted_crawl_resumes_without_refetching() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &categories_of(CATALOGUE), dir.path());

    // second product is down on the first attempt
    product_mock("monti")
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_site(&server, CATALOGUE).await;

    let err = crawl(&config, false).await.unwrap_err();
    assert!(matches!(err, CrawlError::Fetch { ref url, .. } if url.ends_with("/monti.html")));
    assert_eq!(read_results(&config).len(), 1);

    server.reset().await;
    let base_url = server.uri();
    let corals: &[&[&str]] = &[&["acro", "monti"], &["pocillopora"]];

    index_mock("corals", 1)
        .respond_with(ResponseTemplate::new(200).set_body_string(index_html(&base_url, corals[0], 2)))
        .expect(0)
        .mount(&server)
        .await;
    index_mock("corals", 2)
        .respond_with(ResponseTemplate::new(200).set_body_string(index_html(&base_url, corals[1], 2)))
        .expect(1)
        .mount(&server)
        .await;
    index_mock("fish", 1)
        .respond_with(ResponseTemplate::new(200).set_body_string(index_html(&base_url, &["tang"], 1)))
        .expect(1)
        .mount(&server)
        .await;
    product_mock("acro")
        .respond_with(ResponseTemplate::new(200).set_body_string(product_html("acro")))
        .expect(0)
        .mount(&server)
        .await;
    for slug in ["monti", "pocillopora", "tang"] {
        product_mock(slug)
            .respond_with(ResponseTemplate::new(200).set_body_string(product_html(slug)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let summary = crawl(&config, false).await.unwrap();
    assert_eq!(summary.recorded, 3);
    assert_eq!(read_results(&config).len(), 4);

    server.verify().await;
}

#[tokio::test]
async fn test_skip_policy_records_remaining_products() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), &categories_of(CATALOGUE), dir.path());
    config.fetch.on_product_error = ProductErrorPolicy::Skip;

    product_mock("monti")
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_site(&server, CATALOGUE).await;

    let summary = crawl(&config, false).await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.recorded, 3);

    let results = read_results(&config);
    assert!(!results.contains_key(&format!("{}/monti.html", server.uri())));
    let cache = FsPageCache::new(&dir.path().join("cache")).unwrap();
    assert!(!cache.path_for(&CacheKey::product("corals", 1, 2)).exists());
    assert!(cache.path_for(&CacheKey::product("corals", 1, 1)).exists());
}

#[tokio::test]
async fn test_missing_index_page_is_fatal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), &["corals"], dir.path());
    config.fetch.on_product_error = ProductErrorPolicy::Skip;

    // nothing mounted; wiremock answers 404
    let err = crawl(&config, false).await.unwrap_err();
    assert!(matches!(err, CrawlError::Fetch { .. }));

    let saved = SqliteStorage::new(Path::new(&config.output.state_path))
        .unwrap()
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(saved.cursor, Default::default());
}

#[tokio::test]
async fn test_malformed_pagination_is_fatal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &["corals"], dir.path());

    index_mock("corals", 1)
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<ol class="products list items product-items"></ol>
               <ul class="items pages-items"><li><span>Next</span></li></ul>"#,
        ))
        .mount(&server)
        .await;

    let err = crawl(&config, false).await.unwrap_err();
    assert!(matches!(err, CrawlError::Pagination(_)));
}

#[tokio::test]
async fn test_changed_categories_require_fresh() {
    let server = MockServer::start().await;
    mount_site(&server, CATALOGUE).await;
    let dir = TempDir::new().unwrap();

    let config = create_test_config(&server.uri(), &["corals", "fish"], dir.path());
    crawl(&config, false).await.unwrap();

    let reordered = create_test_config(&server.uri(), &["fish", "corals"], dir.path());
    let err = crawl(&reordered, false).await.unwrap_err();
    assert!(matches!(err, CrawlError::CategoryMismatch { .. }));

    let summary = crawl(&reordered, true).await.unwrap();
    assert_eq!(summary.steps, 4);
    assert_eq!(read_results(&reordered).len(), 4);
}

#[tokio::test]
async fn test_sqlite_page_cache() {
    let server = MockServer::start().await;
    mount_site(&server, CATALOGUE).await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), &categories_of(CATALOGUE), dir.path());
    config.output.cache_backend = CacheBackend::Sqlite;

    crawl(&config, false).await.unwrap();

    let storage = SqliteStorage::new(Path::new(&config.output.state_path)).unwrap();
    assert_eq!(storage.count_cached_pages().unwrap(), 7);
    assert!(!dir.path().join("cache").exists());

    crawl(&config, true).await.unwrap();
    assert_eq!(request_count(&server).await, 7);
}
