//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small site and drive the pipeline
//! against file-backed stores in a temporary directory.

use sitecrawl::config::{
    Config, CrawlerConfig, ExtractConfig, SiteConfig, StorageConfig, UserAgentConfig,
};
use sitecrawl::crawler::{crawl, Pipeline};
use sitecrawl::storage::{open_stores, seed_frontier, ArticleStore, FrontierStore};
use sitecrawl::CrawlError;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration for a site rooted at `base_url`
fn create_test_config(base_url: &str, dir: &TempDir) -> Config {
    Config {
        site: SiteConfig {
            base_url: base_url.to_string(),
            seeds: vec![],
        },
        crawler: CrawlerConfig {
            batch_size: 10,
            batch_delay_ms: 0,
            max_in_flight: 4,
            request_timeout_secs: 5,
            fetch_retries: 0,
            retry_backoff_ms: 10,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        storage: StorageConfig {
            frontier_path: dir.path().join("urls.db").display().to_string(),
            articles_path: dir.path().join("articles.db").display().to_string(),
        },
        extract: ExtractConfig::default(),
    }
}

/// Builds an article page with the given headline and outbound links
fn article_page(title: &str, links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|link| format!(r#"<a href="{}">link</a>"#, link))
        .collect();

    format!(
        r#"<html><body>
        <nav>{anchors}</nav>
        <div class="fullstory">
            <h1>{title}</h1>
            <div class="pub-t">2024-01-01</div>
            <p>Body of {title}.</p>
        </div>
        </body></html>"#
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_generation_discovers_and_saves() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&base_url, &dir);

    let url_a = format!("{}/a", base_url);
    let url_b = format!("{}/b", base_url);
    let url_c = format!("{}/c", base_url);

    mount_page(
        &mock_server,
        "/a",
        article_page(
            "Story A",
            &[
                url_b.clone(),
                url_c.clone(),
                "https://elsewhere.test/x".to_string(),
            ],
        ),
    )
    .await;

    let (frontier, articles) = open_stores(&config.storage).unwrap();

    // B is already known and visited; A is the only work
    frontier.discover(&[url_a.clone(), url_b.clone()]).unwrap();
    frontier.claim(&[url_b.clone()]).unwrap();

    let pipeline = Pipeline::from_config(&config, frontier.clone(), articles.clone()).unwrap();
    let report = pipeline.run_generation(1).await.unwrap().unwrap();

    assert_eq!(report.batch_size, 1);
    assert_eq!(report.articles_saved(), 1);
    assert_eq!(report.discovered(), 1);

    let a = frontier.get(&url_a).unwrap().unwrap();
    assert!(a.visited);
    assert!(a.scraped);

    let b = frontier.get(&url_b).unwrap().unwrap();
    assert!(b.visited, "known URLs must not be reset by rediscovery");

    let c = frontier.get(&url_c).unwrap().unwrap();
    assert!(!c.visited);

    assert!(frontier.get("https://elsewhere.test/x").unwrap().is_none());

    let article = articles.get(&url_a).unwrap().unwrap();
    assert_eq!(article.title, "Story A");
    assert_eq!(article.date_published, "2024-01-01");
    assert_eq!(article.content, "Body of Story A.\n\n");
}

#[tokio::test]
async fn test_fetch_failure_does_not_affect_siblings() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&base_url, &dir);

    let good = format!("{}/good", base_url);
    let bad = format!("{}/bad", base_url);

    mount_page(&mock_server, "/good", article_page("Good", &[])).await;
    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (frontier, articles) = open_stores(&config.storage).unwrap();
    frontier.discover(&[good.clone(), bad.clone()]).unwrap();

    let pipeline = Pipeline::from_config(&config, frontier.clone(), articles.clone()).unwrap();
    let report = pipeline.run_generation(1).await.unwrap().unwrap();

    assert_eq!(report.processed(), 1);
    assert_eq!(report.failures(), 1);

    assert!(articles.get(&good).unwrap().is_some());
    assert!(articles.get(&bad).unwrap().is_none());

    // A failed URL stays claimed and is not retried by later generations
    let bad_record = frontier.get(&bad).unwrap().unwrap();
    assert!(bad_record.visited);
    assert!(!bad_record.scraped);
    assert!(pipeline.run_generation(2).await.unwrap().is_none());
}

#[tokio::test]
async fn test_shared_links_in_one_batch_insert_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&base_url, &dir);

    let shared = format!("{}/shared", base_url);
    let pages = ["/p1", "/p2", "/p3"];
    for route in pages {
        mount_page(&mock_server, route, article_page(route, &[shared.clone()])).await;
    }

    let (frontier, articles) = open_stores(&config.storage).unwrap();
    let urls: Vec<String> = pages
        .iter()
        .map(|route| format!("{}{}", base_url, route))
        .collect();
    frontier.discover(&urls).unwrap();

    let pipeline = Pipeline::from_config(&config, frontier.clone(), articles).unwrap();
    let report = pipeline.run_generation(1).await.unwrap().unwrap();

    assert_eq!(report.processed(), 3);
    assert_eq!(report.discovered(), 1);
    assert_eq!(frontier.count_total().unwrap(), 4);
    assert_eq!(frontier.count_unvisited().unwrap(), 1);
}

#[tokio::test]
async fn test_full_crawl_until_frontier_exhausted() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&base_url, &dir);

    let page1 = format!("{}/page1", base_url);
    let page2 = format!("{}/page2", base_url);
    let deep = format!("{}/page2/deep", base_url);

    mount_page(
        &mock_server,
        "/",
        article_page("Home", &[page1.clone(), page2.clone()]),
    )
    .await;
    mount_page(
        &mock_server,
        "/page1",
        article_page("Page 1", &[base_url.clone(), page2.clone()]),
    )
    .await;
    mount_page(
        &mock_server,
        "/page2",
        article_page("Page 2", &[deep.clone()]),
    )
    .await;
    mount_page(&mock_server, "/page2/deep", article_page("Deep", &[])).await;

    let summary = crawl(&config).await.unwrap();

    assert_eq!(summary.urls_claimed, 4);
    assert_eq!(summary.pages_processed, 4);
    assert_eq!(summary.articles_saved, 4);
    assert_eq!(summary.fetch_failures, 0);

    // Generations: {base}, {page1, page2}, {deep}
    assert_eq!(summary.generations, 3);

    let (frontier, articles) = open_stores(&config.storage).unwrap();
    assert_eq!(frontier.count_total().unwrap(), 4);
    assert_eq!(frontier.count_unvisited().unwrap(), 0);
    assert_eq!(frontier.count_scraped().unwrap(), 4);
    assert_eq!(articles.count().unwrap(), 4);

    let deep_article = articles.get(&deep).unwrap().unwrap();
    assert_eq!(deep_article.title, "Deep");
}

#[tokio::test]
async fn test_rerun_after_completion_is_a_no_op() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&base_url, &dir);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(article_page("Home", &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let first = crawl(&config).await.unwrap();
    assert_eq!(first.articles_saved, 1);

    // Seeding again leaves the visited base URL alone
    let second = crawl(&config).await.unwrap();
    assert_eq!(second.generations, 0);
    assert_eq!(second.urls_claimed, 0);

    let (frontier, _) = open_stores(&config.storage).unwrap();
    assert_eq!(seed_frontier(frontier.as_ref(), &config.seed_urls()).unwrap(), 0);
}

/// Makes every claim of `url` fail at the row level
fn reject_claims_of(config: &Config, url: &str) {
    let conn = rusqlite::Connection::open(&config.storage.frontier_path).unwrap();
    conn.execute_batch(&format!(
        "CREATE TRIGGER reject_claim BEFORE UPDATE OF visited ON urls
         WHEN OLD.url = '{}'
         BEGIN SELECT RAISE(ABORT, 'claim rejected'); END;",
        url
    ))
    .unwrap();
}

#[tokio::test]
async fn test_unclaimable_url_does_not_stall_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&base_url, &dir);
    config.crawler.batch_size = 2;

    let stuck = format!("{}/stuck", base_url);
    let other = format!("{}/other", base_url);
    let later = format!("{}/later", base_url);

    mount_page(&mock_server, "/other", article_page("Other", &[later.clone()])).await;
    mount_page(&mock_server, "/later", article_page("Later", &[])).await;

    {
        let (frontier, _) = open_stores(&config.storage).unwrap();
        frontier.discover(&[stuck.clone(), other.clone()]).unwrap();
    }
    reject_claims_of(&config, &stuck);

    let (frontier, articles) = open_stores(&config.storage).unwrap();
    let pipeline = Pipeline::from_config(&config, frontier.clone(), articles.clone()).unwrap();

    let summary = tokio::time::timeout(Duration::from_secs(10), pipeline.run())
        .await
        .expect("crawl must finish")
        .unwrap();

    assert_eq!(summary.claim_failures, 1);
    assert_eq!(summary.articles_saved, 2);
    assert!(frontier.get(&other).unwrap().unwrap().visited);
    assert!(frontier.get(&later).unwrap().unwrap().visited);
    assert!(!frontier.get(&stuck).unwrap().unwrap().visited);
    assert!(articles.get(&stuck).unwrap().is_none());
}

#[tokio::test]
async fn test_batch_of_only_unclaimable_urls_is_fatal() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&base_url, &dir);

    let stuck = format!("{}/stuck", base_url);
    {
        let (frontier, _) = open_stores(&config.storage).unwrap();
        frontier.discover(&[stuck.clone()]).unwrap();
    }
    reject_claims_of(&config, &stuck);

    let (frontier, articles) = open_stores(&config.storage).unwrap();
    let pipeline = Pipeline::from_config(&config, frontier, articles).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(10), pipeline.run())
        .await
        .expect("crawl must finish");

    assert!(matches!(result, Err(CrawlError::Claim { count: 1, .. })));
}

/// Records when each request arrives and answers after a fixed delay
struct RecordingResponder {
    arrivals: Arc<Mutex<Vec<Instant>>>,
    delay: Duration,
}

impl Respond for RecordingResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        ResponseTemplate::new(200)
            .set_body_string(article_page("Slow", &[]))
            .set_delay(self.delay)
    }
}

#[tokio::test]
async fn test_max_in_flight_caps_concurrent_fetches() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&base_url, &dir);
    config.crawler.batch_size = 10;
    config.crawler.max_in_flight = 2;

    let delay = Duration::from_millis(300);
    let arrivals = Arc::new(Mutex::new(Vec::new()));
    Mock::given(method("GET"))
        .respond_with(RecordingResponder {
            arrivals: arrivals.clone(),
            delay,
        })
        .mount(&mock_server)
        .await;

    let urls: Vec<String> = (0..6)
        .map(|i| format!("{}/slow/{}", base_url, i))
        .collect();
    let (frontier, articles) = open_stores(&config.storage).unwrap();
    frontier.discover(&urls).unwrap();

    let pipeline = Pipeline::from_config(&config, frontier, articles).unwrap();
    let report = pipeline.run_generation(1).await.unwrap().unwrap();
    assert_eq!(report.processed(), 6);

    let arrivals = arrivals.lock().unwrap().clone();
    assert_eq!(arrivals.len(), 6);

    // A permit is only released once a response completes, so no window
    // shorter than the response delay can see more requests than the cap.
    let window = delay / 2;
    let peak = arrivals
        .iter()
        .map(|start| {
            arrivals
                .iter()
                .filter(|t| **t >= *start && **t - *start < window)
                .count()
        })
        .max()
        .unwrap_or(0);
    assert!(peak <= 2, "peak of {} requests in flight", peak);
}
