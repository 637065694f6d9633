//! Integration tests for the crawler and ingestion path
//!
//! These tests use wiremock to stand in for the source archive and
//! exercise the full crawl cycle: pagination stop conditions, quota
//! handling, fetch error classification, and end-to-end ingestion into
//! the SQLite store.

use storyscope::config::{Config, OracleConfig, RetryConfig, ScraperConfig, StoreConfig};
use storyscope::crawler::{Crawler, FetchError, SearchQuery, SortKey};
use storyscope::jobs::{self, JobKind, JobRegistry, JobStatus};
use storyscope::store::SqliteStore;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scraper_config(base_url: &str) -> ScraperConfig {
    ScraperConfig {
        base_url: base_url.to_string(),
        rate_limit: 1000.0, // effectively no spacing in tests
        settle_ms: 0,
        request_timeout_secs: 10,
        user_agent: "TestAgent/1.0".to_string(),
    }
}

fn full_config(base_url: &str, database_path: &str) -> Config {
    Config {
        store: StoreConfig {
            database_path: database_path.to_string(),
        },
        scraper: scraper_config(base_url),
        oracle: OracleConfig::default(),
        retry: RetryConfig::default(),
    }
}

fn blurb(id: u64, title: &str, hits: &str) -> String {
    format!(
        r##"<li id="work_{id}" class="work blurb group">
            <h4 class="heading">
                <a href="/works/{id}">{title}</a>
                by <a rel="author" href="/users/writer{id}/pseuds/writer{id}">writer{id}</a>
            </h4>
            <h5 class="fandoms heading"><a class="tag" href="#">Testdom</a></h5>
            <ul class="required-tags">
                <li><span class="rating-teen rating"><span class="text">Teen And Up Audiences</span></span></li>
            </ul>
            <ul class="tags commas">
                <li class="freeforms"><a class="tag" href="#">Fluff</a></li>
            </ul>
            <dl class="stats">
                <dt>Words:</dt><dd class="words">10,000</dd>
                <dt>Kudos:</dt><dd class="kudos">50</dd>
                <dt>Hits:</dt><dd class="hits">{hits}</dd>
            </dl>
            <p class="datetime">2024-01-15</p>
        </li>"##
    )
}

fn listing_page(blurbs: &[String], with_next: bool) -> String {
    let next = if with_next {
        r#"<ol class="pagination"><li class="next"><a href="?page=2">Next</a></li></ol>"#
    } else {
        ""
    };
    format!(
        r#"<html><body><ol class="work index group">{}</ol>{}</body></html>"#,
        blurbs.join("\n"),
        next
    )
}

#[tokio::test]
async fn test_crawl_stops_on_empty_page() {
    let server = MockServer::start().await;

    let page1 = listing_page(
        &[blurb(1, "First", "1,000"), blurb(2, "Second", "500")],
        true,
    );
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page1))
        .mount(&server)
        .await;

    // Page 2 exists but has no blurbs
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[], true)))
        .expect(1)
        .mount(&server)
        .await;

    let mut crawler = Crawler::new(&scraper_config(&server.uri())).unwrap();
    let mut results = crawler.search(SearchQuery {
        limit: 10,
        ..Default::default()
    });

    let mut works = Vec::new();
    while let Some(work) = results.next().await.unwrap() {
        works.push(work);
    }

    assert_eq!(works.len(), 2);
    assert_eq!(works[0].platform_work_id, "1");
    assert_eq!(works[0].title, "First");
    assert_eq!(works[1].platform_work_id, "2");
}

#[tokio::test]
async fn test_crawl_respects_limit() {
    let server = MockServer::start().await;

    let page1 = listing_page(
        &[blurb(1, "First", "1,000"), blurb(2, "Second", "500")],
        true,
    );
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page1))
        .mount(&server)
        .await;

    // The quota is hit before page 2 is ever requested
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[], false)))
        .expect(0)
        .mount(&server)
        .await;

    let mut crawler = Crawler::new(&scraper_config(&server.uri())).unwrap();
    let mut results = crawler.search(SearchQuery {
        limit: 1,
        ..Default::default()
    });

    let mut works = Vec::new();
    while let Some(work) = results.next().await.unwrap() {
        works.push(work);
    }

    assert_eq!(works.len(), 1);
}

#[tokio::test]
async fn test_crawl_stops_without_next_link() {
    let server = MockServer::start().await;

    let page1 = listing_page(&[blurb(1, "Only", "10")], false);
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page1))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[], false)))
        .expect(0)
        .mount(&server)
        .await;

    let mut crawler = Crawler::new(&scraper_config(&server.uri())).unwrap();
    let mut results = crawler.search(SearchQuery {
        limit: 10,
        ..Default::default()
    });

    let mut works = Vec::new();
    while let Some(work) = results.next().await.unwrap() {
        works.push(work);
    }

    assert_eq!(works.len(), 1);
}

#[tokio::test]
async fn test_fetch_failure_aborts_crawl() {
    let server = MockServer::start().await;

    let page1 = listing_page(&[blurb(1, "First", "100")], true);
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page1))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let mut crawler = Crawler::new(&scraper_config(&server.uri())).unwrap();
    let mut results = crawler.search(SearchQuery {
        limit: 10,
        ..Default::default()
    });

    // The page-1 item stands
    let first = results.next().await.unwrap();
    assert!(first.is_some());

    // The page-2 failure aborts the crawl with a typed error
    let error = results.next().await.unwrap_err();
    assert!(matches!(error, FetchError::RateLimited { .. }));
}

#[tokio::test]
async fn test_forbidden_is_classified() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let mut crawler = Crawler::new(&scraper_config(&server.uri())).unwrap();
    let mut results = crawler.search(SearchQuery::default());

    let error = results.next().await.unwrap_err();
    assert!(matches!(error, FetchError::Forbidden { .. }));
}

#[tokio::test]
async fn test_scrape_one_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works/999"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut crawler = Crawler::new(&scraper_config(&server.uri())).unwrap();
    let work = crawler.scrape_one("999").await.unwrap();
    assert!(work.is_none());
}

#[tokio::test]
async fn test_scrape_one_parses_detail_page() {
    let server = MockServer::start().await;

    let detail = r##"<html><body>
        <dl class="work meta group">
            <dd class="rating tags"><ul><li><a class="tag" href="#">Explicit</a></li></ul></dd>
            <dd class="fandom tags"><ul><li><a class="tag" href="#">Testdom</a></li></ul></dd>
            <dd class="freeform tags"><ul><li><a class="tag" href="#">Slow Burn</a></li></ul></dd>
        </dl>
        <h2 class="title heading">Deep Waters</h2>
        <h3 class="byline heading"><a rel="author" href="/users/abyss">abyss</a></h3>
        <dl class="stats">
            <dt>Published:</dt><dd class="published">2023-03-03</dd>
            <dt>Words:</dt><dd class="words">45,000</dd>
            <dt>Chapters:</dt><dd class="chapters">12/12</dd>
            <dt>Kudos:</dt><dd class="kudos">2,000</dd>
            <dt>Hits:</dt><dd class="hits">60,000</dd>
        </dl>
    </body></html>"##;

    Mock::given(method("GET"))
        .and(path("/works/777"))
        .and(query_param("view_adult", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail))
        .mount(&server)
        .await;

    let mut crawler = Crawler::new(&scraper_config(&server.uri())).unwrap();
    let work = crawler.scrape_one("777").await.unwrap().unwrap();

    assert_eq!(work.title, "Deep Waters");
    assert_eq!(work.word_count, 45_000);
    assert_eq!(work.chapter_count, 12);
    assert_eq!(work.views, 60_000);
    assert_eq!(work.author.unwrap().username, "abyss");
}

#[tokio::test]
async fn test_tag_browse_uses_encoded_path() {
    let server = MockServer::start().await;

    let page = listing_page(&[blurb(5, "Pop Song", "42")], false);
    Mock::given(method("GET"))
        .and(path("/tags/K*s*DA/works"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .expect(1)
        .mount(&server)
        .await;

    let mut crawler = Crawler::new(&scraper_config(&server.uri())).unwrap();
    let mut results = crawler.search(SearchQuery {
        fandom: Some("K/DA".to_string()),
        limit: 10,
        ..Default::default()
    });

    let work = results.next().await.unwrap().unwrap();
    assert_eq!(work.platform_work_id, "5");
}

#[tokio::test]
async fn test_tag_statistics_fetch() {
    let server = MockServer::start().await;

    let stats_page = r#"<html><body>
        <h2 class="heading">1 - 20 of 12,345 Works in Testdom</h2>
        <dd class="freeform tags"><ul><li><label>Fluff (900)</label></li></ul></dd>
    </body></html>"#;

    Mock::given(method("GET"))
        .and(path("/tags/Testdom/works"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stats_page))
        .mount(&server)
        .await;

    let mut crawler = Crawler::new(&scraper_config(&server.uri())).unwrap();
    let stats = crawler.tag_statistics("Testdom").await.unwrap();

    assert_eq!(stats.total_works, 12_345);
    assert_eq!(stats.freeform.len(), 1);
    assert_eq!(stats.freeform[0].name, "Fluff");
}

#[tokio::test]
async fn test_search_ingestion_end_to_end() {
    let server = MockServer::start().await;

    let page1 = listing_page(
        &[blurb(1, "First", "1,000"), blurb(2, "Second", "500")],
        false,
    );
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page1))
        .mount(&server)
        .await;

    let db_file = tempfile::NamedTempFile::new().unwrap();
    let db_path = db_file.path().to_str().unwrap().to_string();
    let config = full_config(&server.uri(), &db_path);

    let mut store = SqliteStore::new(db_file.path()).unwrap();
    let mut crawler = Crawler::new(&config.scraper).unwrap();

    let registry = JobRegistry::new();
    let job_id = registry.submit(JobKind::ScrapeWorks, 10, "testhash");

    let query = SearchQuery {
        sort: SortKey::Kudos,
        limit: 10,
        ..Default::default()
    };
    let count = jobs::ingest_search(&registry, job_id, &mut store, &mut crawler, &config, query)
        .await
        .unwrap();

    assert_eq!(count, 2);

    let job = registry.get(job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.works_ingested, 2);

    let summary = store.stats_summary().unwrap();
    assert_eq!(summary.works, 2);
    assert_eq!(summary.authors, 2);
    assert_eq!(summary.snapshots, 2);
    assert_eq!(summary.platforms, 1);

    // Re-ingesting the same listing does not duplicate anything
    let job_id = registry.submit(JobKind::ScrapeWorks, 10, "testhash");
    let mut crawler = Crawler::new(&config.scraper).unwrap();
    let query = SearchQuery {
        limit: 10,
        ..Default::default()
    };
    jobs::ingest_search(&registry, job_id, &mut store, &mut crawler, &config, query)
        .await
        .unwrap();

    let summary = store.stats_summary().unwrap();
    assert_eq!(summary.works, 2);
    assert_eq!(summary.snapshots, 2);
}

#[tokio::test]
async fn test_failed_ingestion_reports_terminal_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let db_file = tempfile::NamedTempFile::new().unwrap();
    let config = full_config(&server.uri(), db_file.path().to_str().unwrap());

    let mut store = SqliteStore::new(db_file.path()).unwrap();
    let mut crawler = Crawler::new(&config.scraper).unwrap();

    let registry = JobRegistry::new();
    let job_id = registry.submit(JobKind::ScrapeWorks, 10, "testhash");

    let result = jobs::ingest_search(
        &registry,
        job_id,
        &mut store,
        &mut crawler,
        &config,
        SearchQuery::default(),
    )
    .await;
    assert!(result.is_err());

    let job = registry.get(job_id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("403"));
}
