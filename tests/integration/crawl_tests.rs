//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! collection crawls end-to-end, from the first page to the last.

use douban_backup::config::{BackupSelection, Config, CrawlerConfig, SiteConfig};
use douban_backup::crawler::{
    backup_public, build_http_client, start_url, CrawlEnd, CrawlEngine, Orchestrator,
    RetryPolicy,
};
use douban_backup::extract::{strategy_for, MovieStrategy};
use douban_backup::{BackupData, ExtractionStrategy, MediaType};
use reqwest::cookie::Jar;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Site config with every host pointing at the mock server
fn site_for(server: &MockServer) -> SiteConfig {
    SiteConfig {
        www_url: server.uri(),
        movie_url: server.uri(),
        book_url: server.uri(),
        music_url: server.uri(),
        ..SiteConfig::default()
    }
}

/// No pacing so tests run fast
fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        request_delay: Duration::ZERO,
        retry_backoff: Duration::from_millis(5),
    }
}

fn client_for(site: &SiteConfig) -> Client {
    let crawler = CrawlerConfig {
        request_timeout_secs: 5,
        ..CrawlerConfig::default()
    };
    build_http_client(site, &crawler, Arc::new(Jar::default()), Policy::default())
        .expect("Failed to build client")
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

/// A movie grid page with `(subject id, title)` items and an optional next link
fn movie_page(items: &[(&str, &str)], next: Option<&str>) -> String {
    let mut body = String::from(r#"<html><body><div class="grid-view">"#);
    for (id, title) in items {
        body.push_str(&format!(
            r#"<div class="item"><div class="info"><ul>
                 <li class="title"><a href="https://movie.douban.com/subject/{id}/"><em>{title}</em></a></li>
                 <li><span class="rating4-t"></span><span class="date">2024-01-01</span></li>
               </ul></div></div>"#
        ));
    }
    body.push_str("</div>");
    if let Some(next) = next {
        body.push_str(&format!(
            r#"<div class="paginator"><span class="next"><a href="{next}">后页&gt;</a></span></div>"#
        ));
    }
    body.push_str("</body></html>");
    body
}

/// A book list page with `(subject id, title)` items and an optional next link
fn book_page(items: &[(&str, &str)], next: Option<&str>) -> String {
    let mut body = String::from(r#"<html><body><ul class="interest-list">"#);
    for (id, title) in items {
        body.push_str(&format!(
            r#"<li class="subject-item"><div class="info">
                 <h2><a href="https://book.douban.com/subject/{id}/">{title}</a></h2>
                 <div class="pub">某作者 / 某出版社</div>
               </div></li>"#
        ));
    }
    body.push_str("</ul>");
    if let Some(next) = next {
        body.push_str(&format!(
            r#"<div class="paginator"><span class="next"><a href="{next}">后页&gt;</a></span></div>"#
        ));
    }
    body.push_str("</body></html>");
    body
}

#[tokio::test]
async fn test_records_keep_page_order() {
    let server = MockServer::start().await;
    let site = site_for(&server);

    Mock::given(method("GET"))
        .and(path("/people/alice/collect"))
        .and(query_param("start", "15"))
        .respond_with(html(movie_page(&[("3", "C")], None)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/people/alice/collect"))
        .respond_with(html(movie_page(
            &[("1", "A"), ("2", "B")],
            Some("/people/alice/collect?start=15"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&site);
    let engine = CrawlEngine::new(&client, fast_policy(3));
    let strategy = MovieStrategy::new(url::Url::parse(&server.uri()).unwrap());
    let bucket = MediaType::Movie.bucket("collect").unwrap();
    let start = start_url(&site, MediaType::Movie, "alice", bucket).unwrap();

    let mut records = Vec::new();
    let report = engine
        .crawl_into(start, &strategy, bucket, &mut records)
        .await;

    assert!(report.is_complete());
    assert_eq!(report.pages, 2);
    let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B", "C"]);
    assert_eq!(records[2].external_id, "3");
    assert_eq!(records[0].rating, "4");
    assert!(records.iter().all(|r| r.collection_label == "看过"));
}

#[tokio::test]
async fn test_failed_page_keeps_earlier_records() {
    let server = MockServer::start().await;
    let site = site_for(&server);

    // Page two never recovers; every attempt is spent on it
    Mock::given(method("GET"))
        .and(path("/people/alice/collect"))
        .and(query_param("start", "15"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/people/alice/collect"))
        .respond_with(html(movie_page(
            &[("1", "A"), ("2", "B")],
            Some("/people/alice/collect?start=15"),
        )))
        .mount(&server)
        .await;

    let client = client_for(&site);
    let engine = CrawlEngine::new(&client, fast_policy(2));
    let strategy = MovieStrategy::new(url::Url::parse(&server.uri()).unwrap());
    let bucket = MediaType::Movie.bucket("collect").unwrap();
    let start = start_url(&site, MediaType::Movie, "alice", bucket).unwrap();

    let mut records = Vec::new();
    let report = engine
        .crawl_into(start, &strategy, bucket, &mut records)
        .await;

    assert_eq!(report.pages, 1);
    assert_eq!(records.len(), 2);
    match report.end {
        CrawlEnd::FetchFailed { url } => assert_eq!(url.query(), Some("start=15")),
        other => panic!("unexpected end: {:?}", other),
    }
}

#[tokio::test]
async fn test_first_page_failure_yields_nothing() {
    let server = MockServer::start().await;
    let site = site_for(&server);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&site);
    let engine = CrawlEngine::new(&client, fast_policy(3));
    let strategy = MovieStrategy::new(url::Url::parse(&server.uri()).unwrap());
    let bucket = MediaType::Movie.bucket("wish").unwrap();
    let start = start_url(&site, MediaType::Movie, "alice", bucket).unwrap();

    let records = engine.crawl(start, &strategy, bucket).await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    let site = site_for(&server);

    Mock::given(method("GET"))
        .and(path("/people/alice/wish"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/people/alice/wish"))
        .respond_with(html(movie_page(&[("7", "G")], None)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&site);
    let engine = CrawlEngine::new(&client, fast_policy(3));
    let strategy = MovieStrategy::new(url::Url::parse(&server.uri()).unwrap());
    let bucket = MediaType::Movie.bucket("wish").unwrap();
    let start = start_url(&site, MediaType::Movie, "alice", bucket).unwrap();

    let records = engine.crawl(start, &strategy, bucket).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "G");
}

#[tokio::test]
async fn test_self_link_stops_crawl() {
    let server = MockServer::start().await;
    let site = site_for(&server);

    Mock::given(method("GET"))
        .and(path("/people/alice/do"))
        .respond_with(html(movie_page(&[("1", "A")], Some("/people/alice/do"))))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&site);
    let engine = CrawlEngine::new(&client, fast_policy(1));
    let strategy = MovieStrategy::new(url::Url::parse(&server.uri()).unwrap());
    let bucket = MediaType::Movie.bucket("do").unwrap();
    let start = start_url(&site, MediaType::Movie, "alice", bucket).unwrap();

    let mut records = Vec::new();
    let report = engine
        .crawl_into(start, &strategy, bucket, &mut records)
        .await;

    assert_eq!(records.len(), 1);
    assert!(matches!(report.end, CrawlEnd::Revisited { .. }));
}

#[tokio::test]
async fn test_book_buckets_end_to_end() {
    let server = MockServer::start().await;
    let site = site_for(&server);

    Mock::given(method("GET"))
        .and(path("/people/alice/collect"))
        .and(query_param("start", "15"))
        .respond_with(html(book_page(&[("30", "活着")], None)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/people/alice/collect"))
        .and(query_param("start", "0"))
        .respond_with(html(book_page(
            &[("10", "三体"), ("20", "围城")],
            Some("/people/alice/collect?start=15&type=book"),
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/people/alice/wish"))
        .respond_with(html(book_page(&[("40", "红楼梦")], None)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/people/alice/reading"))
        .respond_with(html(book_page(&[], None)))
        .mount(&server)
        .await;

    let client = client_for(&site);
    let engine = CrawlEngine::new(&client, fast_policy(2));
    let orchestrator = Orchestrator::new(engine, &site);

    let buckets = orchestrator
        .crawl_all(MediaType::Book, "alice")
        .await
        .expect("book crawl failed");

    let keys: Vec<&str> = buckets.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["wish", "collect", "reading"]);

    let collected: Vec<&str> = buckets["collect"].iter().map(|r| r.title.as_str()).collect();
    assert_eq!(collected, vec!["三体", "围城", "活着"]);
    assert_eq!(buckets["collect"][0].collection_label, "已读");
    assert_eq!(
        buckets["collect"][0].author.as_deref(),
        Some("某作者 / 某出版社")
    );
    assert_eq!(buckets["wish"][0].external_id, "40");
    assert_eq!(buckets["wish"][0].collection_label, "想读");
    assert!(buckets["reading"].is_empty());
}

#[tokio::test]
async fn test_backup_fills_export_keys() {
    let server = MockServer::start().await;
    let site = site_for(&server);

    Mock::given(method("GET"))
        .and(path("/people/alice/collect"))
        .respond_with(html(movie_page(&[("1", "A")], None)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(html(movie_page(&[], None)))
        .mount(&server)
        .await;

    let client = client_for(&site);
    let engine = CrawlEngine::new(&client, fast_policy(1));
    let orchestrator = Orchestrator::new(engine, &site);

    let mut data = BackupData::new();
    orchestrator
        .backup(&[MediaType::Movie], "alice", &mut data)
        .await
        .expect("backup failed");

    assert_eq!(data.len(), 1);
    let movies = &data["movies"];
    assert_eq!(movies.len(), 3);
    assert_eq!(movies["collect"].len(), 1);
    assert!(movies["wish"].is_empty());
    assert!(movies["do"].is_empty());
}

#[tokio::test]
async fn test_game_pagination_resolves_query_links() {
    let server = MockServer::start().await;
    let site = site_for(&server);
    let strategy = strategy_for(MediaType::Game, &site, "alice").unwrap();

    let page = scraper::Html::parse_document(
        r#"<div class="paginator"><span class="next"><a href="?action=collect&amp;start=15">后页</a></span></div>"#,
    );
    let next = strategy.next_page_url(&page).unwrap();
    assert_eq!(
        next.as_str(),
        format!("{}/people/alice/games?action=collect&start=15", server.uri())
    );
}

#[tokio::test]
async fn test_dropped_backup_keeps_collected_records() {
    let server = MockServer::start().await;
    let site = site_for(&server);

    // Page two hangs long past the point where the backup is abandoned
    Mock::given(method("GET"))
        .and(path("/people/alice/wish"))
        .and(query_param("start", "15"))
        .respond_with(html(movie_page(&[("3", "C")], None)).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/people/alice/wish"))
        .respond_with(html(movie_page(
            &[("1", "A"), ("2", "B")],
            Some("/people/alice/wish?start=15"),
        )))
        .mount(&server)
        .await;

    let client = client_for(&site);
    let engine = CrawlEngine::new(&client, fast_policy(1));
    let orchestrator = Orchestrator::new(engine, &site);

    let mut data = BackupData::new();
    let outcome = tokio::time::timeout(
        Duration::from_millis(500),
        orchestrator.backup(&[MediaType::Movie], "alice", &mut data),
    )
    .await;

    assert!(outcome.is_err(), "backup should still be waiting on page two");
    let titles: Vec<&str> = data["movies"]["wish"]
        .iter()
        .map(|r| r.title.as_str())
        .collect();
    assert_eq!(titles, vec!["A", "B"]);
}

#[tokio::test]
async fn test_login_redirect_stops_crawl() {
    let server = MockServer::start().await;
    let site = site_for(&server);

    Mock::given(method("GET"))
        .and(path("/people/alice/collect"))
        .and(query_param("start", "15"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "/accounts/login?source=movie"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/accounts/login"))
        .respond_with(html("<form></form>".to_string()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/people/alice/collect"))
        .respond_with(html(movie_page(
            &[("1", "A")],
            Some("/people/alice/collect?start=15"),
        )))
        .mount(&server)
        .await;

    let client = client_for(&site);
    let engine = CrawlEngine::new(&client, fast_policy(1));
    let strategy = MovieStrategy::new(url::Url::parse(&server.uri()).unwrap());
    let bucket = MediaType::Movie.bucket("collect").unwrap();
    let start = start_url(&site, MediaType::Movie, "alice", bucket).unwrap();

    let mut records = Vec::new();
    let report = engine
        .crawl_into(start, &strategy, bucket, &mut records)
        .await;

    assert_eq!(records.len(), 1);
    assert_eq!(report.pages, 1);
    match report.end {
        CrawlEnd::LoginRedirect { url } => assert_eq!(url.path(), "/accounts/login"),
        other => panic!("unexpected end: {:?}", other),
    }
}

#[tokio::test]
async fn test_public_backup_without_sign_in() {
    let server = MockServer::start().await;
    let config = Config {
        site: site_for(&server),
        crawler: CrawlerConfig {
            request_delay_ms: 0,
            retry_backoff_ms: 0,
            max_retries: 1,
            request_timeout_secs: 5,
        },
        backup: BackupSelection {
            movies: true,
            books: true,
            music: false,
            games: false,
        },
        ..Config::default()
    };

    // No cookies are sent and no sign-in page is touched
    Mock::given(header_exists("cookie"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    for login_path in ["/mine/", "/people/", "/accounts/login"] {
        Mock::given(path(login_path))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/people/bob/collect"))
        .and(query_param("type", "book"))
        .respond_with(html(book_page(&[("10", "三体")], None)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/people/bob/collect"))
        .respond_with(html(movie_page(&[("1", "A"), ("2", "B")], None)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(html(movie_page(&[], None)))
        .mount(&server)
        .await;

    let mut data = BackupData::new();
    backup_public(&config, "bob", &mut data)
        .await
        .expect("public backup failed");

    let media: Vec<&str> = data.keys().map(String::as_str).collect();
    assert_eq!(media, vec!["movies", "books"]);
    assert_eq!(data["movies"]["collect"].len(), 2);
    assert!(data["movies"]["wish"].is_empty());
    assert_eq!(data["books"]["collect"][0].title, "三体");
    assert_eq!(data["books"]["collect"][0].collection_label, "已读");
}
