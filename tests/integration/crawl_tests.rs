//! Integration tests for the crawler
//!
//! These tests use wiremock to serve listing and detail pages and run the
//! full discover → fetch → persist cycle against a temporary store.

use chrono::{Local, NaiveDate};
use furlong::config::{
    Config, CrawlerConfig, OutputConfig, SourceConfig, StorageBackend, UserAgentConfig,
};
use furlong::crawler::{
    build_http_client, run_crawl, Coordinator, HttpRaceSource, RateLimiter, StopSignal,
    RESULT_COLUMNS,
};
use furlong::output::flatten_records;
use furlong::race::RaceId;
use furlong::storage::{open_store, JsonDirStore, RecordStore, SqliteStore};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

// "テスト" in EUC-JP
const TESUTO_EUC_JP: &[u8] = &[0xA5, 0xC6, 0xA5, 0xB9, 0xA5, 0xC8];

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, data_dir: &Path, backend: StorageBackend) -> Config {
    Config {
        crawler: CrawlerConfig {
            days: 1,
            delay_ms: 10, // Very short for testing
            request_timeout_secs: 5,
            connect_timeout_secs: 5,
        },
        source: SourceConfig {
            base_url: base_url.to_string(),
            encoding: "EUC-JP".to_string(),
        },
        user_agent: user_agent(),
        output: OutputConfig {
            backend,
            data_dir: data_dir.join("racedata"),
            database_path: data_dir.join("racedata.db"),
        },
    }
}

fn http_source(base_url: &str) -> HttpRaceSource {
    let config = create_test_config(base_url, Path::new("/unused"), StorageBackend::Json);
    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
    HttpRaceSource::new(client, &config.source).unwrap()
}

fn jan_1() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn id(s: &str) -> RaceId {
    RaceId::parse(s).unwrap()
}

fn listing_page(race_ids: &[&str]) -> String {
    let links: String = race_ids
        .iter()
        .map(|id| format!(r#"<dl><dt><a href="/race/{}/">R</a></dt></dl>"#, id))
        .collect();
    format!(
        r#"<html><body><div class="race_list">{}<a href="/race/list/20231231/">prev</a></div></body></html>"#,
        links
    )
}

/// Detail page in EUC-JP: a header row plus one row per rank, horse names "テスト"
fn detail_page(ranks: &[&str]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        br#"<html><body><table class="race_table_01 nk_tb_common"><tr><th>rank</th><th>frame</th></tr>"#,
    );

    for rank in ranks {
        body.extend_from_slice(b"<tr>");
        for col in 0..RESULT_COLUMNS {
            body.extend_from_slice(b"<td>");
            match col {
                0 => body.extend_from_slice(rank.as_bytes()),
                3 => {
                    body.extend_from_slice(b"<a href=\"/horse/1/\">");
                    body.extend_from_slice(TESUTO_EUC_JP);
                    body.extend_from_slice(b"</a>");
                }
                18 => body.extend_from_slice(b" <a href=\"/trainer/1/\">Trainer</a> "),
                19 => body.extend_from_slice(b"<a href=\"/owner/1/\">Owner</a>"),
                _ => body.extend_from_slice(format!(" v{} ", col).as_bytes()),
            }
            body.extend_from_slice(b"</td>");
        }
        body.extend_from_slice(b"</tr>");
    }

    body.extend_from_slice(b"</table></body></html>");
    body
}

async fn mount_listing(server: &MockServer, date: &str, race_ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/race/list/{}/", date)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(race_ids))
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, race_id: &str, body: Vec<u8>, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/race/{}/", race_id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("content-type", "text/html"),
        )
        .expect(expected_hits)
        .mount(server)
        .await;
}

fn coordinator(
    server: &MockServer,
    store: JsonDirStore,
) -> Coordinator<HttpRaceSource, RateLimiter, JsonDirStore> {
    Coordinator::new(
        http_source(&server.uri()),
        RateLimiter::new(Duration::from_millis(10)),
        store,
        1,
        StopSignal::new(),
    )
}

#[tokio::test]
async fn test_full_crawl_single_day() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    mount_listing(&server, "20240101", &["202401010101", "202401010102", "202401010101"]).await;
    mount_detail(&server, "202401010101", detail_page(&["1", "2"]), 1).await;
    mount_detail(&server, "202401010102", detail_page(&["1", "2", "3"]), 1).await;

    let mut c = coordinator(&server, JsonDirStore::new(tmp.path()));
    let report = c.run(jan_1()).await;

    assert_eq!(report.saved(), 2);
    // The duplicate link is dropped by the listing parser, not skipped later
    assert_eq!(report.races.len(), 2);

    let store = JsonDirStore::new(tmp.path());
    let record = store.load(&id("202401010101")).unwrap();
    assert_eq!(record.len(), 2);
    assert_eq!(record[0].rank, "1");
    assert_eq!(record[0].horse_name, "テスト");
    assert_eq!(record[0].trainer, "Trainer");
    assert_eq!(record[0].owner, "Owner");
    assert_eq!(record[0].prize_money, "v20");
    assert_eq!(store.load(&id("202401010102")).unwrap().len(), 3);
}

#[tokio::test]
async fn test_second_run_fetches_nothing_new() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    mount_listing(&server, "20240101", &["202401010101", "202401010102"]).await;
    // Each detail page may be requested exactly once across both runs
    mount_detail(&server, "202401010101", detail_page(&["1"]), 1).await;
    mount_detail(&server, "202401010102", detail_page(&["1"]), 1).await;

    let first = coordinator(&server, JsonDirStore::new(tmp.path())).run(jan_1()).await;
    assert_eq!(first.saved(), 2);

    let second = coordinator(&server, JsonDirStore::new(tmp.path())).run(jan_1()).await;
    assert_eq!(second.saved(), 0);
    assert_eq!(second.skipped(), 2);
    assert_eq!(second.fetched(), 0);

    // Wiremock verifies the expected hit counts when the server drops
}

#[tokio::test]
async fn test_day_without_listing_fetches_nothing() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/race/list/20240101/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/race/[0-9]{12}/$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut c = coordinator(&server, JsonDirStore::new(tmp.path().join("racedata")));
    let report = c.run(jan_1()).await;

    assert_eq!(report.days.len(), 1);
    assert_eq!(report.fetched(), 0);
    assert_eq!(report.failed_days(), 0);
    assert!(!tmp.path().join("racedata").exists());
}

#[tokio::test]
async fn test_race_without_results_stays_eligible() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    mount_listing(&server, "20240101", &["202401010101"]).await;
    mount_detail(
        &server,
        "202401010101",
        b"<html><body><p>not run yet</p></body></html>".to_vec(),
        2,
    )
    .await;

    let store = JsonDirStore::new(tmp.path());
    let first = coordinator(&server, store.clone()).run(jan_1()).await;
    assert_eq!(first.empty(), 1);
    assert!(!store.unit_path(&id("202401010101")).exists());

    let second = coordinator(&server, store).run(jan_1()).await;
    assert_eq!(second.empty(), 1);
}

#[tokio::test]
async fn test_detail_server_error_is_recorded_and_run_continues() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    mount_listing(&server, "20240101", &["202401010101", "202401010102"]).await;
    Mock::given(method("GET"))
        .and(path("/race/202401010101/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_detail(&server, "202401010102", detail_page(&["1"]), 1).await;

    let mut c = coordinator(&server, JsonDirStore::new(tmp.path()));
    let report = c.run(jan_1()).await;

    assert_eq!(report.fetch_failures(), 1);
    assert_eq!(report.saved(), 1);
    assert!(!c.known().contains(&id("202401010101")));
}

#[tokio::test]
async fn test_run_crawl_from_config_with_sqlite_backend() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    // run_crawl starts at the local date, so accept any listing date
    Mock::given(method("GET"))
        .and(path_regex(r"^/race/list/[0-9]{8}/$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&["202401010101"]))
                .insert_header("content-type", "text/html; charset=EUC-JP"),
        )
        .mount(&server)
        .await;
    mount_detail(&server, "202401010101", detail_page(&["1", "2"]), 1).await;

    let config = create_test_config(&server.uri(), tmp.path(), StorageBackend::Sqlite);
    let report = run_crawl(&config, StopSignal::new()).await.unwrap();

    assert_eq!(report.saved(), 1);
    assert_eq!(report.days[0].date.date(), Local::now().date_naive());

    let store = SqliteStore::new(&config.output.database_path).unwrap();
    let flat = flatten_records(&store).unwrap();
    assert_eq!(flat.len(), 2);
    assert!(flat.iter().all(|f| f.race_id == id("202401010101")));
    assert_eq!(flat[1].result.rank, "2");
    assert_eq!(flat[0].result.horse_name, "テスト");
}

#[tokio::test]
async fn test_stop_signal_ends_run_early() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    mount_listing(&server, "20240101", &["202401010101"]).await;
    mount_detail(&server, "202401010101", detail_page(&["1"]), 0).await;

    let config = create_test_config(&server.uri(), tmp.path(), StorageBackend::Json);
    let stop = StopSignal::new();
    let mut c = Coordinator::new(
        http_source(&server.uri()),
        RateLimiter::new(Duration::from_secs(60)),
        open_store(&config.output).unwrap(),
        1,
        stop.clone(),
    );

    let trigger = stop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.stop();
    });

    let started = std::time::Instant::now();
    let report = c.run(jan_1()).await;

    assert!(report.stopped);
    assert_eq!(report.fetched(), 0);
    assert!(started.elapsed() < Duration::from_secs(30));
}
