//! Remote race source
//!
//! `RaceSource` is the seam between the coordinator and the network. The
//! HTTP implementation fetches the daily listing at `/race/list/<date>/` and
//! the detail page at `/race/<id>/`, both relative to the configured base URL.

use crate::config::{Config, SourceConfig};
use crate::crawler::fetcher::{build_http_client, fetch_page};
use crate::crawler::parser::{parse_race_ids, parse_race_record, RESULT_COLUMNS};
use crate::race::{DateKey, RaceId, RaceRecord};
use crate::SourceError;
use reqwest::Client;
use url::Url;

/// Provider of race listings and race records
pub trait RaceSource {
    /// Distinct race ids listed for `date`, in page order
    ///
    /// A date without a listing is `Ok` with no ids, not an error.
    async fn race_ids(&self, date: &DateKey) -> Result<Vec<RaceId>, SourceError>;

    /// Result rows of one race; empty if the page has no result table
    async fn race_record(&self, race_id: &RaceId) -> Result<RaceRecord, SourceError>;
}

/// `RaceSource` backed by HTTP GETs against the configured site
#[derive(Debug, Clone)]
pub struct HttpRaceSource {
    client: Client,
    base_url: Url,
    encoding: String,
}

impl HttpRaceSource {
    pub fn new(client: Client, config: &SourceConfig) -> Result<Self, SourceError> {
        let mut base_url = Url::parse(&config.base_url)?;

        // Page paths are joined relative to the base, so a path prefix must be a directory
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            encoding: config.encoding.clone(),
        })
    }

    /// Builds the HTTP client and source from a full configuration
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let client = build_http_client(&config.user_agent, &config.crawler)?;
        Ok(Self::new(client, &config.source)?)
    }

    pub fn listing_url(&self, date: &DateKey) -> Result<Url, SourceError> {
        Ok(self.base_url.join(&format!("race/list/{}/", date))?)
    }

    pub fn race_url(&self, race_id: &RaceId) -> Result<Url, SourceError> {
        Ok(self.base_url.join(&format!("race/{}/", race_id))?)
    }

    /// Listing lookup that never fails: errors are logged and yield no ids
    pub async fn resolve_race_ids(&self, date: &DateKey) -> Vec<RaceId> {
        self.race_ids(date).await.unwrap_or_else(|e| {
            tracing::warn!("Failed to fetch race ids for {}: {}", date, e);
            Vec::new()
        })
    }

    /// Detail lookup that never fails: errors are logged and yield no rows
    pub async fn fetch_race_record(&self, race_id: &RaceId) -> RaceRecord {
        self.race_record(race_id).await.unwrap_or_else(|e| {
            tracing::warn!("Failed to fetch race data for {}: {}", race_id, e);
            Vec::new()
        })
    }
}

impl RaceSource for HttpRaceSource {
    async fn race_ids(&self, date: &DateKey) -> Result<Vec<RaceId>, SourceError> {
        let url = self.listing_url(date)?;
        let Some(body) = fetch_page(&self.client, &url, &self.encoding)
            .await
            .into_body(&url)?
        else {
            tracing::debug!("No listing for {} (404)", date);
            return Ok(Vec::new());
        };

        Ok(parse_race_ids(&body))
    }

    async fn race_record(&self, race_id: &RaceId) -> Result<RaceRecord, SourceError> {
        let url = self.race_url(race_id)?;
        let Some(body) = fetch_page(&self.client, &url, &self.encoding)
            .await
            .into_body(&url)?
        else {
            // A missing detail page reads the same as a page with no table
            tracing::debug!("No detail page for {} (404)", race_id);
            return Ok(Vec::new());
        };

        parse_race_record(&body).map_err(|mismatch| SourceError::Layout {
            race_id: race_id.to_string(),
            row: mismatch.row,
            found: mismatch.found,
            expected: RESULT_COLUMNS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, UserAgentConfig};
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(base_url: &str) -> HttpRaceSource {
        let user_agent = UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        };
        let client = build_http_client(&user_agent, &CrawlerConfig::default()).unwrap();
        let config = SourceConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        HttpRaceSource::new(client, &config).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> DateKey {
        DateKey::new(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_url_templates() {
        let source = source("https://db.netkeiba.com");
        assert_eq!(
            source.listing_url(&date(2024, 1, 1)).unwrap().as_str(),
            "https://db.netkeiba.com/race/list/20240101/"
        );
        assert_eq!(
            source
                .race_url(&RaceId::parse("202401010101").unwrap())
                .unwrap()
                .as_str(),
            "https://db.netkeiba.com/race/202401010101/"
        );
    }

    #[test]
    fn test_url_templates_keep_base_path_prefix() {
        for base in [
            "https://mirror.example.com/netkeiba",
            "https://mirror.example.com/netkeiba/",
        ] {
            let source = source(base);
            assert_eq!(
                source.listing_url(&date(2024, 1, 1)).unwrap().as_str(),
                "https://mirror.example.com/netkeiba/race/list/20240101/"
            );
            assert_eq!(
                source
                    .race_url(&RaceId::parse("202401010101").unwrap())
                    .unwrap()
                    .as_str(),
                "https://mirror.example.com/netkeiba/race/202401010101/"
            );
        }
    }

    #[tokio::test]
    async fn test_missing_listing_is_empty_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/race/list/20240101/"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let ids = source(&server.uri()).race_ids(&date(2024, 1, 1)).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_listing_server_error_degrades_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let source = source(&server.uri());
        assert!(source.race_ids(&date(2024, 1, 1)).await.is_err());
        assert!(source.resolve_race_ids(&date(2024, 1, 1)).await.is_empty());
    }

    #[tokio::test]
    async fn test_layout_mismatch_degrades_to_empty_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/race/202401010101/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<table class="race_table_01"><tr><td>1</td><td>2</td></tr></table>"#,
            ))
            .mount(&server)
            .await;

        let source = source(&server.uri());
        let id = RaceId::parse("202401010101").unwrap();

        let err = source.race_record(&id).await.unwrap_err();
        assert!(matches!(
            err,
            SourceError::Layout {
                found: 2,
                expected: RESULT_COLUMNS,
                ..
            }
        ));
        assert!(source.fetch_race_record(&id).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_degrades_to_empty() {
        // Nothing listens on port 9 of localhost in the test environment
        let source = source("http://127.0.0.1:9");
        let id = RaceId::parse("202401010101").unwrap();

        assert!(source.race_record(&id).await.is_err());
        assert!(source.fetch_race_record(&id).await.is_empty());
    }
}
