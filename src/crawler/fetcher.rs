//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the user agent string and timeouts
//! - GET requests for listing and detail pages
//! - Decoding legacy-encoded bodies
//! - Error classification

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::SourceError;
use reqwest::{Client, StatusCode};
use url::Url;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// HTTP status code
        status_code: u16,
        /// Decoded page body
        body: String,
    },

    /// The server answered 404
    NotFound,

    /// Any other non-success HTTP status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, body read failure)
    NetworkError {
        /// Error description
        error: String,
        /// Whether the request ran out of time
        timed_out: bool,
    },
}

impl FetchResult {
    /// Converts the result into the page body
    ///
    /// # Returns
    ///
    /// * `Ok(Some(body))` - The page was fetched
    /// * `Ok(None)` - The page does not exist
    /// * `Err(SourceError)` - Any other failure
    pub fn into_body(self, url: &Url) -> Result<Option<String>, SourceError> {
        match self {
            Self::Success { body, .. } => Ok(Some(body)),
            Self::NotFound => Ok(None),
            Self::HttpError { status_code } => Err(SourceError::Status {
                url: url.to_string(),
                status: status_code,
            }),
            Self::NetworkError { timed_out: true, .. } => Err(SourceError::Timeout {
                url: url.to_string(),
            }),
            Self::NetworkError { error, .. } => Err(SourceError::Network {
                url: url.to_string(),
                message: error,
            }),
        }
    }
}

/// Formats the User-Agent header value
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Supplies the request and connect timeouts
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use furlong::config::{CrawlerConfig, UserAgentConfig};
/// use furlong::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "Furlong".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(user_agent))
        .timeout(crawler.request_timeout())
        .connect_timeout(crawler.connect_timeout())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page and decodes its body
///
/// The charset declared in the response `Content-Type` wins; otherwise the
/// body is decoded as `default_encoding`.
///
/// | Condition | Result |
/// |-----------|--------|
/// | HTTP 2xx | Success |
/// | HTTP 404 | NotFound |
/// | Other HTTP status | HttpError |
/// | Timeout | NetworkError (timed_out) |
/// | Connection / body error | NetworkError |
pub async fn fetch_page(client: &Client, url: &Url, default_encoding: &str) -> FetchResult {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(e),
    };

    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return FetchResult::NotFound;
    }

    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    match response.text_with_charset(default_encoding).await {
        Ok(body) => FetchResult::Success {
            status_code: status.as_u16(),
            body,
        },
        Err(e) => classify_error(e),
    }
}

fn classify_error(e: reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::NetworkError {
            error: "Request timeout".to_string(),
            timed_out: true,
        }
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: format!("Connection failed: {}", e),
            timed_out: false,
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
            timed_out: false,
        }
    }
}
