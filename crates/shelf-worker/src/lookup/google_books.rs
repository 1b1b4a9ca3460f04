//! Google Books volumes client
//!
//! Issues `GET {base_url}/books/v1/volumes?q={title}` and returns the
//! `volumeInfo` of every item in the order the service ranked them.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{LookupError, MetadataLookup};
use crate::models::VolumeInfo;

// ============================================================================
// Client Constants
// ============================================================================

/// Default Books API base URL.
pub const DEFAULT_BOOKS_API_URL: &str = "https://www.googleapis.com";

/// Default request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

const VOLUMES_PATH: &str = "/books/v1/volumes";

#[derive(Debug, Clone)]
pub struct GoogleBooksConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for GoogleBooksConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BOOKS_API_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    #[serde(default)]
    volume_info: VolumeInfo,
}

pub struct GoogleBooksClient {
    client: Client,
    volumes_url: String,
    api_key: Option<String>,
}

impl GoogleBooksClient {
    pub fn new(config: &GoogleBooksConfig) -> Result<Self, LookupError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            volumes_url: format!("{}{}", config.base_url.trim_end_matches('/'), VOLUMES_PATH),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl MetadataLookup for GoogleBooksClient {
    async fn lookup(&self, title: &str) -> Result<Vec<VolumeInfo>, LookupError> {
        let mut request = self.client.get(&self.volumes_url).query(&[("q", title)]);
        if let Some(ref key) = self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let volumes: VolumesResponse = response.json().await?;
        debug!(title, candidates = volumes.items.len(), "Metadata lookup finished");

        Ok(volumes.items.into_iter().map(|v| v.volume_info).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> GoogleBooksClient {
        GoogleBooksClient::new(&GoogleBooksConfig {
            base_url: format!("{}/", server.uri()),
            api_key: api_key.map(str::to_string),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_lookup_returns_candidates_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/books/v1/volumes"))
            .and(query_param("q", "the hobbit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "books#volumes",
                "totalItems": 2,
                "items": [
                    {"volumeInfo": {
                        "title": "The Hobbit",
                        "authors": ["J. R. R. Tolkien"],
                        "publishedDate": "1937-09-21",
                        "imageLinks": {"thumbnail": "http://books.example/hobbit.jpg"}
                    }},
                    {"volumeInfo": {"title": "The Hobbit: Illustrated"}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let candidates = client_for(&server, None).lookup("the hobbit").await.unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "The Hobbit");
        assert_eq!(candidates[0].authors, vec!["J. R. R. Tolkien"]);
        assert_eq!(candidates[1].title, "The Hobbit: Illustrated");
    }

    #[tokio::test]
    async fn test_missing_items_means_no_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/books/v1/volumes"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"kind": "books#volumes", "totalItems": 0})),
            )
            .mount(&server)
            .await;

        let candidates = client_for(&server, None).lookup("zzzz").await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_api_key_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/books/v1/volumes"))
            .and(query_param("key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server, Some("secret")).lookup("emma").await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend down"))
            .mount(&server)
            .await;

        let err = client_for(&server, None).lookup("emma").await.unwrap_err();
        match err {
            LookupError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "backend down");
            },
            other => panic!("unexpected error: {other}"),
        }
    }
}
