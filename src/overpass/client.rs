//! Overpass HTTP client.

use std::future::Future;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use super::response::{self, RawRecord};
use crate::error::{DetectiveError, Result};
use crate::models::GeoArea;

pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_USER_AGENT: &str = concat!("place-detective/", env!("CARGO_PKG_VERSION"));

/// Maximum characters of an error body kept in diagnostics
const ERROR_BODY_PREVIEW: usize = 200;

/// A single network round-trip for one query.
///
/// Implementations make exactly one attempt per call; retrying is the
/// caller's decision.
pub trait FetchClient: Send + Sync {
    fn fetch(
        &self,
        query: &str,
        area: &GeoArea,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<RawRecord>>> + Send;
}

/// Fetches raw records from an Overpass API interpreter endpoint
#[derive(Clone)]
pub struct OverpassClient {
    client: Client,
    endpoint: Url,
}

impl OverpassClient {
    pub fn new(endpoint: &str, user_agent: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            DetectiveError::Config(format!("invalid Overpass endpoint '{}': {}", endpoint, e))
        })?;
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| DetectiveError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl FetchClient for OverpassClient {
    async fn fetch(&self, query: &str, area: &GeoArea, timeout: Duration) -> Result<Vec<RawRecord>> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("data", query)
            .finish();

        debug!("POST {} for area {}", self.endpoint, area);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| DetectiveError::Network {
                area: *area,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let preview: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(ERROR_BODY_PREVIEW)
                .collect();
            let message = format!("HTTP {}: {}", status, preview.trim());

            // Overpass answers 429 when the slot quota is exhausted and 504
            // when it is overloaded; both clear up on their own.
            return Err(if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                DetectiveError::Network {
                    area: *area,
                    message,
                }
            } else {
                DetectiveError::Service {
                    area: *area,
                    message,
                }
            });
        }

        let bytes = response.bytes().await.map_err(|e| DetectiveError::Network {
            area: *area,
            message: format!("failed to read response body: {}", e),
        })?;

        response::parse(&bytes, area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const NODE_BODY: &str = r#"{"version":0.6,"elements":[
        {"type":"node","id":42,"lat":13.74,"lon":100.53,"tags":{"name":"Starbucks"}}
    ]}"#;

    fn area() -> GeoArea {
        GeoArea::new(13.5, 100.1, 14.2, 100.9).unwrap()
    }

    /// Read one request, headers and form body, off the socket.
    async fn read_request(socket: &mut TcpStream) {
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&request);
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let body_len = text[..header_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= header_end + 4 + body_len {
                return;
            }
        }
    }

    /// Serve a single canned HTTP response and return the endpoint URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}/api/interpreter", addr)
    }

    async fn fetch_from(endpoint: &str) -> Result<Vec<RawRecord>> {
        OverpassClient::new(endpoint, DEFAULT_USER_AGENT)
            .unwrap()
            .fetch("[out:json];node(1);out;", &area(), Duration::from_secs(5))
            .await
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        assert!(matches!(
            OverpassClient::new("not a url", DEFAULT_USER_AGENT),
            Err(DetectiveError::Config(_))
        ));
    }

    #[test]
    fn test_accepts_default_endpoint() {
        let client = OverpassClient::new(DEFAULT_ENDPOINT, DEFAULT_USER_AGENT).unwrap();
        assert_eq!(client.endpoint().host_str(), Some("overpass-api.de"));
    }

    #[tokio::test]
    async fn test_overloaded_server_is_transient() {
        let endpoint = serve_once("503 Service Unavailable", "overloaded").await;
        let err = fetch_from(&endpoint).await.unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let endpoint = serve_once("429 Too Many Requests", "slow down").await;
        let err = fetch_from(&endpoint).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_bad_request_is_a_service_error() {
        let endpoint = serve_once("400 Bad Request", "parse error: line 1").await;
        let err = fetch_from(&endpoint).await.unwrap_err();
        assert!(!err.is_transient());
        match err {
            DetectiveError::Service { message, .. } => {
                assert_eq!(message, "HTTP 400 Bad Request: parse error: line 1");
            }
            other => panic!("expected a service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_html_body_is_malformed() {
        let endpoint = serve_once("200 OK", "<html><body>busy</body></html>").await;
        let err = fetch_from(&endpoint).await.unwrap_err();
        assert!(!err.is_transient());
        assert!(
            matches!(&err, DetectiveError::Service { message, .. } if message.contains("malformed Overpass response"))
        );
    }

    #[tokio::test]
    async fn test_elements_are_returned() {
        let endpoint = serve_once("200 OK", NODE_BODY).await;
        let records = fetch_from(&endpoint).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 42);
    }

    #[tokio::test]
    async fn test_refused_connection_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/api/interpreter", listener.local_addr().unwrap());
        drop(listener);

        let err = fetch_from(&endpoint).await.unwrap_err();
        assert!(matches!(err, DetectiveError::Network { .. }));
        assert!(err.is_transient());
    }
}
