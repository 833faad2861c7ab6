use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::models::{Method, Request, Response};

use super::NetError;

/// HTTP request timeout in seconds.
/// 30s allows for slow responses while failing fast enough to reach the
/// cache fallback in reasonable time.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// The network fetch subsystem as seen by the worker.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, NetError>;
}

/// Real network backend over reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNetwork {
    /// Create a network backend. `base_url` is prepended to path-only URLs
    /// such as the core asset list entries (`/`, `/static/index.html`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, NetError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn absolute_url(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.base_url.trim_end_matches('/'), url)
        } else {
            url.to_string()
        }
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Patch => reqwest::Method::PATCH,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetError> {
        let url = self.absolute_url(request.url());
        debug!(method = request.method().as_str(), url = %url, "fetching from network");

        let mut builder = self.client.request(reqwest_method(request.method()), &url);
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }

        let timeout = Duration::from_secs(REQUEST_TIMEOUT_SECS);
        let response = builder
            .send()
            .await
            .map_err(|e| NetError::from_reqwest(e, timeout))?;

        let status = response.status().as_u16();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_string(), v.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| NetError::from_reqwest(e, timeout))?;

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_url_joins_paths() {
        let net = HttpNetwork::new("http://localhost:5000/").unwrap();
        assert_eq!(
            net.absolute_url("/static/offline.html"),
            "http://localhost:5000/static/offline.html"
        );
    }

    #[test]
    fn test_absolute_url_leaves_full_urls_alone() {
        let net = HttpNetwork::new("http://localhost:5000").unwrap();
        assert_eq!(
            net.absolute_url("https://example.com/a.png"),
            "https://example.com/a.png"
        );
    }
}
