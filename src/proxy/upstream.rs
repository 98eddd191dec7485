//! Outbound calls to the public data providers
//!
//! The fetcher performs one GET per call, under a hard timeout that covers
//! both the response head and the body. Non-2xx statuses are returned as-is;
//! only transport failures and timeouts are errors.

use crate::proxy::types::{ProxyError, ProxyResult, UpstreamResponse};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// One outbound GET with a deadline
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> ProxyResult<UpstreamResponse>;
}

/// Percent-encode literal `+` in the query so it reaches the provider as a plus.
///
/// Some providers issue base64 API keys containing `+`, which would otherwise
/// be read as a space on the far side. Only the query portion is touched.
pub fn encode_plus_in_query(url: &str) -> String {
    match url.split_once('?') {
        Some((base, query)) => format!("{base}?{}", query.replace('+', "%2B")),
        None => url.to_string(),
    }
}

/// [`UpstreamFetcher`] backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> ProxyResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProxyError::Internal(format!("HTTP client setup failed: {e}")))?;

        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(&self, url: &str) -> Result<UpstreamResponse, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl UpstreamFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> ProxyResult<UpstreamResponse> {
        let url = encode_plus_in_query(url);

        let response = tokio::time::timeout(timeout, self.send(&url))
            .await
            .map_err(|_| ProxyError::UpstreamTimeout(timeout))?
            .map_err(|e| {
                if e.is_timeout() {
                    ProxyError::UpstreamTimeout(timeout)
                } else {
                    ProxyError::Network(e.to_string())
                }
            })?;

        debug!(
            status = response.status,
            body_size = response.body.len(),
            "Upstream responded"
        );

        Ok(response)
    }
}
