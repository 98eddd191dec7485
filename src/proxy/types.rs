//! Type definitions for the proxy module

use bytes::Bytes;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Whether a response was served from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum CacheStatus {
    #[display("HIT")]
    Hit,
    #[display("MISS")]
    Miss,
}

/// What an upstream provider answered, passed through unchanged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Cached copy of a successful upstream response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub response: UpstreamResponse,
    pub cached_at: DateTime<Utc>,
}

/// Result of one pass through the proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyOutcome {
    pub response: UpstreamResponse,
    /// `None` when the target is outside the cacheable class
    pub cache_status: Option<CacheStatus>,
}

/// Errors that can occur in the proxy
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Missing target URL parameter")]
    MissingTargetUrl,

    #[error("Invalid target URL: {0}")]
    InvalidTargetUrl(String),

    #[error("Domain not allowed: {host}")]
    DomainNotAllowed { host: String },

    #[error("Upstream timeout after {0:?}")]
    UpstreamTimeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for proxy operations
pub type ProxyResult<T> = Result<T, ProxyError>;
