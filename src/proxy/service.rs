//! Main proxy service implementation
//!
//! The `ProxyService` runs one request through the guard, the cache and the
//! upstream fetcher:
//!
//! ```text
//! START -> GUARD -> (CACHE_LOOKUP if cacheable else FETCH)
//!       -> [HIT -> RESPOND] | [MISS -> FETCH -> STORE(async) -> RESPOND]
//! ```
//!
//! Nothing is retried. A rejected host never reaches the cache or the network.
//!
//! ## Service Lifecycle
//!
//! ```rust,ignore
//! let (writer, handle, shutdown_tx) = CacheWriter::new(store.clone(), 256, None);
//! tokio::spawn(writer.run());
//!
//! let proxy = Arc::new(ProxyService::new(&settings.proxy, cache, handle, fetcher));
//! let spatial = Arc::new(SpatialService::new(proxy.clone(), settings.spatial.clone()));
//! let router = into_router(proxy, spatial);
//! axum::serve(listener, router).await?;
//! ```

use crate::config::ProxySettings;
use crate::proxy::allowlist::DomainAllowlist;
use crate::proxy::cache::TtlCache;
use crate::proxy::cache_key::{redact, CacheKeyNormalizer, CachePolicy};
use crate::proxy::cache_writer::CacheWriteHandle;
use crate::proxy::error_response::ErrorResponseExt;
use crate::proxy::headers::{paths, X_CACHE};
use crate::proxy::middleware_stack::ProxyMiddlewareStack;
use crate::proxy::types::*;
use crate::proxy::upstream::UpstreamFetcher;
use crate::spatial::{handlers as spatial_handlers, SpatialService};
use axum::{
    body::Body,
    extract::{FromRef, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

/// Guarded, caching forwarder for allowlisted public data APIs
pub struct ProxyService {
    allowlist: DomainAllowlist,
    policy: CachePolicy,
    normalizer: CacheKeyNormalizer,
    redacted_params: Vec<String>,
    cache: TtlCache,
    writer: CacheWriteHandle,
    fetcher: Arc<dyn UpstreamFetcher>,
    cached_timeout: Duration,
    uncached_timeout: Duration,
}

impl ProxyService {
    pub fn new(
        settings: &ProxySettings,
        cache: TtlCache,
        writer: CacheWriteHandle,
        fetcher: Arc<dyn UpstreamFetcher>,
    ) -> Self {
        Self {
            allowlist: DomainAllowlist::new(&settings.allowed_domains),
            policy: CachePolicy::new(
                &settings.cacheable_hosts,
                &settings.cacheable_path_prefixes,
            ),
            normalizer: CacheKeyNormalizer::new(settings.secret_param.clone()),
            redacted_params: std::iter::once(settings.secret_param.clone())
                .chain(settings.redacted_params.iter().cloned())
                .collect(),
            cache,
            writer,
            fetcher,
            cached_timeout: settings.cached_timeout_ms.as_duration(),
            uncached_timeout: settings.uncached_timeout_ms.as_duration(),
        }
    }

    /// Forward one target URL, serving from cache where the target allows it
    #[instrument(skip_all)]
    pub async fn handle(&self, target: Option<&str>) -> ProxyResult<ProxyOutcome> {
        let raw = target
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ProxyError::MissingTargetUrl)?;

        let url = Url::parse(raw).map_err(|e| ProxyError::InvalidTargetUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProxyError::InvalidTargetUrl(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ProxyError::InvalidTargetUrl("missing host".to_string()))?;

        if !self.allowlist.is_allowed(host) {
            warn!(host = %host, "Rejected target outside the domain allowlist");
            return Err(ProxyError::DomainNotAllowed {
                host: host.to_string(),
            });
        }

        let target_log = self.redact(&url);

        if self.policy.is_cacheable(&url) {
            if let Some(key) = self.normalizer.normalize_url(&url) {
                if let Some(entry) = self.cache.get(&key).await {
                    info!(target = %target_log, cache_key = %key, "Cache hit");
                    return Ok(ProxyOutcome {
                        response: entry.response,
                        cache_status: Some(CacheStatus::Hit),
                    });
                }

                info!(target = %target_log, cache_key = %key, "Cache miss, fetching upstream");
                let response = self.fetcher.fetch(url.as_str(), self.cached_timeout).await?;

                if response.is_success() {
                    self.writer.enqueue(CacheEntry {
                        key: key.into_inner(),
                        response: response.clone(),
                        cached_at: Utc::now(),
                    });
                }

                return Ok(ProxyOutcome {
                    response,
                    cache_status: Some(CacheStatus::Miss),
                });
            }
        }

        info!(target = %target_log, "Fetching uncached target");
        let response = self
            .fetcher
            .fetch(url.as_str(), self.uncached_timeout)
            .await?;

        Ok(ProxyOutcome {
            response,
            cache_status: None,
        })
    }

    /// Log-safe rendering of a target URL
    pub fn redact(&self, url: &Url) -> String {
        redact(url, &self.redacted_params)
    }
}

/// Shared state behind every route
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ProxyService>,
    pub spatial: Arc<SpatialService>,
}

impl FromRef<AppState> for Arc<ProxyService> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.proxy)
    }
}

impl FromRef<AppState> for Arc<SpatialService> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.spatial)
    }
}

/// Build the full HTTP surface with its middleware stack
pub fn into_router(proxy: Arc<ProxyService>, spatial: Arc<SpatialService>) -> Router {
    let router = Router::new()
        .route(paths::HEALTH, get(health_handler))
        .route(paths::PROXY, get(proxy_handler))
        .route(paths::SPATIAL, get(spatial_handlers::spatial_handler))
        .route(
            paths::BROKERS_NEARBY,
            get(spatial_handlers::brokers_nearby_handler),
        )
        .route(paths::PNU, get(spatial_handlers::pnu_handler))
        .with_state(AppState { proxy, spatial });

    ProxyMiddlewareStack::new().apply_to_router(router)
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

/// Axum handler for the generic proxy endpoint
async fn proxy_handler(
    State(proxy): State<Arc<ProxyService>>,
    Query(query): Query<ProxyQuery>,
    headers: HeaderMap,
) -> Response {
    match proxy.handle(query.url.as_deref()).await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => e.into_response_for(&headers),
    }
}

/// Render an upstream answer verbatim, adding `x-cache` when the cache was consulted
pub fn outcome_response(outcome: ProxyOutcome) -> Response {
    let mut response = upstream_response(outcome.response);

    if let Some(status) = outcome.cache_status {
        if let Ok(value) = HeaderValue::from_str(&status.to_string()) {
            response.headers_mut().insert(X_CACHE, value);
        }
    }

    response
}

/// Status, content type and body of an upstream response, unchanged
pub fn upstream_response(upstream: UpstreamResponse) -> Response {
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = (status, Body::from(upstream.body)).into_response();

    if let Some(value) = upstream
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
    {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }

    response
}

/// Health check handler
async fn health_handler() -> &'static str {
    "OK"
}
