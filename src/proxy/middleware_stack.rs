//! Middleware stack builder for clean composition

use crate::proxy::middleware::{logging_middleware, request_id_middleware};
use axum::{middleware::from_fn, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Builder for composing the proxy middleware stack
#[derive(Debug, Clone)]
pub struct ProxyMiddlewareStack {
    cors: bool,
}

impl Default for ProxyMiddlewareStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyMiddlewareStack {
    pub fn new() -> Self {
        Self { cors: true }
    }

    /// Skip the permissive CORS layer
    pub fn without_cors(mut self) -> Self {
        self.cors = false;
        self
    }

    /// Apply the complete middleware stack to a router
    ///
    /// Outer to inner:
    /// 1. CORS (answers preflights before anything else runs)
    /// 2. Request ID generation/propagation
    /// 3. HTTP tracing spans
    /// 4. Logging (with request ID)
    pub fn apply_to_router<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let router = router
            .layer(from_fn(logging_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(from_fn(request_id_middleware));

        if self.cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }
}
