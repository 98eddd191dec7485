//! Caching reverse proxy for allowlisted public data APIs
//!
//! Requests flow through the allowlist guard, then either the TTL cache
//! (cacheable upstreams) or straight to the fetcher. Cache writes happen off
//! the request path on a background [`cache_writer::CacheWriter`].

pub mod allowlist;
pub mod cache;
pub mod cache_key;
pub mod cache_writer;
pub mod error_response;
pub mod headers;
pub mod middleware;
pub mod middleware_stack;
pub mod service;
pub mod types;
pub mod upstream;

#[cfg(test)]
pub mod test_utils;


pub use service::{into_router, AppState, ProxyService};
pub use types::{CacheStatus, ProxyError, ProxyResult};
