//! HTTP header names and route paths used by the proxy service

/// Header name for request ID used for tracing and correlation
pub const X_REQUEST_ID: &str = "x-request-id";

/// Whether the response came from the cache (`HIT`) or upstream (`MISS`)
pub const X_CACHE: &str = "x-cache";

/// Set to `bbox` when a parcel query was retried with a bounding box
pub const X_SPATIAL_FALLBACK: &str = "x-spatial-fallback";

/// Well-known paths
pub mod paths {
    /// Health check endpoint path
    pub const HEALTH: &str = "/health";

    /// Generic allowlisted proxy
    pub const PROXY: &str = "/api/proxy";

    /// WFS query forwarded to the spatial provider
    pub const SPATIAL: &str = "/api/spatial";

    /// Ranked brokers around a point
    pub const BROKERS_NEARBY: &str = "/api/brokers/nearby";

    /// Parcel identifier encoder
    pub const PNU: &str = "/api/pnu";
}
