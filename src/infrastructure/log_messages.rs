//! Log message constants for infrastructure components
//!
//! Messages emitted from more than one place, or during startup and
//! shutdown, live here so their wording stays consistent.

/// Application startup and lifecycle messages
pub mod application {
    pub const STARTING: &str = "Starting parcel proxy";
    pub const LISTENING: &str = "Parcel proxy listening";
    pub const SHUTDOWN_SIGNAL: &str = "Shutdown signal received";
    pub const STOPPED: &str = "Parcel proxy stopped";
}

/// Cache backend messages
pub mod database {
    pub const SCHEMA_READY: &str = "Cache table ready";
    pub const HEALTH_CHECK_FAILED: &str = "Database health check failed";
    pub const USING_POSTGRES: &str = "Using Postgres cache backend";
    pub const USING_MEMORY: &str = "Using in-memory cache backend";
}
