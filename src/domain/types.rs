//! Validated value types shared across the proxy and spatial pipeline
//!
//! These newtypes keep configuration and request values from being passed
//! around as bare primitives, and validate them once at the boundary.

use nutype::nutype;
use std::time::Duration;

/// Maximum age of a cache entry, in hours
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct CacheTtlHours(u64);

impl CacheTtlHours {
    /// TTL as a `chrono::Duration` for age comparisons against stored timestamps
    pub fn as_chrono(&self) -> chrono::Duration {
        i64::try_from(self.into_inner())
            .ok()
            .and_then(chrono::Duration::try_hours)
            .unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for CacheTtlHours {
    fn default() -> Self {
        Self::try_new(24).expect("24 hours is a valid TTL")
    }
}

/// Outbound call timeout in milliseconds
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct TimeoutMillis(u64);

impl TimeoutMillis {
    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.into_inner())
    }
}

/// Search radius around a center point, in meters
#[nutype(
    validate(finite, greater = 0.0),
    derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, AsRef, Display)
)]
pub struct RadiusMeters(f64);

/// Stable, secret-free lookup key for the response cache
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 512),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct CacheKey(String);

/// Maximum number of features to return from a ranking request
#[nutype(
    validate(greater = 0, less_or_equal = 1000),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct FeatureLimit(usize);
