//! Parcel proxy - a caching reverse proxy for rate-limited public data APIs
//!
//! Requests for address, apartment and spatial data are guarded by a host
//! allowlist, answered from a TTL cache when possible, and otherwise fetched
//! upstream under a timeout. A geospatial pipeline on top turns WFS payloads
//! into distance-ranked features.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod proxy;
pub mod spatial;

pub use application::Application;
pub use error::{Error, Result};
