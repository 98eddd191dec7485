//! Geospatial pipeline: WFS queries, GML parsing and distance ranking
//!
//! Upstream traffic is delegated to [`crate::proxy::ProxyService`]; this
//! module only builds provider URLs and post-processes their payloads.

pub mod handlers;
pub mod parser;
pub mod query;
pub mod ranking;
pub mod service;

pub use parser::{FeatureParser, ParseError};
pub use query::SpatialQuery;
pub use service::{NearbyBrokers, NearbyResult, SpatialOutcome, SpatialService};
