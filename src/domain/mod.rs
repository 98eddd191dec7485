//! Domain model for the spatial pipeline and the proxy
//!
//! Request-scoped value objects: points, bounding boxes, parcel identifiers,
//! parsed features and the validated configuration values they depend on.

pub mod feature;
pub mod geo;
pub mod parcel;
pub mod types;

pub use feature::{Feature, MISSING_FIELD};
pub use geo::{bbox, BBox, Coordinate, CrsKind, GeoPoint};
pub use parcel::{encode_pnu, LandSegment, ParcelId};
pub use types::{CacheKey, CacheTtlHours, FeatureLimit, RadiusMeters, TimeoutMillis};
