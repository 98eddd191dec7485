//! Points, coordinate systems and bounding boxes
//!
//! A [`Coordinate`] is either geographic (WGS84 degrees) or projected
//! (planar meters). The kind is decided once, when the point enters the
//! system, and distance computation dispatches on it.

use crate::domain::types::RadiusMeters;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used for WGS84 geographic coordinates
pub const WGS84: &str = "EPSG:4326";

/// Meters per degree of latitude used by the BBOX approximation
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Mean Earth radius used by the Haversine formula
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Horizontal magnitude above which an undeclared coordinate is taken as projected meters
pub const PROJECTED_MAGNITUDE_THRESHOLD: f64 = 1000.0;

/// A point as received from a caller or an upstream payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude, or easting for projected systems
    pub x: f64,
    /// Latitude, or northing for projected systems
    pub y: f64,
    /// Coordinate reference system label, e.g. `EPSG:4326`
    pub crs: String,
}

impl GeoPoint {
    pub fn wgs84(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            crs: WGS84.to_string(),
        }
    }

    /// Classify this point using its CRS label
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::classify(self.x, self.y, Some(&self.crs))
    }
}

/// A coordinate tagged with the kind of space it lives in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Coordinate {
    Geographic { lon: f64, lat: f64 },
    Projected { x: f64, y: f64 },
}

/// What a declared CRS label says about its coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsKind {
    Geographic,
    Projected,
}

impl CrsKind {
    /// Interpret an `srsName`-style label.
    ///
    /// Accepts `EPSG:4326`, `CRS:84`, `urn:ogc:def:crs:EPSG::4326` and
    /// `http://www.opengis.net/gml/srs/epsg.xml#4326`. Any other label carrying
    /// an EPSG code is projected. Labels without a recognizable code yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("CRS:84") || label.eq_ignore_ascii_case("WGS84") {
            return Some(Self::Geographic);
        }

        let code: String = label
            .rsplit(&[':', '#'][..])
            .next()
            .unwrap_or_default()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();

        if code.is_empty() || !label.to_ascii_lowercase().contains("epsg") {
            return None;
        }

        match code.as_str() {
            "4326" | "4019" | "4737" => Some(Self::Geographic),
            _ => Some(Self::Projected),
        }
    }
}

impl Coordinate {
    /// Decide the coordinate kind.
    ///
    /// A recognizable declared CRS wins. Without one, a horizontal magnitude
    /// above [`PROJECTED_MAGNITUDE_THRESHOLD`] means projected meters.
    pub fn classify(x: f64, y: f64, declared_crs: Option<&str>) -> Self {
        match declared_crs.and_then(CrsKind::from_label) {
            Some(CrsKind::Geographic) => Self::Geographic { lon: x, lat: y },
            Some(CrsKind::Projected) => Self::Projected { x, y },
            None if x.abs() > PROJECTED_MAGNITUDE_THRESHOLD => Self::Projected { x, y },
            None => Self::Geographic { lon: x, lat: y },
        }
    }

    /// Horizontal component (longitude or easting)
    pub fn x(&self) -> f64 {
        match *self {
            Self::Geographic { lon, .. } => lon,
            Self::Projected { x, .. } => x,
        }
    }

    /// Vertical component (latitude or northing)
    pub fn y(&self) -> f64 {
        match *self {
            Self::Geographic { lat, .. } => lat,
            Self::Projected { y, .. } => y,
        }
    }

    /// Distance in meters between two coordinates.
    ///
    /// Euclidean only when both sides are projected; every other pairing is
    /// measured as a great circle on the raw values.
    pub fn distance_meters(&self, other: &Coordinate) -> f64 {
        match (self, other) {
            (Self::Projected { x: x1, y: y1 }, Self::Projected { x: x2, y: y2 }) => {
                euclidean_distance(*x1, *y1, *x2, *y2)
            }
            _ => haversine_distance(self.y(), self.x(), other.y(), other.x()),
        }
    }
}

/// Planar distance for projected coordinates
pub fn euclidean_distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    (dx * dx + dy * dy).sqrt()
}

/// Great-circle distance in meters between two WGS84 points
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Rectangular query region, in the axis order the WFS endpoint expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub ymin: f64,
    pub xmin: f64,
    pub ymax: f64,
    pub xmax: f64,
    pub crs: String,
}

impl BBox {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.xmin < x && x < self.xmax && self.ymin < y && y < self.ymax
    }
}

/// Renders `ymin,xmin,ymax,xmax,CRS`, the `bbox` query parameter format
impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.ymin, self.xmin, self.ymax, self.xmax, self.crs
        )
    }
}

/// Build a WGS84 bounding box around a center point.
///
/// Uses 1/111000 degrees per meter of latitude and
/// 1/(111000 * cos(lat)) degrees per meter of longitude. This holds for radii
/// up to a few kilometers. There is no polar or antimeridian correction.
pub fn bbox(center_x: f64, center_y: f64, radius: RadiusMeters) -> BBox {
    let distance = radius.into_inner();
    let lat_delta = distance / METERS_PER_DEGREE;
    let lon_delta = distance / (METERS_PER_DEGREE * center_y.to_radians().cos());

    BBox {
        ymin: center_y - lat_delta,
        xmin: center_x - lon_delta,
        ymax: center_y + lat_delta,
        xmax: center_x + lon_delta,
        crs: WGS84.to_string(),
    }
}
