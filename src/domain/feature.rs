//! Features parsed from spatial data payloads

use crate::domain::geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Marker returned for fields a feature does not carry
pub const MISSING_FIELD: &str = "-";

/// One real-world entity (broker office, land parcel) from a WFS response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    /// Trimmed text content of every field, keyed by local tag name
    pub attributes: BTreeMap<String, String>,
    /// Location, when the payload carries usable coordinates
    pub coordinate: Option<Coordinate>,
    /// Distance from the ranking reference, set by the ranker
    pub distance_meters: Option<f64>,
}

impl Feature {
    pub fn new(attributes: BTreeMap<String, String>, coordinate: Option<Coordinate>) -> Self {
        Self {
            attributes,
            coordinate,
            distance_meters: None,
        }
    }

    /// Field text, or [`MISSING_FIELD`] when absent
    pub fn field(&self, name: &str) -> &str {
        self.attributes
            .get(name)
            .map(String::as_str)
            .unwrap_or(MISSING_FIELD)
    }

    /// Field text only when the feature actually carries a non-empty value
    pub fn field_opt(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}
