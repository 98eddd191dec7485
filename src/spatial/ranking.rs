//! Distance ranking, deduplication and limiting of parsed features

use crate::domain::feature::Feature;
use crate::domain::geo::Coordinate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// Annotate each feature with its distance from `reference` and sort ascending.
///
/// Features without a usable coordinate keep `distance_meters = None` and go
/// after every measured feature, in their original relative order.
pub fn rank(reference: &Coordinate, features: Vec<Feature>) -> Vec<Feature> {
    let mut ranked: Vec<Feature> = features
        .into_iter()
        .map(|mut feature| {
            feature.distance_meters = feature
                .coordinate
                .map(|c| reference.distance_meters(&c))
                .filter(|d| d.is_finite());
            feature
        })
        .collect();

    // sort_by is stable, which keeps unmeasured features in input order
    ranked.sort_by(|a, b| compare_distance(a.distance_meters, b.distance_meters));
    ranked
}

fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Drop repeats, keeping the first occurrence.
///
/// Identity is the non-empty `identity_field` value when present, otherwise
/// the full attribute map.
pub fn dedupe(features: Vec<Feature>, identity_field: &str) -> Vec<Feature> {
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_maps: HashSet<BTreeMap<String, String>> = HashSet::new();

    features
        .into_iter()
        .filter(|feature| match feature.field_opt(identity_field) {
            Some(id) => seen_ids.insert(id.to_string()),
            None => seen_maps.insert(feature.attributes.clone()),
        })
        .collect()
}

/// Rank, dedupe and keep the `limit` closest features
pub fn nearest(
    reference: &Coordinate,
    features: Vec<Feature>,
    identity_field: &str,
    limit: usize,
) -> Vec<Feature> {
    let mut result = dedupe(rank(reference, features), identity_field);
    result.truncate(limit);
    result
}
