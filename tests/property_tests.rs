//! Property-based tests for the pure building blocks
//!
//! Cache key normalization, parcel encoding, bounding boxes and ranking
//! must hold their invariants for arbitrary inputs, not just the examples
//! in the unit tests.

use parcel_proxy::domain::feature::Feature;
use parcel_proxy::domain::geo::{bbox, Coordinate};
use parcel_proxy::domain::parcel::{encode_pnu, LandSegment, PNU_LEN};
use parcel_proxy::domain::types::RadiusMeters;
use parcel_proxy::proxy::cache_key::CacheKeyNormalizer;
use parcel_proxy::spatial::ranking;
use proptest::prelude::*;
use std::collections::BTreeMap;

pub mod generators {
    use super::*;
    use proptest::string::string_regex;

    /// Ten-digit legal dong codes
    pub fn admin_code() -> impl Strategy<Value = String> {
        string_regex("[1-5][0-9]{9}").expect("valid regex")
    }

    /// Whatever a lot field may hold: digits, blanks, junk
    pub fn lot_text() -> impl Strategy<Value = String> {
        prop_oneof![
            (0u32..20_000).prop_map(|n| n.to_string()),
            string_regex("[ a-z0-9-]{0,6}").expect("valid regex"),
        ]
    }

    /// Query values including characters that need escaping
    pub fn query_value() -> impl Strategy<Value = String> {
        string_regex("[A-Za-z0-9%+/=]{1,24}").expect("valid regex")
    }

    /// Points within Korea
    pub fn korea_point() -> impl Strategy<Value = (f64, f64)> {
        (124.5f64..131.9, 33.0f64..38.7)
    }

    pub fn located_feature() -> impl Strategy<Value = Feature> {
        (any::<u16>(), korea_point()).prop_map(|(id, (x, y))| {
            let mut attributes = BTreeMap::new();
            attributes.insert("jurirno".to_string(), id.to_string());
            Feature::new(attributes, Some(Coordinate::Geographic { lon: x, lat: y }))
        })
    }
}

proptest! {
    #[test]
    fn prop_pnu_is_always_19_digits(
        admin in generators::admin_code(),
        mountain in any::<bool>(),
        main in generators::lot_text(),
        sub in generators::lot_text(),
    ) {
        let pnu = encode_pnu(&admin, LandSegment::from_is_mountain(mountain), &main, &sub)
            .expect("ten-character code encodes");
        let pnu = pnu.as_str();

        prop_assert_eq!(pnu.len(), PNU_LEN);
        prop_assert!(pnu.chars().all(|c| c.is_ascii_digit()));
        prop_assert!(pnu.starts_with(&admin));
        prop_assert_eq!(&pnu[10..11], if mountain { "2" } else { "1" });
    }

    #[test]
    fn prop_cache_key_ignores_credential(
        first in generators::query_value(),
        second in generators::query_value(),
        page in 1u32..500,
    ) {
        let normalizer = CacheKeyNormalizer::new("serviceKey");
        let url = |key: &str| {
            format!("https://apis.data.go.kr/1613000/AptListService3/getList?serviceKey={key}&pageNo={page}")
        };

        let a = normalizer.normalize(&url(&first)).expect("key");
        let b = normalizer.normalize(&url(&second)).expect("key");
        prop_assert_eq!(&a, &b);
        prop_assert!(a.as_ref().chars().all(|c| c.is_ascii_alphanumeric() || "._-".contains(c)));
    }

    #[test]
    fn prop_bbox_contains_its_center(
        (x, y) in generators::korea_point(),
        radius in 1.0f64..5_000.0,
    ) {
        let radius = RadiusMeters::try_new(radius).expect("positive radius");
        let area = bbox(x, y, radius);

        prop_assert!(area.contains(x, y));
        prop_assert!(((area.ymax - y) - (y - area.ymin)).abs() < 1e-9);
        prop_assert!(((area.xmax - x) - (x - area.xmin)).abs() < 1e-9);
    }

    #[test]
    fn prop_nearest_respects_limit_and_uniqueness(
        features in prop::collection::vec(generators::located_feature(), 0..60),
        limit in 1usize..40,
        (x, y) in generators::korea_point(),
    ) {
        let center = Coordinate::Geographic { lon: x, lat: y };
        let result = ranking::nearest(&center, features, "jurirno", limit);

        prop_assert!(result.len() <= limit);
        let mut ids: Vec<&str> = result.iter().map(|f| f.field("jurirno")).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), before);
        prop_assert!(result
            .windows(2)
            .all(|w| w[0].distance_meters <= w[1].distance_meters));
    }
}
