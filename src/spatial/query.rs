//! WFS query parameters and target URL construction

use crate::config::SpatialSettings;
use crate::domain::geo::{bbox, BBox};
use crate::domain::types::RadiusMeters;
use crate::proxy::types::{ProxyError, ProxyResult};
use serde::{Deserialize, Serialize};

/// Parameters of one spatial query, forwarded to the provider as given
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialQuery {
    pub key: Option<String>,
    pub typename: Option<String>,
    pub bbox: Option<String>,
    pub pnu: Option<String>,
    pub result_type: Option<String>,
    pub srs_name: Option<String>,
    pub output: Option<String>,
    pub max_features: Option<String>,
    /// Center used for the BBOX retry when a parcel lookup comes back empty; not forwarded
    pub x: Option<f64>,
    /// See [`Self::x`]
    pub y: Option<f64>,
}

impl SpatialQuery {
    /// Broker search around a box, using the configured layer and output options
    pub fn for_bbox(settings: &SpatialSettings, area: &BBox) -> Self {
        Self {
            key: Some(settings.api_key.clone()),
            typename: Some(settings.broker_typename.clone()),
            bbox: Some(area.to_string()),
            pnu: None,
            result_type: Some(settings.result_type.clone()),
            srs_name: Some(settings.srs_name.clone()),
            output: Some(settings.output.clone()),
            max_features: Some(settings.max_features.to_string()),
            x: None,
            y: None,
        }
    }

    /// Fill a missing credential from configuration
    pub fn with_default_key(mut self, key: &str) -> Self {
        if self.key.as_deref().unwrap_or_default().is_empty() && !key.is_empty() {
            self.key = Some(key.to_string());
        }
        self
    }

    pub fn typename(&self) -> Option<&str> {
        self.typename.as_deref().filter(|t| !t.is_empty())
    }

    /// Upstream URL with every present parameter percent-encoded
    pub fn target_url(&self, base_url: &str) -> ProxyResult<String> {
        if self.typename().is_none() {
            return Err(ProxyError::InvalidParameter(
                "typename is required".to_string(),
            ));
        }
        if self.bbox.is_none() && self.pnu.is_none() {
            return Err(ProxyError::InvalidParameter(
                "either bbox or pnu is required".to_string(),
            ));
        }

        let pairs = [
            ("key", &self.key),
            ("typename", &self.typename),
            ("bbox", &self.bbox),
            ("pnu", &self.pnu),
            ("resultType", &self.result_type),
            ("srsName", &self.srs_name),
            ("output", &self.output),
            ("maxFeatures", &self.max_features),
        ];

        let query = pairs
            .iter()
            .filter_map(|(name, value)| {
                value
                    .as_deref()
                    .map(|v| format!("{name}={}", urlencoding::encode(v)))
            })
            .collect::<Vec<_>>()
            .join("&");

        Ok(format!("{base_url}?{query}"))
    }

    /// The same query by bounding box around `x`,`y`, when this is a parcel
    /// lookup that carries a center point
    pub fn bbox_fallback(&self, radius: RadiusMeters) -> Option<Self> {
        self.pnu.as_ref()?;
        let (x, y) = (self.x?, self.y?);
        if !(x.is_finite() && y.is_finite()) {
            return None;
        }

        Some(Self {
            bbox: Some(bbox(x, y, radius).to_string()),
            pnu: None,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://api.vworld.kr/ned/wfs/getEstateBrkpgWFS";

    fn parcel_query() -> SpatialQuery {
        SpatialQuery {
            key: Some("K+1/2=".to_string()),
            typename: Some("dt_d170".to_string()),
            pnu: Some("1113510100100960000".to_string()),
            output: Some("GML2".to_string()),
            x: Some(127.0),
            y: Some(37.5),
            ..Default::default()
        }
    }

    #[test]
    fn test_target_url_encodes_values_and_skips_center() {
        let url = parcel_query().target_url(BASE).unwrap();
        assert_eq!(
            url,
            format!("{BASE}?key=K%2B1%2F2%3D&typename=dt_d170&pnu=1113510100100960000&output=GML2")
        );
    }

    #[test]
    fn test_bbox_query_from_settings() {
        let settings = SpatialSettings::default();
        let area = bbox(127.0, 37.5, settings.search_radius_m);
        let url = SpatialQuery::for_bbox(&settings, &area)
            .target_url(&settings.upstream_url)
            .unwrap();

        assert!(url.starts_with(&settings.upstream_url));
        assert!(url.contains("typename=dt_d170"));
        assert!(url.contains("bbox=37.49"));
        assert!(url.contains("%2CEPSG%3A4326"));
        assert!(url.contains("maxFeatures=30"));
        assert!(url.contains("resultType=results"));
    }

    #[test]
    fn test_requires_typename_and_area() {
        let mut query = parcel_query();
        query.typename = None;
        assert!(matches!(
            query.target_url(BASE),
            Err(ProxyError::InvalidParameter(_))
        ));

        let mut query = parcel_query();
        query.pnu = None;
        assert!(matches!(
            query.target_url(BASE),
            Err(ProxyError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_bbox_fallback_replaces_pnu() {
        let radius = RadiusMeters::try_new(100.0).unwrap();
        let fallback = parcel_query().bbox_fallback(radius).unwrap();

        assert_eq!(fallback.pnu, None);
        assert_eq!(fallback.bbox, Some(bbox(127.0, 37.5, radius).to_string()));
        assert_eq!(fallback.key, parcel_query().key);
    }

    #[test]
    fn test_no_fallback_without_center_or_pnu() {
        let radius = RadiusMeters::try_new(100.0).unwrap();

        let mut query = parcel_query();
        query.y = None;
        assert!(query.bbox_fallback(radius).is_none());

        let mut query = parcel_query();
        query.pnu = None;
        query.bbox = Some("1,2,3,4,EPSG:4326".to_string());
        assert!(query.bbox_fallback(radius).is_none());
    }

    #[test]
    fn test_default_key_only_fills_blanks() {
        let query = SpatialQuery::default().with_default_key("configured");
        assert_eq!(query.key.as_deref(), Some("configured"));

        let query = parcel_query().with_default_key("configured");
        assert_eq!(query.key.as_deref(), Some("K+1/2="));
    }
}
