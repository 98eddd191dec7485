//! Spatial queries routed through the proxy
//!
//! Every upstream call goes through [`ProxyService::handle`], so spatial
//! lookups share the allowlist, the cache policy and the timeouts with the
//! generic proxy endpoint.

use crate::config::SpatialSettings;
use crate::domain::feature::Feature;
use crate::domain::geo::{self, BBox, Coordinate};
use crate::domain::types::{FeatureLimit, RadiusMeters};
use crate::proxy::types::{ProxyOutcome, ProxyResult};
use crate::proxy::ProxyService;
use crate::spatial::parser::{FeatureParser, ParseError};
use crate::spatial::query::SpatialQuery;
use crate::spatial::ranking;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Result of a spatial query, noting whether the BBOX retry was used
#[derive(Debug, Clone)]
pub struct SpatialOutcome {
    pub outcome: ProxyOutcome,
    pub fell_back: bool,
}

/// Ranked brokers around a center point
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyBrokers {
    pub center: Coordinate,
    pub bbox: BBox,
    pub count: usize,
    pub features: Vec<Feature>,
}

/// A nearby search either ranks features or hands back the provider's error
#[derive(Debug, Clone)]
pub enum NearbyResult {
    Ranked(NearbyBrokers),
    Upstream(ProxyOutcome),
}

pub struct SpatialService {
    proxy: Arc<ProxyService>,
    settings: SpatialSettings,
}

impl SpatialService {
    pub fn new(proxy: Arc<ProxyService>, settings: SpatialSettings) -> Self {
        Self { proxy, settings }
    }

    pub fn settings(&self) -> &SpatialSettings {
        &self.settings
    }

    fn parser_for(&self, typename: &str) -> FeatureParser {
        FeatureParser::new(typename, &self.settings.x_field, &self.settings.y_field)
    }

    /// Forward a WFS query; an empty parcel lookup is retried once by BBOX
    #[instrument(skip_all, fields(typename = query.typename.as_deref().unwrap_or_default()))]
    pub async fn query(&self, query: SpatialQuery) -> ProxyResult<SpatialOutcome> {
        let query = query.with_default_key(&self.settings.api_key);
        let url = query.target_url(&self.settings.upstream_url)?;
        let outcome = self.proxy.handle(Some(&url)).await?;

        let Some(fallback) = query.bbox_fallback(self.settings.fallback_radius_m) else {
            return Ok(SpatialOutcome {
                outcome,
                fell_back: false,
            });
        };

        if !outcome.response.is_success() {
            return Ok(SpatialOutcome {
                outcome,
                fell_back: false,
            });
        }

        let typename = query.typename().unwrap_or_default();
        match self.parse(typename, &outcome) {
            Ok(features) if features.is_empty() => {
                info!(
                    radius_m = %self.settings.fallback_radius_m,
                    "Parcel lookup returned no features, retrying by bounding box"
                );
                let url = fallback.target_url(&self.settings.upstream_url)?;
                let outcome = self.proxy.handle(Some(&url)).await?;
                Ok(SpatialOutcome {
                    outcome,
                    fell_back: true,
                })
            }
            Ok(_) => Ok(SpatialOutcome {
                outcome,
                fell_back: false,
            }),
            Err(e) => {
                warn!(error = %e, "Parcel lookup payload unreadable, not retrying");
                Ok(SpatialOutcome {
                    outcome,
                    fell_back: false,
                })
            }
        }
    }

    /// Brokers within `radius` of a WGS84 point, closest first
    #[instrument(skip(self))]
    pub async fn nearby(
        &self,
        lon: f64,
        lat: f64,
        radius: Option<RadiusMeters>,
        limit: Option<FeatureLimit>,
    ) -> ProxyResult<NearbyResult> {
        let radius = radius.unwrap_or(self.settings.search_radius_m);
        let limit = limit.unwrap_or(self.settings.default_limit);

        let center = Coordinate::Geographic { lon, lat };
        let area = geo::bbox(lon, lat, radius);
        let url = SpatialQuery::for_bbox(&self.settings, &area)
            .target_url(&self.settings.upstream_url)?;

        let outcome = self.proxy.handle(Some(&url)).await?;
        if !outcome.response.is_success() {
            warn!(status = outcome.response.status, "Broker search failed upstream");
            return Ok(NearbyResult::Upstream(outcome));
        }

        let features = match self.parse(&self.settings.broker_typename, &outcome) {
            Ok(features) => features,
            Err(e) => {
                warn!(error = %e, "Broker payload unreadable, treating as no features");
                Vec::new()
            }
        };

        let features = ranking::nearest(
            &center,
            features,
            &self.settings.dedupe_field,
            limit.into_inner(),
        );
        info!(count = features.len(), "Ranked nearby brokers");

        Ok(NearbyResult::Ranked(NearbyBrokers {
            center,
            bbox: area,
            count: features.len(),
            features,
        }))
    }

    fn parse(&self, typename: &str, outcome: &ProxyOutcome) -> Result<Vec<Feature>, ParseError> {
        let payload = std::str::from_utf8(&outcome.response.body).map_err(|e| {
            ParseError::Malformed {
                position: e.valid_up_to() as u64,
                message: e.to_string(),
            }
        })?;

        self.parser_for(typename).parse(payload)
    }
}
