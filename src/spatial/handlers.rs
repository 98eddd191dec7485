//! Axum handlers for the spatial endpoints

use crate::domain::parcel::{encode_pnu, LandSegment};
use crate::domain::types::{FeatureLimit, RadiusMeters};
use crate::proxy::error_response::ErrorResponseExt;
use crate::proxy::headers::X_SPATIAL_FALLBACK;
use crate::proxy::service::outcome_response;
use crate::proxy::types::{ProxyError, ProxyResult};
use crate::spatial::query::SpatialQuery;
use crate::spatial::service::{NearbyResult, SpatialService};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Forward a WFS query, flagging responses served by the BBOX retry
pub async fn spatial_handler(
    State(spatial): State<Arc<SpatialService>>,
    Query(query): Query<SpatialQuery>,
    headers: HeaderMap,
) -> Response {
    match spatial.query(query).await {
        Ok(result) => {
            let mut response = outcome_response(result.outcome);
            if result.fell_back {
                response
                    .headers_mut()
                    .insert(X_SPATIAL_FALLBACK, HeaderValue::from_static("bbox"));
            }
            response
        }
        Err(e) => e.into_response_for(&headers),
    }
}

/// Raw query for `/api/brokers/nearby`; numbers are validated by hand so bad
/// input gets the standard error body
#[derive(Debug, Default, Deserialize)]
pub struct NearbyParams {
    pub x: Option<String>,
    pub y: Option<String>,
    pub radius: Option<String>,
    pub limit: Option<String>,
}

struct NearbyRequest {
    lon: f64,
    lat: f64,
    radius: Option<RadiusMeters>,
    limit: Option<FeatureLimit>,
}

fn finite(name: &str, raw: Option<&str>) -> ProxyResult<f64> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProxyError::InvalidParameter(format!("{name} is required")))?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ProxyError::InvalidParameter(format!("{name} must be a finite number")))
}

impl NearbyParams {
    fn validate(&self) -> ProxyResult<NearbyRequest> {
        let lon = finite("x", self.x.as_deref())?;
        let lat = finite("y", self.y.as_deref())?;

        let radius = match self.radius.as_deref() {
            None => None,
            Some(raw) => Some(
                raw.trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(|r| RadiusMeters::try_new(r).ok())
                    .ok_or_else(|| {
                        ProxyError::InvalidParameter(
                            "radius must be a positive number of meters".to_string(),
                        )
                    })?,
            ),
        };

        let limit = match self.limit.as_deref() {
            None => None,
            Some(raw) => Some(
                raw.trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|l| FeatureLimit::try_new(l).ok())
                    .ok_or_else(|| {
                        ProxyError::InvalidParameter(
                            "limit must be between 1 and 1000".to_string(),
                        )
                    })?,
            ),
        };

        Ok(NearbyRequest {
            lon,
            lat,
            radius,
            limit,
        })
    }
}

/// Brokers around a WGS84 point, closest first
pub async fn brokers_nearby_handler(
    State(spatial): State<Arc<SpatialService>>,
    Query(params): Query<NearbyParams>,
    headers: HeaderMap,
) -> Response {
    let request = match params.validate() {
        Ok(request) => request,
        Err(e) => return e.into_response_for(&headers),
    };

    match spatial
        .nearby(request.lon, request.lat, request.radius, request.limit)
        .await
    {
        Ok(NearbyResult::Ranked(brokers)) => Json(brokers).into_response(),
        Ok(NearbyResult::Upstream(outcome)) => outcome_response(outcome),
        Err(e) => e.into_response_for(&headers),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PnuParams {
    pub admin_code: Option<String>,
    pub mountain_flag: Option<String>,
    pub main_lot: Option<String>,
    pub sub_lot: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PnuBody {
    pub pnu: String,
}

/// Encode a parcel identifier from address-search fields
pub async fn pnu_handler(Query(params): Query<PnuParams>, headers: HeaderMap) -> Response {
    let admin_code = params.admin_code.as_deref().unwrap_or_default().trim();
    let segment = LandSegment::from_mountain_flag(params.mountain_flag.as_deref());

    match encode_pnu(
        admin_code,
        segment,
        params.main_lot.as_deref().unwrap_or_default(),
        params.sub_lot.as_deref().unwrap_or_default(),
    ) {
        Some(pnu) => Json(PnuBody {
            pnu: pnu.to_string(),
        })
        .into_response(),
        None => ProxyError::InvalidParameter("adminCode must be 10 characters".to_string())
            .into_response_for(&headers),
    }
}
