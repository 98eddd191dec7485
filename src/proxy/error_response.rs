//! Unified error response handling for the proxy service
//!
//! Every error leaving a handler is rendered as the same JSON shape, with the
//! request ID copied into both the body and the `x-request-id` header.

use crate::proxy::headers::X_REQUEST_ID;
use crate::proxy::types::ProxyError;
use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Standard error response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Unique error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Request ID for correlation
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Convert to HTTP response with proper headers
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        let request_id = self.request_id.clone();
        let mut response = (status, Json(self)).into_response();

        if let Some(id) = request_id {
            if let Ok(header_value) = HeaderValue::from_str(&id) {
                response.headers_mut().insert(X_REQUEST_ID, header_value);
            }
        }

        response
    }
}

/// Extension trait for consistent error formatting
pub trait ErrorResponseExt {
    /// Convert to standardized error response
    fn to_error_response(&self) -> ErrorResponse;

    /// Get the appropriate HTTP status code
    fn status_code(&self) -> StatusCode;

    /// Render with the caller's request ID attached
    fn into_response_for(self, headers: &HeaderMap) -> Response
    where
        Self: Sized,
    {
        let status = self.status_code();
        let mut error = self.to_error_response();
        if let Some(id) = extract_request_id(headers) {
            error = error.with_request_id(id);
        }
        error.into_response_with_status(status)
    }
}

impl ErrorResponseExt for ProxyError {
    fn to_error_response(&self) -> ErrorResponse {
        use ProxyError::*;

        let code = match self {
            MissingTargetUrl => "MISSING_TARGET_URL",
            InvalidTargetUrl(_) => "INVALID_TARGET_URL",
            DomainNotAllowed { .. } => "DOMAIN_NOT_ALLOWED",
            UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
            Network(_) => "NETWORK_ERROR",
            InvalidParameter(_) => "INVALID_PARAMETER",
            Internal(_) => "INTERNAL_ERROR",
        };

        ErrorResponse::new(code, self.to_string())
    }

    fn status_code(&self) -> StatusCode {
        use ProxyError::*;

        match self {
            MissingTargetUrl | InvalidTargetUrl(_) | InvalidParameter(_) => StatusCode::BAD_REQUEST,
            DomainNotAllowed { .. } => StatusCode::FORBIDDEN,
            UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Network(_) | Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error conversion for Axum responses using standardized format
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        self.to_error_response().into_response_with_status(status)
    }
}

/// Helper to extract request ID from headers
pub fn extract_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_REQUEST_ID)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}
