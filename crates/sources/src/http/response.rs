//! HTTP response helpers

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use super::error::HttpSourceError;

/// Body of a successful ingestion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestResponse {
    pub success: bool,
    /// Events committed by this request
    pub accepted: usize,
}

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    /// Events committed before the failure, for ingestion requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted: Option<usize>,
}

pub fn ingested(accepted: usize) -> Response {
    let body = IngestResponse {
        success: true,
        accepted,
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn error_response(error: &HttpSourceError, accepted: Option<usize>) -> Response {
    let body = ErrorResponse {
        error: error.to_string(),
        accepted,
    };
    (error.status(), Json(body)).into_response()
}
