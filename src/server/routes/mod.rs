//! Request handlers.

pub mod auth;
pub mod issues;
pub mod storage;

use axum::Json;

use super::wire::HealthResponse;
use crate::error::FixitError;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Campus FixIt API running".to_string(),
    })
}

pub async fn not_found() -> FixitError {
    FixitError::not_found("Route not found")
}
