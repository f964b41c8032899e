//! `/api/auth/*`

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

use crate::auth::AuthResponse;
use crate::error::{FixitError, Result};
use crate::server::AppState;
use crate::server::wire::{LoginRequest, RegisterRequest};

/// Run password hashing off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(anyhow::Error::from)?
}

pub(crate) fn body_error(rejection: &JsonRejection) -> FixitError {
    FixitError::validation("body", rejection.body_text())
}

pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let Json(body) = payload.map_err(|e| body_error(&e))?;
    let auth = state.auth.clone();
    let response = blocking(move || auth.register(&body.name, &body.email, &body.password)).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>> {
    let Json(body) = payload.map_err(|e| body_error(&e))?;
    let auth = state.auth.clone();
    let response = blocking(move || auth.login(&body.email, &body.password)).await?;
    Ok(Json(response))
}
