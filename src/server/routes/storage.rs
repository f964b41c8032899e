//! `GET /api/storage/{path}`: signed downloads for the local object store.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::HeaderValue;
use axum::http::header::{
    CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_SECURITY_POLICY, CONTENT_TYPE, HeaderMap,
};
use axum::response::IntoResponse;

use crate::error::{FixitError, Result};
use crate::objects::local::{INVALID_LINK, content_type_for, is_inline_image};
use crate::server::AppState;
use crate::server::wire::SignedLinkQuery;

pub async fn download(
    State(state): State<AppState>,
    Path(path): Path<String>,
    query: std::result::Result<Query<SignedLinkQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Some(store) = state.issues.objects().as_local() else {
        return Err(FixitError::not_found("Route not found"));
    };
    let Query(link) = query.map_err(|_| FixitError::forbidden(INVALID_LINK))?;

    store.verify(&path, link.expires, &link.signature)?;
    let bytes = store.read(&path).await?;
    tracing::debug!(path = %path, size = bytes.len(), "serving stored object");

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type_for(&path)));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("private, max-age=3600"));
    headers.insert(
        CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; sandbox"),
    );
    if !is_inline_image(&path) {
        headers.insert(CONTENT_DISPOSITION, HeaderValue::from_static("attachment"));
    }

    Ok((headers, bytes))
}
