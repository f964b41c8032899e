//! `/api/issues/*`. Every handler runs behind the capability guard.

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Multipart, Path, Query, State};
use axum::http::StatusCode;

use super::auth::body_error;
use crate::error::{FixitError, Result};
use crate::lifecycle::CreateIssueInput;
use crate::model::{IssueFilters, Principal};
use crate::objects::ImageUpload;
use crate::server::AppState;
use crate::server::wire::{FilterQuery, IssueResponse, RemarksRequest, StatusRequest};

/// Parse list filters; blank values mean "no filter".
fn parse_filters(query: &FilterQuery) -> Result<IssueFilters> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse()?),
    };
    let category = match query.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse()?),
    };
    Ok(IssueFilters { status, category })
}

fn multipart_error(err: impl std::fmt::Display) -> FixitError {
    FixitError::validation("body", format!("Invalid multipart body: {err}"))
}

/// Collect the text fields and the optional `image` file.
async fn read_create_form(mut multipart: Multipart) -> Result<CreateIssueInput> {
    let mut input = CreateIssueInput::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => input.title = Some(field.text().await.map_err(multipart_error)?),
            "description" => {
                input.description = Some(field.text().await.map_err(multipart_error)?);
            }
            "category" => input.category = Some(field.text().await.map_err(multipart_error)?),
            "image" => {
                let file_name = field.file_name().map(ToString::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // An empty file part is what browsers send for "no file".
                if !bytes.is_empty() || file_name.as_deref().is_some_and(|n| !n.is_empty()) {
                    input.image = Some(ImageUpload {
                        bytes: bytes.to_vec(),
                        content_type,
                        file_name,
                    });
                }
            }
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }
    Ok(input)
}

pub async fn create_issue(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<IssueResponse>)> {
    let input = read_create_form(multipart.map_err(multipart_error)?).await?;
    let issue = state.issues.create_issue(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(issue.into())))
}

pub async fn list_all_issues(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<IssueResponse>>> {
    let filters = parse_filters(&query)?;
    let issues = state.issues.list_all_issues(&principal, filters).await?;
    Ok(Json(issues.into_iter().map(Into::into).collect()))
}

pub async fn list_my_issues(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<IssueResponse>>> {
    let filters = parse_filters(&query)?;
    let issues = state.issues.list_my_issues(&principal, filters).await?;
    Ok(Json(issues.into_iter().map(Into::into).collect()))
}

pub async fn get_issue(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<IssueResponse>> {
    let issue = state.issues.get_issue(&principal, &id).await?;
    Ok(Json(issue.into()))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<IssueResponse>> {
    let Json(body) = payload.map_err(|e| body_error(&e))?;
    let issue = state
        .issues
        .update_status(&principal, &id, body.status.as_deref())
        .await?;
    Ok(Json(issue.into()))
}

pub async fn update_remarks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<RemarksRequest>, JsonRejection>,
) -> Result<Json<IssueResponse>> {
    let Json(body) = payload.map_err(|e| body_error(&e))?;
    let issue = state
        .issues
        .update_remarks(&principal, &id, body.admin_remarks.as_deref())
        .await?;
    Ok(Json(issue.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Status};

    #[test]
    fn test_parse_filters() {
        let filters = parse_filters(&FilterQuery {
            status: Some("In Progress".into()),
            category: Some(String::new()),
        })
        .unwrap();
        assert_eq!(filters.status, Some(Status::InProgress));
        assert_eq!(filters.category, None);

        let filters = parse_filters(&FilterQuery {
            status: None,
            category: Some("Water".into()),
        })
        .unwrap();
        assert_eq!(filters.category, Some(Category::Water));

        assert!(parse_filters(&FilterQuery {
            status: Some("closed".into()),
            category: None,
        })
        .is_err());
    }
}
