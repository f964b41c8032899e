//! HTTP rendering of [`FixitError`].

use super::{FixitError, StructuredError};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

impl FixitError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        let code = StructuredError::from_error(self).code;
        StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for FixitError {
    fn into_response(self) -> Response {
        let structured = StructuredError::public(&self);
        if structured.code.is_internal() {
            tracing::error!(error = %self, code = structured.code.as_str(), "request failed");
        } else {
            tracing::debug!(error = %self, code = structured.code.as_str(), "request rejected");
        }
        (self.status_code(), Json(structured.to_http_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthFailure;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            FixitError::validation("title", "Title is required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FixitError::InvalidCredentials.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FixitError::Conflict {
                message: "Email already registered".into()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FixitError::Unauthorized(AuthFailure::UnknownUser).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            FixitError::forbidden("Access denied").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            FixitError::IssueNotFound { id: "x".into() }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            FixitError::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            FixitError::storage("upload failed").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_responses_do_not_leak_details() {
        let response = FixitError::storage("service role key rejected").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = FixitError::forbidden("Access denied").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
