//! Route guard: bearer authentication plus a declared capability set.
//!
//! Each protected route is wrapped with a [`Guard`] naming the capabilities
//! it needs. The guard answers 401 before it ever considers 403, and hands the
//! resolved [`Principal`] to the handler as a request extension.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use super::AppState;
use crate::auth::authorize;
use crate::error::FixitError;
use crate::model::{Capability, Principal};

pub const CREATE_ISSUE: &[Capability] = &[Capability::CreateIssue];
pub const LIST_OWN_ISSUES: &[Capability] = &[Capability::ListOwnIssues];
pub const VIEW_ISSUE: &[Capability] = &[Capability::ViewIssue];
pub const LIST_ALL_ISSUES: &[Capability] = &[Capability::ListAllIssues];
pub const UPDATE_STATUS: &[Capability] = &[Capability::UpdateStatus];
pub const UPDATE_REMARKS: &[Capability] = &[Capability::UpdateRemarks];

#[derive(Clone)]
pub struct Guard {
    state: AppState,
    required: &'static [Capability],
}

impl Guard {
    /// Guard state for one route; pair with [`check`] in
    /// `axum::middleware::from_fn_with_state`.
    #[must_use]
    pub fn new(state: &AppState, required: &'static [Capability]) -> Self {
        Self {
            state: state.clone(),
            required,
        }
    }
}

/// Middleware: authenticate, authorize, then attach the principal.
///
/// # Errors
///
/// 401 for a missing or bad token, 403 when a capability is missing.
pub async fn check(
    State(guard): State<Guard>,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, FixitError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);

    let principal: Principal = guard.state.auth.authenticate_header(header.as_deref())?;
    authorize(&principal, guard.required)?;

    tracing::debug!(
        user_id = %principal.id,
        role = %principal.role,
        path = %request.uri().path(),
        "request authorized"
    );
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
