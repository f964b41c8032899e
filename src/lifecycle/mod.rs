//! Issue lifecycle: creation, listing, viewing and admin triage.
//!
//! Every operation takes the request's [`Principal`]. Role checks for the
//! admin-only operations are repeated here even though the HTTP guard already
//! enforces them, so the service is safe to call from anywhere. Ownership for
//! [`IssueService::get_issue`] depends on the row and only lives here.
//!
//! Returned issues carry a freshly signed image URL in place of the stored
//! path; the stored path is never replaced.

use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::auth::authorize_admin;
use crate::error::{FixitError, Result};
use crate::model::{Issue, IssueFilters, Principal, Status};
use crate::objects::{ImageUpload, ObjectStore, SIGNED_URL_TTL};
use crate::storage::{ListFilters, SharedStorage, lock};
use crate::validation::IssueValidator;

/// Message for viewing someone else's issue.
pub const ACCESS_DENIED: &str = "Access denied";

/// Raw fields of a create request, before validation.
#[derive(Debug, Clone, Default)]
pub struct CreateIssueInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone)]
pub struct IssueService {
    storage: SharedStorage,
    objects: Arc<dyn ObjectStore>,
}

impl IssueService {
    #[must_use]
    pub fn new(storage: SharedStorage, objects: Arc<dyn ObjectStore>) -> Self {
        Self { storage, objects }
    }

    #[must_use]
    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    /// File a new issue as `principal`, uploading the image first if any.
    ///
    /// # Errors
    ///
    /// Validation errors before anything is written; storage errors if the
    /// image is rejected or the upload fails.
    pub async fn create_issue(&self, principal: &Principal, input: CreateIssueInput) -> Result<Issue> {
        let new_issue = IssueValidator::validate_new(
            input.title.as_deref(),
            input.description.as_deref(),
            input.category.as_deref(),
        )?;

        let image_path = match input.image {
            Some(image) => Some(self.objects.store(image).await?),
            None => None,
        };

        let now = Utc::now();
        let issue = Issue {
            id: Uuid::new_v4().to_string(),
            title: new_issue.title,
            description: new_issue.description,
            category: new_issue.category,
            status: Status::Open,
            image_url: image_path,
            created_by: principal.id.clone(),
            creator: None,
            admin_remarks: String::new(),
            created_at: now,
            updated_at: now,
        };

        let created = {
            let mut storage = lock(&self.storage);
            storage
                .create_issue(&issue, &principal.id)
                .and_then(|()| storage.get_issue(&issue.id))
        };
        let created = match created {
            Ok(created) => created,
            Err(e) => {
                if let Some(path) = issue.image_url.as_deref() {
                    tracing::warn!(
                        path = %path,
                        user_id = %principal.id,
                        error = %e,
                        "issue insert failed, uploaded image left orphaned"
                    );
                }
                return Err(e);
            }
        };
        let Some(created) = created else {
            return Err(FixitError::Other(anyhow::anyhow!(
                "Failed to fetch created issue {}",
                issue.id
            )));
        };

        tracing::info!(
            issue_id = %created.id,
            user_id = %principal.id,
            category = %created.category,
            has_image = created.image_url.is_some(),
            "issue created"
        );
        Ok(self.sign_one(created).await)
    }

    /// Every issue, newest first. Admins only.
    ///
    /// # Errors
    ///
    /// [`FixitError::Forbidden`] for students; database errors otherwise.
    pub async fn list_all_issues(
        &self,
        principal: &Principal,
        filters: IssueFilters,
    ) -> Result<Vec<Issue>> {
        authorize_admin(principal)?;
        let issues = lock(&self.storage).list_issues(&ListFilters::from_request(filters, None))?;
        Ok(self.sign_all(issues).await)
    }

    /// The caller's own issues, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_my_issues(
        &self,
        principal: &Principal,
        filters: IssueFilters,
    ) -> Result<Vec<Issue>> {
        let filters = ListFilters::from_request(filters, Some(&principal.id));
        let issues = lock(&self.storage).list_issues(&filters)?;
        Ok(self.sign_all(issues).await)
    }

    /// One issue, visible to its creator and to admins.
    ///
    /// # Errors
    ///
    /// [`FixitError::IssueNotFound`] if absent, then [`FixitError::Forbidden`]
    /// if the caller neither owns it nor is an admin.
    pub async fn get_issue(&self, principal: &Principal, id: &str) -> Result<Issue> {
        let issue = lock(&self.storage).get_issue(id)?;
        let issue = issue.ok_or_else(|| FixitError::IssueNotFound { id: id.to_string() })?;

        if !principal.is_admin() && !issue.is_owned_by(&principal.id) {
            tracing::debug!(issue_id = %id, user_id = %principal.id, "view denied");
            return Err(FixitError::forbidden(ACCESS_DENIED));
        }

        Ok(self.sign_one(issue).await)
    }

    /// Set the status. Admins only; any status may follow any other.
    ///
    /// # Errors
    ///
    /// [`FixitError::Forbidden`], then a validation error for an unknown
    /// status, then [`FixitError::IssueNotFound`].
    pub async fn update_status(
        &self,
        principal: &Principal,
        id: &str,
        status: Option<&str>,
    ) -> Result<Issue> {
        authorize_admin(principal)?;
        let status = IssueValidator::validate_status(status)?;

        let issue = lock(&self.storage).update_status(id, status, &principal.id)?;
        tracing::info!(issue_id = %id, status = %status, admin = %principal.id, "status updated");
        Ok(self.sign_one(issue).await)
    }

    /// Replace the admin remarks. Admins only; blank clears them.
    ///
    /// # Errors
    ///
    /// [`FixitError::Forbidden`], then [`FixitError::IssueNotFound`].
    pub async fn update_remarks(
        &self,
        principal: &Principal,
        id: &str,
        remarks: Option<&str>,
    ) -> Result<Issue> {
        authorize_admin(principal)?;
        let remarks = IssueValidator::normalize_remarks(remarks);

        let issue = lock(&self.storage).update_remarks(id, &remarks, &principal.id)?;
        tracing::info!(issue_id = %id, admin = %principal.id, "remarks updated");
        Ok(self.sign_one(issue).await)
    }

    async fn sign_one(&self, mut issue: Issue) -> Issue {
        let Some(path) = issue.image_url.clone() else {
            return issue;
        };
        match self.objects.sign_url(&path, SIGNED_URL_TTL).await {
            Ok(url) => issue.image_url = Some(url),
            Err(e) => tracing::warn!(issue_id = %issue.id, error = %e, "Error generating signed URL"),
        }
        issue
    }

    /// Swap stored paths for signed URLs, signing concurrently.
    ///
    /// A failed signature keeps the stored value and logs a warning.
    async fn sign_all(&self, mut issues: Vec<Issue>) -> Vec<Issue> {
        let mut tasks = JoinSet::new();
        for (idx, issue) in issues.iter().enumerate() {
            if let Some(path) = issue.image_url.clone() {
                let objects = Arc::clone(&self.objects);
                tasks.spawn(async move { (idx, objects.sign_url(&path, SIGNED_URL_TTL).await) });
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, Ok(url))) => {
                    if let Some(issue) = issues.get_mut(idx) {
                        issue.image_url = Some(url);
                    }
                }
                Ok((idx, Err(e))) => {
                    let issue_id = issues.get(idx).map(|i| i.id.as_str()).unwrap_or_default();
                    tracing::warn!(issue_id, error = %e, "Error generating signed URL");
                }
                Err(e) => tracing::warn!(error = %e, "signing task failed"),
            }
        }
        issues
    }
}
