//! Client-side issue lists.
//!
//! Holds the signed-in user's issues and, for admins, every issue. Each
//! operation records its failure message in `error` as well as returning it.

use serde_json::{Value, json};

use super::api::{ApiClient, NewIssueForm};
use super::normalize::{ClientIssue, ClientStatus, normalize_issue, normalize_issues};
use super::session::SessionContainer;
use crate::error::Result;
use crate::model::Role;

/// Filters applied to both list fetches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientFilters {
    pub status: Option<ClientStatus>,
    pub category: Option<String>,
}

impl ClientFilters {
    /// Query pairs in the server's spelling; unset filters are omitted.
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(status) = self.status {
            query.push(("status", status.to_server().as_str().to_string()));
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            query.push(("category", category.to_string()));
        }
        query
    }
}

#[derive(Debug, Default)]
pub struct IssueList {
    pub my_issues: Vec<ClientIssue>,
    pub all_issues: Vec<ClientIssue>,
    pub filters: ClientFilters,
    pub error: Option<String>,
}

impl IssueList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_filters(&mut self, filters: ClientFilters) {
        self.filters = filters;
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn record<T>(&mut self, result: Result<T>, fallback: &str) -> Result<T> {
        if let Err(e) = &result {
            let message = e.to_string();
            self.error = Some(if message.is_empty() {
                fallback.to_string()
            } else {
                message
            });
        }
        result
    }

    /// # Errors
    ///
    /// Network and API failures; the message is also kept in `error`.
    pub async fn fetch_my_issues(
        &mut self,
        api: &ApiClient,
        session: &mut SessionContainer,
    ) -> Result<&[ClientIssue]> {
        self.clear_error();
        let query = self.filters.to_query();
        let result = api.get(session.session_mut(), "/issues/my", &query).await;
        session.reconcile();
        let value = self.record(result, "Failed to fetch issues")?;
        self.my_issues = normalize_issues(&value);
        Ok(&self.my_issues)
    }

    /// Admin only on the server side.
    ///
    /// # Errors
    ///
    /// Network and API failures; the message is also kept in `error`.
    pub async fn fetch_all_issues(
        &mut self,
        api: &ApiClient,
        session: &mut SessionContainer,
    ) -> Result<&[ClientIssue]> {
        self.clear_error();
        let query = self.filters.to_query();
        let result = api.get(session.session_mut(), "/issues", &query).await;
        session.reconcile();
        let value = self.record(result, "Failed to fetch issues")?;
        self.all_issues = normalize_issues(&value);
        Ok(&self.all_issues)
    }

    /// # Errors
    ///
    /// Network and API failures; the message is also kept in `error`.
    pub async fn fetch_issue(
        &mut self,
        api: &ApiClient,
        session: &mut SessionContainer,
        id: &str,
    ) -> Result<ClientIssue> {
        self.clear_error();
        let result = api.get(session.session_mut(), &format!("/issues/{id}"), &[]).await;
        session.reconcile();
        let value = self.record(result, "Failed to fetch issue")?;
        Ok(normalize_issue(&value))
    }

    /// Create, prepend to `my_issues`, then refresh that list.
    ///
    /// A failed refresh is logged; the created issue is still returned.
    ///
    /// # Errors
    ///
    /// Network and API failures of the create call.
    pub async fn create_issue(
        &mut self,
        api: &ApiClient,
        session: &mut SessionContainer,
        form: NewIssueForm,
    ) -> Result<ClientIssue> {
        self.clear_error();
        let result = api.create_issue(session.session_mut(), form).await;
        session.reconcile();
        let value = self.record(result, "Failed to create issue")?;

        let issue = normalize_issue(&value);
        self.my_issues.insert(0, issue.clone());
        if let Err(e) = self.fetch_my_issues(api, session).await {
            tracing::warn!(error = %e, "refresh after create failed");
        }
        Ok(issue)
    }

    /// # Errors
    ///
    /// Network and API failures; the message is also kept in `error`.
    pub async fn update_status(
        &mut self,
        api: &ApiClient,
        session: &mut SessionContainer,
        id: &str,
        status: ClientStatus,
    ) -> Result<ClientIssue> {
        self.clear_error();
        let body = json!({ "status": status.to_server().as_str() });
        let result = api
            .put_json(session.session_mut(), &format!("/issues/{id}/status"), &body)
            .await;
        session.reconcile();
        let value = self.record(result, "Failed to update status")?;
        Ok(self.update_local_issue(&value, session.role()))
    }

    /// # Errors
    ///
    /// Network and API failures; the message is also kept in `error`.
    pub async fn update_remarks(
        &mut self,
        api: &ApiClient,
        session: &mut SessionContainer,
        id: &str,
        remarks: &str,
    ) -> Result<ClientIssue> {
        self.clear_error();
        let body = json!({ "adminRemarks": remarks });
        let result = api
            .put_json(session.session_mut(), &format!("/issues/{id}/remarks"), &body)
            .await;
        session.reconcile();
        let value = self.record(result, "Failed to update remarks")?;
        Ok(self.update_local_issue(&value, session.role()))
    }

    /// Replace the matching entry in the list that `role` looks at.
    pub fn update_local_issue(&mut self, value: &Value, role: Option<Role>) -> ClientIssue {
        let issue = normalize_issue(value);
        let list = if role == Some(Role::Admin) {
            &mut self.all_issues
        } else {
            &mut self.my_issues
        };
        if let Some(slot) = list.iter_mut().find(|existing| existing.id == issue.id) {
            *slot = issue.clone();
        }
        issue
    }

    /// Look up an issue already held locally.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&ClientIssue> {
        self.my_issues
            .iter()
            .chain(self.all_issues.iter())
            .find(|issue| issue.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FixitError;

    fn issue(id: &str, status: &str) -> Value {
        json!({"id": id, "title": "t", "description": "d", "category": "Water", "status": status})
    }

    #[test]
    fn test_filters_to_query_uses_server_form() {
        let filters = ClientFilters {
            status: Some(ClientStatus::InProgress),
            category: Some("Water".into()),
        };
        assert_eq!(
            filters.to_query(),
            vec![
                ("status", "In Progress".to_string()),
                ("category", "Water".to_string())
            ]
        );
        assert!(ClientFilters::default().to_query().is_empty());
        let blank = ClientFilters {
            status: None,
            category: Some("  ".into()),
        };
        assert!(blank.to_query().is_empty());
    }

    #[test]
    fn test_update_local_issue_targets_role_list() {
        let mut list = IssueList::new();
        list.my_issues = normalize_issues(&json!([issue("a", "Open")]));
        list.all_issues = normalize_issues(&json!([issue("a", "Open"), issue("b", "Open")]));

        let updated = list.update_local_issue(&issue("a", "Resolved"), Some(Role::Admin));
        assert_eq!(updated.status, ClientStatus::Resolved);
        assert_eq!(list.all_issues[0].status, ClientStatus::Resolved);
        assert_eq!(list.my_issues[0].status, ClientStatus::Open);

        list.update_local_issue(&issue("a", "In Progress"), Some(Role::Student));
        assert_eq!(list.my_issues[0].status, ClientStatus::InProgress);
    }

    #[test]
    fn test_update_local_issue_ignores_unknown_id() {
        let mut list = IssueList::new();
        list.my_issues = normalize_issues(&json!([issue("a", "Open")]));
        list.update_local_issue(&issue("zzz", "Resolved"), None);
        assert_eq!(list.my_issues.len(), 1);
        assert_eq!(list.my_issues[0].status, ClientStatus::Open);
    }

    #[test]
    fn test_record_keeps_message() {
        let mut list = IssueList::new();
        let result: Result<()> = Err(FixitError::Network {
            detail: "refused".into(),
        });
        assert!(list.record(result, "Failed to fetch issues").is_err());
        assert_eq!(
            list.error.as_deref(),
            Some("Cannot connect to server. Make sure the backend is running.")
        );
        list.clear_error();
        assert!(list.error.is_none());
    }
}
