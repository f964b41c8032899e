//! Client session: the signed-in user and token, cached on disk.
//!
//! The cache is a small JSON file holding `{token, user}`. A cache that does
//! not parse is discarded as if nobody were signed in.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::api::{ApiClient, Session};
use crate::auth::AuthResponse;
use crate::error::Result;
use crate::model::{PublicUser, Role};

#[derive(Debug, Serialize, Deserialize)]
struct CachedSession {
    token: String,
    user: PublicUser,
}

#[derive(Debug)]
pub struct SessionContainer {
    user: Option<PublicUser>,
    session: Session,
    cache_file: PathBuf,
}

impl SessionContainer {
    /// An empty container backed by `cache_file`.
    #[must_use]
    pub fn new(cache_file: impl Into<PathBuf>) -> Self {
        Self {
            user: None,
            session: Session::anonymous(),
            cache_file: cache_file.into(),
        }
    }

    /// Load the cached session, if any.
    ///
    /// Never fails: a missing file means signed out, an unreadable one is
    /// logged, and a corrupt one is removed.
    #[must_use]
    pub fn restore(cache_file: impl Into<PathBuf>) -> Self {
        let mut container = Self::new(cache_file);
        let contents = match fs::read_to_string(&container.cache_file) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return container,
            Err(e) => {
                tracing::warn!(path = %container.cache_file.display(), error = %e, "cannot read session cache");
                return container;
            }
        };

        match serde_json::from_str::<CachedSession>(&contents) {
            Ok(cached) => {
                tracing::debug!(user = %cached.user.email, "session restored");
                container.session.set_token(cached.token);
                container.user = Some(cached.user);
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding corrupt session cache");
                evict(&container.cache_file);
            }
        }
        container
    }

    #[must_use]
    pub const fn user(&self) -> Option<&PublicUser> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.session.token()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    #[must_use]
    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// The token holder to pass to [`ApiClient`] calls.
    pub const fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Drop the user once the token has been invalidated by a 401.
    pub fn reconcile(&mut self) {
        if !self.session.is_authenticated() && self.user.is_some() {
            self.user = None;
            evict(&self.cache_file);
        }
    }

    /// # Errors
    ///
    /// API failures, or the cache cannot be written.
    pub async fn login(&mut self, api: &ApiClient, email: &str, password: &str) -> Result<&PublicUser> {
        let body = json!({ "email": email, "password": password });
        let value = api
            .post_json(&mut Session::anonymous(), "/auth/login", &body)
            .await?;
        self.accept(serde_json::from_value(value)?)
    }

    /// # Errors
    ///
    /// API failures, or the cache cannot be written.
    pub async fn register(
        &mut self,
        api: &ApiClient,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<&PublicUser> {
        let body = json!({ "name": name, "email": email, "password": password });
        let value = api
            .post_json(&mut Session::anonymous(), "/auth/register", &body)
            .await?;
        self.accept(serde_json::from_value(value)?)
    }

    fn accept(&mut self, response: AuthResponse) -> Result<&PublicUser> {
        self.persist(&response)?;
        self.session.set_token(response.token);
        tracing::info!(user = %response.user.email, role = %response.user.role, "signed in");
        Ok(self.user.insert(response.user))
    }

    fn persist(&self, response: &AuthResponse) -> Result<()> {
        if let Some(parent) = self.cache_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let cached = CachedSession {
            token: response.token.clone(),
            user: response.user.clone(),
        };
        fs::write(&self.cache_file, serde_json::to_vec_pretty(&cached)?)?;
        Ok(())
    }

    /// Sign out locally. State clears first; cache removal is best effort.
    pub async fn logout(&mut self) {
        self.session.clear();
        self.user = None;

        match tokio::fs::remove_file(&self.cache_file).await {
            Ok(()) => tracing::debug!("session cache removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::error!(path = %self.cache_file.display(), error = %e, "cannot remove session cache");
            }
        }
    }
}

fn evict(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "cannot remove session cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn response() -> AuthResponse {
        AuthResponse {
            token: "tok".into(),
            user: PublicUser {
                id: "u1".into(),
                name: "Alice".into(),
                email: "alice@example.com".into(),
                role: Role::Admin,
            },
        }
    }

    #[test]
    fn test_restore_missing_cache() {
        let dir = TempDir::new().unwrap();
        let container = SessionContainer::restore(dir.path().join("session.json"));
        assert!(!container.is_authenticated());
        assert!(container.user().is_none());
    }

    #[test]
    fn test_accept_persists_and_restores() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let mut container = SessionContainer::new(&path);
        container.accept(response()).unwrap();
        assert_eq!(container.token(), Some("tok"));

        let restored = SessionContainer::restore(&path);
        assert_eq!(restored.token(), Some("tok"));
        assert_eq!(restored.role(), Some(Role::Admin));
    }

    #[test]
    fn test_corrupt_cache_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let container = SessionContainer::restore(&path);
        assert!(!container.is_authenticated());
        assert!(!path.exists());
    }

    #[test]
    fn test_reconcile_after_token_cleared() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let mut container = SessionContainer::new(&path);
        container.accept(response()).unwrap();

        container.session_mut().clear();
        container.reconcile();
        assert!(container.user().is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_logout_clears_state_and_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let mut container = SessionContainer::new(&path);
        container.accept(response()).unwrap();

        container.logout().await;
        assert!(!container.is_authenticated());
        assert!(container.user().is_none());
        assert!(!path.exists());

        // Second logout with no cache is quiet.
        container.logout().await;
    }
}
