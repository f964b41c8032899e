//! Placeholder backend used when hosted storage credentials are missing.
//!
//! The server still boots; uploads and signing fail when attempted.

use async_trait::async_trait;
use std::time::Duration;

use super::ObjectStore;
use crate::error::{FixitError, Result};

#[derive(Debug, Clone)]
pub struct UnconfiguredObjectStore {
    reason: String,
}

impl UnconfiguredObjectStore {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for UnconfiguredObjectStore {
    fn backend(&self) -> &'static str {
        "unconfigured"
    }

    async fn put_object(&self, _path: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        Err(FixitError::storage(&self.reason))
    }

    async fn sign_path(&self, _path: &str, _ttl: Duration) -> Result<String> {
        Err(FixitError::storage(&self.reason))
    }
}
