//! Supabase-compatible storage REST backend.
//!
//! Every call authenticates with the service role key, which bypasses the
//! bucket's row-level policies; the bucket itself stays private.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;

use super::ObjectStore;
use crate::error::{FixitError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct HostedObjectStore {
    client: Client,
    /// `{project url}/storage/v1`
    endpoint: String,
    service_role_key: String,
    bucket: String,
}

impl fmt::Debug for HostedObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostedObjectStore")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

#[derive(Debug, Deserialize)]
struct StorageErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl HostedObjectStore {
    #[must_use]
    pub fn new(project_url: &str, service_role_key: &str, bucket: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: format!("{}/storage/v1", project_url.trim_end_matches('/')),
            service_role_key: service_role_key.to_string(),
            bucket: bucket.to_string(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/object/{}/{path}", self.endpoint, self.bucket)
    }

    fn sign_url_endpoint(&self, path: &str) -> String {
        format!("{}/object/sign/{}/{path}", self.endpoint, self.bucket)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(AUTHORIZATION, format!("Bearer {}", self.service_role_key))
            .header("apikey", &self.service_role_key)
    }
}

/// Best-effort reason from a failed storage response.
async fn failure_reason(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<StorageErrorBody>(&text)
        .ok()
        .and_then(|body| body.message.or(body.error))
        .unwrap_or_else(|| format!("HTTP {status}"))
}

#[async_trait]
impl ObjectStore for HostedObjectStore {
    fn backend(&self) -> &'static str {
        "hosted"
    }

    async fn put_object(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let response = self
            .authorized(self.client.post(self.object_url(path)))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| FixitError::storage(format!("Failed to upload file: {e}")))?;

        if response.status().is_success() {
            return Ok(());
        }
        let reason = failure_reason(response).await;
        Err(FixitError::storage(format!("Failed to upload file: {reason}")))
    }

    async fn sign_path(&self, path: &str, ttl: Duration) -> Result<String> {
        let response = self
            .authorized(self.client.post(self.sign_url_endpoint(path)))
            .json(&json!({ "expiresIn": ttl.as_secs() }))
            .send()
            .await
            .map_err(|e| FixitError::storage(format!("Failed to sign URL: {e}")))?;

        if !response.status().is_success() {
            let reason = failure_reason(response).await;
            return Err(FixitError::storage(format!("Failed to sign URL: {reason}")));
        }

        let body: SignResponse = response
            .json()
            .await
            .map_err(|e| FixitError::storage(format!("Failed to sign URL: {e}")))?;
        Ok(format!("{}{}", self.endpoint, body.signed_url))
    }
}
