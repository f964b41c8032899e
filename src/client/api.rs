//! HTTP transport to the REST API.
//!
//! The client never reads ambient state: every call takes the [`Session`]
//! whose token it should attach. A 401 from the server clears that token.

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{FixitError, Result, ValidationError};
use crate::objects::MAX_IMAGE_BYTES;
use crate::objects::naming::DEFAULT_CONTENT_TYPE;
use crate::server::wire::HealthResponse;

/// The bearer token a request is made with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { token: None }
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn clear(&mut self) {
        self.token = None;
    }
}

/// An image file attached to a new issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

impl ImageFile {
    /// Read a photo from disk, refusing anything the server would reject.
    ///
    /// # Errors
    ///
    /// I/O failures, a non-image extension, or a file over the size limit.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let content_type = match extension.as_str() {
            "jpg" | "jpeg" | "" => DEFAULT_CONTENT_TYPE.to_string(),
            "png" | "gif" | "webp" | "heic" | "bmp" => format!("image/{extension}"),
            other => {
                return Err(FixitError::validation(
                    "image",
                    format!("Only image uploads are allowed (got .{other})"),
                ));
            }
        };

        let bytes = std::fs::read(path)?;
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(FixitError::validation(
                "image",
                "Image exceeds the 5 MB limit",
            ));
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("photo.jpg")
            .to_string();
        Ok(Self {
            bytes,
            file_name,
            content_type,
        })
    }
}

/// Form fields of a new issue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewIssueForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub image: Option<ImageFile>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ValidationError>,
}

/// Typed access to `{api_url}/api`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for `api_url` (without the `/api` suffix).
    ///
    /// # Errors
    ///
    /// Returns a config error if the HTTP client cannot be constructed.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fixit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FixitError::Config(format!("Cannot build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: format!("{}/api", api_url.trim_end_matches('/')),
        })
    }

    /// # Errors
    ///
    /// See [`ApiClient::new`].
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(&config.api_url, config.timeout)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, session: &Session) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{path}", self.base_url));
        match session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and decode. Non-2xx answers become [`FixitError::Api`].
    async fn send(&self, session: &mut Session, builder: RequestBuilder) -> Result<Value> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        if status.is_success() {
            if body.is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_slice(&body)?);
        }

        if status == StatusCode::UNAUTHORIZED && session.is_authenticated() {
            tracing::info!("server rejected the session token, clearing it");
            session.clear();
        }
        Err(api_error(status, &body))
    }

    /// # Errors
    ///
    /// Network failures and non-2xx answers.
    pub async fn get(
        &self,
        session: &mut Session,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value> {
        let builder = self.request(Method::GET, path, session).query(query);
        self.send(session, builder).await
    }

    /// # Errors
    ///
    /// Network failures and non-2xx answers.
    pub async fn post_json(&self, session: &mut Session, path: &str, body: &Value) -> Result<Value> {
        let builder = self.request(Method::POST, path, session).json(body);
        self.send(session, builder).await
    }

    /// # Errors
    ///
    /// Network failures and non-2xx answers.
    pub async fn put_json(&self, session: &mut Session, path: &str, body: &Value) -> Result<Value> {
        let builder = self.request(Method::PUT, path, session).json(body);
        self.send(session, builder).await
    }

    /// `POST /issues` as multipart.
    ///
    /// # Errors
    ///
    /// Network failures, non-2xx answers, or an unusable image content type.
    pub async fn create_issue(&self, session: &mut Session, form: NewIssueForm) -> Result<Value> {
        let mut multipart = Form::new()
            .text("title", form.title)
            .text("description", form.description);
        if !form.category.is_empty() {
            multipart = multipart.text("category", form.category);
        }
        if let Some(image) = form.image {
            let part = Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.content_type)
                .map_err(|e| FixitError::validation("image", format!("Bad content type: {e}")))?;
            multipart = multipart.part("image", part);
        }
        let builder = self
            .request(Method::POST, "/issues", session)
            .multipart(multipart);
        self.send(session, builder).await
    }

    /// `GET /health`.
    ///
    /// # Errors
    ///
    /// Network failures, non-2xx answers, or an unexpected body.
    pub async fn health(&self) -> Result<HealthResponse> {
        let value = self.get(&mut Session::anonymous(), "/health", &[]).await?;
        Ok(serde_json::from_value(value)?)
    }
}

fn transport_error(err: reqwest::Error) -> FixitError {
    tracing::debug!(error = %err, "request failed before a response");
    if err.is_decode() {
        return FixitError::Other(anyhow::anyhow!("Unreadable response: {err}"));
    }
    FixitError::Network {
        detail: err.to_string(),
    }
}

fn api_error(status: StatusCode, body: &[u8]) -> FixitError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed
        .message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
    FixitError::Api {
        status: status.as_u16(),
        message,
        errors: parsed.errors,
    }
}
