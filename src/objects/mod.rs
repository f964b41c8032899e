//! Object store adapter for issue photos.
//!
//! Issues persist a storage *path*; every read mints a fresh signed URL for it
//! with a one-hour lifetime. Three backends share the [`ObjectStore`] trait:
//!
//! - [`HostedObjectStore`]: a Supabase-compatible storage REST API
//! - [`LocalObjectStore`]: files on disk, served back by the API itself
//! - [`UnconfiguredObjectStore`]: selected when hosted credentials are missing

pub mod hosted;
pub mod local;
pub mod naming;
pub mod unconfigured;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;

pub use hosted::HostedObjectStore;
pub use local::LocalObjectStore;
pub use naming::{MAX_IMAGE_BYTES, check_image, is_absolute_url, unique_object_name};
pub use unconfigured::UnconfiguredObjectStore;

/// Lifetime of every signed URL handed out.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

/// An uploaded image as received from a client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Write `bytes` under `path`. Must not overwrite an existing object.
    async fn put_object(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Mint a URL granting read access to `path` for `ttl`.
    async fn sign_path(&self, path: &str, ttl: Duration) -> Result<String>;

    /// The local backend serves its own objects; the server needs it back.
    fn as_local(&self) -> Option<&LocalObjectStore> {
        None
    }

    /// Check, name and upload an image, returning its storage path.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the payload is rejected or the write fails.
    async fn store(&self, upload: ImageUpload) -> Result<String> {
        check_image(upload.bytes.len(), &upload.content_type)?;
        let path = unique_object_name(upload.file_name.as_deref());
        let size = upload.bytes.len();
        self.put_object(&path, upload.bytes, &upload.content_type)
            .await?;
        tracing::info!(backend = self.backend(), path = %path, size, "stored image");
        Ok(path)
    }

    /// Sign a stored path. Values that are already full URLs pass through.
    ///
    /// # Errors
    ///
    /// Returns a storage error if signing fails.
    async fn sign_url(&self, path: &str, ttl: Duration) -> Result<String> {
        if is_absolute_url(path) {
            return Ok(path.to_string());
        }
        self.sign_path(path, ttl).await
    }
}

/// Pick the backend `storage` describes.
///
/// `public_url` is the base the local backend builds its links on.
#[must_use]
pub fn build_object_store(storage: &StorageConfig, public_url: &str) -> Arc<dyn ObjectStore> {
    match storage.backend {
        StorageBackend::Local => Arc::new(LocalObjectStore::new(
            storage.dir.clone(),
            public_url,
            storage.signing_secret.as_bytes(),
        )),
        StorageBackend::Hosted => {
            match (storage.url.as_deref(), storage.service_role_key.as_deref()) {
                (Some(url), Some(key)) => {
                    Arc::new(HostedObjectStore::new(url, key, &storage.bucket))
                }
                _ => {
                    tracing::warn!(
                        "Hosted storage selected without url and service role key; image uploads will fail"
                    );
                    Arc::new(UnconfiguredObjectStore::new(
                        "Storage configuration error: hosted storage credentials not set",
                    ))
                }
            }
        }
    }
}
