//! Disk-backed object store with HMAC-signed links.
//!
//! Signed URLs look like
//! `{public_url}/api/storage/{path}?expires={unix}&signature={hex}` where the
//! signature is HMAC-SHA256 over `"{path}:{expires}"`. The API verifies the
//! signature in constant time before streaming the file.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::ObjectStore;
use crate::error::{FixitError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Message for any signature or expiry failure.
pub const INVALID_LINK: &str = "Link is invalid or has expired";

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    dir: PathBuf,
    public_url: String,
    secret: Vec<u8>,
}

impl LocalObjectStore {
    #[must_use]
    pub fn new(dir: PathBuf, public_url: &str, secret: &[u8]) -> Self {
        Self {
            dir,
            public_url: public_url.trim_end_matches('/').to_string(),
            secret: secret.to_vec(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn mac(&self, path: &str, expires: i64) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| FixitError::storage(format!("Invalid signing key: {e}")))?;
        mac.update(format!("{path}:{expires}").as_bytes());
        Ok(mac)
    }

    /// Hex signature for `path` valid until `expires` (unix seconds).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the key is unusable.
    pub fn signature(&self, path: &str, expires: i64) -> Result<String> {
        Ok(hex::encode(self.mac(path, expires)?.finalize().into_bytes()))
    }

    /// Check a presented signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns [`FixitError::Forbidden`] if the link is expired, tampered
    /// with or signed for another path.
    pub fn verify(&self, path: &str, expires: i64, signature: &str) -> Result<()> {
        if expires < Utc::now().timestamp() {
            return Err(FixitError::forbidden(INVALID_LINK));
        }
        let provided = hex::decode(signature).map_err(|_| FixitError::forbidden(INVALID_LINK))?;
        self.mac(path, expires)?
            .verify_slice(&provided)
            .map_err(|_| FixitError::forbidden(INVALID_LINK))
    }

    /// Resolve a storage path to a file inside the store directory.
    ///
    /// Only single plain file names are accepted.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let candidate = Path::new(path);
        let mut components = candidate.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if !path.contains('\\') => {
                Ok(self.dir.join(name))
            }
            _ => Err(FixitError::not_found("Object not found")),
        }
    }

    /// Read a stored object.
    ///
    /// # Errors
    ///
    /// Returns [`FixitError::NotFound`] if it does not exist.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let file = self.resolve(path)?;
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FixitError::not_found("Object not found"))
            }
            Err(e) => Err(FixitError::storage(format!(
                "Failed to read {}: {e}",
                file.display()
            ))),
        }
    }
}

/// Content type to serve a stored object with, from its extension.
///
/// Only raster formats get an image type. Anything else, SVG included,
/// is served as opaque bytes.
#[must_use]
pub fn content_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// True when the object may be shown inline rather than downloaded.
#[must_use]
pub fn is_inline_image(path: &str) -> bool {
    content_type_for(path) != "application/octet-stream"
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn put_object(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        let file = self.resolve(path)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| FixitError::storage(format!("Failed to upload file: {e}")))?;

        let mut handle = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file)
            .await
            .map_err(|e| FixitError::storage(format!("Failed to upload file: {e}")))?;
        handle
            .write_all(&bytes)
            .await
            .map_err(|e| FixitError::storage(format!("Failed to upload file: {e}")))?;
        handle
            .flush()
            .await
            .map_err(|e| FixitError::storage(format!("Failed to upload file: {e}")))?;
        Ok(())
    }

    async fn sign_path(&self, path: &str, ttl: Duration) -> Result<String> {
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires = Utc::now().timestamp().saturating_add(ttl);
        let signature = self.signature(path, expires)?;
        Ok(format!(
            "{}/api/storage/{path}?expires={expires}&signature={signature}",
            self.public_url
        ))
    }

    fn as_local(&self) -> Option<&Self> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{ImageUpload, SIGNED_URL_TTL};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> LocalObjectStore {
        LocalObjectStore::new(dir.path().join("uploads"), "http://localhost:5000/", b"secret")
    }

    fn query_param<'a>(url: &'a str, name: &str) -> &'a str {
        let query = url.split_once('?').unwrap().1;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix(&format!("{name}=")))
            .unwrap()
    }

    #[tokio::test]
    async fn test_store_read_and_sign() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let path = store
            .store(ImageUpload {
                bytes: vec![0xFF, 0xD8, 0xFF],
                content_type: "image/jpeg".to_string(),
                file_name: Some("Leak Photo.jpg".to_string()),
            })
            .await
            .unwrap();
        assert!(path.starts_with("leak-photo-"));
        assert_eq!(store.read(&path).await.unwrap(), vec![0xFF, 0xD8, 0xFF]);

        let url = store.sign_url(&path, SIGNED_URL_TTL).await.unwrap();
        assert!(url.starts_with(&format!("http://localhost:5000/api/storage/{path}?")));

        let expires: i64 = query_param(&url, "expires").parse().unwrap();
        let signature = query_param(&url, "signature");
        store.verify(&path, expires, signature).unwrap();
    }

    #[tokio::test]
    async fn test_store_accepts_very_long_file_names() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let path = store
            .store(ImageUpload {
                bytes: vec![0x89, 0x50, 0x4E, 0x47],
                content_type: "image/png".to_string(),
                file_name: Some(format!("{}.png", "a".repeat(300))),
            })
            .await
            .unwrap();
        assert!(path.ends_with(".png"));
        assert_eq!(store.read(&path).await.unwrap(), vec![0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn test_svg_is_not_served_inline() {
        assert_eq!(content_type_for("logo-1-2.svg"), "application/octet-stream");
        assert!(!is_inline_image("logo-1-2.svg"));
        assert!(is_inline_image("leak-1-2.PNG"));
        assert_eq!(content_type_for("leak-1-2.PNG"), "image/png");
    }

    #[tokio::test]
    async fn test_put_never_overwrites() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store.put_object("a.png", vec![1], "image/png").await.unwrap();
        assert!(store.put_object("a.png", vec![2], "image/png").await.is_err());
        assert_eq!(store.read("a.png").await.unwrap(), vec![1]);
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let expires = Utc::now().timestamp() + 60;
        let sig = store.signature("a.png", expires).unwrap();

        assert!(store.verify("a.png", expires, &sig).is_ok());
        assert!(store.verify("b.png", expires, &sig).is_err());
        assert!(store.verify("a.png", expires + 1, &sig).is_err());
        assert!(store.verify("a.png", expires, "zz").is_err());

        let other = LocalObjectStore::new(tmp.path().to_path_buf(), "http://x", b"other");
        assert!(other.verify("a.png", expires, &sig).is_err());
    }

    #[test]
    fn test_verify_rejects_expired() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let expires = Utc::now().timestamp() - 1;
        let sig = store.signature("a.png", expires).unwrap();
        let err = store.verify("a.png", expires, &sig).unwrap_err();
        assert!(matches!(err, FixitError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_traversal_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        for bad in ["../secret", "a/b.png", "/etc/passwd", "..", ""] {
            let err = store.read(bad).await.unwrap_err();
            assert!(matches!(err, FixitError::NotFound { .. }), "{bad}");
        }
        assert!(matches!(
            store.read("missing.png").await.unwrap_err(),
            FixitError::NotFound { .. }
        ));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
