//! Object naming and pre-upload checks.

use rand::Rng;

use crate::error::{FixitError, Result};

/// Largest accepted image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub const DEFAULT_EXTENSION: &str = ".jpg";

/// Longest sanitized stem kept in an object name.
pub const MAX_STEM_CHARS: usize = 100;

/// Longest extension kept, dot included.
pub const MAX_EXTENSION_CHARS: usize = 10;
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Reject payloads that are too large or not images. Runs before any upload.
///
/// # Errors
///
/// Returns a storage error describing the rejection.
pub fn check_image(len: usize, content_type: &str) -> Result<()> {
    if !content_type.trim().to_ascii_lowercase().starts_with("image/") {
        return Err(FixitError::storage("Only image uploads are allowed"));
    }
    if len > MAX_IMAGE_BYTES {
        return Err(FixitError::storage(format!(
            "Image exceeds the {} MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    if len == 0 {
        return Err(FixitError::storage("Image is empty"));
    }
    Ok(())
}

/// Split a client file name into a sanitized stem and extension (with dot).
///
/// Directories are dropped, whitespace runs become `-`, the stem is
/// lowercased and anything outside `[a-z0-9._-]` is removed. A missing
/// extension becomes [`DEFAULT_EXTENSION`]. The stem is cut to
/// [`MAX_STEM_CHARS`] and the extension to [`MAX_EXTENSION_CHARS`].
#[must_use]
pub fn split_name(original: Option<&str>) -> (String, String) {
    let original = original.unwrap_or("image");
    let file = original.rsplit(['/', '\\']).next().unwrap_or(original);

    let (stem, ext) = match file.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < file.len() => (&file[..idx], &file[idx..]),
        _ => (file, ""),
    };

    let ext: String = ext
        .chars()
        .filter(|c| *c == '.' || c.is_ascii_alphanumeric())
        .take(MAX_EXTENSION_CHARS)
        .collect::<String>()
        .to_ascii_lowercase();
    let ext = if ext.len() > 1 {
        ext
    } else {
        DEFAULT_EXTENSION.to_string()
    };

    let mut base = String::with_capacity(stem.len());
    let mut in_space = false;
    for c in stem.chars() {
        if c.is_whitespace() {
            if !in_space {
                base.push('-');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        for lower in c.to_lowercase() {
            if lower.is_ascii_alphanumeric() || matches!(lower, '-' | '_' | '.') {
                base.push(lower);
            }
        }
    }
    let base: String = base
        .trim_matches('.')
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();
    let base = base.trim_end_matches('.').to_string();
    let base = if base.is_empty() {
        "image".to_string()
    } else {
        base
    };

    (base, ext)
}

/// Deterministic part of [`unique_object_name`].
#[must_use]
pub fn object_name(original: Option<&str>, millis: i64, suffix: u64) -> String {
    let (base, ext) = split_name(original);
    format!("{base}-{millis}-{suffix}{ext}")
}

/// A collision-resistant name: `{stem}-{unix millis}-{random}{ext}`.
#[must_use]
pub fn unique_object_name(original: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u64 = rand::rng().random_range(0..1_000_000_000);
    object_name(original, millis, suffix)
}

/// True for values that are already full URLs rather than storage paths.
#[must_use]
pub fn is_absolute_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
