//! Shared utilities for `campus_fixit`.
//!
//! - Duration specs and RFC3339 timestamps
//! - Home-relative paths for user config and the session cache

pub mod time;

use std::env;
use std::path::PathBuf;

/// `$HOME/.config/fixit`, or `None` when `HOME` is unset.
#[must_use]
pub fn user_config_dir() -> Option<PathBuf> {
    let home = env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".config").join("fixit"))
}
