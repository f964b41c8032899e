//! Command implementations.

pub mod account;
pub mod completions;
pub mod health;
pub mod issues;
pub mod serve;

use serde::Serialize;
use std::io::{self, BufRead, IsTerminal};

use crate::client::{ApiClient, SessionContainer};
use crate::config::{self, CliOverrides, ClientConfig};
use crate::error::{FixitError, Result};

/// How results are written to stdout.
#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
    pub use_color: bool,
}

impl OutputOptions {
    #[must_use]
    pub fn detect(json: bool, quiet: bool, no_color: bool) -> Self {
        Self {
            json,
            quiet,
            use_color: !no_color && io::stdout().is_terminal(),
        }
    }

    /// Print human text unless `--quiet`.
    pub fn say(&self, text: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", text.as_ref());
        }
    }
}

/// What every client command runs with.
#[derive(Debug)]
pub struct ClientContext {
    pub api: ApiClient,
    pub session: SessionContainer,
    pub output: OutputOptions,
}

impl ClientContext {
    /// Load config, build the API client and restore the cached session.
    ///
    /// # Errors
    ///
    /// Config files that do not parse, or an HTTP client that cannot be built.
    pub fn load(overrides: &CliOverrides, output: OutputOptions) -> Result<Self> {
        let layer = config::load_config(overrides)?;
        let client_config = ClientConfig::from_layer(&layer)?;
        tracing::debug!(api_url = %client_config.api_url, "client configured");
        Ok(Self {
            api: ApiClient::from_config(&client_config)?,
            session: SessionContainer::restore(&client_config.session_file),
            output,
        })
    }
}

/// Write `value` as pretty JSON on stdout.
///
/// # Errors
///
/// Serialization failures.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Use the flag value, or read one line from stdin.
///
/// # Errors
///
/// Stdin read failures, or an empty password.
pub fn resolve_password(flag: Option<String>) -> Result<String> {
    if let Some(password) = flag {
        return Ok(password);
    }
    if io::stdin().is_terminal() {
        eprint!("Password: ");
    }
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(FixitError::validation("password", "Password is required"));
    }
    Ok(password)
}
