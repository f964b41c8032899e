//! Configuration management for `campus_fixit`.
//!
//! Configuration sources (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`FIXIT_*`, plus the bare names a deployment
//!    `.env` commonly carries, e.g. `JWT_SECRET`, `SUPABASE_URL`)
//! 3. `.env` in the working directory (never overrides the real environment)
//! 4. Project config (`./fixit.yaml`, or the `--config` path)
//! 5. User config (`~/.config/fixit/config.yaml`)
//! 6. Defaults
//!
//! Every source is flattened to dotted keys (`storage.bucket`,
//! `jwt.expires-in`) in a [`ConfigLayer`]; typed views ([`ServerConfig`],
//! [`ClientConfig`]) are built from the merged layer.

use crate::error::{FixitError, Result};
use crate::util::time::parse_duration_spec;
use crate::util::user_config_dir;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BUCKET: &str = "campus-fixit-uploads";
pub const DEFAULT_ADMIN_NAME: &str = "Campus Admin";
pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const PROJECT_CONFIG_FILE: &str = "fixit.yaml";
const ENV_PREFIX: &str = "FIXIT_";

/// Bare environment names mapped onto config keys.
const ENV_ALIASES: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("DATABASE_URL", "database.url"),
    ("JWT_SECRET", "jwt.secret"),
    ("JWT_EXPIRES_IN", "jwt.expires-in"),
    ("SUPABASE_URL", "storage.url"),
    ("SUPABASE_SERVICE_ROLE_KEY", "storage.service-role-key"),
    ("SUPABASE_STORAGE_BUCKET", "storage.bucket"),
    ("CLIENT_URL", "cors.origin"),
    ("ADMIN_NAME", "admin.name"),
    ("ADMIN_EMAIL", "admin.email"),
    ("ADMIN_PASSWORD", "admin.password"),
];

/// A flattened configuration source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    /// Look a key up; blank values count as unset.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&normalize_key(key))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from `KEY=value` pairs.
    ///
    /// `FIXIT_STORAGE_BUCKET` lands on `storage.bucket`: the known section
    /// name is split off, remaining underscores become dashes.
    #[must_use]
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut layer = Self::default();
        let mut aliased = Vec::new();

        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layer.set(&env_key_to_config_key(stripped), value);
            } else if let Some((_, target)) = ENV_ALIASES.iter().find(|(name, _)| *name == key) {
                aliased.push((*target, value));
            }
        }

        // Prefixed names win over bare aliases.
        for (target, value) in aliased {
            layer
                .values
                .entry(normalize_key(target))
                .or_insert(value);
        }

        layer
    }

    /// Build a layer from a dotenv file, without touching the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed.
    pub fn from_dotenv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let iter = dotenvy::from_path_iter(path)
            .map_err(|e| FixitError::Config(format!("{}: {e}", path.display())))?;
        let mut vars = Vec::new();
        for item in iter {
            let pair = item.map_err(|e| FixitError::Config(format!("{}: {e}", path.display())))?;
            vars.push(pair);
        }
        Ok(Self::from_vars(vars))
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub api_url: Option<String>,
    pub session_file: Option<PathBuf>,
    pub bind: Option<String>,
    pub database: Option<String>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(url) = &self.api_url {
            layer.set("client.api-url", url.clone());
        }
        if let Some(path) = &self.session_file {
            layer.set("client.session-file", path.to_string_lossy().to_string());
        }
        if let Some(bind) = &self.bind {
            layer.set("server.bind", bind.clone());
            // An explicit bind clears any port picked up from the environment.
            layer.set("server.port", "");
        }
        if let Some(database) = &self.database {
            layer.set("database.url", database.clone());
        }

        layer
    }
}

/// Load user config (`~/.config/fixit/config.yaml`).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Some(dir) = user_config_dir() else {
        return Ok(ConfigLayer::default());
    };
    ConfigLayer::from_yaml(&dir.join("config.yaml"))
}

/// Load project config: the explicit path if given (must exist), else
/// `./fixit.yaml` if present.
///
/// # Errors
///
/// Returns an error if an explicit path is missing, or a file cannot be parsed.
pub fn load_project_config(explicit: Option<&Path>) -> Result<ConfigLayer> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(FixitError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            ConfigLayer::from_yaml(path)
        }
        None => ConfigLayer::from_yaml(Path::new(PROJECT_CONFIG_FILE)),
    }
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer.set("server.bind", format!("0.0.0.0:{DEFAULT_PORT}"));
    layer.set("database.url", "fixit.db");
    layer.set("jwt.expires-in", "7d");
    layer.set("storage.bucket", DEFAULT_BUCKET);
    layer.set("storage.dir", "uploads");
    layer.set("rate-limit.window", "900");
    layer.set("rate-limit.max", "100");
    layer.set("cors.origin", "*");
    layer.set("admin.name", DEFAULT_ADMIN_NAME);
    layer.set("client.api-url", DEFAULT_API_URL);
    layer.set("client.timeout", "10s");
    layer
}

/// Load configuration with the full precedence chain.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_config(cli: &CliOverrides) -> Result<ConfigLayer> {
    let defaults = default_config_layer();
    let user = load_user_config()?;
    let project = load_project_config(cli.config.as_deref())?;
    let dotenv = ConfigLayer::from_dotenv(Path::new(".env"))?;
    let env_layer = ConfigLayer::from_env();
    let cli_layer = cli.as_layer();

    Ok(ConfigLayer::merge_layers(&[
        defaults, user, project, dotenv, env_layer, cli_layer,
    ]))
}

/// Where uploaded images live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Files on local disk, served back through signed `/api/storage` URLs.
    Local,
    /// A Supabase-compatible storage REST API.
    Hosted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub url: Option<String>,
    pub service_role_key: Option<String>,
    pub bucket: String,
    pub dir: PathBuf,
    pub signing_secret: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub window: Duration,
    pub max_requests: usize,
}

/// Credentials for the admin account created on first boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub name: String,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Everything `fixit serve` needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub database_url: String,
    /// Base URL local signed links are built on.
    pub public_url: String,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitSettings,
    pub cors_origin: String,
    pub admin: AdminSeed,
}

impl ServerConfig {
    /// Defaults around a given token secret, with an in-memory database.
    #[must_use]
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        let jwt_secret = jwt_secret.into();
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            database_url: ":memory:".to_string(),
            public_url: format!("http://localhost:{DEFAULT_PORT}"),
            storage: StorageConfig {
                backend: StorageBackend::Local,
                url: None,
                service_role_key: None,
                bucket: DEFAULT_BUCKET.to_string(),
                dir: PathBuf::from("uploads"),
                signing_secret: jwt_secret.clone(),
            },
            jwt_secret,
            jwt_expires_in: Duration::from_secs(7 * 24 * 60 * 60),
            rate_limit: RateLimitSettings {
                window: Duration::from_secs(900),
                max_requests: 100,
            },
            cors_origin: "*".to_string(),
            admin: AdminSeed {
                name: DEFAULT_ADMIN_NAME.to_string(),
                email: None,
                password: None,
            },
        }
    }

    /// Build the typed view from a merged layer.
    ///
    /// # Errors
    ///
    /// Returns a config error if the token secret is missing or a value does
    /// not parse.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let jwt_secret = layer
            .get("jwt.secret")
            .ok_or_else(|| {
                FixitError::Config(
                    "jwt.secret is required to serve (set FIXIT_JWT_SECRET or JWT_SECRET)"
                        .to_string(),
                )
            })?
            .to_string();

        let bind = resolve_bind(layer)?;
        let public_url = layer.get("server.public-url").map_or_else(
            || format!("http://localhost:{}", bind.port()),
            |url| url.trim_end_matches('/').to_string(),
        );

        let storage_url = layer.get("storage.url").map(ToString::to_string);
        let backend = match layer.get("storage.backend") {
            Some("local") => StorageBackend::Local,
            Some("hosted" | "supabase") => StorageBackend::Hosted,
            Some(other) => {
                return Err(FixitError::Config(format!(
                    "storage.backend must be 'local' or 'hosted', got '{other}'"
                )));
            }
            None if storage_url.is_some() => StorageBackend::Hosted,
            None => StorageBackend::Local,
        };

        Ok(Self {
            bind,
            database_url: layer.get("database.url").unwrap_or(":memory:").to_string(),
            public_url,
            jwt_expires_in: config_duration(layer, "jwt.expires-in", "7d")?,
            storage: StorageConfig {
                backend,
                url: storage_url,
                service_role_key: layer
                    .get("storage.service-role-key")
                    .map(ToString::to_string),
                bucket: layer
                    .get("storage.bucket")
                    .unwrap_or(DEFAULT_BUCKET)
                    .to_string(),
                dir: PathBuf::from(layer.get("storage.dir").unwrap_or("uploads")),
                signing_secret: layer
                    .get("storage.signing-secret")
                    .unwrap_or(&jwt_secret)
                    .to_string(),
            },
            jwt_secret,
            rate_limit: RateLimitSettings {
                window: config_duration(layer, "rate-limit.window", "900")?,
                max_requests: config_number(layer, "rate-limit.max", 100)?,
            },
            cors_origin: layer.get("cors.origin").unwrap_or("*").to_string(),
            admin: AdminSeed {
                name: layer
                    .get("admin.name")
                    .unwrap_or(DEFAULT_ADMIN_NAME)
                    .to_string(),
                email: layer.get("admin.email").map(ToString::to_string),
                password: layer.get("admin.password").map(ToString::to_string),
            },
        })
    }
}

/// Everything the client subcommands need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Build the typed view from a merged layer.
    ///
    /// # Errors
    ///
    /// Returns a config error if the timeout does not parse.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let session_file = layer.get("client.session-file").map_or_else(
            || {
                user_config_dir()
                    .unwrap_or_else(|| PathBuf::from(".fixit"))
                    .join("session.json")
            },
            PathBuf::from,
        );

        Ok(Self {
            api_url: layer
                .get("client.api-url")
                .unwrap_or(DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            timeout: config_duration(layer, "client.timeout", "10s")?,
            session_file,
        })
    }
}

fn resolve_bind(layer: &ConfigLayer) -> Result<SocketAddr> {
    // A bare port (from PORT or server.port) keeps the all-interfaces host.
    if let Some(port) = layer.get("server.port") {
        let port: u16 = port
            .parse()
            .map_err(|_| FixitError::Config(format!("server.port is not a port: '{port}'")))?;
        return Ok(SocketAddr::from(([0, 0, 0, 0], port)));
    }
    let raw = layer.get("server.bind").unwrap_or("0.0.0.0:5000");
    raw.parse()
        .map_err(|_| FixitError::Config(format!("server.bind is not an address: '{raw}'")))
}

fn config_duration(layer: &ConfigLayer, key: &str, default: &str) -> Result<Duration> {
    let raw = layer.get(key).unwrap_or(default);
    parse_duration_spec(raw, key).map_err(|e| FixitError::Config(format!("{key}: {e}")))
}

fn config_number(layer: &ConfigLayer, key: &str, default: usize) -> Result<usize> {
    layer.get(key).map_or(Ok(default), |raw| {
        raw.parse()
            .map_err(|_| FixitError::Config(format!("{key} is not a number: '{raw}'")))
    })
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

/// Config sections; env names are split on the section they start with.
const SECTIONS: &[&str] = &[
    "rate_limit", "server", "database", "jwt", "storage", "cors", "admin", "client",
];

/// `STORAGE_SERVICE_ROLE_KEY` -> `storage.service-role-key`.
fn env_key_to_config_key(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let split = SECTIONS.iter().find_map(|section| {
        lower
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
            .map(|rest| (*section, rest))
    });
    match split {
        Some((section, rest)) => format!("{section}.{rest}").replace('_', "-"),
        None => lower.replace('_', "-"),
    }
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let mut flat = HashMap::new();
    flatten_yaml(value, "", &mut flat);

    for (key, value) in flat {
        layer.set(&key, value);
    }

    layer
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
