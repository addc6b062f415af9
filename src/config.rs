//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.sw-cache/config.toml` (user)
//! 3. `/etc/sw-cache/config.toml` (system)
//!
//! Every field has a default matching the deployed site, so an empty file
//! is a valid configuration.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;

use crate::router::RoutingRules;
use crate::{Result, SwCacheError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub routing: RoutingRules,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Versioned worker settings.
///
/// Bumping either store name is how a deploy forces full cache
/// invalidation: the next activation deletes every store not named here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkerConfig {
    /// Origin the static asset paths are resolved against.
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Name of the store seeded at install time.
    #[serde(default = "default_static_cache")]
    pub static_cache: String,
    /// Name of the store for third-party model assets.
    #[serde(default = "default_model_cache")]
    pub model_cache: String,
    /// Paths seeded into the static store at install time.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            static_cache: default_static_cache(),
            model_cache: default_model_cache(),
            static_assets: default_static_assets(),
        }
    }
}

fn default_origin() -> String {
    "http://localhost:8080".to_string()
}

fn default_static_cache() -> String {
    "portfolio-v1".to_string()
}

fn default_model_cache() -> String {
    "spline-models-v1".to_string()
}

fn default_static_assets() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/og.png", "/profile.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl WorkerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the origin.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Set the static store name.
    pub fn static_cache(mut self, name: impl Into<String>) -> Self {
        self.static_cache = name.into();
        self
    }

    /// Set the model store name.
    pub fn model_cache(mut self, name: impl Into<String>) -> Self {
        self.model_cache = name.into();
        self
    }

    /// Replace the install-time asset list.
    pub fn static_assets<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.static_assets = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Check the settings and return the parsed origin.
    pub fn validate(&self) -> Result<Url> {
        if self.static_cache.is_empty() || self.model_cache.is_empty() {
            return Err(SwCacheError::Configuration(
                "store names must not be empty".to_string(),
            ));
        }
        if self.static_cache == self.model_cache {
            return Err(SwCacheError::Configuration(format!(
                "static and model stores share the name '{}'",
                self.static_cache
            )));
        }
        let origin = Url::parse(&self.origin).map_err(|e| {
            SwCacheError::Configuration(format!("invalid origin '{}': {e}", self.origin))
        })?;
        if origin.cannot_be_a_base() {
            return Err(SwCacheError::Configuration(format!(
                "origin '{}' cannot resolve relative paths",
                self.origin
            )));
        }
        Ok(origin)
    }

    /// Names of the stores this version keeps on activation.
    pub fn expected_stores(&self) -> [&str; 2] {
        [self.static_cache.as_str(), self.model_cache.as_str()]
    }
}

/// Persistent storage location.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Directory for the cache document (default: `~/.cache/sw-cache`).
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured directory, or the default under the user cache dir.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("sw-cache")
        })
    }
}

/// Network settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkConfig {
    /// Per-request timeout in seconds. Unset means no timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl NetworkConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.sw-cache/config.toml`
    /// 3. `/etc/sw-cache/config.toml`
    ///
    /// With no explicit path and no file found, defaults are used.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let Some(path) = Self::resolve_config_path(explicit_path)? else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(&path).map_err(|e| {
            SwCacheError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml_str(&content).map_err(|e| {
            SwCacheError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| SwCacheError::Configuration(e.to_string()))?;
        config.worker.validate()?;
        Ok(config)
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(SwCacheError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".sw-cache").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/sw-cache/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}
