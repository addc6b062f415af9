//! Request classification.
//!
//! Every intercepted request maps to exactly one [`Route`], decided purely
//! from its URL. Rules are checked in fixed priority order, first match
//! wins:
//!
//! 1. host equals the model asset host → [`Route::ModelAsset`]
//! 2. path starts with the API prefix → [`Route::Api`]
//! 3. anything else → [`Route::Static`]

use reqwest::Url;
use serde::Deserialize;

/// Default host serving interactive scene assets.
pub const DEFAULT_MODEL_HOST: &str = "prod.spline.design";

/// Default API path prefix.
pub const DEFAULT_API_PREFIX: &str = "/api/";

/// Routing category of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Third-party model asset: cache-or-fetch-and-store against the model store.
    ModelAsset,
    /// API call: network first, any-store cache fallback.
    Api,
    /// Everything else: any-store cache first, network fallback.
    Static,
}

impl Route {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::ModelAsset => "model_asset",
            Route::Api => "api",
            Route::Static => "static",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification constants.
///
/// Usable from TOML:
///
/// ```toml
/// [routing]
/// model_host = "prod.spline.design"
/// api_prefix = "/api/"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoutingRules {
    /// Host whose assets are cached aggressively.
    #[serde(default = "default_model_host")]
    pub model_host: String,
    /// Path prefix of network-first requests.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

impl Default for RoutingRules {
    fn default() -> Self {
        Self {
            model_host: default_model_host(),
            api_prefix: default_api_prefix(),
        }
    }
}

fn default_model_host() -> String {
    DEFAULT_MODEL_HOST.to_string()
}

fn default_api_prefix() -> String {
    DEFAULT_API_PREFIX.to_string()
}

impl RoutingRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model asset host.
    pub fn model_host(mut self, host: impl Into<String>) -> Self {
        self.model_host = host.into();
        self
    }

    /// Set the API path prefix.
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Classify a URL.
    pub fn classify(&self, url: &Url) -> Route {
        if url.host_str() == Some(self.model_host.as_str()) {
            Route::ModelAsset
        } else if url.path().starts_with(&self.api_prefix) {
            Route::Api
        } else {
            Route::Static
        }
    }
}
