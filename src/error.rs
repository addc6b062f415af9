//! sw-cache error types

/// sw-cache error types
#[derive(Debug, thiserror::Error)]
pub enum SwCacheError {
    // Network errors
    /// The fetch itself rejected (offline, DNS, connection reset).
    /// HTTP error statuses are responses, not errors.
    #[error("network error: {0}")]
    Network(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    // Body errors
    #[error("response body already used")]
    BodyAlreadyUsed,

    // Store errors
    #[error("request method '{0}' is unsupported by the cache")]
    UnsupportedMethod(String),

    #[error("partial (206) responses cannot be cached")]
    PartialResponse,

    #[error("failed to add {url} to cache: {reason}")]
    AddAllFailed { url: String, reason: String },

    #[error("storage error: {0}")]
    Storage(String),

    // Lifecycle errors
    #[error("install failed: {0}")]
    InstallFailed(Box<SwCacheError>),

    #[error("invalid worker state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SwCacheError {
    /// Whether this error is a network rejection.
    ///
    /// Only network rejections trigger the cache fallback in the
    /// network-first strategy.
    pub fn is_network(&self) -> bool {
        matches!(self, SwCacheError::Network(_))
    }
}

impl From<reqwest::Error> for SwCacheError {
    fn from(err: reqwest::Error) -> Self {
        SwCacheError::Network(err.to_string())
    }
}

impl From<std::io::Error> for SwCacheError {
    fn from(err: std::io::Error) -> Self {
        SwCacheError::Storage(err.to_string())
    }
}

/// Result type alias for sw-cache operations
pub type Result<T> = std::result::Result<T, SwCacheError>;
