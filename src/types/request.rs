//! Intercepted request snapshot and its cache identity.

use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

use crate::{Result, SwCacheError};

/// A read-only snapshot of an outgoing request.
///
/// [`Fetcher::fetch`](crate::Fetcher::fetch) takes the request by value:
/// a request is spent by a network attempt. Any path that both consults a
/// cache and may fall back to the network must `clone()` first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Vec<(String, String)>,
}

impl Request {
    /// Create a request with an explicit method.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
        }
    }

    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Parse an absolute URL into a GET request.
    pub fn parse(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| SwCacheError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self::get(url))
    }

    /// Resolve `path` against `origin` into a GET request.
    ///
    /// Used for the install-time asset list, which is expressed as
    /// origin-relative paths. An absolute `path` is taken as-is.
    pub fn resolve(origin: &Url, path: &str) -> Result<Self> {
        let url = origin
            .join(path)
            .map_err(|e| SwCacheError::InvalidUrl(format!("{path}: {e}")))?;
        Ok(Self::get(url))
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The identity under which a store keeps this request's response.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }
}

/// Cache identity of a request: method + URL (fragment excluded).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.as_str().to_ascii_uppercase(),
            url: url.into(),
        }
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}
