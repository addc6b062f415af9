//! Network access.
//!
//! [`Fetcher`] is the seam between the caching layer and the real network.
//! A fetch **rejects** only when no response could be obtained at all
//! (offline, DNS failure, connection reset). Any HTTP status, including
//! 4xx/5xx, is a successful fetch that yields a [`Response`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::types::{Request, Response};
use crate::{Result, SwCacheError};

/// Performs real network fetches.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetcher name for logging/debugging.
    fn name(&self) -> &str;

    /// Fetch `request` from the network.
    ///
    /// Takes the request by value: a request is spent by one attempt.
    async fn fetch(&self, request: Request) -> Result<Response>;
}

/// [`Fetcher`] backed by `reqwest`.
///
/// No timeout is applied unless one is configured; a hung fetch stays
/// pending for as long as the underlying transport allows.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with no request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(None)
    }

    /// Create a fetcher with an optional per-request timeout.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SwCacheError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, request: Request) -> Result<Response> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let headers: Vec<(String, String)> = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp.bytes().await?;

        debug!(url = %request.url(), status, bytes = body.len(), "network fetch");

        let mut response = Response::new(status, body.to_vec());
        for (name, value) in headers {
            response = response.header(name, value);
        }
        Ok(response)
    }
}
