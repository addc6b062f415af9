//! Named cache stores.
//!
//! Two traits form the storage seam:
//!
//! - [`CacheStorage`] — the registry of named stores (`open`, `keys`,
//!   `delete`, `match_any`). Injected into the worker instead of being
//!   ambient global state.
//! - [`CacheStore`] — one named store mapping a [`RequestKey`] to the most
//!   recent response put under it.
//!
//! Two backends are provided:
//!
//! - [`MemoryCacheStorage`] — moka-backed, process lifetime only.
//! - [`DiskCacheStorage`] — same semantics, persisted to a JSON document.
//!
//! Neither backend evicts on its own. Stores only disappear when deleted by
//! name, which the worker does while activating a new version.

pub mod disk;
pub mod memory;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Method;
use tracing::debug;

use crate::fetch::Fetcher;
use crate::types::{Request, RequestKey, Response};
use crate::{Result, SwCacheError};

/// Registry of named cache stores.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store by name, creating it if absent.
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>>;

    /// Whether a store with this name exists.
    async fn has(&self, name: &str) -> Result<bool>;

    /// Store names in creation order.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Delete a store. Returns `true` if a store was removed.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Look `request` up across every store in creation order.
    async fn match_any(&self, request: &Request) -> Result<Option<Response>>;
}

/// A single named store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store name.
    fn name(&self) -> &str;

    /// Look up the response stored under `request`'s key.
    async fn match_request(&self, request: &Request) -> Result<Option<Response>>;

    /// Store `response` under `request`'s key, overwriting any previous
    /// entry. Only unread responses to GET requests can be stored, and
    /// partial (206) responses are refused.
    async fn put(&self, request: &Request, response: Response) -> Result<()>;

    /// Remove the entry for `request`. Returns `true` if one existed.
    async fn delete(&self, request: &Request) -> Result<bool>;

    /// Keys currently stored. Order is unspecified.
    async fn keys(&self) -> Result<Vec<RequestKey>>;

    /// Number of entries.
    async fn len(&self) -> Result<usize> {
        Ok(self.keys().await?.len())
    }

    /// Whether the store holds no entries.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Fetch every request and store all responses, or none.
    ///
    /// Fetches run concurrently. If any fetch rejects or returns a non-2xx
    /// status, nothing is stored and the first failure is returned.
    async fn add_all(&self, fetcher: &dyn Fetcher, requests: Vec<Request>) -> Result<()> {
        let responses = fetch_all(fetcher, &requests).await?;
        for (request, response) in requests.iter().zip(responses) {
            self.put(request, response).await?;
        }
        debug!(store = self.name(), count = requests.len(), "add_all complete");
        Ok(())
    }
}

/// Fetch every request concurrently, requiring a 2xx for each.
///
/// Returns the responses in request order, or the first failure.
pub(crate) async fn fetch_all(
    fetcher: &dyn Fetcher,
    requests: &[Request],
) -> Result<Vec<Response>> {
    for request in requests {
        check_cacheable_request(request)?;
    }

    let fetches = requests.iter().map(|request| async move {
        let url = request.url().to_string();
        match fetcher.fetch(request.clone()).await {
            Ok(response) if response.ok() => Ok(response),
            Ok(response) => Err(SwCacheError::AddAllFailed {
                url,
                reason: format!("bad status {}", response.status()),
            }),
            Err(e) => Err(SwCacheError::AddAllFailed {
                url,
                reason: e.to_string(),
            }),
        }
    });
    join_all(fetches).await.into_iter().collect()
}

/// Validate a request/response pair before it is written to a store.
pub(crate) fn check_cacheable(request: &Request, response: &Response) -> Result<()> {
    check_cacheable_request(request)?;
    if response.status() == 206 {
        return Err(SwCacheError::PartialResponse);
    }
    if response.body_used() {
        return Err(SwCacheError::BodyAlreadyUsed);
    }
    Ok(())
}

fn check_cacheable_request(request: &Request) -> Result<()> {
    if *request.method() != Method::GET {
        return Err(SwCacheError::UnsupportedMethod(
            request.method().as_str().to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;

    #[test]
    fn post_is_not_cacheable() {
        let req = Request::new(
            Method::POST,
            Url::parse("https://example.com/api/data").unwrap(),
        );
        let err = check_cacheable(&req, &Response::new(200, "")).unwrap_err();
        assert!(matches!(err, SwCacheError::UnsupportedMethod(m) if m == "POST"));
    }

    #[test]
    fn partial_response_is_not_cacheable() {
        let req = Request::parse("https://example.com/video.mp4").unwrap();
        let err = check_cacheable(&req, &Response::new(206, "")).unwrap_err();
        assert!(matches!(err, SwCacheError::PartialResponse));
    }

    #[test]
    fn error_status_is_cacheable_by_put() {
        let req = Request::parse("https://example.com/missing").unwrap();
        assert!(check_cacheable(&req, &Response::new(404, "")).is_ok());
    }
}
