//! Tests for the three fetch strategies.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{MockFetcher, req};
use sw_cache::strategy::{cache_first, cache_or_fetch_and_store, network_first};
use sw_cache::{
    CacheStorage, CacheStore, MemoryCacheStorage, Request, RequestKey, Response, Result,
    SwCacheError,
};

const MODEL_URL: &str = "https://prod.spline.design/abc/scene.splinecode";
const MODEL_STORE: &str = "spline-models-v1";

// =========================================================================
// cache_or_fetch_and_store
// =========================================================================

#[tokio::test]
async fn model_asset_hit_avoids_network() {
    let storage = MemoryCacheStorage::new();
    let fetcher = MockFetcher::new();
    fetcher.serve(MODEL_URL, 200, b"\x00\x01scene-bytes".to_vec());

    let mut first = cache_or_fetch_and_store(&storage, MODEL_STORE, &fetcher, req(MODEL_URL))
        .await
        .unwrap();
    let first_body = first.bytes().unwrap();
    assert_eq!(fetcher.calls(), 1);

    let mut second = cache_or_fetch_and_store(&storage, MODEL_STORE, &fetcher, req(MODEL_URL))
        .await
        .unwrap();
    assert_eq!(fetcher.calls(), 1, "second request must not hit the network");
    assert_eq!(second.bytes().unwrap(), first_body);
}

#[tokio::test]
async fn model_asset_miss_writes_through_to_dedicated_store() {
    let storage = MemoryCacheStorage::new();
    let fetcher = MockFetcher::new();
    fetcher.serve(MODEL_URL, 200, "scene");

    cache_or_fetch_and_store(&storage, MODEL_STORE, &fetcher, req(MODEL_URL))
        .await
        .unwrap();

    assert_eq!(storage.keys().await.unwrap(), vec![MODEL_STORE]);
    let store = storage.open(MODEL_STORE).await.unwrap();
    let mut cached = store.match_request(&req(MODEL_URL)).await.unwrap().unwrap();
    assert_eq!(cached.text().unwrap(), "scene");
}

#[tokio::test]
async fn model_asset_is_served_forever_once_cached() {
    let storage = MemoryCacheStorage::new();
    let fetcher = MockFetcher::new();
    fetcher.serve(MODEL_URL, 200, "v1");

    cache_or_fetch_and_store(&storage, MODEL_STORE, &fetcher, req(MODEL_URL))
        .await
        .unwrap();

    // Upstream changes, but the cached copy has no expiry.
    fetcher.serve(MODEL_URL, 200, "v2");
    let mut resp = cache_or_fetch_and_store(&storage, MODEL_STORE, &fetcher, req(MODEL_URL))
        .await
        .unwrap();
    assert_eq!(resp.text().unwrap(), "v1");
}

#[tokio::test]
async fn model_asset_network_error_propagates() {
    let storage = MemoryCacheStorage::new();
    let fetcher = MockFetcher::new();
    fetcher.set_offline(true);

    let err = cache_or_fetch_and_store(&storage, MODEL_STORE, &fetcher, req(MODEL_URL))
        .await
        .unwrap_err();
    assert!(err.is_network());
}

#[tokio::test]
async fn model_asset_error_status_is_returned_and_stored() {
    let storage = MemoryCacheStorage::new();
    let fetcher = MockFetcher::new();
    fetcher.serve(MODEL_URL, 404, "missing");

    let resp = cache_or_fetch_and_store(&storage, MODEL_STORE, &fetcher, req(MODEL_URL))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let store = storage.open(MODEL_STORE).await.unwrap();
    assert_eq!(store.len().await.unwrap(), 1);
}

/// Storage whose stores refuse every write.
#[derive(Default)]
struct ReadOnlyStorage {
    inner: MemoryCacheStorage,
}

struct ReadOnlyStore(Arc<dyn CacheStore>);

#[async_trait]
impl CacheStore for ReadOnlyStore {
    fn name(&self) -> &str {
        self.0.name()
    }
    async fn match_request(&self, request: &Request) -> Result<Option<Response>> {
        self.0.match_request(request).await
    }
    async fn put(&self, _request: &Request, _response: Response) -> Result<()> {
        Err(SwCacheError::Storage("quota exceeded".into()))
    }
    async fn delete(&self, request: &Request) -> Result<bool> {
        self.0.delete(request).await
    }
    async fn keys(&self) -> Result<Vec<RequestKey>> {
        self.0.keys().await
    }
}

#[async_trait]
impl CacheStorage for ReadOnlyStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>> {
        Ok(Arc::new(ReadOnlyStore(self.inner.open(name).await?)))
    }
    async fn has(&self, name: &str) -> Result<bool> {
        self.inner.has(name).await
    }
    async fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys().await
    }
    async fn delete(&self, name: &str) -> Result<bool> {
        self.inner.delete(name).await
    }
    async fn match_any(&self, request: &Request) -> Result<Option<Response>> {
        self.inner.match_any(request).await
    }
}

#[tokio::test]
async fn model_asset_store_failure_still_returns_response() {
    let storage = ReadOnlyStorage::default();
    let fetcher = MockFetcher::new();
    fetcher.serve(MODEL_URL, 200, "scene");

    let mut resp = cache_or_fetch_and_store(&storage, MODEL_STORE, &fetcher, req(MODEL_URL))
        .await
        .unwrap();
    assert_eq!(resp.text().unwrap(), "scene");
}

// =========================================================================
// network_first
// =========================================================================

const API_URL: &str = "http://localhost:8080/api/data";

#[tokio::test]
async fn network_first_returns_live_response_without_writing() {
    let storage = MemoryCacheStorage::new();
    let fetcher = MockFetcher::new();
    fetcher.serve(API_URL, 200, r#"{"ok":true}"#);

    let mut resp = network_first(&storage, &fetcher, req(API_URL)).await.unwrap();
    assert_eq!(resp.text().unwrap(), r#"{"ok":true}"#);
    assert!(storage.keys().await.unwrap().is_empty());
    assert!(storage.match_any(&req(API_URL)).await.unwrap().is_none());
}

#[tokio::test]
async fn network_first_http_error_is_not_a_failure() {
    let storage = MemoryCacheStorage::new();
    let store = storage.open("portfolio-v1").await.unwrap();
    store
        .put(&req(API_URL), Response::new(200, "cached"))
        .await
        .unwrap();
    let fetcher = MockFetcher::new();
    fetcher.serve(API_URL, 500, "boom");

    let resp = network_first(&storage, &fetcher, req(API_URL)).await.unwrap();
    assert_eq!(resp.status(), 500);
}

#[tokio::test]
async fn network_first_falls_back_to_any_store_on_rejection() {
    let storage = MemoryCacheStorage::new();
    let store = storage.open("some-other-store").await.unwrap();
    store
        .put(&req(API_URL), Response::new(200, "cached data"))
        .await
        .unwrap();

    let fetcher = MockFetcher::new();
    fetcher.set_offline(true);

    let mut resp = network_first(&storage, &fetcher, req(API_URL)).await.unwrap();
    assert_eq!(resp.text().unwrap(), "cached data");
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn network_first_rejection_without_cache_propagates() {
    let storage = MemoryCacheStorage::new();
    let fetcher = MockFetcher::new();
    fetcher.set_offline(true);

    let err = network_first(&storage, &fetcher, req(API_URL))
        .await
        .unwrap_err();
    assert!(err.is_network());
}

/// The API path never writes, so after any number of successful calls an
/// offline call still has nothing to fall back to.
#[tokio::test]
async fn network_first_fallback_is_empty_in_normal_operation() {
    let storage = MemoryCacheStorage::new();
    let fetcher = MockFetcher::new();
    fetcher.serve(API_URL, 200, "live");

    for _ in 0..3 {
        network_first(&storage, &fetcher, req(API_URL)).await.unwrap();
    }
    fetcher.set_offline(true);
    assert!(network_first(&storage, &fetcher, req(API_URL)).await.is_err());
}

// =========================================================================
// cache_first
// =========================================================================

const PAGE_URL: &str = "http://localhost:8080/about.html";

#[tokio::test]
async fn cache_first_hit_avoids_network() {
    let storage = MemoryCacheStorage::new();
    let store = storage.open("portfolio-v1").await.unwrap();
    store
        .put(&req(PAGE_URL), Response::new(200, "cached page"))
        .await
        .unwrap();
    let fetcher = MockFetcher::new();

    let mut resp = cache_first(&storage, &fetcher, req(PAGE_URL)).await.unwrap();
    assert_eq!(resp.text().unwrap(), "cached page");
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn cache_first_miss_falls_through_without_storing() {
    let storage = MemoryCacheStorage::new();
    storage.open("portfolio-v1").await.unwrap();
    let fetcher = MockFetcher::new();
    fetcher.serve(PAGE_URL, 200, "live page");

    let mut resp = cache_first(&storage, &fetcher, req(PAGE_URL)).await.unwrap();
    assert_eq!(resp.text().unwrap(), "live page");

    assert!(storage.match_any(&req(PAGE_URL)).await.unwrap().is_none());
    let store = storage.open("portfolio-v1").await.unwrap();
    assert_eq!(store.len().await.unwrap(), 0);

    // Still a miss next time.
    cache_first(&storage, &fetcher, req(PAGE_URL)).await.unwrap();
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn cache_first_miss_offline_propagates() {
    let storage = MemoryCacheStorage::new();
    let fetcher = MockFetcher::new();
    fetcher.set_offline(true);

    let err = cache_first(&storage, &fetcher, req(PAGE_URL))
        .await
        .unwrap_err();
    assert!(err.is_network());
}
