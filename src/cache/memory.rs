//! In-memory cache storage backed by moka.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use tokio::sync::RwLock;
use tracing::debug;

use super::{CacheStorage, CacheStore, check_cacheable};
use crate::Result;
use crate::types::{Request, RequestKey, Response, StoredResponse};

/// One in-memory store.
///
/// Entries never expire and there is no capacity bound: a store lives until
/// it is deleted from its [`MemoryCacheStorage`].
pub struct MemoryCacheStore {
    name: String,
    entries: Cache<RequestKey, Arc<StoredResponse>>,
}

impl MemoryCacheStore {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Cache::builder().build(),
        }
    }

    /// Insert already-materialised content, bypassing the body checks.
    pub(crate) async fn insert_stored(&self, key: RequestKey, stored: StoredResponse) {
        self.entries.insert(key, Arc::new(stored)).await;
    }

    pub(crate) async fn get_stored(&self, key: &RequestKey) -> Option<Arc<StoredResponse>> {
        self.entries.get(key).await
    }

    /// Put `previous` back under `key`, or remove the key if there was none.
    pub(crate) async fn restore(&self, key: RequestKey, previous: Option<Arc<StoredResponse>>) {
        match previous {
            Some(stored) => self.entries.insert(key, stored).await,
            None => self.entries.invalidate(&key).await,
        }
    }

    /// Snapshot every entry.
    pub(crate) fn entries(&self) -> Vec<(RequestKey, StoredResponse)> {
        self.entries
            .iter()
            .map(|(k, v)| ((*k).clone(), (*v).clone()))
            .collect()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> Result<Option<Response>> {
        Ok(self
            .entries
            .get(&request.key())
            .await
            .map(|stored| stored.to_response()))
    }

    async fn put(&self, request: &Request, response: Response) -> Result<()> {
        check_cacheable(request, &response)?;
        let stored = response.into_stored()?;
        self.insert_stored(request.key(), stored).await;
        Ok(())
    }

    async fn delete(&self, request: &Request) -> Result<bool> {
        Ok(self.entries.remove(&request.key()).await.is_some())
    }

    async fn keys(&self) -> Result<Vec<RequestKey>> {
        Ok(self.entries.iter().map(|(k, _)| (*k).clone()).collect())
    }
}

/// Process-local [`CacheStorage`].
///
/// Cheap to construct; the usual backend for tests and for embedding the
/// worker in a long-running process.
#[derive(Default)]
pub struct MemoryCacheStorage {
    stores: RwLock<Vec<Arc<MemoryCacheStore>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (create-if-absent) and return the concrete store type.
    pub(crate) async fn open_store(&self, name: &str) -> Arc<MemoryCacheStore> {
        if let Some(store) = self.find(name).await {
            return store;
        }
        let mut stores = self.stores.write().await;
        // Re-check under the write lock; another task may have created it.
        if let Some(store) = stores.iter().find(|s| s.name == name) {
            return store.clone();
        }
        debug!(store = name, "creating cache store");
        let store = Arc::new(MemoryCacheStore::new(name));
        stores.push(store.clone());
        store
    }

    /// Current stores in creation order.
    pub(crate) async fn stores(&self) -> Vec<Arc<MemoryCacheStore>> {
        self.stores.read().await.clone()
    }

    async fn find(&self, name: &str) -> Option<Arc<MemoryCacheStore>> {
        self.stores
            .read()
            .await
            .iter()
            .find(|s| s.name == name)
            .cloned()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>> {
        Ok(self.open_store(name).await)
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.find(name).await.is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .stores
            .read()
            .await
            .iter()
            .map(|s| s.name.clone())
            .collect())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let mut stores = self.stores.write().await;
        let before = stores.len();
        stores.retain(|s| s.name != name);
        Ok(stores.len() != before)
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>> {
        for store in self.stores().await {
            if let Some(response) = store.match_request(request).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}
