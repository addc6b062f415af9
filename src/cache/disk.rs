//! Disk-persisted cache storage.
//!
//! All stores live in a single versioned JSON document:
//!
//! ```json
//! { "version": 1, "stores": [ { "name": "portfolio-v1", "entries": [...] } ] }
//! ```
//!
//! The document is loaded once when the storage is opened and rewritten
//! after every mutation (atomic write via tmp + rename). Reads are served
//! from memory. A store mutation that cannot be written to disk is undone
//! in memory, and `add_all` writes the document once for the whole batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::memory::{MemoryCacheStorage, MemoryCacheStore};
use super::{CacheStorage, CacheStore, check_cacheable, fetch_all};
use crate::fetch::Fetcher;
use crate::types::{Request, RequestKey, Response, StoredResponse};
use crate::{Result, SwCacheError};

/// File name of the storage document inside the storage directory.
pub const STORAGE_FILE: &str = "caches.json";

/// Maximum supported storage format version.
const MAX_SUPPORTED_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStorage {
    version: u32,
    stores: Vec<PersistedStore>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStore {
    name: String,
    #[serde(default)]
    entries: Vec<PersistedEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    key: RequestKey,
    response: StoredResponse,
}

struct Shared {
    path: PathBuf,
    memory: MemoryCacheStorage,
    write: Mutex<()>,
}

impl Shared {
    async fn persist(&self) -> Result<()> {
        let _guard = self.write.lock().await;

        let mut stores = Vec::new();
        for store in self.memory.stores().await {
            let mut entries: Vec<PersistedEntry> = store
                .entries()
                .into_iter()
                .map(|(key, response)| PersistedEntry { key, response })
                .collect();
            entries.sort_by(|a, b| a.key.cmp(&b.key));
            stores.push(PersistedStore {
                name: store.name().to_string(),
                entries,
            });
        }
        let doc = PersistedStorage {
            version: MAX_SUPPORTED_VERSION,
            stores,
        };
        let json = serde_json::to_vec_pretty(&doc)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), bytes = json.len(), "cache storage persisted");
        Ok(())
    }
}

/// [`CacheStorage`] persisted under a directory.
///
/// Cloning shares the same underlying document.
#[derive(Clone)]
pub struct DiskCacheStorage {
    shared: Arc<Shared>,
}

impl DiskCacheStorage {
    /// Open (or start) the storage in `dir`.
    ///
    /// A missing document means empty storage. A corrupt document is logged
    /// and treated as empty; it is overwritten on the next mutation. A
    /// document from a newer format version is an error.
    pub async fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(STORAGE_FILE);
        let memory = MemoryCacheStorage::new();

        if let Some(doc) = load_document(&path).await? {
            for persisted in doc.stores {
                let store = memory.open_store(&persisted.name).await;
                for entry in persisted.entries {
                    store.insert_stored(entry.key, entry.response).await;
                }
            }
        }

        Ok(Self {
            shared: Arc::new(Shared {
                path,
                memory,
                write: Mutex::new(()),
            }),
        })
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.shared.path
    }
}

async fn load_document(path: &Path) -> Result<Option<PersistedStorage>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let doc: PersistedStorage = match serde_json::from_str(&content) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt cache storage, starting empty");
            return Ok(None);
        }
    };
    if doc.version > MAX_SUPPORTED_VERSION {
        return Err(SwCacheError::Storage(format!(
            "unsupported storage version {} (max supported: {MAX_SUPPORTED_VERSION})",
            doc.version
        )));
    }
    Ok(Some(doc))
}

/// A store handle that writes through to disk.
struct DiskCacheStore {
    store: Arc<MemoryCacheStore>,
    shared: Arc<Shared>,
}

impl DiskCacheStore {
    /// Insert `entries` in memory and persist once. If the document cannot
    /// be written the previous entries are put back.
    async fn write_batch(&self, entries: Vec<(RequestKey, StoredResponse)>) -> Result<()> {
        let mut previous = Vec::with_capacity(entries.len());
        for (key, stored) in entries {
            previous.push((key.clone(), self.store.get_stored(&key).await));
            self.store.insert_stored(key, stored).await;
        }

        if let Err(e) = self.shared.persist().await {
            warn!(store = self.name(), error = %e, "persist failed, reverting store");
            for (key, prev) in previous.into_iter().rev() {
                self.store.restore(key, prev).await;
            }
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for DiskCacheStore {
    fn name(&self) -> &str {
        self.store.name()
    }

    async fn match_request(&self, request: &Request) -> Result<Option<Response>> {
        self.store.match_request(request).await
    }

    async fn put(&self, request: &Request, response: Response) -> Result<()> {
        check_cacheable(request, &response)?;
        let stored = response.into_stored()?;
        self.write_batch(vec![(request.key(), stored)]).await
    }

    async fn delete(&self, request: &Request) -> Result<bool> {
        let key = request.key();
        let Some(previous) = self.store.get_stored(&key).await else {
            return Ok(false);
        };
        self.store.restore(key.clone(), None).await;
        if let Err(e) = self.shared.persist().await {
            self.store.restore(key, Some(previous)).await;
            return Err(e);
        }
        Ok(true)
    }

    async fn keys(&self) -> Result<Vec<RequestKey>> {
        self.store.keys().await
    }

    async fn add_all(&self, fetcher: &dyn Fetcher, requests: Vec<Request>) -> Result<()> {
        let responses = fetch_all(fetcher, &requests).await?;
        let mut entries = Vec::with_capacity(responses.len());
        for (request, response) in requests.iter().zip(responses) {
            check_cacheable(request, &response)?;
            entries.push((request.key(), response.into_stored()?));
        }
        self.write_batch(entries).await?;
        debug!(store = self.name(), count = requests.len(), "add_all persisted");
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>> {
        let existed = self.shared.memory.has(name).await?;
        let store = self.shared.memory.open_store(name).await;
        if !existed {
            self.shared.persist().await?;
        }
        Ok(Arc::new(DiskCacheStore {
            store,
            shared: self.shared.clone(),
        }))
    }

    async fn has(&self, name: &str) -> Result<bool> {
        self.shared.memory.has(name).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.shared.memory.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let removed = self.shared.memory.delete(name).await?;
        if removed {
            self.shared.persist().await?;
        }
        Ok(removed)
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>> {
        self.shared.memory.match_any(request).await
    }
}
