//! The versioned cache worker.
//!
//! A [`CacheWorker`] owns the three transition points of one version of
//! the caching layer:
//!
//! ```text
//!  Parsed ──install──► Installing ──ok──► Installed ──activate──► Activating ──► Activated
//!                          │
//!                          └──seed failed──► Redundant
//! ```
//!
//! - **install** seeds the static store with the configured asset list. A
//!   failure is fatal to this version; whatever version was active stays
//!   active. Skip-waiting is requested on success.
//! - **activate** deletes every store whose name is not one of this
//!   version's two store names, then claims open clients. A failing delete
//!   is logged and pruning carries on.
//! - **fetch** classifies the request and answers through the matching
//!   strategy.

mod builder;
mod event;

pub use builder::CacheWorkerBuilder;
pub use event::{FetchEvent, FetchOutcome, LifecycleEvent, ResponseHandle};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use futures_util::future::join_all;
use reqwest::Url;
use tracing::{debug, info, instrument, warn};

use crate::cache::CacheStorage;
use crate::config::WorkerConfig;
use crate::fetch::Fetcher;
use crate::router::{Route, RoutingRules};
use crate::types::{Request, Response};
use crate::{Result, SwCacheError, strategy, telemetry};

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Parsed = 0,
    Installing = 1,
    Installed = 2,
    Activating = 3,
    Activated = 4,
    Redundant = 5,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkerState::Parsed,
            1 => WorkerState::Installing,
            2 => WorkerState::Installed,
            3 => WorkerState::Activating,
            4 => WorkerState::Activated,
            _ => WorkerState::Redundant,
        }
    }
}

/// One version of the caching layer.
///
/// Construct with [`CacheWorker::builder()`].
pub struct CacheWorker {
    config: WorkerConfig,
    origin: Url,
    rules: RoutingRules,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    state: AtomicU8,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

impl std::fmt::Debug for CacheWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheWorker")
            .field("static_cache", &self.config.static_cache)
            .field("model_cache", &self.config.model_cache)
            .field("state", &self.state())
            .field("fetcher", &self.fetcher.name())
            .finish()
    }
}

impl CacheWorker {
    /// Create a new builder.
    pub fn builder() -> CacheWorkerBuilder {
        CacheWorkerBuilder::new()
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn rules(&self) -> &RoutingRules {
        &self.rules
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether install asked to skip the waiting phase.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::Acquire)
    }

    /// Whether activation has taken control of open clients.
    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::Acquire)
    }

    fn transition(&self, from: WorkerState, to: WorkerState) -> Result<()> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|found| SwCacheError::InvalidState {
                expected: from.as_str(),
                found: WorkerState::from_u8(found).as_str(),
            })
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Mark an already-activated version as running again.
    ///
    /// For a process restarting over persisted storage that this version
    /// already installed and activated: no seeding, no pruning. Callers
    /// check [`stale_stores`](Self::stale_stores) is empty first.
    pub fn resume_activated(&self) -> Result<()> {
        self.transition(WorkerState::Parsed, WorkerState::Activated)?;
        self.clients_claimed.store(true, Ordering::Release);
        Ok(())
    }

    /// Mark a version whose install ran in an earlier process as installed,
    /// so it can be activated without seeding again.
    pub fn resume_installed(&self) -> Result<()> {
        self.transition(WorkerState::Parsed, WorkerState::Installed)?;
        self.skip_waiting.store(true, Ordering::Release);
        Ok(())
    }

    /// Whether the static store already holds every configured asset.
    ///
    /// Install is all-or-nothing, so this is how a later process tells that
    /// this version's install completed.
    pub async fn is_seeded(&self) -> Result<bool> {
        if !self.storage.has(&self.config.static_cache).await? {
            return Ok(false);
        }
        let store = self.storage.open(&self.config.static_cache).await?;
        let keys = store.keys().await?;
        for path in &self.config.static_assets {
            let key = Request::resolve(&self.origin, path)?.key();
            if !keys.contains(&key) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Stores that activating this version would delete.
    pub async fn stale_stores(&self) -> Result<Vec<String>> {
        let expected = self.config.expected_stores();
        Ok(self
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| !expected.contains(&name.as_str()))
            .collect())
    }

    /// Dispatch a lifecycle event.
    pub async fn dispatch(&self, event: LifecycleEvent) -> Result<()> {
        match event {
            LifecycleEvent::Install => self.install().await,
            LifecycleEvent::Activate => self.activate().await.map(|_| ()),
            LifecycleEvent::Fetch(event) => {
                self.handle_fetch(event).await;
                Ok(())
            }
        }
    }

    /// Seed the static store with every configured asset.
    ///
    /// Completes only after every asset was fetched and stored. Any failure
    /// leaves this version redundant and is returned as `InstallFailed`.
    #[instrument(skip(self), fields(store = %self.config.static_cache))]
    pub async fn install(&self) -> Result<()> {
        self.transition(WorkerState::Parsed, WorkerState::Installing)?;

        match self.seed_static_store().await {
            Ok(count) => {
                metrics::counter!(telemetry::ASSETS_SEEDED_TOTAL).increment(count as u64);
                self.skip_waiting.store(true, Ordering::Release);
                self.set_state(WorkerState::Installed);
                info!(assets = count, "installed");
                Ok(())
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant);
                warn!(error = %e, "install failed");
                Err(SwCacheError::InstallFailed(Box::new(e)))
            }
        }
    }

    async fn seed_static_store(&self) -> Result<usize> {
        let requests = self
            .config
            .static_assets
            .iter()
            .map(|path| Request::resolve(&self.origin, path))
            .collect::<Result<Vec<_>>>()?;
        let count = requests.len();

        let store = self.storage.open(&self.config.static_cache).await?;
        store.add_all(self.fetcher.as_ref(), requests).await?;
        Ok(count)
    }

    /// Delete stale stores and take control of open clients.
    ///
    /// Returns the names of the stores that were deleted.
    #[instrument(skip(self), fields(store = %self.config.static_cache))]
    pub async fn activate(&self) -> Result<Vec<String>> {
        self.transition(WorkerState::Installed, WorkerState::Activating)?;

        let stale = match self.stale_stores().await {
            Ok(stale) => stale,
            Err(e) => {
                self.set_state(WorkerState::Installed);
                return Err(e);
            }
        };

        let deletions = stale.iter().map(|name| async move {
            match self.storage.delete(name).await {
                Ok(true) => Some(name.clone()),
                Ok(false) => {
                    debug!(store = %name, "stale store already gone");
                    None
                }
                Err(e) => {
                    warn!(store = %name, error = %e, "failed to delete stale store");
                    None
                }
            }
        });
        let pruned: Vec<String> = join_all(deletions).await.into_iter().flatten().collect();
        metrics::counter!(telemetry::STORES_PRUNED_TOTAL).increment(pruned.len() as u64);

        self.clients_claimed.store(true, Ordering::Release);
        self.set_state(WorkerState::Activated);
        info!(pruned = ?pruned, "activated");
        Ok(pruned)
    }

    /// Answer one intercepted request.
    ///
    /// Always responds, so the request never falls through uncontrolled.
    pub async fn handle_fetch(&self, event: FetchEvent) {
        let response = self.respond(event.request().clone()).await;
        event.respond_with(response);
    }

    /// Classify `request` and run the matching strategy.
    pub async fn respond(&self, request: Request) -> Result<Response> {
        let route = self.rules.classify(request.url());
        debug!(route = %route, url = %request.url(), "fetch");
        let storage = self.storage.as_ref();
        let fetcher = self.fetcher.as_ref();
        match route {
            Route::ModelAsset => {
                strategy::cache_or_fetch_and_store(
                    storage,
                    &self.config.model_cache,
                    fetcher,
                    request,
                )
                .await
            }
            Route::Api => strategy::network_first(storage, fetcher, request).await,
            Route::Static => strategy::cache_first(storage, fetcher, request).await,
        }
    }
}
