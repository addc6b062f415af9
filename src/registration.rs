//! Version handover.
//!
//! A [`Registration`] tracks which [`CacheWorker`] version currently
//! controls requests. Registering a new version installs it first; only a
//! successful install (which always requests skip-waiting) leads to
//! activation and replaces the active version. A failed install leaves the
//! previous version in control.
//!
//! Requests already being handled keep their `Arc` to the version that
//! picked them up and complete under that version's routing.
//!
//! A process starting over persisted storage uses [`Registration::resume`],
//! which works out from the stores how far this version got last time.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::fetch::Fetcher;
use crate::types::{Request, Response};
use crate::worker::{CacheWorker, FetchEvent, FetchOutcome, LifecycleEvent, WorkerState};
use crate::{Result, SwCacheError};

/// How [`Registration::resume`] put a version in control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resumption {
    /// Storage already belonged to this version alone; nothing ran.
    Adopted,
    /// Storage was seeded but stale stores remained; activation ran.
    Activated,
    /// Storage was not seeded; install and activation ran.
    Registered,
}

/// Active-version slot plus the uncontrolled network path.
pub struct Registration {
    fetcher: Arc<dyn Fetcher>,
    active: RwLock<Option<Arc<CacheWorker>>>,
}

impl Registration {
    /// Create a registration with no active version.
    ///
    /// `fetcher` serves requests that no worker controls.
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            active: RwLock::new(None),
        }
    }

    /// The version currently in control, if any.
    pub async fn active(&self) -> Option<Arc<CacheWorker>> {
        self.active.read().await.clone()
    }

    /// Install and, if that succeeds, activate `worker`.
    ///
    /// On any failure the previously active version stays in place.
    pub async fn register(&self, worker: CacheWorker) -> Result<Arc<CacheWorker>> {
        let worker = Arc::new(worker);
        worker.dispatch(LifecycleEvent::Install).await?;
        debug_assert!(worker.skip_waiting_requested());
        self.activate_and_swap(worker).await
    }

    /// Activate a version whose install already seeded the storage.
    ///
    /// Fails with `InvalidState` if the static store is missing any asset.
    pub async fn activate_installed(&self, worker: CacheWorker) -> Result<Arc<CacheWorker>> {
        if !worker.is_seeded().await? {
            return Err(SwCacheError::InvalidState {
                expected: WorkerState::Installed.as_str(),
                found: worker.state().as_str(),
            });
        }
        worker.resume_installed()?;
        self.activate_and_swap(Arc::new(worker)).await
    }

    /// Put an already-activated version in control without re-running
    /// install or activate.
    ///
    /// Refused with `InvalidState` while stores from other versions remain;
    /// only activation removes them.
    pub async fn adopt(&self, worker: CacheWorker) -> Result<Arc<CacheWorker>> {
        let stale = worker.stale_stores().await?;
        if !stale.is_empty() {
            debug!(stale = ?stale, "refusing to adopt before activation");
            return Err(SwCacheError::InvalidState {
                expected: WorkerState::Activated.as_str(),
                found: WorkerState::Installed.as_str(),
            });
        }
        worker.resume_activated()?;
        let worker = Arc::new(worker);
        *self.active.write().await = Some(worker.clone());
        Ok(worker)
    }

    /// Bring `worker` into control over storage left by earlier processes.
    ///
    /// Adopts it if its stores are the only ones present, activates it if it
    /// was installed but stale stores remain, and registers it otherwise.
    pub async fn resume(&self, worker: CacheWorker) -> Result<(Arc<CacheWorker>, Resumption)> {
        if !worker.is_seeded().await? {
            let worker = self.register(worker).await?;
            return Ok((worker, Resumption::Registered));
        }
        if worker.stale_stores().await?.is_empty() {
            let worker = self.adopt(worker).await?;
            return Ok((worker, Resumption::Adopted));
        }
        let worker = self.activate_installed(worker).await?;
        Ok((worker, Resumption::Activated))
    }

    async fn activate_and_swap(&self, worker: Arc<CacheWorker>) -> Result<Arc<CacheWorker>> {
        worker.dispatch(LifecycleEvent::Activate).await?;
        *self.active.write().await = Some(worker.clone());
        info!(static_cache = %worker.config().static_cache, "version now active");
        Ok(worker)
    }

    /// Issue a request from a controlled page.
    ///
    /// With no active version, or if the version leaves the event
    /// unanswered, the request goes straight to the network.
    pub async fn fetch(&self, request: Request) -> Result<Response> {
        let Some(worker) = self.active().await else {
            return self.fetcher.fetch(request).await;
        };

        let (event, handle) = FetchEvent::new(request.clone());
        worker.dispatch(LifecycleEvent::Fetch(event)).await?;
        match handle.outcome().await {
            FetchOutcome::Responded(response) => response,
            FetchOutcome::Unhandled => {
                debug!(url = %request.url(), "fetch not intercepted");
                self.fetcher.fetch(request).await
            }
        }
    }
}
