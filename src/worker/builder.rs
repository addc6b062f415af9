//! Builder for configuring worker instances

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8};

use super::{CacheWorker, WorkerState};
use crate::cache::CacheStorage;
use crate::config::WorkerConfig;
use crate::fetch::Fetcher;
use crate::router::RoutingRules;
use crate::{Result, SwCacheError};

/// Builder for [`CacheWorker`].
///
/// Storage and fetcher are required; configuration and routing rules
/// default to the deployed site's values.
#[derive(Default)]
pub struct CacheWorkerBuilder {
    config: WorkerConfig,
    rules: RoutingRules,
    storage: Option<Arc<dyn CacheStorage>>,
    fetcher: Option<Arc<dyn Fetcher>>,
}

impl CacheWorkerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the versioned worker settings.
    pub fn config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the routing rules.
    pub fn routing(mut self, rules: RoutingRules) -> Self {
        self.rules = rules;
        self
    }

    /// Set the cache storage.
    pub fn storage(mut self, storage: Arc<dyn CacheStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the network fetcher.
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Build the worker in the `Parsed` state.
    pub fn build(self) -> Result<CacheWorker> {
        let origin = self.config.validate()?;
        let storage = self
            .storage
            .ok_or_else(|| SwCacheError::Configuration("no cache storage configured".into()))?;
        let fetcher = self
            .fetcher
            .ok_or_else(|| SwCacheError::Configuration("no fetcher configured".into()))?;

        Ok(CacheWorker {
            config: self.config,
            origin,
            rules: self.rules,
            storage,
            fetcher,
            state: AtomicU8::new(WorkerState::Parsed as u8),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
        })
    }
}
