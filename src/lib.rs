//! sw-cache - versioned asset caching layer
//!
//! This crate intercepts requests on behalf of a site and answers each one
//! from a named cache store or from the network, following one of three
//! fixed strategies chosen from the request URL:
//!
//! - third-party model assets: served from a dedicated store, fetched and
//!   stored on first miss ([`strategy::cache_or_fetch_and_store`])
//! - `/api/` requests: network first, cache only if the network rejects
//!   ([`strategy::network_first`])
//! - everything else: cache first, network on miss ([`strategy::cache_first`])
//!
//! A [`CacheWorker`] is one deployable version. Installing it seeds the
//! static store; activating it deletes every store the version does not
//! name. Bumping a store name is therefore the way to invalidate caches on
//! redeploy.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sw_cache::{CacheWorker, HttpFetcher, MemoryCacheStorage, Registration, Request, WorkerConfig};
//!
//! #[tokio::main]
//! async fn main() -> sw_cache::Result<()> {
//!     let fetcher = Arc::new(HttpFetcher::new()?);
//!     let worker = CacheWorker::builder()
//!         .config(WorkerConfig::new().origin("https://example.dev"))
//!         .storage(Arc::new(MemoryCacheStorage::new()))
//!         .fetcher(fetcher.clone())
//!         .build()?;
//!
//!     let registration = Registration::new(fetcher);
//!     registration.register(worker).await?;
//!
//!     let mut response = registration
//!         .fetch(Request::parse("https://example.dev/og.png")?)
//!         .await?;
//!     println!("{} bytes", response.bytes()?.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod registration;
pub mod router;
pub mod strategy;
pub mod telemetry;
pub mod types;
mod version;
pub mod worker;

pub use cache::{CacheStorage, CacheStore, DiskCacheStorage, MemoryCacheStorage};
pub use config::{Config, WorkerConfig};
pub use error::{Result, SwCacheError};
pub use fetch::{Fetcher, HttpFetcher};
pub use registration::{Registration, Resumption};
pub use router::{Route, RoutingRules};
pub use types::{Request, RequestKey, Response, StoredResponse};
pub use version::{BuildInfo, PKG_VERSION, version_string};
pub use worker::{
    CacheWorker, CacheWorkerBuilder, FetchEvent, FetchOutcome, LifecycleEvent, ResponseHandle,
    WorkerState,
};
