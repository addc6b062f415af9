//! Telemetry metric name constants.
//!
//! Centralised metric names for sw-cache operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `sw_cache_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `route` — request classification: "model_asset", "api" or "static"
//! - `status` — network outcome: "ok" or "error"

/// Total requests answered from a cache store.
///
/// Labels: `route`.
pub const CACHE_HITS_TOTAL: &str = "sw_cache_hits_total";

/// Total cache lookups that found nothing.
///
/// Labels: `route`.
pub const CACHE_MISSES_TOTAL: &str = "sw_cache_misses_total";

/// Total network fetches issued by a strategy.
///
/// Labels: `route`, `status` ("ok" | "error").
pub const NETWORK_FETCHES_TOTAL: &str = "sw_cache_network_fetches_total";

/// Total stale stores deleted during activation.
pub const STORES_PRUNED_TOTAL: &str = "sw_cache_stores_pruned_total";

/// Total assets written to the static store during install.
pub const ASSETS_SEEDED_TOTAL: &str = "sw_cache_assets_seeded_total";
