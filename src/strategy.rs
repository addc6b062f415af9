//! Fetch strategies.
//!
//! | Strategy | Lookup | Network | Writes |
//! |---|---|---|---|
//! | [`cache_or_fetch_and_store`] | dedicated store first | on miss | on miss |
//! | [`network_first`] | any store, only if the network rejects | first | never |
//! | [`cache_first`] | any store first | on miss | never |
//!
//! No strategy retries, and none checks freshness: a cached response is
//! served until its store is deleted.

use tracing::{debug, warn};

use crate::cache::CacheStorage;
use crate::fetch::Fetcher;
use crate::router::Route;
use crate::telemetry;
use crate::types::{Request, Response};
use crate::Result;

/// Fetch through, counting the attempt.
async fn fetch_counted(fetcher: &dyn Fetcher, request: Request, route: Route) -> Result<Response> {
    let result = fetcher.fetch(request).await;
    let status = if result.is_ok() { "ok" } else { "error" };
    metrics::counter!(telemetry::NETWORK_FETCHES_TOTAL,
        "route" => route.as_str(), "status" => status)
    .increment(1);
    result
}

fn record_lookup(route: Route, hit: bool) {
    if hit {
        metrics::counter!(telemetry::CACHE_HITS_TOTAL, "route" => route.as_str()).increment(1);
    } else {
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "route" => route.as_str()).increment(1);
    }
}

/// Serve from `store_name` if present, otherwise fetch and store a copy.
///
/// A hit never touches the network. On a miss the fetched response is
/// split with [`Response::split_for_cache_and_caller`]: one copy goes into
/// the store, the other to the caller. A failed write is logged and does
/// not fail the request. A network rejection propagates.
pub async fn cache_or_fetch_and_store(
    storage: &dyn CacheStorage,
    store_name: &str,
    fetcher: &dyn Fetcher,
    request: Request,
) -> Result<Response> {
    let store = storage.open(store_name).await?;
    if let Some(response) = store.match_request(&request).await? {
        record_lookup(Route::ModelAsset, true);
        debug!(store = store_name, url = %request.url(), "cache hit");
        return Ok(response);
    }
    record_lookup(Route::ModelAsset, false);

    let network_response = fetch_counted(fetcher, request.clone(), Route::ModelAsset).await?;
    let (cache_copy, caller_copy) = network_response.split_for_cache_and_caller()?;
    if let Err(e) = store.put(&request, cache_copy).await {
        warn!(store = store_name, url = %request.url(), error = %e, "failed to store response");
    }
    Ok(caller_copy)
}

/// Fetch from the network; if the fetch rejects, fall back to any store.
///
/// Nothing is written here. With no cached match the original network
/// error is returned.
pub async fn network_first(
    storage: &dyn CacheStorage,
    fetcher: &dyn Fetcher,
    request: Request,
) -> Result<Response> {
    let err = match fetch_counted(fetcher, request.clone(), Route::Api).await {
        Ok(response) => return Ok(response),
        Err(e) => e,
    };

    debug!(url = %request.url(), error = %err, "network failed, trying cache");
    match storage.match_any(&request).await? {
        Some(response) => {
            record_lookup(Route::Api, true);
            Ok(response)
        }
        None => {
            record_lookup(Route::Api, false);
            Err(err)
        }
    }
}

/// Serve from any store; on a miss fetch from the network.
///
/// The network response is returned as-is and not stored: only what was
/// seeded at install time lives in the static store.
pub async fn cache_first(
    storage: &dyn CacheStorage,
    fetcher: &dyn Fetcher,
    request: Request,
) -> Result<Response> {
    if let Some(response) = storage.match_any(&request).await? {
        record_lookup(Route::Static, true);
        debug!(url = %request.url(), "cache hit");
        return Ok(response);
    }
    record_lookup(Route::Static, false);
    fetch_counted(fetcher, request, Route::Static).await
}
