//! Shared test doubles.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use sw_cache::{Fetcher, Request, Response, Result, SwCacheError};

pub const ORIGIN: &str = "http://localhost:8080";

/// Fetcher answering from a fixed table of URL → (status, body).
///
/// Unknown URLs and every URL while offline reject with a network error.
#[derive(Default)]
pub struct MockFetcher {
    routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    offline: AtomicBool,
    calls: AtomicU32,
    seen: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve every default static asset with a 200.
    pub fn with_static_assets() -> Self {
        let fetcher = Self::new();
        for path in ["/", "/index.html", "/manifest.json", "/og.png", "/profile.png"] {
            fetcher.serve(&format!("{ORIGIN}{path}"), 200, format!("asset {path}"));
        }
        fetcher
    }

    pub fn serve(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.into()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.seen.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, request: Request) -> Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let url = request.url().to_string();
        self.seen.lock().unwrap().push(url.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(SwCacheError::Network("offline".into()));
        }
        match self.routes.lock().unwrap().get(&url) {
            Some((status, body)) => Ok(Response::new(*status, body.clone())),
            None => Err(SwCacheError::Network(format!("connection refused: {url}"))),
        }
    }
}

pub fn req(url: &str) -> Request {
    Request::parse(url).unwrap()
}
