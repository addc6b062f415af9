//! Integration tests for [`HttpFetcher`] against a mock server.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Url};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sw_cache::{
    CacheStorage, CacheWorker, Fetcher, HttpFetcher, MemoryCacheStorage, Request, WorkerConfig,
};

fn url(server: &MockServer, p: &str) -> Url {
    Url::parse(&format!("{}{p}", server.uri())).unwrap()
}

#[tokio::test]
async fn fetch_returns_status_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/og.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![0x89, b'P', b'N', b'G']),
        )
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let mut resp = fetcher
        .fetch(Request::get(url(&server, "/og.png")))
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.header_value("content-type"), Some("image/png"));
    assert_eq!(resp.bytes().unwrap(), vec![0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn http_error_status_is_a_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let mut resp = fetcher
        .fetch(Request::get(url(&server, "/api/data")))
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
    assert!(!resp.ok());
    assert_eq!(resp.text().unwrap(), "busy");
}

#[tokio::test]
async fn request_method_and_headers_are_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/contact"))
        .and(header("x-requested-with", "sw-cache"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let request = Request::new(Method::POST, url(&server, "/api/contact"))
        .header("x-requested-with", "sw-cache");
    let resp = fetcher.fetch(request).await.unwrap();
    assert_eq!(resp.status(), 201);
}

#[tokio::test]
async fn connection_refused_is_network_error() {
    // Bind then drop a listener so the port is (very likely) closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let dead = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();

    let fetcher = HttpFetcher::new().unwrap();
    let err = fetcher.fetch(Request::get(dead)).await.unwrap_err();
    assert!(err.is_network());
}

#[tokio::test]
async fn configured_timeout_rejects_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::with_timeout(Some(Duration::from_millis(100))).unwrap();
    let err = fetcher
        .fetch(Request::get(url(&server, "/slow")))
        .await
        .unwrap_err();
    assert!(err.is_network());
}

#[tokio::test]
async fn worker_installs_from_live_origin() {
    let server = MockServer::start().await;
    for p in ["/", "/index.html", "/manifest.json", "/og.png", "/profile.png"] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("body {p}")))
            .expect(1)
            .mount(&server)
            .await;
    }

    let storage = Arc::new(MemoryCacheStorage::new());
    let worker = CacheWorker::builder()
        .config(WorkerConfig::new().origin(server.uri()))
        .storage(storage.clone())
        .fetcher(Arc::new(HttpFetcher::new().unwrap()))
        .build()
        .unwrap();
    worker.install().await.unwrap();
    worker.activate().await.unwrap();

    // Served from the static store: the mocks expect exactly one hit each.
    let mut resp = worker
        .respond(Request::get(url(&server, "/index.html")))
        .await
        .unwrap();
    assert_eq!(resp.text().unwrap(), "body /index.html");
    assert_eq!(storage.keys().await.unwrap(), vec!["portfolio-v1"]);
}
