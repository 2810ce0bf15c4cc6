use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use gately_cache::{MokaTier, TieredCache};
use gately_core::{MappingRecord, ShortKey, SortOrder};
use gately_gateway::model::{CreateUrlResponse, ErrorResponse, HealthResponse, UrlMetricsResponse};
use gately_gateway::{App, AppState};
use gately_generator::SeqGenerator;
use gately_service::{Created, MappingConfig, MappingService, UrlMapper};
use gately_storage::InMemoryStore;
use jiff::Timestamp;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

type Service = MappingService<InMemoryStore, SeqGenerator>;

fn app() -> (Router, Arc<Service>) {
    let service = Arc::new(MappingService::new(
        Arc::new(InMemoryStore::new()),
        TieredCache::new().with_tier(MokaTier::with_capacity(100)),
        SeqGenerator::with_prefix("gt"),
        MappingConfig::default(),
    ));
    let mapper: Arc<dyn UrlMapper> = service.clone();
    let router = App::router(AppState::new(mapper, Duration::from_secs(5)));
    (router, service)
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

async fn json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn create_request(long_url: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/urls")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "long_url": long_url }).to_string(),
        ))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn key_of(short_url: &str) -> &str {
    short_url.rsplit('/').next().unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let (router, _service) = app();

    let response = send(&router, get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: HealthResponse = json(response).await;
    assert_eq!(body.status, "ok");
}

#[tokio::test]
async fn create_then_redirect() {
    let (router, _service) = app();

    let response = send(&router, create_request("example.com/a")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: CreateUrlResponse = json(response).await;
    assert_eq!(created.long_url, "example.com/a");
    assert!(created.short_url.starts_with("gate.ly/"));

    let response = send(&router, get(&format!("/{}", key_of(&created.short_url)))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://example.com/a"
    );
}

#[tokio::test]
async fn duplicate_create_is_bad_request() {
    let (router, _service) = app();

    let response = send(&router, create_request("www.example.com/a/")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&router, create_request("example.com/a")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = json(response).await;
    assert!(body.error.contains("https://example.com/a"), "{}", body.error);
}

#[tokio::test]
async fn invalid_create_bodies_are_bad_requests() {
    let (router, _service) = app();

    let response = send(&router, create_request("ftp://example.com")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let not_json = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/urls")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = send(&router, not_json).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let _: ErrorResponse = json(response).await;

    let missing_field = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/urls")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"url":"example.com"}"#))
        .unwrap();
    let response = send(&router, missing_field).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_and_malformed_keys_are_not_found() {
    let (router, _service) = app();

    let response = send(&router, get("/unknown-key")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let _: ErrorResponse = json(response).await;

    let response = send(&router, get("/a.b")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_then_redirect_is_not_found() {
    let (router, _service) = app();

    let created: CreateUrlResponse = json(send(&router, create_request("example.com/a")).await).await;
    let key = key_of(&created.short_url).to_string();
    assert_eq!(
        send(&router, get(&format!("/{key}"))).await.status(),
        StatusCode::SEE_OTHER
    );

    let response = send(&router, delete(&format!("/api/v1/urls/{key}"))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&router, get(&format!("/{key}"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Deleting again is still fine.
    let response = send(&router, delete(&format!("/api/v1/urls/{key}"))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn delete_with_malformed_key_is_bad_request() {
    let (router, _service) = app();

    let response = send(&router, delete("/api/v1/urls/a.b")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn metrics_lists_records_by_hits() {
    let (router, service) = app();

    let a: CreateUrlResponse = json(send(&router, create_request("a.example")).await).await;
    let b: CreateUrlResponse = json(send(&router, create_request("b.example")).await).await;
    for _ in 0..2 {
        send(&router, get(&format!("/{}", key_of(&b.short_url)))).await;
    }
    service.shutdown().await;

    let now = Timestamp::now().as_second();
    let uri = format!("/api/v1/urls?start={}&end={}", now - 60, now + 60);
    let response = send(&router, get(&uri)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let records: Vec<UrlMetricsResponse> = json(response).await;
    let keys: Vec<_> = records.iter().map(|r| r.short_key.as_str()).collect();
    assert_eq!(keys, [key_of(&b.short_url), key_of(&a.short_url)]);
    assert_eq!(records[0].hits, 3);
    assert_eq!(records[0].long_url, "https://b.example");

    let uri = format!("/api/v1/urls?start={}&end={}&sort=asc", now - 60, now + 60);
    let records: Vec<UrlMetricsResponse> = json(send(&router, get(&uri)).await).await;
    assert_eq!(records[0].short_key, key_of(&a.short_url));
}

#[tokio::test]
async fn metrics_rejects_bad_queries() {
    let (router, _service) = app();

    for uri in [
        "/api/v1/urls?start=100&end=50",
        "/api/v1/urls?start=abc&end=50",
        "/api/v1/urls?end=50",
        "/api/v1/urls?start=1&end=2&sort=sideways",
    ] {
        let response = send(&router, get(uri)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri: {uri}");
    }
}

/// A mapper whose calls never complete.
struct StuckMapper;

#[async_trait]
impl UrlMapper for StuckMapper {
    async fn create(&self, _long_url: &str) -> gately_service::Result<Created> {
        std::future::pending().await
    }

    async fn redirect(&self, _key: &ShortKey) -> gately_service::Result<String> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &ShortKey) -> gately_service::Result<bool> {
        std::future::pending().await
    }

    async fn metrics(
        &self,
        _start: Timestamp,
        _end: Timestamp,
        _order: SortOrder,
    ) -> gately_service::Result<Vec<MappingRecord>> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn slow_requests_hit_the_deadline() {
    let router = App::router(AppState::new(
        Arc::new(StuckMapper),
        Duration::from_millis(50),
    ));

    let response = send(&router, get("/abc123")).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

    let response = send(&router, create_request("example.com")).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}
