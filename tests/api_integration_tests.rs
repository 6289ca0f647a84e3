//! Integration Tests for the Gateway
//!
//! Full request/response cycle through the router, over in-memory and SQLite
//! backends, plus one run over a real socket.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use kv_cache::{
    api::create_router, AccessPolicy, AppState, CacheLayer, CacheOptions, Config, DurableStore,
    MemoryStore, SqliteStore,
};
use tower::ServiceExt;

const PASSWORD: &str = "test-password";

// == Helper Functions ==

async fn open_cache(durable: Arc<dyn DurableStore>) -> Arc<CacheLayer> {
    Arc::new(
        CacheLayer::open(durable, CacheOptions::default())
            .await
            .unwrap(),
    )
}

fn app_for(cache: Arc<CacheLayer>, config: &Config) -> Router {
    create_router(AppState::new(cache, AccessPolicy::from_config(config)))
}

async fn create_test_app() -> (Router, Arc<CacheLayer>) {
    let cache = open_cache(Arc::new(MemoryStore::new())).await;
    let config = Config::default().with_password(PASSWORD);
    (app_for(cache.clone(), &config), cache)
}

fn post(key: &str, password: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/{key}"))
        .header("content-type", "application/json");
    if let Some(password) = password {
        builder = builder.header("authorization", password);
    }
    builder.body(body.into()).unwrap()
}

fn get(key: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/{key}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// == GET ==

#[tokio::test]
async fn test_get_nonexistent_key() {
    let (app, _) = create_test_app().await;

    let response = app.oneshot(get("nonexistent")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response.into_body()).await, "Key not found\n");
}

#[tokio::test]
async fn test_get_existing_key() {
    let (app, cache) = create_test_app().await;
    cache
        .set("test-key".to_string(), r#"{"message":"hello"}"#.into())
        .await
        .unwrap();

    let response = app.oneshot(get("test-key")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(
        body_string(response.into_body()).await,
        r#"{"message":"hello"}"#
    );
}

#[tokio::test]
async fn test_get_root_requires_key() {
    let (app, _) = create_test_app().await;

    let response = app.oneshot(get("")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(response.into_body()).await, "Key required\n");
}

// == POST ==

#[tokio::test]
async fn test_post_then_get_is_byte_identical() {
    let (app, _) = create_test_app().await;
    let raw = "{ \"b\": [1, 2 ,3],\n  \"a\": null }";

    let response = app
        .clone()
        .oneshot(post("doc.v1", Some(PASSWORD), raw))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, "");

    let response = app.oneshot(get("doc.v1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, raw);
}

#[tokio::test]
async fn test_post_without_password() {
    let (app, cache) = create_test_app().await;

    let response = app
        .oneshot(post("test-key", None, r#"{"message":"hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_string(response.into_body()).await, "Unauthorized\n");
    assert!(cache.get("test-key").await.unwrap().is_none());
}

#[tokio::test]
async fn test_post_wrong_password() {
    let (app, cache) = create_test_app().await;

    let response = app
        .oneshot(post("test-key", Some("wrong-password"), r#"{"message":"hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(cache.get("test-key").await.unwrap().is_none());
}

#[tokio::test]
async fn test_post_invalid_json() {
    let (app, cache) = create_test_app().await;

    let response = app
        .oneshot(post("test-key", Some(PASSWORD), "invalid json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(response.into_body()).await, "Invalid JSON\n");
    assert!(cache.get("test-key").await.unwrap().is_none());
}

#[tokio::test]
async fn test_post_invalid_key() {
    let (app, _) = create_test_app().await;

    let too_long = "k".repeat(257);
    for key in ["a%20b", "nested/key", too_long.as_str()] {
        let response = app
            .clone()
            .oneshot(post(key, Some(PASSWORD), "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "key {key}");
        assert_eq!(body_string(response.into_body()).await, "Invalid key format\n");
    }
}

#[tokio::test]
async fn test_percent_encoded_key_is_decoded() {
    let (app, _) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(post("a%2Eb", Some(PASSWORD), r#"{"n":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("a.b")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, r#"{"n":1}"#);
}

#[tokio::test]
async fn test_post_overwrites_value() {
    let (app, _) = create_test_app().await;

    for body in [r#"{"v":1}"#, r#"{"v":2}"#] {
        let response = app
            .clone()
            .oneshot(post("k", Some(PASSWORD), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get("k")).await.unwrap();
    assert_eq!(body_string(response.into_body()).await, r#"{"v":2}"#);
}

#[tokio::test]
async fn test_body_size_boundary() {
    let cache = open_cache(Arc::new(MemoryStore::new())).await;
    let mut config = Config::default().with_password(PASSWORD);
    config.max_body_bytes = 64;
    let app = app_for(cache, &config);

    // A JSON string of exactly 64 bytes: 62 characters plus two quotes
    let exact = format!("\"{}\"", "x".repeat(62));
    assert_eq!(exact.len(), 64);
    let response = app
        .clone()
        .oneshot(post("k", Some(PASSWORD), exact))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let over = format!("\"{}\"", "x".repeat(63));
    let response = app
        .clone()
        .oneshot(post("k", Some(PASSWORD), over))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        body_string(response.into_body()).await,
        "Request body too large\n"
    );
}

#[tokio::test]
async fn test_default_limit_rejects_large_body() {
    let (app, _) = create_test_app().await;
    let huge = format!("\"{}\"", "x".repeat(1024 * 1024));

    let response = app
        .oneshot(post("k", Some(PASSWORD), huge))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_unsupported_method() {
    let (app, _) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/k")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// == CORS ==

async fn options_with_origin(origin: &str) -> axum::response::Response {
    options_on("/test", origin).await
}

async fn options_on(uri: &str, origin: &str) -> axum::response::Response {
    let (app, _) = create_test_app().await;
    app.oneshot(
        Request::builder()
            .method("OPTIONS")
            .uri(uri)
            .header("origin", origin)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_cors_allowed_origin() {
    let response = options_with_origin("https://a.noxchat.in").await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "https://a.noxchat.in");
    assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
    assert_eq!(
        headers["access-control-allow-headers"],
        "Authorization, Content-Type"
    );
    assert_eq!(body_string(response.into_body()).await, "");
}

#[tokio::test]
async fn test_cors_disallowed_origin() {
    let response = options_with_origin("https://evil.com").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("access-control-allow-origin").is_none());
    assert!(response.headers().get("access-control-allow-methods").is_none());
}

#[tokio::test]
async fn test_cors_preflight_on_ui() {
    let response = options_on("/ui", "https://a.noxchat.in").await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "https://a.noxchat.in");
    assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
    assert_eq!(body_string(response.into_body()).await, "");
}

#[tokio::test]
async fn test_preflight_needs_no_key() {
    let (app, _) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// == SQLite Backend ==

#[tokio::test]
async fn test_sqlite_cold_start_serves_preloaded_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.db");
    let config = Config::default().with_password(PASSWORD);

    // First process lifetime: write through the API, then flush on shutdown
    {
        let cache = open_cache(Arc::new(SqliteStore::open(&path).unwrap())).await;
        let app = app_for(cache.clone(), &config);
        let response = app
            .oneshot(post("persisted", Some(PASSWORD), r#"{"n":1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        cache.shutdown().await;
    }

    // Second lifetime: the record is preloaded before any request
    let cache = open_cache(Arc::new(SqliteStore::open(&path).unwrap())).await;
    assert_eq!(cache.stats().await.total_entries, 1);

    let app = app_for(cache.clone(), &config);
    let response = app.oneshot(get("persisted")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, r#"{"n":1}"#);

    let stats = cache.stats().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 0);
}

#[tokio::test]
async fn test_sqlite_cold_start_accepts_text_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.db");
    SqliteStore::open(&path).unwrap();

    // Rows written by the sqlite3 shell or a string-binding driver are TEXT
    let conn = r2d2_sqlite::rusqlite::Connection::open(&path).unwrap();
    conn.execute(
        "INSERT INTO data (key, value) VALUES ('seeded', '{\"a\": 1}')",
        [],
    )
    .unwrap();
    drop(conn);

    let cache = open_cache(Arc::new(SqliteStore::open(&path).unwrap())).await;
    let app = app_for(cache, &Config::default().with_password(PASSWORD));

    let response = app.oneshot(get("seeded")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, r#"{"a": 1}"#);
}

// == Real Socket ==

#[tokio::test]
async fn test_end_to_end_over_http() {
    let (app, cache) = create_test_app().await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let response = client
        .post(format!("{base}/e2e"))
        .header("Authorization", PASSWORD)
        .json(&serde_json::json!({"message": "hello"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let response = client.get(format!("{base}/e2e")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["message"], "hello");

    let response = client.get(format!("{base}/missing")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    server.abort();
    cache.shutdown().await;
}
