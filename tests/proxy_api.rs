//! Relay endpoint integration tests
//!
//! Runs the real router against a scripted in-process stand-in for the
//! Google Drive API, plus one end-to-end pass of the upload driver through
//! the relay wire contract.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{Host, Path, RawQuery, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use axum_test::TestServer;
use chrono::Utc;
use serde_json::{json, Value};

use drive_relay::auth::{AuthError, Credential, MemoryStore, SessionClient, TokenRefresher};
use drive_relay::config::Config;
use drive_relay::relay::DriveRelay;
use drive_relay::routes;
use drive_relay::state::AppState;
use drive_relay::upload::{MemorySource, ProxyTransport, UploadDriver};

// ============================================================================
// Fake Upstream
// ============================================================================

#[derive(Default)]
struct FakeDrive {
    /// Content-Range header of every PUT, in order
    puts: Mutex<Vec<String>>,

    /// Highest contiguous byte count acknowledged
    received: Mutex<u64>,

    /// When set, the next PUT crossing this offset is truncated to it
    truncate_at: Mutex<Option<u64>>,

    /// One-shot scripted rejections
    reject_init: Mutex<Option<(u16, String)>>,
    reject_put: Mutex<Option<(u16, String)>>,

    /// Last session-init request: metadata body, upload headers, query string
    last_init: Mutex<Option<(Value, String, String, String)>>,
}

async fn fake_init(
    State(fake): State<Arc<FakeDrive>>,
    Host(host): Host,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some((status, body)) = fake.reject_init.lock().unwrap().take() {
        return (StatusCode::from_u16(status).unwrap(), body).into_response();
    }

    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string()
    };
    *fake.last_init.lock().unwrap() = Some((
        body,
        header_value("x-upload-content-type"),
        header_value("x-upload-content-length"),
        query.unwrap_or_default(),
    ));

    let location = format!("http://{host}/upload/session/1");
    (StatusCode::OK, [(header::LOCATION, location)], "").into_response()
}

async fn fake_put(State(fake): State<Arc<FakeDrive>>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some((status, body)) = fake.reject_put.lock().unwrap().take() {
        return (StatusCode::from_u16(status).unwrap(), body).into_response();
    }

    let range = headers
        .get(header::CONTENT_RANGE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();
    fake.puts.lock().unwrap().push(range.clone());

    let done = || {
        Json(json!({ "id": "file-1", "mimeType": "application/octet-stream" })).into_response()
    };

    if let Some(total) = range.strip_prefix("bytes */") {
        assert_eq!(total, "0");
        assert!(body.is_empty());
        return done();
    }

    // "bytes {start}-{end}/{total}", end inclusive
    let (span, total) = range
        .strip_prefix("bytes ")
        .and_then(|rest| rest.split_once('/'))
        .expect("well-formed content range");
    let (start, end) = span.split_once('-').expect("well-formed span");
    let (start, end): (u64, u64) = (start.parse().unwrap(), end.parse().unwrap());
    let total: u64 = total.parse().unwrap();
    assert_eq!(body.len() as u64, end - start + 1);

    let mut truncate = fake.truncate_at.lock().unwrap();
    let cut = match *truncate {
        Some(cut) if cut <= end => truncate.take(),
        _ => None,
    };
    drop(truncate);
    if let Some(cut) = cut {
        *fake.received.lock().unwrap() = cut;
        let resume = format!("bytes=0-{}", cut - 1);
        return (
            StatusCode::PERMANENT_REDIRECT,
            [(header::RANGE, resume)],
            "",
        )
            .into_response();
    }

    *fake.received.lock().unwrap() = end + 1;
    if end + 1 == total {
        done()
    } else {
        let resume = format!("bytes=0-{end}");
        (
            StatusCode::PERMANENT_REDIRECT,
            [(header::RANGE, resume)],
            "",
        )
            .into_response()
    }
}

async fn fake_list_folders(State(_fake): State<Arc<FakeDrive>>) -> Response {
    Json(json!({
        "files": [
            { "id": "folder-default", "name": "Attachments",
              "mimeType": "application/vnd.google-apps.folder" }
        ]
    }))
    .into_response()
}

async fn fake_file(
    State(_fake): State<Arc<FakeDrive>>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    if id == "forbidden" {
        return (StatusCode::FORBIDDEN, "insufficient scope").into_response();
    }

    if query.unwrap_or_default().contains("alt=media") {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain")],
            "hello content",
        )
            .into_response()
    } else {
        Json(json!({ "id": id, "name": "hello.txt", "mimeType": "text/plain" })).into_response()
    }
}

fn fake_router(fake: Arc<FakeDrive>) -> Router {
    Router::new()
        .route("/upload/drive/v3/files", post(fake_init))
        .route("/upload/session/1", put(fake_put))
        .route("/drive/v3/files", get(fake_list_folders))
        .route("/drive/v3/files/:id", get(fake_file))
        .with_state(fake)
}

async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

// ============================================================================
// Harness
// ============================================================================

fn relay_router(upstream: SocketAddr) -> Router {
    let mut config = Config::default();
    config.drive.api_base = format!("http://{upstream}/drive/v3");
    config.drive.upload_base = format!("http://{upstream}/upload/drive/v3");

    let relay = DriveRelay::new(&config.drive).unwrap();
    let state = AppState::new(config, relay);
    Router::new().merge(routes::drive::router()).with_state(state)
}

async fn harness() -> (Arc<FakeDrive>, TestServer) {
    let fake = Arc::new(FakeDrive::default());
    let upstream = spawn(fake_router(fake.clone())).await;
    let server = TestServer::new(relay_router(upstream)).unwrap();
    (fake, server)
}

fn authorized(server: &TestServer, body: Value) -> axum_test::TestRequest {
    server
        .post("/google-drive")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("tok"))
        .json(&body)
}

// ============================================================================
// Operation Dispatch
// ============================================================================

#[tokio::test]
async fn init_returns_the_upstream_session_location() {
    let (fake, server) = harness().await;

    let response = authorized(
        &server,
        json!({
            "operation": "INIT",
            "data": {
                "contentType": "application/pdf",
                "contentLength": 600000,
                "name": "paper.pdf",
                "folderId": "folder-1"
            }
        }),
    )
    .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let location = body["location"].as_str().unwrap();
    assert!(location.ends_with("/upload/session/1"));

    let (metadata, upload_type, upload_length, query) =
        fake.last_init.lock().unwrap().clone().unwrap();
    assert_eq!(metadata["name"], "paper.pdf");
    assert_eq!(metadata["parents"], json!(["folder-1"]));
    assert_eq!(upload_type, "application/pdf");
    assert_eq!(upload_length, "600000");
    // default transport carries the credential as a query parameter
    assert!(query.contains("access_token=tok"));
    assert!(query.contains("uploadType=resumable"));
}

#[tokio::test]
async fn init_without_folder_targets_the_configured_default() {
    let (fake, server) = harness().await;

    let response = authorized(
        &server,
        json!({
            "operation": "INIT",
            "data": { "contentType": "text/plain", "contentLength": 5, "name": "note.txt" }
        }),
    )
    .await;

    response.assert_status_ok();
    let (metadata, ..) = fake.last_init.lock().unwrap().clone().unwrap();
    assert_eq!(metadata["parents"], json!(["folder-default"]));
}

#[tokio::test]
async fn init_without_credential_is_unauthorized() {
    let (fake, server) = harness().await;

    let response = server
        .post("/google-drive")
        .json(&json!({
            "operation": "INIT",
            "data": { "contentType": "text/plain", "contentLength": 1, "name": "a.txt" }
        }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert!(fake.last_init.lock().unwrap().is_none());
}

#[tokio::test]
async fn upload_translates_partial_and_final_status() {
    let (_fake, server) = harness().await;

    let first = authorized(
        &server,
        json!({
            "operation": "UPLOAD",
            "data": {
                "chunk": vec![7u8; 10],
                "uri": first_session_uri(&server).await,
                "contentLength": 10,
                "contentRange": "bytes 0-9/20"
            }
        }),
    )
    .await;
    first.assert_status_ok();
    let body: Value = first.json();
    assert_eq!(body, json!({ "done": false, "start": 10 }));

    let second = authorized(
        &server,
        json!({
            "operation": "UPLOAD",
            "data": {
                "chunk": vec![7u8; 10],
                "uri": first_session_uri(&server).await,
                "contentLength": 10,
                "contentRange": "bytes 10-19/20"
            }
        }),
    )
    .await;
    second.assert_status_ok();
    let body: Value = second.json();
    assert_eq!(body["done"], json!(true));
    assert_eq!(body["id"], "file-1");
    assert_eq!(body["mimeType"], "application/octet-stream");
}

/// Open a session against the fake upstream and return its URI.
async fn first_session_uri(server: &TestServer) -> String {
    let response = authorized(
        server,
        json!({
            "operation": "INIT",
            "data": { "contentType": "application/octet-stream", "contentLength": 20, "name": "b.bin" }
        }),
    )
    .await;
    let body: Value = response.json();
    body["location"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn upload_rejects_chunk_length_mismatch() {
    let (_fake, server) = harness().await;

    let response = authorized(
        &server,
        json!({
            "operation": "UPLOAD",
            "data": {
                "chunk": [1, 2, 3],
                "uri": "http://unused.test/session",
                "contentLength": 5,
                "contentRange": "bytes 0-4/5"
            }
        }),
    )
    .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unrecognized_operation_is_a_400() {
    let (_fake, server) = harness().await;

    let response = authorized(&server, json!({ "operation": "FETCH", "data": {} })).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "Invalid operation FETCH");
}

#[tokio::test]
async fn upstream_rejection_surfaces_the_payload_verbatim() {
    let (fake, server) = harness().await;
    *fake.reject_init.lock().unwrap() = Some((403, "rate limit exceeded".to_string()));

    let response = authorized(
        &server,
        json!({
            "operation": "INIT",
            "data": { "contentType": "text/plain", "contentLength": 1, "name": "a.txt" }
        }),
    )
    .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "rate limit exceeded");
}

// ============================================================================
// Pass-Through Fetch
// ============================================================================

#[tokio::test]
async fn metadata_fetch_passes_through() {
    let (_fake, server) = harness().await;

    let response = server
        .get("/google-drive")
        .add_query_param("id", "abc")
        .add_query_param("meta", "true")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("tok"))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["id"], "abc");
    assert_eq!(body["mimeType"], "text/plain");
}

#[tokio::test]
async fn content_download_passes_through() {
    let (_fake, server) = harness().await;

    let response = server
        .get("/google-drive")
        .add_query_param("id", "abc")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("tok"))
        .await;

    response.assert_status_ok();
    assert_eq!(response.text(), "hello content");
}

#[tokio::test]
async fn fetch_requires_an_id() {
    let (_fake, server) = harness().await;

    let response = server
        .get("/google-drive")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("tok"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "id parameter is required");
}

#[tokio::test]
async fn fetch_surfaces_upstream_rejection() {
    let (_fake, server) = harness().await;

    let response = server
        .get("/google-drive")
        .add_query_param("id", "forbidden")
        .add_query_param("meta", "true")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("tok"))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "insufficient scope");
}

// ============================================================================
// End-to-End Driver Run
// ============================================================================

struct NoRefresh;

#[async_trait]
impl TokenRefresher for NoRefresh {
    async fn refresh(&self, _refresh_token: &str) -> Result<Credential, AuthError> {
        panic!("refresh should not be reached with a fresh credential");
    }
}

fn signed_in_session() -> Arc<SessionClient> {
    Arc::new(SessionClient::new(
        Box::new(MemoryStore::with(Credential {
            access_token: "tok".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: 3600,
            issued_at: Utc::now(),
        })),
        Box::new(NoRefresh),
    ))
}

#[tokio::test]
async fn driver_uploads_through_the_relay_contract() {
    let fake = Arc::new(FakeDrive::default());
    let upstream = spawn(fake_router(fake.clone())).await;
    let proxy = spawn(relay_router(upstream)).await;

    let transport = ProxyTransport::new(format!("http://{proxy}/google-drive"));
    let driver = UploadDriver::new(transport, signed_in_session());

    let data: Vec<u8> = (0..600000usize).map(|i| (i % 251) as u8).collect();
    let mut source = MemorySource::new(data);
    let artifact = driver
        .upload(&mut source, "big.bin", "application/octet-stream", None)
        .await
        .unwrap();

    assert_eq!(artifact.id, "file-1");
    assert_eq!(*fake.received.lock().unwrap(), 600000);
    assert_eq!(
        *fake.puts.lock().unwrap(),
        vec![
            "bytes 0-262143/600000",
            "bytes 262144-524287/600000",
            "bytes 524288-599999/600000",
        ]
    );
}

#[tokio::test]
async fn driver_resumes_where_the_backend_truncated() {
    let fake = Arc::new(FakeDrive::default());
    *fake.truncate_at.lock().unwrap() = Some(400000);
    let upstream = spawn(fake_router(fake.clone())).await;
    let proxy = spawn(relay_router(upstream)).await;

    let transport = ProxyTransport::new(format!("http://{proxy}/google-drive"));
    let driver = UploadDriver::new(transport, signed_in_session());

    let data: Vec<u8> = (0..600000usize).map(|i| (i % 251) as u8).collect();
    let mut source = MemorySource::new(data);
    driver
        .upload(&mut source, "big.bin", "application/octet-stream", None)
        .await
        .unwrap();

    assert_eq!(
        *fake.puts.lock().unwrap(),
        vec![
            "bytes 0-262143/600000",
            "bytes 262144-524287/600000",
            // resumed from the server-reported offset, not the chunk boundary
            "bytes 400000-599999/600000",
        ]
    );
    assert_eq!(*fake.received.lock().unwrap(), 600000);
}
