//! HTTP tests for `SearchClient` against a local axum server.
//!
//! The server imitates the indexing service closely enough to check request
//! shapes (paths, api-version, api-key, bodies) and response handling.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use search_client::{
    tag_filter, Batch, ClientConfig, Document, IndexSchema, IndexService, SearchClient,
    ServiceError, ServiceOperation, DEFAULT_API_VERSION,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

const API_KEY: &str = "test-key";

/// What the fake service has seen.
#[derive(Default)]
struct Recorded {
    created: Vec<(String, serde_json::Value)>,
    deleted: Vec<String>,
    documents: Vec<Document>,
    searches: Vec<String>,
    /// Status returned by the next batch posts, consumed front to back
    batch_failures: Vec<StatusCode>,
}

type AppState = Arc<Mutex<Recorded>>;

fn authorized(headers: &HeaderMap, params: &HashMap<String, String>) -> bool {
    headers.get("api-key").and_then(|v| v.to_str().ok()) == Some(API_KEY)
        && params.get("api-version").map(String::as_str) == Some(DEFAULT_API_VERSION)
}

async fn create_index(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    if !authorized(&headers, &params) {
        return StatusCode::FORBIDDEN;
    }
    state.lock().unwrap().created.push((name, body));
    StatusCode::CREATED
}

async fn delete_index(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> StatusCode {
    if !authorized(&headers, &params) {
        return StatusCode::FORBIDDEN;
    }
    if name == "missing" {
        return StatusCode::NOT_FOUND;
    }
    state.lock().unwrap().deleted.push(name);
    StatusCode::NO_CONTENT
}

async fn post_documents(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(batch): Json<Batch>,
) -> Response {
    if !authorized(&headers, &params) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let mut recorded = state.lock().unwrap();
    if !recorded.batch_failures.is_empty() {
        let status = recorded.batch_failures.remove(0);
        return (status, "throttled").into_response();
    }
    recorded.documents.extend(batch.into_documents());
    StatusCode::OK.into_response()
}

async fn count_documents(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers, &params) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let search = params.get("search").cloned().unwrap_or_default();
    if params.get("$count").map(String::as_str) != Some("true")
        || params.get("$top").map(String::as_str) != Some("0")
    {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let mut recorded = state.lock().unwrap();
    let tag = search.strip_prefix("tag:").unwrap_or_default().to_string();
    let count = recorded.documents.iter().filter(|d| d.tag == tag).count();
    recorded.searches.push(search);

    Json(serde_json::json!({ "@odata.count": count, "value": [] })).into_response()
}

async fn garbage_count() -> Response {
    (StatusCode::OK, "not json").into_response()
}

/// Start the fake service and return its base URL.
async fn start_test_server(state: AppState) -> String {
    let app = Router::new()
        .route("/indexes/:name", put(create_index).delete(delete_index))
        .route("/indexes/:name/docs/index", post(post_documents))
        .route("/indexes/:name/docs", get(count_documents))
        .route("/broken/indexes/:name/docs", get(garbage_count))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn client(base_url: &str, index: &str) -> SearchClient {
    SearchClient::new(ClientConfig::new(base_url, API_KEY, index)).unwrap()
}

fn batch(tag: &str, n: usize) -> Batch {
    (0..n)
        .map(|i| Document::new(format!("doc{i}"), "lorem ipsum", tag))
        .collect()
}

#[tokio::test]
async fn test_create_index_sends_schema() {
    let state = AppState::default();
    let base_url = start_test_server(state.clone()).await;

    client(&base_url, "throughput")
        .create_index(&IndexSchema::default())
        .await
        .unwrap();

    let recorded = state.lock().unwrap();
    assert_eq!(recorded.created.len(), 1);
    let (name, body) = &recorded.created[0];
    assert_eq!(name, "throughput");
    assert_eq!(body["name"], "throughput");
    assert_eq!(body["fields"].as_array().unwrap().len(), 3);
    assert_eq!(body["fields"][0]["key"], true);
}

#[tokio::test]
async fn test_create_index_rejected_credentials() {
    let state = AppState::default();
    let base_url = start_test_server(state).await;

    let client = SearchClient::new(ClientConfig::new(&base_url, "wrong", "throughput")).unwrap();
    let err = client
        .create_index(&IndexSchema::default())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(403));
    assert_eq!(err.operation(), Some(ServiceOperation::CreateIndex));
}

#[tokio::test]
async fn test_delete_index() {
    let state = AppState::default();
    let base_url = start_test_server(state.clone()).await;

    client(&base_url, "throughput").delete_index().await.unwrap();
    assert_eq!(state.lock().unwrap().deleted, vec!["throughput".to_string()]);

    let err = client(&base_url, "missing").delete_index().await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_post_batch_and_count() {
    let state = AppState::default();
    let base_url = start_test_server(state.clone()).await;
    let client = client(&base_url, "throughput");

    client.post_batch(&batch("run-a", 25)).await.unwrap();
    client.post_batch(&batch("run-b", 5)).await.unwrap();

    assert_eq!(client.count_matching(&tag_filter("run-a")).await.unwrap(), 25);
    assert_eq!(client.count_matching(&tag_filter("run-b")).await.unwrap(), 5);
    assert_eq!(client.count_matching(&tag_filter("run-c")).await.unwrap(), 0);

    let recorded = state.lock().unwrap();
    assert_eq!(recorded.documents.len(), 30);
    assert_eq!(recorded.searches[0], "tag:run-a");
}

#[tokio::test]
async fn test_post_batch_failure_is_service_error() {
    let state = AppState::default();
    state
        .lock()
        .unwrap()
        .batch_failures
        .push(StatusCode::SERVICE_UNAVAILABLE);
    let base_url = start_test_server(state.clone()).await;
    let client = client(&base_url, "throughput");

    let err = client.post_batch(&batch("run", 3)).await.unwrap_err();
    match &err {
        ServiceError::Status {
            operation,
            status,
            body,
        } => {
            assert_eq!(*operation, ServiceOperation::PostBatch);
            assert_eq!(*status, 503);
            assert_eq!(body, "throttled");
        }
        other => panic!("Expected status error, got {other:?}"),
    }

    // The client does not retry on its own; a second call goes through
    client.post_batch(&batch("run", 3)).await.unwrap();
    assert_eq!(state.lock().unwrap().documents.len(), 3);
}

#[tokio::test]
async fn test_count_invalid_response() {
    let state = AppState::default();
    let base_url = start_test_server(state).await;

    let err = client(&format!("{base_url}/broken"), "throughput")
        .count_matching("tag:x")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_transport_error() {
    // Bind then drop a listener so the port is very likely closed
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = ClientConfig::new(format!("http://{addr}"), API_KEY, "throughput");
    config.timeout = Duration::from_secs(2);
    let client = SearchClient::new(config).unwrap();

    let err = client.post_batch(&batch("run", 1)).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Transport {
            operation: ServiceOperation::PostBatch,
            ..
        }
    ));
}
