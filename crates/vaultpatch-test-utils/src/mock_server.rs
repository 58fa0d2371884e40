//! A local stand-in for the Obsidian Local REST API.
//!
//! [`MockRestApi`] serves the subset of endpoints [`RestVaultClient`] calls
//! over real HTTP on `127.0.0.1`, backed by a [`MemoryVault`]. Every request
//! is recorded so tests can assert on methods, paths, and query strings.
//!
//! [`RestVaultClient`]: vaultpatch_core::RestVaultClient

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::debug;
use vaultpatch_core::vault::{Period, VaultApi, VaultError};

use crate::memory_vault::MemoryVault;

/// API key the mock accepts unless another is given.
pub const TEST_API_KEY: &str = "test-api-key";

/// One request as seen by the mock, before authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
}

pub struct MockState {
    vault: Arc<MemoryVault>,
    api_key: String,
    requests: Mutex<Vec<RecordedRequest>>,
    failure: Mutex<Option<(StatusCode, String)>>,
}

/// Build the router on its own, for in-process `oneshot` tests.
pub fn router(state: Arc<MockState>) -> axum::Router {
    axum::Router::new()
        .route("/vault/", get(list_root))
        .route(
            "/vault/{*path}",
            get(get_entry)
                .put(put_entry)
                .post(append_entry)
                .delete(delete_entry),
        )
        .route("/search/simple/", post(simple_search))
        .route("/search/", post(structured_search))
        .route("/periodic/{period}/", get(periodic_note))
        .route("/periodic/{period}/recent", get(recent_periodic))
        .layer(middleware::from_fn_with_state(state.clone(), record_and_authorize))
        .with_state(state)
}

/// A running mock server. Stops when dropped.
pub struct MockRestApi {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockRestApi {
    /// Serve an empty vault with [`TEST_API_KEY`].
    pub async fn start() -> std::io::Result<Self> {
        Self::with_vault(Arc::new(MemoryVault::new()), TEST_API_KEY).await
    }

    pub async fn with_vault(vault: Arc<MemoryVault>, api_key: &str) -> std::io::Result<Self> {
        let state = MockState::new(vault, api_key);
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = router(state.clone());
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                debug!(error = %e, "mock REST API stopped");
            }
        });
        debug!(%addr, "mock REST API listening");
        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// `http://127.0.0.1:<port>`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn vault(&self) -> &Arc<MemoryVault> {
        &self.state.vault
    }

    pub fn insert(&self, path: &str, content: &str) {
        self.state.vault.insert(path, content);
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.state.vault.content(path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests()
    }

    /// Answer every authorized request with `status` and a raw `body`.
    pub fn fail_with(&self, status: StatusCode, body: &str) {
        *self.state.failure.lock().expect("mock lock poisoned") = Some((status, body.to_string()));
    }
}

impl Drop for MockRestApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl MockState {
    pub fn new(vault: Arc<MemoryVault>, api_key: &str) -> Arc<Self> {
        Arc::new(Self {
            vault,
            api_key: api_key.to_string(),
            requests: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("mock lock poisoned").clone()
    }
}

fn api_error(status: StatusCode, code: i64, message: &str) -> Response {
    (status, Json(json!({"errorCode": code, "message": message}))).into_response()
}

fn vault_error(err: VaultError) -> Response {
    match err {
        VaultError::Api {
            status, code, message, ..
        } => api_error(
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code,
            &message,
        ),
        other => api_error(StatusCode::INTERNAL_SERVER_ERROR, 50000, &other.to_string()),
    }
}

fn markdown(content: String) -> Response {
    ([(CONTENT_TYPE, "text/markdown; charset=utf-8")], content).into_response()
}

fn header_value(request: &Request, name: HeaderName) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn record_and_authorize(
    State(state): State<Arc<MockState>>,
    request: Request,
    next: Next,
) -> Response {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        content_type: header_value(&request, CONTENT_TYPE),
    };
    let authorized = header_value(&request, AUTHORIZATION) == Some(format!("Bearer {}", state.api_key));
    state
        .requests
        .lock()
        .expect("mock lock poisoned")
        .push(recorded);

    if !authorized {
        return api_error(
            StatusCode::UNAUTHORIZED,
            40101,
            "Authorization required. Find your API Key in the 'Local REST API' section of your Obsidian settings.",
        );
    }
    let failure = state.failure.lock().expect("mock lock poisoned").clone();
    if let Some((status, body)) = failure {
        return (status, body).into_response();
    }
    next.run(request).await
}

async fn list_dir(state: &MockState, dir: &str) -> Response {
    match state.vault.list_files(Some(dir)).await {
        Ok(files) => Json(json!({"files": files})).into_response(),
        Err(e) => vault_error(e),
    }
}

async fn list_root(State(state): State<Arc<MockState>>) -> Response {
    list_dir(&state, "").await
}

async fn get_entry(State(state): State<Arc<MockState>>, Path(path): Path<String>) -> Response {
    if let Some(dir) = path.strip_suffix('/') {
        return list_dir(&state, dir).await;
    }
    match state.vault.get_file(&path).await {
        Ok(content) => markdown(content),
        Err(e) => vault_error(e),
    }
}

async fn put_entry(
    State(state): State<Arc<MockState>>,
    Path(path): Path<String>,
    body: String,
) -> Response {
    match state.vault.put_file(&path, &body).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => vault_error(e),
    }
}

async fn append_entry(
    State(state): State<Arc<MockState>>,
    Path(path): Path<String>,
    body: String,
) -> Response {
    match state.vault.append_file(&path, &body).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => vault_error(e),
    }
}

async fn delete_entry(State(state): State<Arc<MockState>>, Path(path): Path<String>) -> Response {
    match state.vault.delete_file(&path).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => vault_error(e),
    }
}

async fn simple_search(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(query) = params.get("query") else {
        return api_error(StatusCode::BAD_REQUEST, 40000, "query parameter is required");
    };
    let context_length = params
        .get("contextLength")
        .and_then(|v| v.parse().ok())
        .unwrap_or(100);
    match state.vault.simple_search(query, context_length).await {
        Ok(hits) => Json(hits).into_response(),
        Err(e) => vault_error(e),
    }
}

async fn structured_search(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let result = match content_type {
        "application/vnd.olrapi.jsonlogic+json" => match serde_json::from_slice::<Value>(&body) {
            Ok(query) => state.vault.search_json_logic(&query).await,
            Err(e) => {
                return api_error(StatusCode::BAD_REQUEST, 40016, &format!("invalid JsonLogic: {e}"));
            }
        },
        "application/vnd.olrapi.dataview.dql+txt" => {
            state.vault.search_dql(&String::from_utf8_lossy(&body)).await
        }
        other => {
            return api_error(
                StatusCode::BAD_REQUEST,
                40015,
                &format!("unsupported content type {other:?}"),
            );
        }
    };
    match result {
        Ok(value) => Json(value).into_response(),
        Err(e) => vault_error(e),
    }
}

fn parse_period(period: &str) -> Result<Period, Response> {
    period
        .parse::<Period>()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, 40060, "unknown period"))
}

async fn periodic_note(
    State(state): State<Arc<MockState>>,
    Path(period): Path<String>,
) -> Response {
    let period = match parse_period(&period) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    match state.vault.periodic_note(period).await {
        Ok(content) => markdown(content),
        Err(e) => vault_error(e),
    }
}

async fn recent_periodic(
    State(state): State<Arc<MockState>>,
    Path(period): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let period = match parse_period(&period) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let limit = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(5);
    let include_content = params.get("includeContent").is_some_and(|v| v == "true");
    match state
        .vault
        .recent_periodic_notes(period, limit, include_content)
        .await
    {
        Ok(value) => Json(value).into_response(),
        Err(e) => vault_error(e),
    }
}
