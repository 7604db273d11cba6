//! Fake Firestore REST API server for integration tests.
//!
//! Spins up a minimal `axum` HTTP server on a random TCP port bound to
//! 127.0.0.1. Serves:
//! - `GET  /v1/projects/{p}/databases/(default)/documents/{collection}`,
//!   paginated with `pageSize`/`pageToken` (capped by [`FakeFirestore::set_page_size`])
//! - `POST /v1/projects/{p}/databases/(default)/documents:commit`, applying
//!   masked `update` writes atomically
//! - `POST /token`, the OAuth token endpoint for the JWT-bearer grant
//!
//! Every Firestore route requires `Authorization: Bearer <token>` where the
//! token is the one handed out by `/token` or set with
//! [`FakeFirestore::accept_token`].
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo() {
//! let api = FakeFirestore::start("walld").await.unwrap();
//! api.add_node("tenants/acme/nodes/n1", "Head Office").await;
//! // Point a FirestoreClient at api.base_url()
//! # }
//! ```

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub const ISSUED_TOKEN: &str = "fake-access-token";

/// State shared between the router and test code.
#[derive(Default)]
struct ApiState {
    project: String,
    /// Relative document path → typed `fields` object.
    docs: BTreeMap<String, Map<String, Value>>,
    accepted_tokens: BTreeSet<String>,
    page_size: Option<usize>,
    failing_commits: BTreeSet<usize>,
    commit_attempts: usize,
    /// Bodies of every commit request, accepted or not.
    commit_bodies: Vec<Value>,
    /// Forms posted to `/token`.
    token_requests: Vec<TokenForm>,
    list_requests: usize,
}

/// Handle to the running fake Firestore server.
pub struct FakeFirestore {
    addr: SocketAddr,
    state: Arc<Mutex<ApiState>>,
}

impl FakeFirestore {
    pub async fn start(project: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(ApiState {
            project: project.to_string(),
            ..ApiState::default()
        }));

        let app = Router::new()
            .route("/token", post(issue_token))
            .route(
                "/v1/projects/{project}/databases/{database}/documents:commit",
                post(commit),
            )
            .route(
                "/v1/projects/{project}/databases/{database}/documents/{*collection}",
                get(list),
            )
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        Ok(Self { addr, state })
    }

    /// Base URL for the API (e.g. `http://127.0.0.1:PORT`).
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn token_uri(&self) -> String {
        format!("{}/token", self.base_url())
    }

    pub async fn accept_token(&self, token: &str) {
        self.state.lock().await.accepted_tokens.insert(token.to_string());
    }

    /// Serve at most `n` documents per page regardless of `pageSize`.
    pub async fn set_page_size(&self, n: usize) {
        self.state.lock().await.page_size = Some(n);
    }

    /// Make the `attempt`-th commit (zero-based) answer 500.
    pub async fn fail_commit(&self, attempt: usize) {
        self.state.lock().await.failing_commits.insert(attempt);
    }

    /// Store a document with a typed `fields` object.
    pub async fn add_document(&self, path: &str, fields: Value) {
        let fields = fields.as_object().cloned().unwrap_or_default();
        self.state.lock().await.docs.insert(path.to_string(), fields);
    }

    /// Store a node with just a `name` string field.
    pub async fn add_node(&self, path: &str, name: &str) {
        self.add_document(path, json!({ "name": { "stringValue": name } }))
            .await;
    }

    /// The plain string value of `field` on the document at `path`.
    pub async fn string_field(&self, path: &str, field: &str) -> Option<String> {
        let state = self.state.lock().await;
        state
            .docs
            .get(path)?
            .get(field)?
            .get("stringValue")?
            .as_str()
            .map(str::to_string)
    }

    pub async fn commit_bodies(&self) -> Vec<Value> {
        self.state.lock().await.commit_bodies.clone()
    }

    pub async fn token_requests(&self) -> Vec<TokenForm> {
        self.state.lock().await.token_requests.clone()
    }

    pub async fn list_requests(&self) -> usize {
        self.state.lock().await.list_requests
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

type Shared = Arc<Mutex<ApiState>>;

/// Body of an OAuth token request.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenForm {
    pub grant_type: String,
    pub assertion: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    page_size: Option<usize>,
    page_token: Option<String>,
}

fn error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "code": status.as_u16(), "message": message } })),
    )
        .into_response()
}

/// Checks the bearer token and the project/database the request is addressed to.
fn reject(state: &ApiState, headers: &HeaderMap, project: &str, database: &str) -> Option<Response> {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    if !state.accepted_tokens.contains(bearer) {
        return Some(error(StatusCode::UNAUTHORIZED, "missing or invalid bearer token"));
    }
    if project != state.project || database != "(default)" {
        return Some(error(
            StatusCode::NOT_FOUND,
            &format!("project {project} or database {database} does not exist"),
        ));
    }
    None
}

async fn issue_token(State(state): State<Shared>, Form(form): Form<TokenForm>) -> Response {
    let mut state = state.lock().await;
    state.token_requests.push(form.clone());
    if form.grant_type != "urn:ietf:params:oauth:grant-type:jwt-bearer" || form.assertion.is_empty() {
        return error(StatusCode::BAD_REQUEST, "unsupported grant");
    }
    state.accepted_tokens.insert(ISSUED_TOKEN.to_string());
    Json(json!({
        "access_token": ISSUED_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600,
    }))
    .into_response()
}

async fn list(
    Path((project, database, collection)): Path<(String, String, String)>,
    Query(params): Query<ListParams>,
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().await;
    state.list_requests += 1;
    if let Some(rejected) = reject(&state, &headers, &project, &database) {
        return rejected;
    }

    let requested = params.page_size.unwrap_or(usize::MAX);
    let size = state.page_size.map_or(requested, |cap| cap.min(requested));
    let offset: usize = params
        .page_token
        .and_then(|t| t.parse().ok())
        .unwrap_or(0);

    let prefix = format!("{}/", collection.trim_matches('/'));
    let children: Vec<(&String, &Map<String, Value>)> = state
        .docs
        .iter()
        .filter(|(p, _)| {
            p.strip_prefix(&prefix)
                .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
        })
        .collect();

    let documents: Vec<Value> = children
        .iter()
        .skip(offset)
        .take(size)
        .map(|(path, fields)| {
            json!({
                "name": format!(
                    "projects/{}/databases/(default)/documents/{path}",
                    state.project
                ),
                "fields": fields,
                "createTime": "2024-01-15T10:00:00Z",
                "updateTime": "2024-01-15T10:00:00Z",
            })
        })
        .collect();

    let mut body = json!({});
    if !documents.is_empty() {
        body["documents"] = Value::Array(documents);
    }
    if offset.saturating_add(size) < children.len() {
        body["nextPageToken"] = Value::String((offset + size).to_string());
    }
    Json(body).into_response()
}

async fn commit(
    Path((project, database)): Path<(String, String)>,
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    let mut state = state.lock().await;
    if let Some(rejected) = reject(&state, &headers, &project, &database) {
        return rejected;
    }
    state.commit_bodies.push(request.clone());
    let attempt = state.commit_attempts;
    state.commit_attempts += 1;
    if state.failing_commits.contains(&attempt) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "injected failure");
    }

    let root = format!("projects/{}/databases/(default)/documents/", state.project);
    let writes = request["writes"].as_array().cloned().unwrap_or_default();

    // Validate everything before applying anything.
    let mut applied = Vec::with_capacity(writes.len());
    for write in &writes {
        let Some(path) = write["update"]["name"]
            .as_str()
            .and_then(|n| n.strip_prefix(&root))
        else {
            return error(StatusCode::BAD_REQUEST, "bad document name");
        };
        if write["currentDocument"]["exists"] == json!(true) && !state.docs.contains_key(path) {
            return error(StatusCode::NOT_FOUND, &format!("no entity to update: {path}"));
        }
        let mask: Vec<String> = write["updateMask"]["fieldPaths"]
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let fields = write["update"]["fields"].as_object().cloned().unwrap_or_default();
        applied.push((path.to_string(), mask, fields));
    }

    for (path, mask, fields) in applied {
        let doc = state.docs.entry(path).or_default();
        for field in mask {
            match fields.get(&field) {
                Some(v) => doc.insert(field, v.clone()),
                None => doc.remove(&field),
            };
        }
    }

    Json(json!({
        "writeResults": writes.iter().map(|_| json!({"updateTime": "2024-01-15T10:00:01Z"})).collect::<Vec<_>>(),
        "commitTime": "2024-01-15T10:00:01Z",
    }))
    .into_response()
}
