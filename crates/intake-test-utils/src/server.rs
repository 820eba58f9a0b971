//! HTTP front for [`MemoryIngestApi`].
//!
//! [`MockIngestServer`] binds an axum router to `127.0.0.1:0` and serves the
//! ingestion API under `/api`, delegating every call to an in-memory service
//! so tests can assert on recorded calls after going through real HTTP.

use axum::extract::{Multipart, Path, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use intake_core::api::{IngestApi, UploadFile};
use intake_core::error::Error;
use intake_core::model::{Dataset, Table};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use crate::memory::MemoryIngestApi;

#[derive(Clone)]
struct ServerState {
    api: MemoryIngestApi,
    token: Option<String>,
}

struct ApiFailure(Error);

impl From<Error> for ApiFailure {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            Error::Rejected { status, message } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message,
            ),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

type HandlerResult = Result<Json<Value>, ApiFailure>;

fn json_of<T: serde::Serialize>(value: &T) -> HandlerResult {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| ApiFailure(Error::malformed(e.to_string())))
}

async fn list_datasets(State(state): State<ServerState>) -> HandlerResult {
    let datasets = state.api.list_datasets().await?;
    json_of(&datasets)
}

async fn create_dataset(
    State(state): State<ServerState>,
    Json(dataset): Json<Dataset>,
) -> HandlerResult {
    let created = state.api.create_dataset(&dataset).await?;
    json_of(&created)
}

async fn list_tables(
    State(state): State<ServerState>,
    Path(dataset): Path<String>,
) -> HandlerResult {
    let tables = state.api.list_tables(&dataset).await?;
    json_of(&tables)
}

async fn get_table(
    State(state): State<ServerState>,
    Path((dataset, table)): Path<(String, String)>,
) -> HandlerResult {
    let schema = state.api.get_table(&dataset, &table).await?;
    json_of(&schema)
}

async fn update_table(
    State(state): State<ServerState>,
    Path((dataset, table)): Path<(String, String)>,
    Json(schema): Json<Table>,
) -> HandlerResult {
    let updated = state.api.update_table(&dataset, &table, &schema).await?;
    json_of(&updated)
}

async fn upload_file(
    State(state): State<ServerState>,
    Path(filename): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Value>, Response> {
    let mut data = None;
    let mut metadata = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(IntoResponse::into_response)?
    {
        match field.name() {
            Some("file") => {
                data = Some(field.bytes().await.map_err(IntoResponse::into_response)?);
            }
            Some("metadata") => {
                metadata = Some(field.text().await.map_err(IntoResponse::into_response)?);
            }
            _ => {}
        }
    }
    let Some(data) = data else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "missing file part" })),
        )
            .into_response());
    };

    let file = UploadFile::from_bytes(filename.clone(), data);
    state
        .api
        .upload_file(&filename, &file, metadata.as_deref())
        .await
        .map(Json)
        .map_err(|e| ApiFailure(e).into_response())
}

async fn find_match(
    State(state): State<ServerState>,
    Path(filename): Path<String>,
) -> HandlerResult {
    match state.api.find_match(&filename).await? {
        Some(dataset) => json_of(&dataset),
        None => Ok(Json(Value::Null)),
    }
}

async fn require_token(State(state): State<ServerState>, request: Request, next: Next) -> Response {
    if let Some(token) = &state.token {
        let expected = format!("Bearer {token}");
        let presented = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if presented != Some(expected.as_str()) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": "Not authenticated" })),
            )
                .into_response();
        }
    }
    next.run(request).await
}

fn router(state: ServerState) -> Router {
    let api = Router::new()
        .route("/datasets", get(list_datasets).post(create_dataset))
        .route("/:dataset/tables", get(list_tables))
        .route("/:dataset/tables/:table", get(get_table).put(update_table))
        .route("/upload/:filename", post(upload_file))
        .route("/findmatch/:filename", get(find_match))
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state);
    Router::new().nest("/api", api)
}

/// A running HTTP server backed by a [`MemoryIngestApi`].
///
/// The server task is aborted on drop.
pub struct MockIngestServer {
    base_url: String,
    api: MemoryIngestApi,
    handle: JoinHandle<()>,
}

impl MockIngestServer {
    /// Starts a server that accepts unauthenticated requests.
    pub async fn start(api: MemoryIngestApi) -> Self {
        Self::spawn(api, None).await
    }

    /// Starts a server that answers 401 unless `Authorization: Bearer <token>` is sent.
    pub async fn start_with_token(api: MemoryIngestApi, token: impl Into<String>) -> Self {
        Self::spawn(api, Some(token.into())).await
    }

    async fn spawn(api: MemoryIngestApi, token: Option<String>) -> Self {
        let app = router(ServerState {
            api: api.clone(),
            token,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}/api"),
            api,
            handle,
        }
    }

    /// Base URL ending in `/api`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The service behind the server.
    pub fn api(&self) -> &MemoryIngestApi {
        &self.api
    }
}

impl Drop for MockIngestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
