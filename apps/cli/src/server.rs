//! HTTP trigger and keyword admin API.
//!
//! Every `/api/*` route except `/api/health` requires
//! `Authorization: Bearer <secret>`. Every response carries a JSON body.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use seopress_core::{Controller, RunOutcome, RunRequest};
use seopress_shared::{KeywordRecord, KeywordStatus, SeoPressError};
use seopress_storage::KeywordStore;

/// State shared by every handler.
#[derive(Clone)]
pub(crate) struct AppState {
    controller: Arc<Controller>,
    /// Held for the duration of a run; triggers queue behind it.
    run_gate: Arc<Mutex<()>>,
    secret: Arc<str>,
}

impl AppState {
    pub(crate) fn new(controller: Controller, secret: impl Into<Arc<str>>) -> Self {
        Self {
            controller: Arc::new(controller),
            run_gate: Arc::new(Mutex::new(())),
            secret: secret.into(),
        }
    }

    fn store(&self) -> KeywordStore {
        self.controller.store().clone()
    }
}

pub(crate) fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/generate", post(trigger).fallback(method_not_allowed))
        .route("/api/keywords", get(list_keywords).post(add_keyword))
        .route("/api/keywords/:keyword", delete(remove_keyword))
        .route("/api/keywords/:keyword/requeue", post(requeue_keyword))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/api/health", get(health))
        .merge(protected)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

/// An error response: status code plus the JSON envelope.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    message: String,
    keyword: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            keyword: None,
        }
    }
}

impl From<SeoPressError> for ApiError {
    fn from(err: SeoPressError) -> Self {
        let status = if err.is_contention() {
            StatusCode::CONFLICT
        } else {
            // Only bare input errors are the caller's fault; anything wrapped
            // by a run is a server-side failure.
            match &err {
                SeoPressError::Validation { .. } | SeoPressError::Parse { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        };
        let keyword = match &err {
            SeoPressError::Pipeline { keyword, .. } => Some(keyword.clone()),
            _ => None,
        };
        Self {
            status,
            message: err.to_string(),
            keyword,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse {
            success: false,
            message: self.message,
            keyword: self.keyword,
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Run a blocking store operation off the async runtime.
async fn with_store<T, F>(store: KeywordStore, f: F) -> ApiResult<T>
where
    F: FnOnce(&KeywordStore) -> seopress_shared::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("store task failed: {e}")))?
        .map_err(ApiError::from)
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| secrets_match(token.trim(), &state.secret));

    if !authorized {
        warn!(path = %request.uri().path(), "rejected request without valid bearer token");
        return ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    next.run(request).await
}

/// Length-checked comparison that does not stop at the first differing byte.
fn secrets_match(given: &str, expected: &str) -> bool {
    given.len() == expected.len()
        && given
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<ApiResponse> {
    Json(ApiResponse {
        success: true,
        message: "ok".into(),
        keyword: None,
    })
}

async fn method_not_allowed() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Not found")
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TriggerRequest {
    #[serde(default)]
    keyword: Option<String>,
}

impl TriggerRequest {
    /// An empty body asks for the next queued keyword. Anything else must be
    /// a JSON object, whatever `Content-Type` the caller sent.
    fn from_body(body: &[u8]) -> ApiResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| {
            ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid request body: {e}"))
        })
    }
}

async fn trigger(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<ApiResponse>> {
    let request = RunRequest {
        keyword: TriggerRequest::from_body(&body)?.keyword,
    };

    let _gate = state.run_gate.lock().await;
    match state.controller.run(request).await? {
        RunOutcome::Published {
            keyword,
            url,
            side_effects,
            ..
        } => {
            side_effects.detach();
            Ok(Json(ApiResponse {
                success: true,
                message: format!("Published '{keyword}' at {url}"),
                keyword: Some(keyword),
            }))
        }
        RunOutcome::NoEligible { message } => Err(ApiError::new(StatusCode::BAD_REQUEST, message)),
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct KeywordList {
    success: bool,
    keywords: Vec<KeywordRecord>,
}

async fn list_keywords(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<KeywordList>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<KeywordStatus>)
        .transpose()?;

    let mut keywords = with_store(state.store(), |s| s.read_all()).await?;
    if let Some(status) = status {
        keywords.retain(|r| r.status == status);
    }
    Ok(Json(KeywordList {
        success: true,
        keywords,
    }))
}

#[derive(Debug, Deserialize)]
struct NewKeyword {
    keyword: String,
    stage: Option<String>,
    intent: Option<String>,
    priority: Option<String>,
}

impl NewKeyword {
    fn into_record(self) -> seopress_shared::Result<KeywordRecord> {
        let mut record = KeywordRecord::queued(self.keyword);
        if let Some(stage) = self.stage {
            record.stage = stage.parse()?;
        }
        if let Some(intent) = self.intent {
            record.intent = intent.parse()?;
        }
        if let Some(priority) = self.priority {
            record.priority = priority.parse()?;
        }
        Ok(record)
    }
}

async fn add_keyword(
    State(state): State<AppState>,
    body: Result<Json<NewKeyword>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse>)> {
    let Json(body) = body?;
    let record = body.into_record()?;
    let keyword = record.keyword.clone();

    let exists = {
        let keyword = keyword.clone();
        with_store(state.store(), move |s| s.find_by_keyword(&keyword)).await?
    };
    if exists.is_some() {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            format!("Keyword '{keyword}' already exists"),
        ));
    }

    with_store(state.store(), move |s| s.insert(record)).await?;
    info!(%keyword, "keyword added via API");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            success: true,
            message: format!("Added '{keyword}'"),
            keyword: Some(keyword),
        }),
    ))
}

async fn remove_keyword(
    State(state): State<AppState>,
    Path(keyword): Path<String>,
) -> ApiResult<Json<ApiResponse>> {
    let removed = {
        let keyword = keyword.clone();
        with_store(state.store(), move |s| s.delete(&keyword)).await?
    };
    if !removed {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Keyword '{keyword}' not found"),
        ));
    }
    Ok(Json(ApiResponse {
        success: true,
        message: format!("Removed '{keyword}'"),
        keyword: Some(keyword),
    }))
}

async fn requeue_keyword(
    State(state): State<AppState>,
    Path(keyword): Path<String>,
) -> ApiResult<Json<ApiResponse>> {
    let exists = {
        let keyword = keyword.clone();
        with_store(state.store(), move |s| s.find_by_keyword(&keyword)).await?
    };
    if exists.is_none() {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Keyword '{keyword}' not found"),
        ));
    }

    let record = {
        let keyword = keyword.clone();
        with_store(state.store(), move |s| s.requeue(&keyword)).await?
    };
    Ok(Json(ApiResponse {
        success: true,
        message: format!("Requeued '{}'", record.keyword),
        keyword: Some(record.keyword),
    }))
}
