use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pagesmith_common::{EvaluationNotice, SubmissionRequest, SubmissionResponse};
use serde::{Deserialize, Serialize};

use crate::deploy::Deployer;
use crate::errors::DeployError;
use crate::notify::Notifier;

pub const SERVICE_NAME: &str = "meta-app-builder";

// ── Shared application state ──────────────────────────────────────────

/// The one email/secret pair allowed to submit.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub secret: String,
}

impl Credentials {
    fn matches(&self, email: &str, secret: &str) -> bool {
        self.email == email && self.secret == secret
    }
}

pub struct AppState {
    pub credentials: Credentials,
    pub deployer: Arc<Deployer>,
    pub notifier: Notifier,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PreviewRequest {
    pub task: String,
    pub brief: String,
    #[serde(default)]
    pub checks_text: String,
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub task: String,
    pub brief: String,
    pub checks: Vec<String>,
    pub hint: &'static str,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    Unauthorized(String),
    Unprocessable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<DeployError> for ApiError {
    fn from(err: DeployError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/submit", post(submit))
        .route("/revise", post(submit))
        .route("/preview", post(preview))
        .route("/healthz", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"ok": true, "service": SERVICE_NAME}))
}

/// Build or revise the app for a task, publish it, then tell the grader.
async fn submit(
    State(state): State<SharedState>,
    Json(payload): Json<SubmissionRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let started = Instant::now();
    if !state.credentials.matches(&payload.email, &payload.secret) {
        tracing::warn!(task = %payload.task, "rejected submission: credential mismatch");
        return Err(ApiError::Unauthorized("email/secret mismatch".into()));
    }
    payload
        .validate()
        .map_err(|e| ApiError::Unprocessable(e.to_string()))?;

    tracing::info!(task = %payload.task, round = payload.round, nonce = %payload.nonce, "submission accepted");
    let evaluation_url = payload.evaluation_url.clone();
    let result = state
        .deployer
        .deploy_detached(payload.clone())
        .await
        .inspect_err(|e| tracing::error!(task = %payload.task, error = %e, "deployment failed"))?;

    let response = SubmissionResponse::new(&payload, &result);
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let notice = EvaluationNotice::new(&response, latency_ms);
    let outcome = state.notifier.notify(&evaluation_url, &notice).await;
    tracing::debug!(?outcome, "evaluation callback outcome");

    Ok(Json(response))
}

/// Echo what a submission would contain without deploying anything.
async fn preview(Json(payload): Json<PreviewRequest>) -> Json<PreviewResponse> {
    let checks = payload
        .checks_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    Json(PreviewResponse {
        task: payload.task,
        brief: payload.brief,
        checks,
        hint: "POST JSON to /submit from your client for real deployment",
    })
}
