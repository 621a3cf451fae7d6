//! The merge endpoint: a stateless HTTP proxy in front of the model API.
//!
//! The handler never lets an error escape: every failure is mapped to a
//! JSON `{ "error": ... }` payload with the status from
//! [`MergeError::http_status`].

use crate::capture::EncodedImage;
use crate::error::Result;
use crate::merge::backend::MergeBackend;
use crate::merge::types::{MergeRequest, MISSING_FIELDS};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// The single-page frontend, embedded at compile time.
const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Shared handler state: the injected merge backend.
#[derive(Clone)]
pub struct AppState {
    backend: Arc<dyn MergeBackend>,
}

impl AppState {
    /// Creates handler state around a merge backend.
    pub fn new(backend: Arc<dyn MergeBackend>) -> Self {
        Self { backend }
    }
}

/// Incoming body for `POST /api/generate`. All fields are optional at the
/// wire level so absence maps to a 400 rather than a deserialization error.
#[derive(Debug, Deserialize)]
struct GenerateBody {
    image1: Option<EncodedImage>,
    image2: Option<EncodedImage>,
    prompt: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    image_url: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/api/generate", post(generate))
        .with_state(state)
}

/// Binds the address and serves until the process is stopped.
pub async fn serve(addr: SocketAddr, backend: Arc<dyn MergeBackend>) -> Result<()> {
    let app = router(AppState::new(backend));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "imagemix server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn generate(
    State(state): State<AppState>,
    body: std::result::Result<Json<GenerateBody>, JsonRejection>,
) -> (StatusCode, Json<serde_json::Value>) {
    // A body that isn't valid JSON still resolves to the error envelope
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(rejection.status(), &rejection.body_text()),
    };

    // Received -> Validated
    let request = match (body.image1, body.image2, body.prompt) {
        (Some(image1), Some(image2), Some(prompt)) => MergeRequest::new(image1, image2, prompt),
        _ => return error_response(StatusCode::BAD_REQUEST, MISSING_FIELDS),
    };
    if let Err(e) = request.validate() {
        return error_response(StatusCode::BAD_REQUEST, &e.to_string());
    }

    // Validated -> Dispatched-to-model
    let start = Instant::now();
    match state.backend.merge(&request).await {
        Ok(merged) => {
            tracing::info!(
                model = state.backend.model(),
                size_bytes = merged.size(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "merge succeeded"
            );
            let response = GenerateResponse {
                image_url: merged.to_data_url(),
            };
            (
                StatusCode::OK,
                Json(serde_json::to_value(response).unwrap_or_default()),
            )
        }
        Err(e) => {
            tracing::warn!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                "merge failed: {e}"
            );
            let status =
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            error_response(status, &e.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    let body = ErrorBody {
        error: message.to_string(),
    };
    (
        status,
        Json(serde_json::to_value(body).unwrap_or_default()),
    )
}
