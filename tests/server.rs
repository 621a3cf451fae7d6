//! Endpoint tests against the router with a fake merge backend.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use imagemix::server::{router, AppState};
use imagemix::{ImageFormat, MergeBackend, MergeError, MergeRequest, MergedImage};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const PNG_BYTES: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

/// Backend stub whose behavior is fixed at construction.
struct FakeBackend(fn() -> Result<MergedImage, MergeError>);

#[async_trait]
impl MergeBackend for FakeBackend {
    async fn merge(&self, _request: &MergeRequest) -> Result<MergedImage, MergeError> {
        (self.0)()
    }

    fn model(&self) -> &str {
        "fake-model"
    }

    async fn health_check(&self) -> Result<(), MergeError> {
        Ok(())
    }
}

fn app(behavior: fn() -> Result<MergedImage, MergeError>) -> axum::Router {
    router(AppState::new(Arc::new(FakeBackend(behavior))))
}

fn succeed() -> Result<MergedImage, MergeError> {
    Ok(MergedImage::new(PNG_BYTES.to_vec(), ImageFormat::Png))
}

fn no_candidate() -> Result<MergedImage, MergeError> {
    Err(MergeError::NoCandidate)
}

fn no_image() -> Result<MergedImage, MergeError> {
    Err(MergeError::NoImage)
}

fn generate_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn valid_body() -> Value {
    let image = json!({"base64": "iVBORw0KGgo=", "mimeType": "image/png"});
    json!({"image1": image, "image2": image, "prompt": "blend them"})
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn generate_success_returns_exact_data_url() {
    let response = app(succeed)
        .oneshot(generate_request(valid_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;

    use base64::Engine;
    let expected = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(PNG_BYTES)
    );
    assert_eq!(body["imageUrl"], expected);
}

#[tokio::test]
async fn generate_missing_image_is_400() {
    let mut body = valid_body();
    body.as_object_mut().unwrap().remove("image2");

    let response = app(succeed).oneshot(generate_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Missing required fields");
}

#[tokio::test]
async fn generate_missing_prompt_is_400() {
    let mut body = valid_body();
    body.as_object_mut().unwrap().remove("prompt");

    let response = app(succeed).oneshot(generate_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Missing required fields");
}

#[tokio::test]
async fn generate_empty_prompt_is_400() {
    let mut body = valid_body();
    body["prompt"] = json!("");

    let response = app(succeed).oneshot(generate_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Missing required fields");
}

#[tokio::test]
async fn generate_malformed_body_resolves_to_error_envelope() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app(succeed).oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    let body = json_body(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn generate_without_candidate_is_500() {
    let response = app(no_candidate)
        .oneshot(generate_request(valid_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await["error"],
        "No candidate response from the model."
    );
}

#[tokio::test]
async fn generate_without_image_part_is_500() {
    let response = app(no_image)
        .oneshot(generate_request(valid_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await["error"],
        "API did not return an image. It may have refused the request."
    );
}

#[tokio::test]
async fn success_round_trips_through_download_path() {
    let response = app(succeed)
        .oneshot(generate_request(valid_body()))
        .await
        .unwrap();
    let body = json_body(response).await;

    // What the browser downloads must decode to the bytes the model returned
    let merged = MergedImage::from_data_url(body["imageUrl"].as_str().unwrap()).unwrap();
    assert_eq!(merged.data, PNG_BYTES);
    assert_eq!(merged.format, ImageFormat::Png);
}

#[tokio::test]
async fn index_serves_frontend() {
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app(succeed).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8_lossy(&bytes);
    assert!(html.contains("/api/generate"));
}

#[tokio::test]
async fn healthz_is_ok() {
    let request = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let response = app(succeed).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
