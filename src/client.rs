//! HTTP client for the merge endpoint.
//!
//! This is the proxied path: the client only ever talks to the imagemix
//! server, which holds the API key. One network call per invocation, no
//! retry, no timeout.

use crate::error::{MergeError, Result};
use crate::merge::types::MergeRequest;
use serde::Deserialize;

/// Success payload from the merge endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    image_url: String,
}

/// Error payload from the merge endpoint.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Client for a running imagemix server.
pub struct MergeClient {
    client: reqwest::Client,
    base_url: String,
}

impl MergeClient {
    /// Creates a client pointed at the given server base URL
    /// (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Sends a merge request and returns the generated image as a data URL.
    ///
    /// Invalid requests fail locally and never dispatch a network call.
    /// A non-success response yields the server's `error` field, or a
    /// generic status-based message when the body carries none.
    pub async fn generate_merged_image(&self, request: &MergeRequest) -> Result<String> {
        request.validate()?;

        let url = format!("{}/api/generate", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => format!("Request failed with status {}", status.as_u16()),
            };
            return Err(MergeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response.json().await?;
        Ok(body.image_url)
    }
}
