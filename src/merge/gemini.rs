//! Gemini-backed merge implementation.
//!
//! Builds a single `generateContent` call carrying both images as inline
//! binary parts plus a fixed instruction template, and extracts the first
//! inline image from the first candidate of the response.

use crate::capture::ImageFormat;
use crate::error::{MergeError, Result};
use crate::merge::backend::MergeBackend;
use crate::merge::types::{MergeRequest, MergedImage};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Model used for image merging.
const MERGE_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Builds the instruction sent alongside the two images.
fn merge_instruction(prompt: &str) -> String {
    format!(
        "You are an expert at creatively merging and blending images. \
         Combine the following two images based on this user instruction: \
         \"{prompt}\". The output must be a single, new image that masterfully \
         combines elements from both inputs as described."
    )
}

/// Builder for [`GeminiMerger`].
#[derive(Debug, Clone, Default)]
pub struct GeminiMergerBuilder {
    api_key: Option<String>,
}

impl GeminiMergerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to the `GEMINI_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Builds the merger, resolving the API key.
    ///
    /// A missing key is a hard failure so the process aborts at startup
    /// rather than on the first request.
    pub fn build(self) -> Result<GeminiMerger> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .ok_or_else(|| {
                MergeError::Auth("GEMINI_API_KEY not set and no API key provided".into())
            })?;

        Ok(GeminiMerger {
            client: reqwest::Client::new(),
            api_key,
        })
    }
}

/// Gemini image merge backend.
pub struct GeminiMerger {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiMerger {
    /// Creates a new [`GeminiMergerBuilder`].
    pub fn builder() -> GeminiMergerBuilder {
        GeminiMergerBuilder::new()
    }

    async fn merge_impl(&self, request: &MergeRequest) -> Result<MergedImage> {
        request.validate()?;

        let start = Instant::now();

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            MERGE_MODEL,
        );

        let body = GeminiRequest::from_merge_request(request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_upstream_error(status.as_u16(), &text));
        }

        let gemini_response: GeminiResponse = response.json().await?;

        // A blocked prompt comes back as HTTP 200 with feedback and no parts
        if let Some(ref feedback) = gemini_response.prompt_feedback {
            if let Some(ref reason) = feedback.block_reason {
                let msg = feedback
                    .block_reason_message
                    .clone()
                    .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
                return Err(MergeError::ContentBlocked(msg));
            }
        }

        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or(MergeError::NoCandidate)?;

        let content = candidate.content.ok_or(MergeError::NoImage)?;

        // Take the first inline-data part; any text parts are ignored
        let inline_data = content
            .parts
            .into_iter()
            .find_map(|p| p.inline_data)
            .ok_or(MergeError::NoImage)?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(&inline_data.data)
            .map_err(|e| MergeError::Decode(e.to_string()))?;

        let format = ImageFormat::from_mime_type(&inline_data.mime_type)
            .or_else(|| ImageFormat::from_magic_bytes(&data))
            .unwrap_or_default();

        Ok(MergedImage {
            data,
            format,
            model: Some(MERGE_MODEL.to_string()),
            duration_ms: Some(start.elapsed().as_millis() as u64),
        })
    }
}

#[async_trait]
impl MergeBackend for GeminiMerger {
    async fn merge(&self, request: &MergeRequest) -> Result<MergedImage> {
        self.merge_impl(request).await
    }

    fn model(&self) -> &str {
        MERGE_MODEL
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}",
            MERGE_MODEL,
        );

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(MergeError::Auth("Invalid API key".into())),
            s if !(200..300).contains(&s) => Err(MergeError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

/// Maps a non-2xx upstream response to an error, pulling the message out
/// of the JSON error envelope when one is present.
fn parse_upstream_error(status: u16, text: &str) -> MergeError {
    let message = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| text.trim().to_string());

    if status == 429 {
        return MergeError::RateLimited;
    }
    if status == 401 || status == 403 {
        return MergeError::Auth(message);
    }
    let lower = message.to_lowercase();
    if lower.contains("safety") || lower.contains("blocked") || lower.contains("prohibited") {
        return MergeError::ContentBlocked(message);
    }
    MergeError::Api { status, message }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn from_merge_request(req: &MergeRequest) -> Self {
        let parts = vec![
            GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: req.image1.mime_type.clone(),
                    data: req.image1.base64.clone(),
                },
            },
            GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: req.image2.mime_type.clone(),
                    data: req.image2.base64.clone(),
                },
            },
            GeminiRequestPart::Text {
                text: merge_instruction(&req.prompt),
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::EncodedImage;

    fn sample_request() -> MergeRequest {
        let img = |payload: &str| EncodedImage {
            base64: payload.into(),
            mime_type: "image/png".into(),
        };
        MergeRequest::new(img("AAAA"), img("BBBB"), "put the cat on the moon")
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let merger = GeminiMerger::builder().api_key("test-key").build();
        assert!(merger.is_ok());
    }

    #[test]
    fn test_instruction_interpolates_prompt() {
        let text = merge_instruction("swap the skies");
        assert!(text.contains("\"swap the skies\""));
        assert!(text.starts_with("You are an expert at creatively merging"));
    }

    #[test]
    fn test_request_construction() {
        let req = GeminiRequest::from_merge_request(&sample_request());

        assert_eq!(req.contents.len(), 1);
        let parts = &req.contents[0].parts;
        assert_eq!(parts.len(), 3);
        assert!(matches!(parts[0], GeminiRequestPart::InlineData { .. }));
        assert!(matches!(parts[1], GeminiRequestPart::InlineData { .. }));
        assert!(matches!(parts[2], GeminiRequestPart::Text { .. }));
        assert_eq!(
            req.generation_config.response_modalities,
            vec!["IMAGE", "TEXT"]
        );
    }

    #[test]
    fn test_request_serialization_uses_camel_case() {
        let req = GeminiRequest::from_merge_request(&sample_request());
        let json = serde_json::to_value(&req).unwrap();

        assert!(json.get("generationConfig").is_some());
        assert!(json.get("generation_config").is_none());

        let part = &json["contents"][0]["parts"][0];
        assert!(part.get("inline_data").is_none());
        assert_eq!(part["inlineData"]["mimeType"], "image/png");
        assert_eq!(part["inlineData"]["data"], "AAAA");
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here is your merged image"},
                        {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
                    ]
                }
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.candidates.len(), 1);

        let content = resp.candidates[0].content.as_ref().unwrap();
        // Text part first; selection must skip it and find the image part
        assert!(content.parts[0].inline_data.is_none());
        let inline = content.parts[1].inline_data.as_ref().unwrap();
        assert_eq!(inline.mime_type, "image/png");
    }

    #[test]
    fn test_response_with_prompt_feedback_block() {
        let json = r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(resp.candidates.is_empty());
        let feedback = resp.prompt_feedback.unwrap();
        assert_eq!(feedback.block_reason.as_deref(), Some("SAFETY"));
    }

    #[test]
    fn test_parse_upstream_error() {
        let body = r#"{"error": {"message": "API key not valid", "status": "UNAUTHENTICATED"}}"#;
        assert!(matches!(
            parse_upstream_error(401, body),
            MergeError::Auth(_)
        ));
        assert!(matches!(
            parse_upstream_error(429, body),
            MergeError::RateLimited
        ));

        let err = parse_upstream_error(503, "backend overloaded");
        match err {
            MergeError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "backend overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_upstream_error_safety_body() {
        let body = r#"{"error": {"message": "Request blocked by safety settings"}}"#;
        assert!(matches!(
            parse_upstream_error(400, body),
            MergeError::ContentBlocked(_)
        ));
    }
}
