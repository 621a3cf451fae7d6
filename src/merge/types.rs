//! Core types for image merging.

use crate::capture::{EncodedImage, ImageFormat};
use crate::error::{MergeError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Validation failure message shared by the client and the endpoint.
pub const MISSING_FIELDS: &str = "Missing required fields";

/// A request to merge two images according to a text instruction.
///
/// All three fields are required; [`MergeRequest::validate`] is called
/// before any dispatch, client-side and server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequest {
    /// First input image.
    pub image1: EncodedImage,
    /// Second input image.
    pub image2: EncodedImage,
    /// Natural-language description of the desired merge.
    pub prompt: String,
}

impl MergeRequest {
    /// Creates a new merge request.
    pub fn new(image1: EncodedImage, image2: EncodedImage, prompt: impl Into<String>) -> Self {
        Self {
            image1,
            image2,
            prompt: prompt.into(),
        }
    }

    /// Rejects requests with an empty prompt or empty image payloads.
    pub fn validate(&self) -> Result<()> {
        if self.image1.is_empty() || self.image2.is_empty() || self.prompt.trim().is_empty() {
            return Err(MergeError::InvalidRequest(MISSING_FIELDS.into()));
        }
        Ok(())
    }
}

/// A merged image returned by the generation model.
#[derive(Debug, Clone)]
#[must_use = "merged image should be saved or rendered"]
pub struct MergedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Image format, as reported by the model.
    pub format: ImageFormat,
    /// Model that produced this image.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
}

impl MergedImage {
    /// Creates a merged image from raw bytes and a format.
    pub fn new(data: Vec<u8>, format: ImageFormat) -> Self {
        Self {
            data,
            format,
            model: None,
            duration_ms: None,
        }
    }

    /// Parses a `data:<mime>;base64,<payload>` string back into bytes.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| MergeError::Decode("not a data URL".into()))?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| MergeError::Decode("data URL is not base64-encoded".into()))?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| MergeError::Decode(e.to_string()))?;

        let format = ImageFormat::from_mime_type(mime)
            .or_else(|| ImageFormat::from_magic_bytes(&data))
            .unwrap_or_default();

        Ok(Self::new(data, format))
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a data URL embedding its MIME type and payload.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            self.to_base64()
        )
    }

    /// Size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }
}
