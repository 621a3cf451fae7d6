//! Image capture: turning a user-selected file into an encoded payload.

use crate::error::{MergeError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Attempts to detect format from a MIME type string.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// A user-supplied image, base64-encoded with its MIME type.
///
/// This is the wire form the frontend, the merge endpoint, and the Gemini
/// API all exchange: a bare base64 payload (no data-URL prefix) plus the
/// MIME type as a separate field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImage {
    /// Base64-encoded image bytes, standard alphabet, no prefix.
    pub base64: String,
    /// MIME type of the encoded bytes (e.g. "image/png").
    pub mime_type: String,
}

impl EncodedImage {
    /// Encodes raw image bytes, sniffing the MIME type from magic bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let format = ImageFormat::from_magic_bytes(data)
            .ok_or_else(|| MergeError::Decode("Unknown image format".into()))?;
        Ok(Self {
            base64: base64::engine::general_purpose::STANDARD.encode(data),
            mime_type: format.mime_type().to_string(),
        })
    }

    /// Reads and encodes an image file.
    ///
    /// Single-shot read with one resolution point; the file extension is
    /// used as a fallback when the content's magic bytes are unrecognized.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;

        match Self::from_bytes(&data) {
            Ok(img) => Ok(img),
            Err(e) => {
                let ext_format = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(ImageFormat::from_extension);
                match ext_format {
                    Some(format) => Ok(Self {
                        base64: base64::engine::general_purpose::STANDARD.encode(&data),
                        mime_type: format.mime_type().to_string(),
                    }),
                    None => Err(e),
                }
            }
        }
    }

    /// Returns the full data-URL form, usable directly as an image source.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }

    /// Decoded size of the payload in bytes.
    pub fn decoded_len(&self) -> usize {
        // 4 base64 chars encode 3 bytes; padding overcounts by at most 2.
        let padding = self.base64.bytes().rev().take_while(|&b| b == b'=').count();
        (self.base64.len() / 4 * 3).saturating_sub(padding)
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.base64.is_empty()
    }
}
