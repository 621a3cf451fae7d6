//! Error types for the image merge pipeline.

/// Errors that can occur while encoding, merging, or serving images.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The generation API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded on the generation API.
    #[error("rate limited by the generation API")]
    RateLimited,

    /// Content was blocked by the model's safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters (missing image or prompt).
    #[error("{0}")]
    InvalidRequest(String),

    /// The model returned no candidates at all.
    #[error("No candidate response from the model.")]
    NoCandidate,

    /// The model answered, but no response part carried image data.
    #[error("API did not return an image. It may have refused the request.")]
    NoImage,

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 or recognize an image format.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., reading an input file or saving the result).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MergeError {
    /// HTTP status the merge endpoint uses when reporting this error.
    ///
    /// Only request validation maps to 400; every upstream or internal
    /// failure is reported as 500 with the error's message in the body.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            _ => 500,
        }
    }
}

/// Result type alias for merge operations.
pub type Result<T> = std::result::Result<T, MergeError>;
