//! Image merging: request/result types, the backend seam, and the
//! Gemini-backed implementation.

pub mod backend;
pub mod gemini;
pub mod types;

pub use backend::MergeBackend;
pub use gemini::{GeminiMerger, GeminiMergerBuilder};
pub use types::{MergeRequest, MergedImage};
