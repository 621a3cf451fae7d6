#![warn(missing_docs)]
//! imagemix - merge two images with a natural-language instruction.
//!
//! The crate wraps Google's Gemini image model behind a small proxy server
//! so the secret API key never reaches the browser. It ships the building
//! blocks for the whole flow: file encoding, the merge backend, the HTTP
//! client for the proxied endpoint, and the UI state machine the frontend
//! and CLI both follow.
//!
//! # Quick Start - server
//!
//! ```no_run
//! use imagemix::{server, GeminiMerger};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> imagemix::Result<()> {
//!     let backend = Arc::new(GeminiMerger::builder().build()?);
//!     server::serve("127.0.0.1:8080".parse().unwrap(), backend).await
//! }
//! ```
//!
//! # Quick Start - client
//!
//! ```no_run
//! use imagemix::{EncodedImage, MergeClient, MergeRequest, MergedImage};
//!
//! #[tokio::main]
//! async fn main() -> imagemix::Result<()> {
//!     let image1 = EncodedImage::from_path("castle.png").await?;
//!     let image2 = EncodedImage::from_path("dragon.jpg").await?;
//!     let request = MergeRequest::new(image1, image2, "put the dragon on the castle");
//!
//!     let client = MergeClient::new("http://127.0.0.1:8080");
//!     let data_url = client.generate_merged_image(&request).await?;
//!     MergedImage::from_data_url(&data_url)?.save("merged-image.png")?;
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod client;
mod error;
pub mod merge;
pub mod server;
pub mod shell;

pub use capture::{EncodedImage, ImageFormat};
pub use client::MergeClient;
pub use error::{MergeError, Result};
pub use merge::{GeminiMerger, GeminiMergerBuilder, MergeBackend, MergeRequest, MergedImage};
pub use shell::{AppShell, ImageSlot, ShellPhase, DOWNLOAD_FILE_PREFIX};
