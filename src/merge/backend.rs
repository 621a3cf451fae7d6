//! Merge backend trait.

use crate::error::Result;
use crate::merge::types::{MergeRequest, MergedImage};
use async_trait::async_trait;

/// Trait for services that can merge two images from a text instruction.
///
/// The HTTP endpoint holds a `dyn MergeBackend` rather than constructing a
/// concrete client itself, so tests can substitute a fake and the API key
/// check happens exactly once, at construction.
#[async_trait]
pub trait MergeBackend: Send + Sync {
    /// Merges the two images in the request into a single new image.
    ///
    /// One upstream round trip per call; no retries.
    async fn merge(&self, request: &MergeRequest) -> Result<MergedImage>;

    /// Identifier of the model this backend dispatches to.
    fn model(&self) -> &str;

    /// Checks if the backend is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}
