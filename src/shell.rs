//! Application shell state machine.
//!
//! Holds the two image slots, the prompt, and the in-flight/result flags,
//! and enforces the transitions the UI is allowed to make. The browser
//! frontend mirrors this machine in JavaScript; the CLI drives this one
//! directly.

use crate::capture::{EncodedImage, ImageFormat};
use crate::merge::types::MergeRequest;

/// Fixed prefix for the downloaded/saved output file.
pub const DOWNLOAD_FILE_PREFIX: &str = "merged-image";

/// Which of the two upload slots an image goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    /// First upload slot.
    First,
    /// Second upload slot.
    Second,
}

/// The observable phase of the shell, derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellPhase {
    /// Nothing entered yet.
    Idle,
    /// Some inputs present, but not all three.
    ImagesPartial,
    /// Both images set and the prompt is non-empty.
    ReadyToGenerate,
    /// A generate call is in flight.
    Generating,
    /// A merged image is available.
    Succeeded,
    /// The last attempt failed.
    Failed,
}

/// UI state for the merge application.
#[derive(Debug, Default)]
pub struct AppShell {
    image1: Option<EncodedImage>,
    image2: Option<EncodedImage>,
    prompt: String,
    loading: bool,
    result: Option<String>,
    error: Option<String>,
}

impl AppShell {
    /// Creates an empty shell in the Idle phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an uploaded image, replacing any previous one in the slot.
    ///
    /// Uploads are ignored while a generate call is in flight, matching
    /// the disabled inputs in the frontend.
    pub fn set_image(&mut self, slot: ImageSlot, image: EncodedImage) {
        if self.loading {
            return;
        }
        match slot {
            ImageSlot::First => self.image1 = Some(image),
            ImageSlot::Second => self.image2 = Some(image),
        }
    }

    /// Clears an upload slot.
    pub fn clear_image(&mut self, slot: ImageSlot) {
        if self.loading {
            return;
        }
        match slot {
            ImageSlot::First => self.image1 = None,
            ImageSlot::Second => self.image2 = None,
        }
    }

    /// Updates the prompt text.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        if self.loading {
            return;
        }
        self.prompt = prompt.into();
    }

    /// Returns the preview data URL for a slot, if an image is set.
    pub fn preview(&self, slot: ImageSlot) -> Option<String> {
        match slot {
            ImageSlot::First => self.image1.as_ref().map(EncodedImage::to_data_url),
            ImageSlot::Second => self.image2.as_ref().map(EncodedImage::to_data_url),
        }
    }

    /// True when both images are set and the prompt is non-empty.
    pub fn is_form_complete(&self) -> bool {
        self.image1.is_some() && self.image2.is_some() && !self.prompt.trim().is_empty()
    }

    /// The current phase.
    pub fn phase(&self) -> ShellPhase {
        if self.loading {
            return ShellPhase::Generating;
        }
        if self.result.is_some() {
            return ShellPhase::Succeeded;
        }
        if self.error.is_some() {
            return ShellPhase::Failed;
        }
        if self.is_form_complete() {
            return ShellPhase::ReadyToGenerate;
        }
        if self.image1.is_some() || self.image2.is_some() || !self.prompt.trim().is_empty() {
            return ShellPhase::ImagesPartial;
        }
        ShellPhase::Idle
    }

    /// Begins a generate attempt.
    ///
    /// Returns the request to dispatch, or `None` when the form is
    /// incomplete or a call is already in flight (no duplicate
    /// submissions). Clears any previous result and error.
    pub fn begin_generate(&mut self) -> Option<MergeRequest> {
        if self.loading || !self.is_form_complete() {
            return None;
        }
        let (Some(image1), Some(image2)) = (self.image1.clone(), self.image2.clone()) else {
            return None;
        };

        self.loading = true;
        self.result = None;
        self.error = None;

        Some(MergeRequest::new(image1, image2, self.prompt.clone()))
    }

    /// Completes the in-flight generate attempt.
    ///
    /// Loading is cleared before the result is stored, so the shell never
    /// holds a success value and a pending-loading flag at the same time.
    /// Exactly one of result/error is populated afterwards.
    pub fn finish(&mut self, outcome: std::result::Result<String, String>) {
        self.loading = false;
        match outcome {
            Ok(data_url) => {
                self.result = Some(data_url);
                self.error = None;
            }
            Err(message) => {
                self.error = Some(message);
                self.result = None;
            }
        }
    }

    /// The generated image's data URL, in the Succeeded phase.
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// The failure message, in the Failed phase.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// File name for the download action. Only available once a result
    /// exists; the extension follows the result's MIME type.
    pub fn download_file_name(&self) -> Option<String> {
        let result = self.result.as_deref()?;
        let extension = result
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .and_then(ImageFormat::from_mime_type)
            .unwrap_or_default()
            .extension();
        Some(format!("{DOWNLOAD_FILE_PREFIX}.{extension}"))
    }
}
