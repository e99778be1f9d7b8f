//! Pipeline error taxonomy and user-facing message mapping.
//!
//! Upload and group-creation failures are terminal and carry their own
//! stage-specific notification; training failures never become errors
//! here (they are logged and recovered in-stage); everything else is
//! surfaced to the user through one generic error notification.

use std::time::Duration;

use persona_db::StoreError;
use persona_provider::ProviderError;

/// Terminal failure of one pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The staged source image could not be read.
    #[error("Failed to read staged image: {0}")]
    ReadImage(#[source] std::io::Error),

    /// Asset upload failed or the response lacked an image key.
    #[error("Asset upload failed: {0}")]
    Upload(#[source] ProviderError),

    /// Avatar-group creation failed.
    #[error("Avatar group creation failed: {0}")]
    GroupCreation(#[source] ProviderError),

    /// The avatar record write failed after training was requested.
    #[error("Avatar record persistence failed: {0}")]
    Persistence(#[from] StoreError),

    /// The job ran past its overall deadline.
    #[error("Job exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

/// User-facing message for a group-creation failure, keyed on the
/// provider's HTTP status.
pub(crate) fn group_creation_message(status: Option<u16>) -> &'static str {
    match status {
        Some(400) => "The image format or size was not accepted. Please try a different photo.",
        Some(429) => "The avatar service is busy right now. Please retry in a few minutes.",
        _ => "Avatar group creation failed. Please try again.",
    }
}

impl PipelineError {
    /// Whether a stage-specific error notification was already emitted
    /// for this failure inside the state machine.
    pub fn stage_notified(&self) -> bool {
        matches!(self, Self::Upload(_) | Self::GroupCreation(_))
    }

    /// Message shown to the end user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ReadImage(_) | Self::Upload(_) => {
                "Image upload failed. Please try again."
            }
            Self::GroupCreation(e) => group_creation_message(e.status()),
            Self::Persistence(_) | Self::DeadlineExceeded(_) => {
                "Avatar creation failed unexpectedly. Please try again."
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
