//! The avatar-creation job payload and its domain enums.
//!
//! An [`AvatarJob`] is created by the API layer after it has staged the
//! uploaded source image to local disk. Once enqueued the payload is
//! immutable; the staged file is owned exclusively by the job until the
//! pipeline worker deletes it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Maximum length of an avatar name (also the provider group name).
const MAX_NAME_LEN: usize = 128;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Age bracket of the person in the source photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    Child,
    Teen,
    Adult,
    Senior,
}

impl AgeGroup {
    /// Parse from the wire/database name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "child" => Ok(Self::Child),
            "teen" => Ok(Self::Teen),
            "adult" => Ok(Self::Adult),
            "senior" => Ok(Self::Senior),
            other => Err(CoreError::Validation(format!(
                "Unknown age group '{other}'. Must be one of: child, teen, adult, senior"
            ))),
        }
    }

    /// Wire/database name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Child => "child",
            Self::Teen => "teen",
            Self::Adult => "adult",
            Self::Senior => "senior",
        }
    }
}

/// Gender presented to the provider and stored on the avatar record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Parse from the wire/database name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            unknown => Err(CoreError::Validation(format!(
                "Unknown gender '{unknown}'. Must be one of: male, female, other"
            ))),
        }
    }

    /// Wire/database name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }
}

// ---------------------------------------------------------------------------
// AvatarJob
// ---------------------------------------------------------------------------

/// One request to turn a staged photo into a trained avatar.
///
/// Serialized to JSONB for durable queue storage. The `idempotency_key`
/// is generated at construction time and forwarded on every provider
/// call so that a redelivered job does not create a second asset or
/// avatar group on the provider side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarJob {
    /// Staged source image; owned by this job until the worker deletes it.
    pub image_path: PathBuf,
    pub age_group: AgeGroup,
    /// Avatar name, forwarded as the provider's group name.
    pub name: String,
    pub gender: Gender,
    /// Opaque user identifier for notification routing and ownership.
    pub user_id: String,
    pub ethnicity: Option<String>,
    /// Content type of the staged image, forwarded verbatim on upload.
    pub mime_type: String,
    /// Client-generated key attached to provider calls.
    pub idempotency_key: Uuid,
}

impl AvatarJob {
    /// Build a payload with a fresh idempotency key.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        image_path: impl Into<PathBuf>,
        age_group: AgeGroup,
        name: impl Into<String>,
        gender: Gender,
        user_id: impl Into<String>,
        ethnicity: Option<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            image_path: image_path.into(),
            age_group,
            name: name.into(),
            gender,
            user_id: user_id.into(),
            ethnicity,
            mime_type: mime_type.into(),
            idempotency_key: Uuid::new_v4(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate the user-controlled fields of a job payload.
///
/// Rules:
/// - `name` must not be empty and must not exceed `MAX_NAME_LEN` characters.
/// - `user_id` must not be empty.
/// - `mime_type` must look like an image content type (`image/...`).
pub fn validate_job(job: &AvatarJob) -> Result<(), CoreError> {
    if job.name.trim().is_empty() {
        return Err(CoreError::Validation(
            "Avatar name must not be empty".to_string(),
        ));
    }
    if job.name.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Avatar name must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    if job.user_id.is_empty() {
        return Err(CoreError::Validation(
            "User id must not be empty".to_string(),
        ));
    }
    if !job.mime_type.starts_with("image/") {
        return Err(CoreError::Validation(format!(
            "Content type '{}' is not an image type",
            job.mime_type
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
