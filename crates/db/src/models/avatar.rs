//! Avatar record entity and insert DTO.

use persona_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Initial status of a freshly persisted avatar. Flips once the
/// out-of-band training status check observes completion.
pub const AVATAR_STATUS_PENDING: &str = "pending";

/// A row from the `avatars` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AvatarRecord {
    pub id: DbId,
    /// Provider-assigned avatar identifier; unique across the table.
    pub avatar_id: String,
    pub user_id: String,
    pub avatar_name: String,
    pub gender: String,
    pub preview_image_url: String,
    /// Empty until a later asynchronous enrichment fills it in.
    pub preview_video_url: String,
    pub is_default: bool,
    pub ethnicity: Option<String>,
    pub age_group: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert DTO for a newly trained avatar.
#[derive(Debug, Clone)]
pub struct NewAvatar {
    pub avatar_id: String,
    pub user_id: String,
    pub avatar_name: String,
    pub gender: String,
    pub preview_image_url: String,
    pub ethnicity: Option<String>,
    pub age_group: String,
}
