//! Repository for the `avatars` table.

use sqlx::PgPool;

use crate::models::avatar::{AvatarRecord, NewAvatar, AVATAR_STATUS_PENDING};

/// Column list for `avatars` queries.
const COLUMNS: &str = "\
    id, avatar_id, user_id, avatar_name, gender, \
    preview_image_url, preview_video_url, is_default, \
    ethnicity, age_group, status, created_at, updated_at";

/// Provides persistence for trained avatar records.
pub struct AvatarRepo;

impl AvatarRepo {
    /// Persist a freshly trained avatar with `status = "pending"`.
    ///
    /// Upserts on the provider-assigned `avatar_id`: a redelivered job
    /// that reaches the persist stage twice converges on one row
    /// instead of failing the second attempt.
    pub async fn create(pool: &PgPool, avatar: &NewAvatar) -> Result<AvatarRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO avatars \
                 (avatar_id, user_id, avatar_name, gender, preview_image_url, \
                  ethnicity, age_group, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (avatar_id) DO UPDATE SET updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AvatarRecord>(&query)
            .bind(&avatar.avatar_id)
            .bind(&avatar.user_id)
            .bind(&avatar.avatar_name)
            .bind(&avatar.gender)
            .bind(&avatar.preview_image_url)
            .bind(&avatar.ethnicity)
            .bind(&avatar.age_group)
            .bind(AVATAR_STATUS_PENDING)
            .fetch_one(pool)
            .await
    }

    /// Find an avatar by its provider-assigned identifier.
    pub async fn find_by_avatar_id(
        pool: &PgPool,
        avatar_id: &str,
    ) -> Result<Option<AvatarRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM avatars WHERE avatar_id = $1");
        sqlx::query_as::<_, AvatarRecord>(&query)
            .bind(avatar_id)
            .fetch_optional(pool)
            .await
    }
}
