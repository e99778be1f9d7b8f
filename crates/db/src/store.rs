//! Avatar record store seam.
//!
//! The pipeline persists through the [`AvatarStore`] trait rather than
//! calling the repository directly, so tests can substitute an
//! in-memory double and the worker receives the store as an injected
//! constructor dependency.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::avatar::{AvatarRecord, NewAvatar};
use crate::repositories::AvatarRepo;

/// Errors from the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence contract consumed by the pipeline worker.
#[async_trait]
pub trait AvatarStore: Send + Sync {
    /// Create the record for a successfully trained avatar.
    ///
    /// Uniqueness is scoped to the provider `avatar_id`; implementations
    /// absorb duplicate creation from queue redelivery.
    async fn create(&self, avatar: NewAvatar) -> Result<AvatarRecord, StoreError>;
}

/// PostgreSQL-backed [`AvatarStore`].
pub struct PgAvatarStore {
    pool: PgPool,
}

impl PgAvatarStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AvatarStore for PgAvatarStore {
    async fn create(&self, avatar: NewAvatar) -> Result<AvatarRecord, StoreError> {
        let record = AvatarRepo::create(&self.pool, &avatar).await?;
        tracing::info!(
            avatar_id = %record.avatar_id,
            user_id = %record.user_id,
            "Avatar record persisted",
        );
        Ok(record)
    }
}
