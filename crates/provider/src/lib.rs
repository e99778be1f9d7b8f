//! Client for the external avatar-training service.
//!
//! The pipeline consumes the provider through the [`AvatarProvider`]
//! trait so tests can substitute doubles; [`api::AvatarApi`] is the
//! production HTTP implementation over [`reqwest`].
//!
//! The provider workflow is three calls, in order: upload the source
//! photo as an asset, create an avatar group from the returned image
//! key, then kick off training for the group. Training returns an
//! acknowledgement only; actual completion is observed out-of-band.

pub mod api;

use async_trait::async_trait;
use uuid::Uuid;

pub use api::{AvatarApi, ProviderError};

/// Asset handle returned by a successful upload.
#[derive(Debug, Clone)]
pub struct UploadedAsset {
    /// Provider-assigned key referencing the uploaded image.
    pub image_key: String,
}

/// Request body for avatar-group creation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CreateAvatarGroup {
    /// Group name shown in the provider dashboard (the avatar name).
    pub name: String,
    /// Image key from a prior [`AvatarProvider::upload_asset`] call.
    pub image_key: String,
}

/// Identifiers assigned by the provider when a group is created.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AvatarGroup {
    pub avatar_id: String,
    pub group_id: String,
    pub preview_image_url: String,
}

/// Acknowledgement returned by the training endpoint.
///
/// Training runs asynchronously on the provider side; this only
/// confirms the request was accepted.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct TrainAck {
    pub status: Option<String>,
}

/// Contract the pipeline worker consumes.
///
/// Every call carries the job's idempotency key so that an at-least-once
/// redelivery does not create duplicate provider-side resources.
#[async_trait]
pub trait AvatarProvider: Send + Sync {
    /// Upload raw image bytes; fails with
    /// [`ProviderError::MissingImageKey`] when the response lacks a key.
    async fn upload_asset(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        idempotency_key: Uuid,
    ) -> Result<UploadedAsset, ProviderError>;

    /// Create an avatar group from an uploaded asset.
    async fn create_avatar_group(
        &self,
        req: &CreateAvatarGroup,
        idempotency_key: Uuid,
    ) -> Result<AvatarGroup, ProviderError>;

    /// Request training for a group. Best-effort from the pipeline's
    /// point of view; callers decide whether an error is fatal.
    async fn train(&self, group_id: &str) -> Result<TrainAck, ProviderError>;
}
