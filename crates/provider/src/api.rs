//! REST client for the avatar-training HTTP API.
//!
//! Wraps the provider's asset-upload, group-creation, and training
//! endpoints using [`reqwest`]. All calls are authenticated with a
//! static API key header and carry the job's idempotency key.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::{AvatarGroup, AvatarProvider, CreateAvatarGroup, TrainAck, UploadedAsset};

/// Header carrying the static API key.
const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the per-job idempotency key.
const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";

/// HTTP request timeout for a single provider call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors from the provider REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx upload response that did not contain an image key.
    #[error("Upload response did not contain an image key")]
    MissingImageKey,
}

impl ProviderError {
    /// HTTP status of the failure, when the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::MissingImageKey => None,
        }
    }
}

/// Response body of the asset-upload endpoint.
///
/// The key is optional on the wire; [`AvatarApi::upload_asset`] turns
/// its absence into [`ProviderError::MissingImageKey`].
#[derive(Debug, Deserialize)]
struct UploadResponse {
    image_key: Option<String>,
}

/// HTTP client for the avatar-training service.
pub struct AvatarApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AvatarApi {
    /// Create a new API client.
    ///
    /// * `base_url` - e.g. `https://api.avatars.example.com`.
    /// * `api_key`  - static key sent on every request.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across services).
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ProviderError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl AvatarProvider for AvatarApi {
    /// Upload the source photo as a provider asset.
    ///
    /// Sends `POST /v1/assets` with the raw bytes as the body and the
    /// staged image's content type forwarded verbatim.
    async fn upload_asset(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        idempotency_key: Uuid,
    ) -> Result<UploadedAsset, ProviderError> {
        let response = self
            .client
            .post(format!("{}/v1/assets", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header(IDEMPOTENCY_HEADER, idempotency_key.to_string())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let parsed: UploadResponse = Self::parse_response(response).await?;
        let image_key = parsed.image_key.ok_or(ProviderError::MissingImageKey)?;

        Ok(UploadedAsset { image_key })
    }

    /// Create an avatar group from an uploaded asset.
    ///
    /// Sends `POST /v2/avatar_groups` with the group name and image key.
    async fn create_avatar_group(
        &self,
        req: &CreateAvatarGroup,
        idempotency_key: Uuid,
    ) -> Result<AvatarGroup, ProviderError> {
        let response = self
            .client
            .post(format!("{}/v2/avatar_groups", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header(IDEMPOTENCY_HEADER, idempotency_key.to_string())
            .json(req)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Kick off training for a group.
    ///
    /// Sends `POST /v2/avatar_groups/{group_id}/train`. The provider
    /// answers with an acknowledgement, not a trained state.
    async fn train(&self, group_id: &str) -> Result<TrainAck, ProviderError> {
        let response = self
            .client
            .post(format!("{}/v2/avatar_groups/{group_id}/train", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
