//! The four-stage avatar pipeline state machine.
//!
//! Stage order is fixed: upload -> group creation -> training -> persist.
//! No stage is skipped or reordered, and no record is written unless
//! every stage before persistence succeeded. The staged source image is
//! removed on every exit path; removal is idempotent so the per-stage
//! cleanup and the terminal cleanup cannot double-fault.

use std::sync::Arc;
use std::time::Duration;

use persona_core::{staging, AvatarJob};
use persona_db::models::avatar::{AvatarRecord, NewAvatar};
use persona_db::AvatarStore;
use persona_events::{ProgressNotifier, Stage, Status};
use persona_provider::{AvatarProvider, CreateAvatarGroup};

use crate::error::PipelineError;

/// Default wait between group creation and the training call; the
/// provider needs time to index the new group before it will accept a
/// training request.
const DEFAULT_TRAIN_DELAY: Duration = Duration::from_secs(20);

/// Default overall per-job deadline covering all four stages.
const DEFAULT_JOB_DEADLINE: Duration = Duration::from_secs(600);

/// Tuning knobs for a [`PipelineWorker`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Suspension between group creation and the training call.
    pub train_delay: Duration,
    /// Hard upper bound on one job's total processing time.
    pub job_deadline: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            train_delay: DEFAULT_TRAIN_DELAY,
            job_deadline: DEFAULT_JOB_DEADLINE,
        }
    }
}

/// Drives one avatar job at a time through the provider workflow.
///
/// All collaborators are injected; the worker owns no global state and
/// any number of workers may run concurrently against the same queue.
pub struct PipelineWorker {
    provider: Arc<dyn AvatarProvider>,
    notifier: Arc<dyn ProgressNotifier>,
    store: Arc<dyn AvatarStore>,
    config: PipelineConfig,
}

impl PipelineWorker {
    pub fn new(
        provider: Arc<dyn AvatarProvider>,
        notifier: Arc<dyn ProgressNotifier>,
        store: Arc<dyn AvatarStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            provider,
            notifier,
            store,
            config,
        }
    }

    /// Process one job to a terminal state.
    ///
    /// On return the staged image is gone regardless of outcome, and the
    /// user has been notified of the terminal state: a stage-specific
    /// error for upload/group-creation failures, one generic error for
    /// anything else, or the final completion event.
    pub async fn process(&self, job: &AvatarJob) -> Result<AvatarRecord, PipelineError> {
        let result = match tokio::time::timeout(self.config.job_deadline, self.execute(job)).await
        {
            Ok(result) => result,
            Err(_) => Err(PipelineError::DeadlineExceeded(self.config.job_deadline)),
        };

        // Terminal cleanup: covers success, the deadline path (where
        // execute() was cancelled mid-stage), and any error that did
        // not already clean up at its failure site.
        self.cleanup(job).await;

        if let Err(ref e) = result {
            tracing::error!(user_id = %job.user_id, error = %e, "Avatar job failed");
            if !e.stage_notified() {
                self.notifier
                    .notify(
                        &job.user_id,
                        Stage::Error,
                        Status::Error,
                        serde_json::json!({ "message": e.user_message() }),
                    )
                    .await;
            }
        }

        result
    }

    /// Run the stage sequence. Stage failures notify, clean up, and
    /// return; the caller handles everything that escapes.
    async fn execute(&self, job: &AvatarJob) -> Result<AvatarRecord, PipelineError> {
        let image_key = self.upload(job).await?;
        let group = self.create_group(job, &image_key).await?;
        self.train(job, &group.group_id).await;
        self.persist(job, &group).await
    }

    /// Stage 1: read the staged image and upload it as a provider asset.
    async fn upload(&self, job: &AvatarJob) -> Result<String, PipelineError> {
        let bytes = tokio::fs::read(&job.image_path)
            .await
            .map_err(PipelineError::ReadImage)?;

        let asset = match self
            .provider
            .upload_asset(bytes, &job.mime_type, job.idempotency_key)
            .await
        {
            Ok(asset) => asset,
            Err(e) => {
                let err = PipelineError::Upload(e);
                self.notifier
                    .notify(
                        &job.user_id,
                        Stage::Upload,
                        Status::Error,
                        serde_json::json!({
                            "message": err.user_message(),
                            "raw_error": err.to_string(),
                        }),
                    )
                    .await;
                self.cleanup(job).await;
                return Err(err);
            }
        };

        tracing::info!(user_id = %job.user_id, image_key = %asset.image_key, "Asset uploaded");
        self.notifier
            .notify(
                &job.user_id,
                Stage::Upload,
                Status::Success,
                serde_json::json!({ "image_key": asset.image_key }),
            )
            .await;

        Ok(asset.image_key)
    }

    /// Stage 2: create the avatar group from the uploaded asset.
    async fn create_group(
        &self,
        job: &AvatarJob,
        image_key: &str,
    ) -> Result<persona_provider::AvatarGroup, PipelineError> {
        let request = CreateAvatarGroup {
            name: job.name.clone(),
            image_key: image_key.to_string(),
        };

        let group = match self
            .provider
            .create_avatar_group(&request, job.idempotency_key)
            .await
        {
            Ok(group) => group,
            Err(e) => {
                let err = PipelineError::GroupCreation(e);
                self.notifier
                    .notify(
                        &job.user_id,
                        Stage::GroupCreation,
                        Status::Error,
                        serde_json::json!({
                            "message": err.user_message(),
                            "raw_error": err.to_string(),
                        }),
                    )
                    .await;
                self.cleanup(job).await;
                return Err(err);
            }
        };

        tracing::info!(
            user_id = %job.user_id,
            avatar_id = %group.avatar_id,
            group_id = %group.group_id,
            "Avatar group created",
        );
        self.notifier
            .notify(
                &job.user_id,
                Stage::GroupCreation,
                Status::Success,
                serde_json::json!({
                    "avatar_id": group.avatar_id,
                    "group_id": group.group_id,
                    "preview_image_url": group.preview_image_url,
                }),
            )
            .await;

        Ok(group)
    }

    /// Stage 3: wait out the provider's indexing delay, then request
    /// training. Best-effort: a failed training request is logged and
    /// the pipeline continues, since the call only acknowledges the
    /// request; actual completion is observed out-of-band.
    async fn train(&self, job: &AvatarJob, group_id: &str) {
        self.notifier
            .notify(
                &job.user_id,
                Stage::Training,
                Status::Progress,
                serde_json::json!({ "message": "Avatar training started" }),
            )
            .await;

        tokio::time::sleep(self.config.train_delay).await;

        match self.provider.train(group_id).await {
            Ok(ack) => {
                tracing::info!(
                    user_id = %job.user_id,
                    group_id,
                    status = ?ack.status,
                    "Training request acknowledged",
                );
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %job.user_id,
                    group_id,
                    error = %e,
                    "Training request failed; continuing",
                );
            }
        }
    }

    /// Stage 4: persist the avatar record and emit the final event.
    async fn persist(
        &self,
        job: &AvatarJob,
        group: &persona_provider::AvatarGroup,
    ) -> Result<AvatarRecord, PipelineError> {
        self.notifier
            .notify(
                &job.user_id,
                Stage::Saving,
                Status::Progress,
                serde_json::json!({ "message": "Saving your avatar" }),
            )
            .await;

        let new_avatar = NewAvatar {
            avatar_id: group.avatar_id.clone(),
            user_id: job.user_id.clone(),
            avatar_name: job.name.clone(),
            gender: job.gender.name().to_string(),
            preview_image_url: group.preview_image_url.clone(),
            ethnicity: job.ethnicity.clone(),
            age_group: job.age_group.name().to_string(),
        };

        let record = match self.store.create(new_avatar).await {
            Ok(record) => record,
            Err(e) => {
                // The provider-side group already exists and is not
                // rolled back; log the ids so operators can reconcile.
                tracing::error!(
                    user_id = %job.user_id,
                    avatar_id = %group.avatar_id,
                    group_id = %group.group_id,
                    error = %e,
                    "Avatar record write failed; provider group left in place",
                );
                return Err(PipelineError::Persistence(e));
            }
        };

        self.notifier
            .notify(
                &job.user_id,
                Stage::Complete,
                Status::Success,
                serde_json::json!({
                    "avatar_id": record.avatar_id,
                    "preview_image_url": record.preview_image_url,
                }),
            )
            .await;

        Ok(record)
    }

    /// Remove the staged image. Safe to call more than once per job;
    /// cleanup problems are logged, never escalated.
    async fn cleanup(&self, job: &AvatarJob) {
        match staging::remove_if_exists(&job.image_path).await {
            Ok(true) => {
                tracing::debug!(path = %job.image_path.display(), "Removed staged image");
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(
                    path = %job.image_path.display(),
                    error = %e,
                    "Failed to remove staged image",
                );
            }
        }
    }
}
