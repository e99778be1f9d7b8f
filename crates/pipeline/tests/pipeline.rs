//! End-to-end pipeline scenarios against in-memory collaborators.
//!
//! Every test stages a real temp file so the cleanup guarantee is
//! exercised for real: whatever the outcome, the staged image must be
//! gone once the worker reaches a terminal state.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use persona_core::{AgeGroup, AvatarJob, Gender};
use persona_db::models::avatar::{AvatarRecord, NewAvatar};
use persona_db::{AvatarStore, StoreError};
use persona_events::{ProgressNotifier, Stage, Status};
use persona_pipeline::{PipelineConfig, PipelineError, PipelineWorker};
use persona_provider::{
    AvatarGroup, AvatarProvider, CreateAvatarGroup, ProviderError, TrainAck, UploadedAsset,
};

// ---------------------------------------------------------------------------
// Doubles
// ---------------------------------------------------------------------------

/// How the stubbed provider should behave, stage by stage.
#[derive(Default)]
struct StubProvider {
    /// Upload responds without an image key.
    upload_missing_key: bool,
    /// Group creation fails with this HTTP status.
    group_fail_status: Option<u16>,
    /// Training request fails (pipeline must continue anyway).
    train_fails: bool,
    train_called: AtomicBool,
}

#[async_trait]
impl AvatarProvider for StubProvider {
    async fn upload_asset(
        &self,
        _bytes: Vec<u8>,
        _content_type: &str,
        _idempotency_key: Uuid,
    ) -> Result<UploadedAsset, ProviderError> {
        if self.upload_missing_key {
            return Err(ProviderError::MissingImageKey);
        }
        Ok(UploadedAsset {
            image_key: "k1".to_string(),
        })
    }

    async fn create_avatar_group(
        &self,
        _req: &CreateAvatarGroup,
        _idempotency_key: Uuid,
    ) -> Result<AvatarGroup, ProviderError> {
        if let Some(status) = self.group_fail_status {
            return Err(ProviderError::Api {
                status,
                body: "stubbed failure".to_string(),
            });
        }
        Ok(AvatarGroup {
            avatar_id: "av1".to_string(),
            group_id: "g1".to_string(),
            preview_image_url: "https://x/p.jpg".to_string(),
        })
    }

    async fn train(&self, _group_id: &str) -> Result<TrainAck, ProviderError> {
        self.train_called.store(true, Ordering::SeqCst);
        if self.train_fails {
            return Err(ProviderError::Api {
                status: 503,
                body: "training backend unavailable".to_string(),
            });
        }
        Ok(TrainAck {
            status: Some("queued".to_string()),
        })
    }
}

/// Captures every notification in emission order.
#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<(Stage, Status, serde_json::Value)>>,
}

impl RecordingNotifier {
    fn events(&self) -> Vec<(Stage, Status, serde_json::Value)> {
        self.events.lock().unwrap().clone()
    }

    fn stages(&self) -> Vec<(Stage, Status)> {
        self.events()
            .into_iter()
            .map(|(stage, status, _)| (stage, status))
            .collect()
    }
}

#[async_trait]
impl ProgressNotifier for RecordingNotifier {
    async fn notify(
        &self,
        _user_id: &str,
        stage: Stage,
        status: Status,
        payload: serde_json::Value,
    ) {
        self.events.lock().unwrap().push((stage, status, payload));
    }
}

/// In-memory avatar store, optionally failing every write.
#[derive(Default)]
struct MemoryStore {
    fail_writes: bool,
    records: Mutex<Vec<AvatarRecord>>,
}

impl MemoryStore {
    fn records(&self) -> Vec<AvatarRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AvatarStore for MemoryStore {
    async fn create(&self, avatar: NewAvatar) -> Result<AvatarRecord, StoreError> {
        if self.fail_writes {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        }
        let mut records = self.records.lock().unwrap();
        let now = chrono::Utc::now();
        let record = AvatarRecord {
            id: records.len() as i64 + 1,
            avatar_id: avatar.avatar_id,
            user_id: avatar.user_id,
            avatar_name: avatar.avatar_name,
            gender: avatar.gender,
            preview_image_url: avatar.preview_image_url,
            preview_video_url: String::new(),
            is_default: false,
            ethnicity: avatar.ethnicity,
            age_group: avatar.age_group,
            status: "pending".to_string(),
            created_at: now,
            updated_at: now,
        };
        records.push(record.clone());
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    worker: PipelineWorker,
    provider: Arc<StubProvider>,
    notifier: Arc<RecordingNotifier>,
    store: Arc<MemoryStore>,
    // Held so the staged file's directory outlives the test body.
    _dir: tempfile::TempDir,
    image_path: PathBuf,
}

fn harness(provider: StubProvider, store: MemoryStore, config: PipelineConfig) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("a.jpg");
    let mut f = std::fs::File::create(&image_path).unwrap();
    f.write_all(b"jpeg bytes").unwrap();

    let provider = Arc::new(provider);
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(store);
    let worker = PipelineWorker::new(
        provider.clone(),
        notifier.clone(),
        store.clone(),
        config,
    );

    Harness {
        worker,
        provider,
        notifier,
        store,
        _dir: dir,
        image_path,
    }
}

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        train_delay: Duration::ZERO,
        job_deadline: Duration::from_secs(5),
    }
}

fn job(image_path: &PathBuf) -> AvatarJob {
    AvatarJob::new(
        image_path.clone(),
        AgeGroup::Adult,
        "Jane",
        Gender::Female,
        "u1",
        None,
        "image/jpeg",
    )
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn happy_path_emits_ordered_notifications_and_persists_record() {
    let h = harness(StubProvider::default(), MemoryStore::default(), fast_config());

    let record = h.worker.process(&job(&h.image_path)).await.unwrap();

    assert_eq!(record.avatar_id, "av1");
    assert_eq!(record.status, "pending");
    assert_eq!(record.preview_image_url, "https://x/p.jpg");
    assert!(record.preview_video_url.is_empty());
    assert!(!record.is_default);

    assert_eq!(
        h.notifier.stages(),
        vec![
            (Stage::Upload, Status::Success),
            (Stage::GroupCreation, Status::Success),
            (Stage::Training, Status::Progress),
            (Stage::Saving, Status::Progress),
            (Stage::Complete, Status::Success),
        ],
    );

    let events = h.notifier.events();
    let (_, _, complete_payload) = events.last().unwrap();
    assert_eq!(complete_payload["avatar_id"], "av1");
    assert_eq!(complete_payload["preview_image_url"], "https://x/p.jpg");

    let records = h.store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_id, "u1");
    assert_eq!(records[0].age_group, "adult");

    assert!(!h.image_path.exists());
}

#[tokio::test]
async fn upload_without_image_key_fails_before_group_creation() {
    let provider = StubProvider {
        upload_missing_key: true,
        ..Default::default()
    };
    let h = harness(provider, MemoryStore::default(), fast_config());

    let err = h.worker.process(&job(&h.image_path)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Upload(_)));

    // Exactly one notification: the upload error. No group-creation
    // events, no trailing generic error.
    assert_eq!(h.notifier.stages(), vec![(Stage::Upload, Status::Error)]);

    let events = h.notifier.events();
    assert!(events[0].2["message"].is_string());
    assert!(events[0].2["raw_error"]
        .as_str()
        .unwrap()
        .contains("image key"));

    assert!(h.store.records().is_empty());
    assert!(!h.image_path.exists());
}

#[tokio::test]
async fn group_creation_bad_request_and_rate_limit_messages_differ() {
    let mut messages = Vec::new();

    for status in [400u16, 429] {
        let provider = StubProvider {
            group_fail_status: Some(status),
            ..Default::default()
        };
        let h = harness(provider, MemoryStore::default(), fast_config());

        let err = h.worker.process(&job(&h.image_path)).await.unwrap_err();
        assert!(matches!(err, PipelineError::GroupCreation(_)));

        assert_eq!(
            h.notifier.stages(),
            vec![
                (Stage::Upload, Status::Success),
                (Stage::GroupCreation, Status::Error),
            ],
        );

        let events = h.notifier.events();
        messages.push(events[1].2["message"].as_str().unwrap().to_string());

        assert!(h.store.records().is_empty());
        assert!(!h.image_path.exists());
    }

    assert_ne!(messages[0], messages[1]);
}

#[tokio::test]
async fn training_failure_is_soft_and_pipeline_completes() {
    let provider = StubProvider {
        train_fails: true,
        ..Default::default()
    };
    let h = harness(provider, MemoryStore::default(), fast_config());

    let record = h.worker.process(&job(&h.image_path)).await.unwrap();
    assert_eq!(record.avatar_id, "av1");

    // The training request was made and failed, but the run still ends
    // with the completion event and a persisted record.
    assert!(h.provider.train_called.load(Ordering::SeqCst));
    let stages = h.notifier.stages();
    assert_eq!(stages.last(), Some(&(Stage::Complete, Status::Success)));
    assert_eq!(h.store.records().len(), 1);
    assert!(!h.image_path.exists());
}

#[tokio::test]
async fn persistence_failure_emits_generic_error_and_cleans_up() {
    let store = MemoryStore {
        fail_writes: true,
        ..Default::default()
    };
    let h = harness(StubProvider::default(), store, fast_config());

    let err = h.worker.process(&job(&h.image_path)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Persistence(_)));

    assert_eq!(
        h.notifier.stages(),
        vec![
            (Stage::Upload, Status::Success),
            (Stage::GroupCreation, Status::Success),
            (Stage::Training, Status::Progress),
            (Stage::Saving, Status::Progress),
            (Stage::Error, Status::Error),
        ],
    );

    assert!(h.store.records().is_empty());
    assert!(!h.image_path.exists());
}

#[tokio::test]
async fn deadline_expiry_fails_the_job_and_cleans_up() {
    let config = PipelineConfig {
        // The training delay alone exceeds the deadline.
        train_delay: Duration::from_secs(30),
        job_deadline: Duration::from_millis(100),
    };
    let h = harness(StubProvider::default(), MemoryStore::default(), config);

    let err = h.worker.process(&job(&h.image_path)).await.unwrap_err();
    assert!(matches!(err, PipelineError::DeadlineExceeded(_)));

    let stages = h.notifier.stages();
    assert_eq!(stages.last(), Some(&(Stage::Error, Status::Error)));
    // The deadline cut the run off inside the training delay.
    assert!(!h.provider.train_called.load(Ordering::SeqCst));
    assert!(h.store.records().is_empty());
    assert!(!h.image_path.exists());
}

#[tokio::test]
async fn missing_staged_image_fails_with_generic_error() {
    let h = harness(StubProvider::default(), MemoryStore::default(), fast_config());
    // Sabotage the staged file before processing.
    std::fs::remove_file(&h.image_path).unwrap();

    let err = h.worker.process(&job(&h.image_path)).await.unwrap_err();
    assert!(matches!(err, PipelineError::ReadImage(_)));

    assert_eq!(h.notifier.stages(), vec![(Stage::Error, Status::Error)]);
    assert!(h.store.records().is_empty());
}
