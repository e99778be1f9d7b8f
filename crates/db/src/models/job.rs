//! Queued-job entity for the durable avatar work queue.

use persona_core::types::{DbId, Timestamp};
use persona_core::AvatarJob;
use serde::Serialize;
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `avatar_jobs` table.
///
/// The payload column is opaque JSONB to the queue; decode it with
/// [`QueuedJob::payload`] once a worker has claimed the row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueuedJob {
    pub id: DbId,
    pub status_id: StatusId,
    pub payload: serde_json::Value,
    /// Number of times this job has been redelivered after a stale claim.
    pub attempt_count: i32,
    pub error_message: Option<String>,
    pub submitted_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl QueuedJob {
    /// Decode the stored payload back into an [`AvatarJob`].
    pub fn payload(&self) -> Result<AvatarJob, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::{AgeGroup, Gender};

    #[test]
    fn payload_decodes_back_into_avatar_job() {
        let job = AvatarJob::new(
            "/tmp/a.jpg",
            AgeGroup::Adult,
            "Jane",
            Gender::Female,
            "u1",
            Some("hispanic".to_string()),
            "image/jpeg",
        );
        let row = QueuedJob {
            id: 1,
            status_id: 1,
            payload: serde_json::to_value(&job).unwrap(),
            attempt_count: 0,
            error_message: None,
            submitted_at: chrono::Utc::now(),
            claimed_at: None,
            completed_at: None,
        };

        let decoded = row.payload().unwrap();
        assert_eq!(decoded.name, "Jane");
        assert_eq!(decoded.user_id, "u1");
        assert_eq!(decoded.ethnicity.as_deref(), Some("hispanic"));
    }
}
