//! Durable work queue over the `avatar_jobs` table.
//!
//! Delivery semantics are at-least-once: `claim_next` hands a given job
//! to exactly one consumer at a time via `FOR UPDATE SKIP LOCKED`, and
//! `requeue_stale` returns jobs whose worker died mid-flight to the
//! pending state after a visibility timeout. Payloads are opaque JSONB;
//! no cross-job ordering is guaranteed beyond oldest-first claiming.

use std::time::Duration;

use persona_core::types::{DbId, Timestamp};
use persona_core::{job::validate_job, staging, AvatarJob, CoreError};
use sqlx::PgPool;

use crate::models::job::QueuedJob;
use crate::models::status::JobStatus;

/// Column list for `avatar_jobs` queries.
const COLUMNS: &str = "\
    id, status_id, payload, attempt_count, error_message, \
    submitted_at, claimed_at, completed_at";

/// Errors surfaced by the queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The payload failed the enqueue-time invariants (missing/empty
    /// staged file, invalid fields).
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// Payload (de)serialization failed.
    #[error("Payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Compute the claim cutoff for stale-job requeueing.
///
/// A running job claimed before this instant is considered abandoned.
fn stale_cutoff(now: Timestamp, visibility_timeout: Duration) -> Timestamp {
    now - chrono::Duration::from_std(visibility_timeout)
        .unwrap_or_else(|_| chrono::Duration::seconds(0))
}

/// Provides producer and consumer operations for the avatar job queue.
pub struct JobQueue;

impl JobQueue {
    /// Durably accept a job and return immediately.
    ///
    /// Verifies the enqueue-time invariant (the staged image exists and
    /// is non-empty) and the payload fields before inserting; the
    /// caller gets the pending row back without waiting on pipeline
    /// execution.
    pub async fn enqueue(pool: &PgPool, job: &AvatarJob) -> Result<QueuedJob, QueueError> {
        validate_job(job)?;
        staging::assert_staged(&job.image_path).await?;

        let payload = serde_json::to_value(job)?;
        let query = format!(
            "INSERT INTO avatar_jobs (status_id, payload) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, QueuedJob>(&query)
            .bind(JobStatus::Pending.id())
            .bind(&payload)
            .fetch_one(pool)
            .await?;

        tracing::info!(job_id = row.id, user_id = %job.user_id, "Avatar job enqueued");
        Ok(row)
    }

    /// Atomically claim the oldest pending job.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so that concurrent workers
    /// never receive the same job instance.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<QueuedJob>, sqlx::Error> {
        let query = format!(
            "UPDATE avatar_jobs \
             SET status_id = $1, claimed_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM avatar_jobs \
                 WHERE status_id = $2 \
                 ORDER BY submitted_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueuedJob>(&query)
            .bind(JobStatus::Running.id())
            .bind(JobStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Acknowledge successful processing of a claimed job.
    pub async fn complete(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE avatar_jobs SET status_id = $2, completed_at = NOW() WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Completed.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Acknowledge failed processing of a claimed job.
    pub async fn fail(pool: &PgPool, job_id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE avatar_jobs \
             SET status_id = $2, error_message = $3, completed_at = NOW() \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Failed.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Return abandoned running jobs to the pending state.
    ///
    /// A job is abandoned when its claim is older than the visibility
    /// timeout: the claiming worker crashed or hung without acking.
    /// Each requeue increments `attempt_count` so operators can spot
    /// jobs that keep dying.
    pub async fn requeue_stale(
        pool: &PgPool,
        visibility_timeout: Duration,
    ) -> Result<u64, sqlx::Error> {
        let cutoff = stale_cutoff(chrono::Utc::now(), visibility_timeout);
        let result = sqlx::query(
            "UPDATE avatar_jobs \
             SET status_id = $1, claimed_at = NULL, attempt_count = attempt_count + 1 \
             WHERE status_id = $2 AND claimed_at < $3",
        )
        .bind(JobStatus::Pending.id())
        .bind(JobStatus::Running.id())
        .bind(cutoff)
        .execute(pool)
        .await?;

        let requeued = result.rows_affected();
        if requeued > 0 {
            tracing::warn!(requeued, "Requeued stale avatar jobs for redelivery");
        }
        Ok(requeued)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_cutoff_subtracts_visibility_timeout() {
        let now = chrono::Utc::now();
        let cutoff = stale_cutoff(now, Duration::from_secs(600));
        assert_eq!((now - cutoff).num_seconds(), 600);
    }

    #[test]
    fn stale_cutoff_with_zero_timeout_is_now() {
        let now = chrono::Utc::now();
        assert_eq!(stale_cutoff(now, Duration::from_secs(0)), now);
    }
}
