//! Queue-consumer loop.
//!
//! Polls the durable queue on an interval, claims at most one job per
//! tick, runs it through the [`PipelineWorker`], and acks the outcome.
//! Shutdown is cooperative: the loop observes its cancellation token
//! between jobs, so an in-flight job always reaches a terminal state
//! (and its cleanup) before the consumer exits.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use persona_db::repositories::JobQueue;

use crate::worker::PipelineWorker;

/// Default polling interval for the consumer loop.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default visibility timeout after which a claimed-but-unacked job is
/// redelivered. Longer than the worker's job deadline so a slow job is
/// not redelivered while its first delivery is still running.
const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(900);

/// Tuning knobs for a [`JobConsumer`].
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub poll_interval: Duration,
    /// Claims older than this are considered abandoned and requeued.
    pub visibility_timeout: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }
}

/// One consumer slot: claims and processes jobs sequentially.
///
/// Run several consumers (each with its own task) for parallel job
/// throughput; queue-side claiming guarantees they never receive the
/// same job instance.
pub struct JobConsumer {
    pool: PgPool,
    worker: Arc<PipelineWorker>,
    config: ConsumerConfig,
}

impl JobConsumer {
    pub fn new(pool: PgPool, worker: Arc<PipelineWorker>, config: ConsumerConfig) -> Self {
        Self {
            pool,
            worker,
            config,
        }
    }

    /// Run the consumer loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Job consumer started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Job consumer shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "Consume cycle failed");
                    }
                }
            }
        }
    }

    /// One consume cycle: sweep stale claims, then claim and process at
    /// most one job.
    async fn tick(&self) -> Result<(), sqlx::Error> {
        JobQueue::requeue_stale(&self.pool, self.config.visibility_timeout).await?;

        let Some(row) = JobQueue::claim_next(&self.pool).await? else {
            return Ok(());
        };

        let job = match row.payload() {
            Ok(job) => job,
            Err(e) => {
                // A payload that no longer decodes can never succeed;
                // fail it instead of redelivering forever.
                tracing::error!(job_id = row.id, error = %e, "Job payload is not decodable");
                JobQueue::fail(&self.pool, row.id, &format!("undecodable payload: {e}")).await?;
                return Ok(());
            }
        };

        tracing::info!(
            job_id = row.id,
            attempt = row.attempt_count,
            user_id = %job.user_id,
            "Processing avatar job",
        );

        match self.worker.process(&job).await {
            Ok(record) => {
                JobQueue::complete(&self.pool, row.id).await?;
                tracing::info!(
                    job_id = row.id,
                    avatar_id = %record.avatar_id,
                    "Avatar job completed",
                );
            }
            Err(e) => {
                JobQueue::fail(&self.pool, row.id, &e.to_string()).await?;
            }
        }

        Ok(())
    }
}
