use std::time::Duration;

use persona_pipeline::{ConsumerConfig, PipelineConfig};

/// Worker configuration loaded from environment variables.
///
/// Connection settings are required; the tuning knobs have defaults
/// suitable for production.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Base URL of the avatar-training service.
    pub provider_base_url: String,
    /// Static API key for the avatar-training service.
    pub provider_api_key: String,
    /// Number of concurrent consumer slots in this process.
    pub consumer_slots: usize,
    /// Wait between group creation and the training request.
    pub train_delay: Duration,
    /// Overall per-job deadline.
    pub job_deadline: Duration,
    /// Queue poll interval.
    pub poll_interval: Duration,
    /// Claims older than this are requeued for redelivery.
    pub visibility_timeout: Duration,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                   | Default    |
    /// |---------------------------|------------|
    /// | `DATABASE_URL`            | (required) |
    /// | `PROVIDER_BASE_URL`       | (required) |
    /// | `PROVIDER_API_KEY`        | (required) |
    /// | `CONSUMER_SLOTS`          | `2`        |
    /// | `TRAIN_DELAY_SECS`        | `20`       |
    /// | `JOB_TIMEOUT_SECS`        | `600`      |
    /// | `POLL_INTERVAL_MS`        | `1000`     |
    /// | `VISIBILITY_TIMEOUT_SECS` | `900`      |
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let provider_base_url =
            std::env::var("PROVIDER_BASE_URL").expect("PROVIDER_BASE_URL must be set");
        let provider_api_key =
            std::env::var("PROVIDER_API_KEY").expect("PROVIDER_API_KEY must be set");

        let consumer_slots: usize = std::env::var("CONSUMER_SLOTS")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("CONSUMER_SLOTS must be a valid usize");

        let train_delay_secs: u64 = std::env::var("TRAIN_DELAY_SECS")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .expect("TRAIN_DELAY_SECS must be a valid u64");

        let job_timeout_secs: u64 = std::env::var("JOB_TIMEOUT_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("JOB_TIMEOUT_SECS must be a valid u64");

        let poll_interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("POLL_INTERVAL_MS must be a valid u64");

        let visibility_timeout_secs: u64 = std::env::var("VISIBILITY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "900".into())
            .parse()
            .expect("VISIBILITY_TIMEOUT_SECS must be a valid u64");

        Self {
            database_url,
            provider_base_url,
            provider_api_key,
            consumer_slots,
            train_delay: Duration::from_secs(train_delay_secs),
            job_deadline: Duration::from_secs(job_timeout_secs),
            poll_interval: Duration::from_millis(poll_interval_ms),
            visibility_timeout: Duration::from_secs(visibility_timeout_secs),
        }
    }

    /// Pipeline tuning derived from this configuration.
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            train_delay: self.train_delay,
            job_deadline: self.job_deadline,
        }
    }

    /// Consumer tuning derived from this configuration.
    pub fn consumer(&self) -> ConsumerConfig {
        ConsumerConfig {
            poll_interval: self.poll_interval,
            visibility_timeout: self.visibility_timeout,
        }
    }
}
