//! The avatar-creation pipeline.
//!
//! [`PipelineWorker`] is the four-stage state machine that drives one
//! job from staged photo to persisted avatar record: asset upload,
//! avatar-group creation, training kickoff (after a provider
//! consistency delay), and record persistence. It emits per-stage
//! progress notifications and guarantees staged-file cleanup on every
//! exit path.
//!
//! [`JobConsumer`] is the queue-side loop: it claims jobs from the
//! durable queue one at a time, runs them through the worker, and acks
//! the outcome back to the queue.

pub mod consumer;
pub mod error;
pub mod worker;

pub use consumer::{ConsumerConfig, JobConsumer};
pub use error::PipelineError;
pub use worker::{PipelineConfig, PipelineWorker};
