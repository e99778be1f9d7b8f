//! Persona progress-event infrastructure.
//!
//! The pipeline reports per-stage progress through the
//! [`ProgressNotifier`] trait; this crate provides the in-process
//! implementation:
//!
//! - [`EventBus`] — publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`ProgressEvent`] — the canonical per-user progress envelope.
//! - [`BusNotifier`] — [`ProgressNotifier`] implementation that
//!   publishes onto the bus; the realtime transport (out of scope
//!   here) subscribes on the other side.

pub mod bus;
pub mod notifier;

pub use bus::{EventBus, ProgressEvent};
pub use notifier::{BusNotifier, ProgressNotifier, Stage, Status};
