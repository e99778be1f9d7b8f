//! Progress notifier contract and the bus-backed implementation.
//!
//! The pipeline never blocks on, retries, or fails because of progress
//! delivery: [`ProgressNotifier::notify`] is infallible and
//! implementations swallow their own delivery errors.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bus::{EventBus, ProgressEvent};

// ---------------------------------------------------------------------------
// Stage / Status
// ---------------------------------------------------------------------------

/// Pipeline stage a progress update refers to.
///
/// The wire names match what the frontend listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Upload,
    GroupCreation,
    Training,
    Saving,
    Complete,
    Error,
}

impl Stage {
    /// Wire name, e.g. `"group-creation"`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::GroupCreation => "group-creation",
            Self::Training => "training",
            Self::Saving => "saving",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

/// Outcome kind of a progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Progress,
    Success,
    Error,
}

impl Status {
    /// Wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// ProgressNotifier
// ---------------------------------------------------------------------------

/// Fire-and-forget progress push, routed by user identifier.
///
/// Injected into the pipeline worker; test doubles capture the calls,
/// production uses [`BusNotifier`].
#[async_trait]
pub trait ProgressNotifier: Send + Sync {
    /// Push one progress update. Must never fail or block the pipeline;
    /// implementations log and swallow delivery problems.
    async fn notify(
        &self,
        user_id: &str,
        stage: Stage,
        status: Status,
        payload: serde_json::Value,
    );
}

/// [`ProgressNotifier`] that publishes onto the in-process [`EventBus`].
pub struct BusNotifier {
    bus: Arc<EventBus>,
}

impl BusNotifier {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl ProgressNotifier for BusNotifier {
    async fn notify(
        &self,
        user_id: &str,
        stage: Stage,
        status: Status,
        payload: serde_json::Value,
    ) {
        tracing::debug!(
            user_id,
            stage = stage.name(),
            status = status.name(),
            "Progress update",
        );
        self.bus
            .publish(ProgressEvent::new(user_id, stage, status).with_payload(payload));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_wire_names() {
        assert_eq!(Stage::GroupCreation.name(), "group-creation");
        assert_eq!(
            serde_json::to_value(Stage::GroupCreation).unwrap(),
            "group-creation"
        );
        assert_eq!(serde_json::to_value(Status::Progress).unwrap(), "progress");
    }

    #[tokio::test]
    async fn bus_notifier_publishes_event() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let notifier = BusNotifier::new(bus.clone());

        notifier
            .notify(
                "u1",
                Stage::Complete,
                Status::Success,
                serde_json::json!({"avatar_id": "av1"}),
            )
            .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.user_id, "u1");
        assert_eq!(event.stage, Stage::Complete);
        assert_eq!(event.payload["avatar_id"], "av1");
    }

    #[tokio::test]
    async fn notify_without_subscribers_is_silent() {
        let notifier = BusNotifier::new(Arc::new(EventBus::default()));
        // Nobody listening; must not fail.
        notifier
            .notify("u1", Stage::Error, Status::Error, serde_json::json!({}))
            .await;
    }
}
