//! Avatar pipeline worker process.
//!
//! Wires the durable queue, the provider client, the progress bus, and
//! the record store into [`PipelineWorker`] instances and runs the
//! configured number of consumer slots until a shutdown signal arrives.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use persona_db::PgAvatarStore;
use persona_events::{BusNotifier, EventBus};
use persona_pipeline::{JobConsumer, PipelineWorker};
use persona_provider::AvatarApi;

mod config;
use config::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "persona_worker=debug,persona_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env();

    let pool = persona_db::create_pool(&config.database_url).await?;
    persona_db::MIGRATOR.run(&pool).await?;
    persona_db::health_check(&pool).await?;
    tracing::info!("Database connection established");

    let bus = Arc::new(EventBus::default());
    let provider = Arc::new(AvatarApi::new(
        config.provider_base_url.clone(),
        config.provider_api_key.clone(),
    ));
    let notifier = Arc::new(BusNotifier::new(bus.clone()));
    let store = Arc::new(PgAvatarStore::new(pool.clone()));

    let worker = Arc::new(PipelineWorker::new(
        provider,
        notifier,
        store,
        config.pipeline(),
    ));

    let cancel = CancellationToken::new();

    // Mirror progress events into the worker log until the realtime
    // transport picks them up from the bus.
    tokio::spawn(log_progress_events(bus.subscribe(), cancel.clone()));

    let mut slots = Vec::with_capacity(config.consumer_slots);
    for slot in 0..config.consumer_slots {
        let consumer = JobConsumer::new(pool.clone(), worker.clone(), config.consumer());
        let cancel = cancel.clone();
        slots.push(tokio::spawn(async move {
            tracing::info!(slot, "Consumer slot started");
            consumer.run(cancel).await;
        }));
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, draining consumer slots");
    cancel.cancel();

    for slot in slots {
        let _ = slot.await;
    }

    tracing::info!("Worker stopped");
    Ok(())
}

/// Log every progress event published on the bus.
async fn log_progress_events(
    mut rx: tokio::sync::broadcast::Receiver<persona_events::ProgressEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Ok(event) => {
                    tracing::debug!(
                        user_id = %event.user_id,
                        stage = event.stage.name(),
                        status = event.status.name(),
                        "Progress event",
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Progress log subscriber lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}
