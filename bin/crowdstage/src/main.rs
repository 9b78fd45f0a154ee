//! # Crowdstage Binary
//!
//! Assembles one hosted stage: configuration, the store plugin chosen at
//! compile time, the rotation session and the HTTP surface.

use std::sync::Arc;

use cs_api::AppState;
use cs_configs::{AppConfig, LogConfig, LogFormat};
use cs_core::{EventRecord, RandomSource, StdRandom};
use cs_rotation::StageScheduler;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[cfg(feature = "store-memory")]
use cs_store_memory::MemoryStore;

#[cfg(not(feature = "store-memory"))]
compile_error!("crowdstage needs a store plugin; enable the `store-memory` feature");

fn init_tracing(log: &LogConfig) {
    // RUST_LOG wins over the configured filter.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

fn random_source(seed: Option<u64>) -> Box<dyn RandomSource> {
    match seed {
        Some(seed) => Box::new(StdRandom::seeded(seed)),
        None => Box::new(StdRandom::from_entropy()),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.log);

    // 1. Store plugin, seeded with the hosted event
    let store = Arc::new(MemoryStore::new());
    store.put_event(EventRecord {
        id: config.stage.event_id.clone(),
        name: config.stage.event_name.clone(),
        disabled: false,
        settings: config.stage.initial_settings(),
        background_image: None,
    });

    // 2. Rotation session
    let seed = config.stage.rng_seed;
    let scheduler = Arc::new(StageScheduler::new(
        config.stage.event_id.clone(),
        store.clone(),
        store.clone(),
        random_source(seed),
    ));
    scheduler.start().await?;

    // 3. HTTP surface
    let state = Arc::new(AppState::new(
        scheduler.clone(),
        store.clone(),
        store.clone(),
        random_source(seed.map(|s| s.wrapping_add(1))),
    ));

    let mut notices = state.subscribe_notices();
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => info!(?notice, "forwarded stage notice"),
                Err(RecvError::Lagged(missed)) => warn!(missed, "stage notices dropped"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(
        addr = %listener.local_addr()?,
        event = %config.stage.event_id,
        "🎤 crowdstage listening"
    );

    axum::serve(listener, cs_api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop();
    Ok(())
}
