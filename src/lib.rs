// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod engine;
pub mod history;
pub mod ingest;
pub mod metrics;
pub mod settings;
pub mod signal;
pub mod storage;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{DayScore, Level, Mood};
pub use crate::api::router;
pub use crate::engine::{DayReport, Engine};
pub use crate::signal::{Availability, Origin, Signal, SignalKind, Signals};

use std::sync::Arc;

use axum::Router;

use crate::api::{create_router, AppState};
use crate::clock::SystemClock;
use crate::config::AppConfig;
use crate::metrics::Metrics;

/// Build the full HTTP app (API + `/metrics`) for the given configuration.
pub fn app_with_config(cfg: &AppConfig) -> anyhow::Result<Router> {
    let metrics = Metrics::init(cfg.cache_ttl().as_millis() as u64)?;
    let engine = Engine::from_config(cfg, Arc::new(SystemClock))?;
    Ok(create_router(AppState::new(engine)).merge(metrics.router()))
}

/// Build the full HTTP app from `config/vibe.toml` / env.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = AppConfig::load_default()?;
    tracing::info!(
        data_dir = %cfg.data_dir.display(),
        cache_ttl_secs = cfg.cache_ttl_secs,
        "building app"
    );
    app_with_config(&cfg)
}
