//! Dagens Vibe binary entrypoint.
//! Boots the Axum HTTP server with the day-score engine and `/metrics`.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a tracing subscriber unless the runtime already did.
/// `VIBE_LOG_FORMAT=json` switches to JSON lines, otherwise compact output.
fn enable_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dagens_vibe=info,engine=info,ingest=info,cache=info,warn"));

    let json = std::env::var("VIBE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_tracing();

    let router = dagens_vibe::app().await?;
    Ok(router.into())
}
