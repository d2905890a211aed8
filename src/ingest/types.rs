// src/ingest/types.rs
use anyhow::Result;

use crate::config::Location;
use crate::signal::{Signal, SignalKind};

/// One external source that can be turned into a [`Signal`].
///
/// `fetch_fresh` is allowed to fail; the ingest layer turns every error into
/// a degraded signal so nothing past this boundary ever sees it.
#[async_trait::async_trait]
pub trait SignalProvider: Send + Sync {
    fn kind(&self) -> SignalKind;
    /// Deterministic cache key for this source at `location`.
    fn cache_key(&self, location: &Location) -> String;
    async fn fetch_fresh(&self, location: &Location) -> Result<Signal>;
    fn name(&self) -> &'static str;
}
