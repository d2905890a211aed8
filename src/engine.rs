//! # Day Engine
//! Drives one refresh cycle: fan out to the four providers, wait for all of
//! them to settle, combine the scores with the current mood, persist the day's
//! entry and keep the latest report for the HTTP layer.
//!
//! Every cycle carries a generation tag. Starting a new cycle (refresh or
//! location change) supersedes older ones: their late results are neither
//! cached nor applied.
//!
//! A cycle runs on its own task, so it settles even when the caller that
//! started it goes away.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use metrics::gauge;
use serde::Serialize;
use tokio::sync::{watch, Mutex as AsyncMutex};

use crate::aggregate::{Aggregator, DayScore, Mood};
use crate::cache::SignalCache;
use crate::clock::SharedClock;
use crate::config::{find_location, AppConfig, Location};
use crate::history::{HistoryEntry, HistoryStore};
use crate::ingest::{self, Generation, Providers};
use crate::settings::{Settings, SettingsStore};
use crate::signal::{Availability, Signals};
use crate::storage::{FileStore, KvStore};

/// Everything a presentation layer needs after a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct DayReport {
    #[serde(flatten)]
    pub score: DayScore,
    pub mood: Mood,
    pub location: Location,
    pub signals: Signals,
    pub availability: Availability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub cycle: u64,
}

struct EngineState {
    aggregator: Aggregator,
    location: Location,
}

pub struct Engine {
    providers: Providers,
    cache: Arc<SignalCache>,
    history: HistoryStore,
    settings: SettingsStore,
    generation: Generation,
    state: Mutex<EngineState>,
    latest: watch::Sender<Option<DayReport>>,
    // Held while the first cycle runs so concurrent readers share it.
    first_cycle: AsyncMutex<()>,
}

impl Engine {
    /// Restores today's mood from history and the location from settings.
    pub fn new(
        providers: Providers,
        cache: Arc<SignalCache>,
        history: HistoryStore,
        settings: SettingsStore,
    ) -> Self {
        let mood = history.today_mood_or_default();
        let location = settings.location();
        tracing::info!(target: "engine", location = location.id, ?mood, "engine initialized");
        Self {
            providers,
            cache,
            history,
            settings,
            generation: Generation::new(),
            state: Mutex::new(EngineState {
                aggregator: Aggregator::new(mood),
                location,
            }),
            latest: watch::channel(None).0,
            first_cycle: AsyncMutex::new(()),
        }
    }

    /// Production wiring: HTTP providers, file-backed storage under `data_dir`.
    pub fn from_config(cfg: &AppConfig, clock: SharedClock) -> Result<Self> {
        let providers = Providers::from_config(cfg, clock.clone())?;
        let cache = Arc::new(SignalCache::new(cfg.cache_ttl(), clock.clone()));
        let store: Arc<dyn KvStore> = Arc::new(FileStore::new(cfg.data_dir.clone()));
        Ok(Self::new(
            providers,
            cache,
            HistoryStore::new(store.clone(), clock),
            SettingsStore::new(store),
        ))
    }

    fn state(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().expect("engine state mutex poisoned")
    }

    /// Run one full cycle. Returns `None` if a newer cycle superseded this one.
    ///
    /// Dropping the returned future does not abandon the cycle: it keeps
    /// running and still leaves the loading state and records its result.
    pub async fn refresh(self: &Arc<Self>) -> Option<DayReport> {
        match self.spawn_cycle().await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(target: "engine", error = ?e, "refresh task failed");
                None
            }
        }
    }

    /// Latest report, running the first cycle if none has finished yet.
    ///
    /// Concurrent callers share that first cycle. If it gets superseded, the
    /// caller waits for the cycle that replaced it.
    pub async fn current_report(self: &Arc<Self>) -> Option<DayReport> {
        if let Some(r) = self.last_report() {
            return Some(r);
        }
        let mut rx = self.latest.subscribe();
        {
            let _first = self.first_cycle.lock().await;
            if let Some(r) = self.last_report() {
                return Some(r);
            }
            match self.spawn_cycle().await {
                Ok(Some(r)) => return Some(r),
                Ok(None) => {
                    tracing::debug!(target: "engine", "first cycle superseded, waiting for the newer one");
                }
                Err(e) => {
                    tracing::error!(target: "engine", error = ?e, "refresh task failed");
                    return None;
                }
            }
        }
        let report = rx.wait_for(Option::is_some).await.ok()?.clone();
        report
    }

    fn spawn_cycle(self: &Arc<Self>) -> tokio::task::JoinHandle<Option<DayReport>> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.run_cycle().await })
    }

    async fn run_cycle(&self) -> Option<DayReport> {
        let (cycle, location) = {
            let mut st = self.state();
            let cycle = self.generation.bump();
            st.aggregator.begin_cycle();
            (cycle, st.location)
        };
        tracing::debug!(target: "engine", cycle = cycle.id(), location = location.id, "refresh started");

        let signals = ingest::fetch_all(&self.providers, self.cache.clone(), location, &cycle).await;

        let availability = Availability::from_signals(&signals);
        let notice = availability.notice();

        let report = {
            let mut st = self.state();
            if !cycle.is_current() {
                tracing::debug!(target: "engine", cycle = cycle.id(), "cycle superseded, discarding results");
                return None;
            }
            st.aggregator.apply(&signals);
            let score = st.aggregator.total()?;
            let report = DayReport {
                score,
                mood: st.aggregator.mood(),
                location,
                signals,
                availability,
                notice,
                cycle: cycle.id(),
            };
            self.latest.send_replace(Some(report.clone()));
            report
        };

        if let Some(n) = &report.notice {
            tracing::warn!(target: "engine", cycle = report.cycle, notice = %n, "some sources unavailable");
        }
        self.persist(&report);
        tracing::info!(
            target: "engine",
            cycle = report.cycle,
            total = report.score.total,
            status = report.score.status,
            "refresh finished"
        );
        Some(report)
    }

    /// Change the mood. Recomputes and records the total unless a cycle is in flight.
    pub fn set_mood(&self, mood: Mood) -> Option<DayReport> {
        let report = {
            let mut st = self.state();
            st.aggregator.set_mood(mood);
            let score = st.aggregator.total()?;
            let mut report = self.latest.borrow().clone()?;
            report.score = score;
            report.mood = mood;
            self.latest.send_replace(Some(report.clone()));
            report
        };
        self.persist(&report);
        Some(report)
    }

    /// Switch location: persist it, invalidate in-flight cycles, flush the cache, refresh.
    pub async fn change_location(self: &Arc<Self>, id: &str) -> Result<Option<DayReport>> {
        let location = find_location(id).ok_or_else(|| anyhow!("unknown location id {id:?}"))?;
        self.settings.save(Settings {
            location_id: Some(location.id.to_string()),
        })?;
        {
            let mut st = self.state();
            st.location = location;
            self.generation.bump();
        }
        self.cache.clear();
        tracing::info!(target: "engine", location = location.id, "location changed");
        Ok(self.refresh().await)
    }

    fn persist(&self, report: &DayReport) {
        gauge!("vibe_total_score").set(f64::from(report.score.total));
        if let Err(e) = self.history.record_today(report.score.total, report.mood) {
            tracing::warn!(target: "engine", error = ?e, "failed to record day score");
        }
    }

    pub fn last_report(&self) -> Option<DayReport> {
        self.latest.borrow().clone()
    }

    pub fn location(&self) -> Location {
        self.state().location
    }

    pub fn mood(&self) -> Mood {
        self.state().aggregator.mood()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.history()
    }

    pub fn cache(&self) -> &SignalCache {
        &self.cache
    }
}
