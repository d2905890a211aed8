// tests/common/mod.rs
//
// Shared helpers: scripted providers and an engine wired to in-memory storage.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use chrono::{Local, TimeZone};
use tokio::sync::Notify;

use dagens_vibe::cache::SignalCache;
use dagens_vibe::clock::{ManualClock, SharedClock};
use dagens_vibe::config::Location;
use dagens_vibe::engine::Engine;
use dagens_vibe::history::HistoryStore;
use dagens_vibe::ingest::types::SignalProvider;
use dagens_vibe::ingest::Providers;
use dagens_vibe::settings::SettingsStore;
use dagens_vibe::signal::{Signal, SignalKind};
use dagens_vibe::storage::{KvStore, MemoryStore};

#[derive(Clone)]
pub enum Behavior {
    Ok(Signal),
    /// Answers after the given delay.
    Delayed(Signal, std::time::Duration),
    Fail,
    Panic,
}

/// Provider that returns a scripted result and counts calls.
pub struct StubProvider {
    kind: SignalKind,
    behavior: Mutex<Behavior>,
    calls: AtomicUsize,
    /// If set, the first call waits on this before answering.
    first_call_gate: Option<Arc<Notify>>,
}

impl StubProvider {
    pub fn new(kind: SignalKind, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
            first_call_gate: None,
        })
    }

    pub fn gated(kind: SignalKind, behavior: Behavior, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
            first_call_gate: Some(gate),
        })
    }

    pub fn ok(kind: SignalKind, score: u8) -> Arc<Self> {
        Self::new(
            kind,
            Behavior::Ok(Signal::live(score, format!("{score}"), "stub", "•")),
        )
    }

    pub fn failing(kind: SignalKind) -> Arc<Self> {
        Self::new(kind, Behavior::Fail)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_behavior(&self, b: Behavior) {
        *self.behavior.lock().unwrap() = b;
    }
}

#[async_trait::async_trait]
impl SignalProvider for StubProvider {
    fn kind(&self) -> SignalKind {
        self.kind
    }

    fn cache_key(&self, location: &Location) -> String {
        match self.kind {
            SignalKind::Weather | SignalKind::Energy => {
                format!("{}_{}", self.kind.as_str(), location.id)
            }
            _ => self.kind.as_str().to_string(),
        }
    }

    async fn fetch_fresh(&self, _location: &Location) -> Result<Signal> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            if let Some(g) = &self.first_call_gate {
                g.notified().await;
            }
        }
        let b = self.behavior.lock().unwrap().clone();
        match b {
            Behavior::Ok(s) => Ok(s),
            Behavior::Delayed(s, d) => {
                tokio::time::sleep(d).await;
                Ok(s)
            }
            Behavior::Fail => Err(anyhow!("stub {} down", self.kind.as_str())),
            Behavior::Panic => panic!("stub {} exploded", self.kind.as_str()),
        }
    }

    fn name(&self) -> &'static str {
        self.kind.as_str()
    }
}

pub struct Stubs {
    pub weather: Arc<StubProvider>,
    pub news: Arc<StubProvider>,
    pub market: Arc<StubProvider>,
    pub energy: Arc<StubProvider>,
}

impl Stubs {
    pub fn all_ok(w: u8, n: u8, m: u8, e: u8) -> Self {
        Self {
            weather: StubProvider::ok(SignalKind::Weather, w),
            news: StubProvider::ok(SignalKind::News, n),
            market: StubProvider::ok(SignalKind::Market, m),
            energy: StubProvider::ok(SignalKind::Energy, e),
        }
    }

    pub fn all_failing() -> Self {
        Self {
            weather: StubProvider::failing(SignalKind::Weather),
            news: StubProvider::failing(SignalKind::News),
            market: StubProvider::failing(SignalKind::Market),
            energy: StubProvider::failing(SignalKind::Energy),
        }
    }

    pub fn providers(&self) -> Providers {
        Providers {
            weather: self.weather.clone(),
            news: self.news.clone(),
            market: self.market.clone(),
            energy: self.energy.clone(),
        }
    }
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub engine: Arc<Engine>,
}

pub fn noon() -> chrono::DateTime<Local> {
    Local.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
}

pub fn harness(stubs: &Stubs) -> Harness {
    let clock = Arc::new(ManualClock::new(noon()));
    let store = Arc::new(MemoryStore::new());
    let engine = build_engine(stubs, clock.clone(), store.clone());
    Harness {
        clock,
        store,
        engine: Arc::new(engine),
    }
}

pub fn build_engine(stubs: &Stubs, clock: Arc<ManualClock>, store: Arc<MemoryStore>) -> Engine {
    let shared: SharedClock = clock;
    let kv: Arc<dyn KvStore> = store;
    let cache = Arc::new(SignalCache::new(
        dagens_vibe::cache::DEFAULT_TTL,
        shared.clone(),
    ));
    Engine::new(
        stubs.providers(),
        cache,
        HistoryStore::new(kv.clone(), shared),
        SettingsStore::new(kv),
    )
}
