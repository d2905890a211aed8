// src/ingest/mod.rs
pub mod providers;
pub mod types;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinError;

use crate::cache::SignalCache;
use crate::config::{AppConfig, Location};
use crate::ingest::types::SignalProvider;
use crate::signal::{Origin, Signal, SignalKind, Signals};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_cache_hits_total", "Signals served from the TTL cache.");
        describe_counter!(
            "ingest_cache_misses_total",
            "Signals that required a network fetch."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors (degraded signals)."
        );
        describe_counter!(
            "ingest_news_fallback_total",
            "News cycles that had to use the forum fallback."
        );
        describe_counter!(
            "ingest_stale_results_total",
            "Fresh results dropped because a newer cycle started."
        );
        describe_histogram!("ingest_fetch_ms", "Provider fetch time in milliseconds.");
    });
}

/// Shared HTTP client for all providers.
pub fn build_http_client(cfg: &AppConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .timeout(cfg.http_timeout())
        .build()
        .context("building http client")
}

/// Normalize a headline: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Half-up rounding (`2.5 → 3`, `-2.5 → -2`).
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Monotonic refresh-cycle counter. Starting a cycle supersedes all earlier ones.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    current: Arc<AtomicU64>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new cycle and return its tag.
    pub fn bump(&self) -> CycleTag {
        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        CycleTag {
            id,
            current: self.current.clone(),
        }
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct CycleTag {
    id: u64,
    current: Arc<AtomicU64>,
}

impl CycleTag {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// False once a newer cycle has been started.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.id
    }
}

/// The four sources, one provider each.
#[derive(Clone)]
pub struct Providers {
    pub weather: Arc<dyn SignalProvider>,
    pub news: Arc<dyn SignalProvider>,
    pub market: Arc<dyn SignalProvider>,
    pub energy: Arc<dyn SignalProvider>,
}

impl Providers {
    /// Real HTTP providers wired from configuration.
    pub fn from_config(cfg: &AppConfig, clock: crate::clock::SharedClock) -> Result<Self> {
        use providers::{
            energy::EnergyProvider, market::MarketProvider, news::NewsProvider,
            weather::WeatherProvider,
        };
        let client = build_http_client(cfg)?;
        let ep = &cfg.endpoints;
        Ok(Self {
            weather: Arc::new(WeatherProvider::new(client.clone(), &ep.weather_base)),
            news: Arc::new(NewsProvider::new(
                client.clone(),
                &ep.news_feed_url,
                ep.news_proxy_url.as_deref(),
                &ep.forum_base,
            )),
            market: Arc::new(MarketProvider::new(client.clone(), &ep.market_base)),
            energy: Arc::new(EnergyProvider::new(client, &ep.energy_base, clock)),
        })
    }
}

/// Cache-first fetch of one signal. Never fails: errors become a degraded signal.
///
/// Fresh results are written to the cache only while `cycle` is still current,
/// so a superseded cycle cannot put another location's data back.
pub async fn fetch_signal(
    provider: &dyn SignalProvider,
    cache: &SignalCache,
    location: &Location,
    cycle: &CycleTag,
) -> Signal {
    ensure_metrics_described();

    let key = provider.cache_key(location);
    if let Some(hit) = cache.get(&key) {
        counter!("ingest_cache_hits_total", "provider" => provider.name()).increment(1);
        tracing::debug!(target: "ingest", provider = provider.name(), %key, "cache hit");
        return hit.with_origin(Origin::Cache);
    }
    counter!("ingest_cache_misses_total", "provider" => provider.name()).increment(1);

    let t0 = std::time::Instant::now();
    let res = provider.fetch_fresh(location).await;
    histogram!("ingest_fetch_ms", "provider" => provider.name())
        .record(t0.elapsed().as_secs_f64() * 1_000.0);

    match res {
        Ok(signal) => {
            if signal.is_cacheable() {
                // Checked under the cache lock: a location change bumps the
                // generation before it clears, so no stale write survives it.
                if !cache.set_if(key, signal.clone(), || cycle.is_current()) {
                    counter!("ingest_stale_results_total").increment(1);
                    tracing::debug!(
                        target: "ingest",
                        provider = provider.name(),
                        cycle = cycle.id(),
                        "superseded cycle, not caching"
                    );
                }
            }
            signal
        }
        Err(e) => {
            tracing::warn!(target: "ingest", error = ?e, provider = provider.name(), "provider error, degrading");
            counter!("ingest_provider_errors_total", "provider" => provider.name()).increment(1);
            Signal::degraded(provider.kind())
        }
    }
}

fn settle(res: Result<Signal, JoinError>, kind: SignalKind) -> Signal {
    res.unwrap_or_else(|e| {
        tracing::warn!(target: "ingest", error = ?e, provider = kind.as_str(), "fetch task failed");
        Signal::degraded(kind)
    })
}

/// Run all four providers concurrently and wait for every one to settle.
/// One slow or failing source never cancels the others.
pub async fn fetch_all(
    providers: &Providers,
    cache: Arc<SignalCache>,
    location: Location,
    cycle: &CycleTag,
) -> Signals {
    let spawn = |p: Arc<dyn SignalProvider>| {
        let cache = cache.clone();
        let cycle = cycle.clone();
        let loc = location;
        tokio::spawn(async move { fetch_signal(p.as_ref(), &cache, &loc, &cycle).await })
    };

    let (weather, news, market, energy) = tokio::join!(
        spawn(providers.weather.clone()),
        spawn(providers.news.clone()),
        spawn(providers.market.clone()),
        spawn(providers.energy.clone()),
    );

    Signals {
        weather: settle(weather, SignalKind::Weather),
        news: settle(news, SignalKind::News),
        market: settle(market, SignalKind::Market),
        energy: settle(energy, SignalKind::Energy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_decodes_and_collapses() {
        let s = "  Rekord&nbsp;&nbsp;for <b>norsk</b>\n eksport  ";
        assert_eq!(normalize_text(s), "Rekord for norsk eksport");
    }

    #[test]
    fn round_half_up_matches_expectations() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-0.7), -1.0);
        assert_eq!(round_half_up(61.49), 61.0);
    }

    #[test]
    fn generation_supersedes_older_cycles() {
        let g = Generation::new();
        let first = g.bump();
        assert!(first.is_current());
        let second = g.bump();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert_eq!(g.current(), 2);
    }

    struct FixedMarket;

    #[async_trait::async_trait]
    impl SignalProvider for FixedMarket {
        fn kind(&self) -> SignalKind {
            SignalKind::Market
        }
        fn cache_key(&self, _location: &Location) -> String {
            "market".into()
        }
        async fn fetch_fresh(&self, _location: &Location) -> Result<Signal> {
            Ok(Signal::live(70, "Grådighet", "Index: 70/100", "😊"))
        }
        fn name(&self) -> &'static str {
            "fixed_market"
        }
    }

    #[tokio::test]
    async fn superseded_cycle_result_is_returned_but_not_cached() {
        let cache = SignalCache::new(
            crate::cache::DEFAULT_TTL,
            Arc::new(crate::clock::SystemClock),
        );
        let g = Generation::new();
        let old = g.bump();
        let _new = g.bump();

        let loc = crate::config::default_location();
        let s = fetch_signal(&FixedMarket, &cache, &loc, &old).await;
        assert_eq!(s.score, 70);
        assert!(cache.is_empty());

        let cur = g.bump();
        fetch_signal(&FixedMarket, &cache, &loc, &cur).await;
        assert_eq!(cache.len(), 1);
    }
}
