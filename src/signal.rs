//! # Signal
//! Normalized per-source reading shared by every provider.
//!
//! A provider always hands back a `Signal`, even when its source is down; in
//! that case the signal is *degraded* (neutral score, `--` display, `error`).

use serde::{Deserialize, Serialize};

/// Score given to a source that could not be read.
pub const NEUTRAL_SCORE: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Weather,
    News,
    Market,
    Energy,
}

impl SignalKind {
    pub const ALL: [SignalKind; 4] = [
        SignalKind::Weather,
        SignalKind::News,
        SignalKind::Market,
        SignalKind::Energy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Weather => "weather",
            SignalKind::News => "news",
            SignalKind::Market => "market",
            SignalKind::Energy => "energy",
        }
    }

    /// Norwegian label used in user-facing notices.
    pub fn label(&self) -> &'static str {
        match self {
            SignalKind::Weather => "vær",
            SignalKind::News => "nyheter",
            SignalKind::Market => "marked",
            SignalKind::Energy => "strøm",
        }
    }

    /// Icon shown next to a degraded reading.
    pub fn fallback_icon(&self) -> &'static str {
        match self {
            SignalKind::Weather => "🌡️",
            SignalKind::News => "📰",
            SignalKind::Market => "📊",
            SignalKind::Energy => "⚡",
        }
    }
}

/// Where a returned signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Live,
    Fallback,
    Cache,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub score: u8,
    pub display: String,
    pub description: String,
    pub icon: String,
    pub error: bool,
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headlines: Vec<String>,
}

impl Signal {
    pub fn live(
        score: u8,
        display: impl Into<String>,
        description: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            score: score.min(100),
            display: display.into(),
            description: description.into(),
            icon: icon.into(),
            error: false,
            origin: Origin::Live,
            headlines: Vec::new(),
        }
    }

    pub fn degraded(kind: SignalKind) -> Self {
        Self {
            score: NEUTRAL_SCORE,
            display: "--".to_string(),
            description: "Utilgjengelig".to_string(),
            icon: kind.fallback_icon().to_string(),
            error: true,
            origin: Origin::Degraded,
            headlines: Vec::new(),
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_headlines(mut self, headlines: Vec<String>) -> Self {
        self.headlines = headlines;
        self
    }

    /// Only first-hand, non-degraded readings go into the cache.
    pub fn is_cacheable(&self) -> bool {
        !self.error && self.origin == Origin::Live
    }
}

/// One cycle's worth of signals, one per source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    pub weather: Signal,
    pub news: Signal,
    pub market: Signal,
    pub energy: Signal,
}

impl Signals {
    pub fn all_degraded() -> Self {
        Self {
            weather: Signal::degraded(SignalKind::Weather),
            news: Signal::degraded(SignalKind::News),
            market: Signal::degraded(SignalKind::Market),
            energy: Signal::degraded(SignalKind::Energy),
        }
    }

    pub fn get(&self, kind: SignalKind) -> &Signal {
        match kind {
            SignalKind::Weather => &self.weather,
            SignalKind::News => &self.news,
            SignalKind::Market => &self.market,
            SignalKind::Energy => &self.energy,
        }
    }

    pub fn failed(&self) -> Vec<SignalKind> {
        SignalKind::ALL
            .into_iter()
            .filter(|k| self.get(*k).error)
            .collect()
    }
}

/// How many sources answered in one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "failed", rename_all = "snake_case")]
pub enum Availability {
    All,
    Partial(Vec<SignalKind>),
    Unavailable,
}

impl Availability {
    pub fn from_signals(signals: &Signals) -> Self {
        let failed = signals.failed();
        match failed.len() {
            0 => Availability::All,
            n if n == SignalKind::ALL.len() => Availability::Unavailable,
            _ => Availability::Partial(failed),
        }
    }

    /// User notice for this availability, if any.
    pub fn notice(&self) -> Option<String> {
        match self {
            Availability::All => None,
            Availability::Partial(kinds) => {
                let names: Vec<&str> = kinds.iter().map(|k| k.label()).collect();
                Some(format!("Kunne ikke hente: {}", names.join(", ")))
            }
            Availability::Unavailable => {
                Some("Ingen data tilgjengelig. Sjekk internettforbindelsen.".to_string())
            }
        }
    }
}
