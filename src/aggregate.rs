//! # Aggregator
//! Pure scoring: five component scores → one day score and a qualitative band.
//! No I/O, suitable for unit tests.
//!
//! The aggregator also keeps the working state between cycles (latest source
//! scores, current mood, loading flag). While a refresh cycle is in flight the
//! state is *loading* and [`Aggregator::total`] refuses to compute, so a total
//! is never built from half-updated scores.

use serde::{Deserialize, Serialize};

use crate::ingest::round_half_up;
use crate::signal::{Signals, NEUTRAL_SCORE};

/// User-selected mood. Closed set of four levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Bad,
    #[default]
    Meh,
    Good,
    Great,
}

impl Mood {
    pub fn score(&self) -> u8 {
        match self {
            Mood::Bad => 15,
            Mood::Meh => 45,
            Mood::Good => 75,
            Mood::Great => 100,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Mood::Bad => "😫",
            Mood::Meh => "😐",
            Mood::Good => "😊",
            Mood::Great => "🔥",
        }
    }
}

/// Fixed component weights. They sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Weights {
    pub weather: f64,
    pub news: f64,
    pub market: f64,
    pub energy: f64,
    pub mood: f64,
}

pub const WEIGHTS: Weights = Weights {
    weather: 0.20,
    news: 0.25,
    market: 0.20,
    energy: 0.15,
    mood: 0.20,
};

impl Weights {
    pub fn sum(&self) -> f64 {
        self.weather + self.news + self.market + self.energy + self.mood
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Scores {
    pub weather: u8,
    pub news: u8,
    pub market: u8,
    pub energy: u8,
    pub mood: u8,
}

impl Default for Scores {
    fn default() -> Self {
        Self {
            weather: NEUTRAL_SCORE,
            news: NEUTRAL_SCORE,
            market: NEUTRAL_SCORE,
            energy: NEUTRAL_SCORE,
            mood: Mood::default().score(),
        }
    }
}

/// `round(Σ weight_i * score_i)`, always within 0..=100.
pub fn weighted_total(s: &Scores, w: &Weights) -> u8 {
    let raw = w.weather * f64::from(s.weather)
        + w.news * f64::from(s.news)
        + w.market * f64::from(s.market)
        + w.energy * f64::from(s.energy)
        + w.mood * f64::from(s.mood);
    round_half_up(raw).clamp(0.0, 100.0) as u8
}

/// Qualitative band for a total. Bands: `<35`, `<55`, `<75`, rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Tough,
    Okay,
    Fine,
    Fantastic,
}

impl Level {
    pub fn from_total(total: u8) -> Self {
        match total {
            0..=34 => Level::Tough,
            35..=54 => Level::Okay,
            55..=74 => Level::Fine,
            _ => Level::Fantastic,
        }
    }

    /// Coarse tone for theming (`bad` / `ok` / `good`).
    pub fn tone(&self) -> &'static str {
        match self {
            Level::Tough => "bad",
            Level::Okay | Level::Fine => "ok",
            Level::Fantastic => "good",
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Level::Tough => "En tøff dag",
            Level::Okay => "En helt grei dag",
            Level::Fine => "En fin dag",
            Level::Fantastic => "En fantastisk dag!",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Level::Tough => "Mye motvind i dag. Ta vare på deg selv og fokuser på det positive.",
            Level::Okay => "Dagen har sine opp- og nedturer. Det meste går sin gang.",
            Level::Fine => "Ting ser bra ut! Nyt dagen og gjør noe hyggelig.",
            Level::Fantastic => "Alt ligger til rette for en super dag. Grip mulighetene!",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayScore {
    pub total: u8,
    pub level: Level,
    pub tone: &'static str,
    pub status: &'static str,
    pub description: &'static str,
}

impl DayScore {
    pub fn from_total(total: u8) -> Self {
        let level = Level::from_total(total);
        Self {
            total,
            level,
            tone: level.tone(),
            status: level.status(),
            description: level.description(),
        }
    }
}

/// Working state between refresh cycles.
#[derive(Debug, Clone)]
pub struct Aggregator {
    scores: Scores,
    mood: Mood,
    loading: bool,
}

impl Aggregator {
    /// Starts in the loading state: nothing can be computed before the first cycle settles.
    pub fn new(mood: Mood) -> Self {
        Self {
            scores: Scores {
                mood: mood.score(),
                ..Scores::default()
            },
            mood,
            loading: true,
        }
    }

    pub fn begin_cycle(&mut self) {
        self.loading = true;
    }

    /// Take the settled scores of a finished cycle and leave the loading state.
    pub fn apply(&mut self, signals: &Signals) {
        self.scores.weather = signals.weather.score;
        self.scores.news = signals.news.score;
        self.scores.market = signals.market.score;
        self.scores.energy = signals.energy.score;
        self.loading = false;
    }

    pub fn set_mood(&mut self, mood: Mood) {
        self.mood = mood;
        self.scores.mood = mood.score();
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    pub fn scores(&self) -> Scores {
        self.scores
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// `None` while a cycle is in flight.
    pub fn total(&self) -> Option<DayScore> {
        if self.loading {
            return None;
        }
        Some(DayScore::from_total(weighted_total(&self.scores, &WEIGHTS)))
    }
}
