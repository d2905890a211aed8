// src/ingest/providers/market.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use crate::config::Location;
use crate::ingest::types::SignalProvider;
use crate::signal::{Signal, SignalKind};

#[derive(Debug, Deserialize)]
struct FngResponse {
    data: Vec<FngPoint>,
}

#[derive(Debug, Deserialize)]
struct FngPoint {
    #[serde(deserialize_with = "deserialize_index")]
    value: u32,
    value_classification: String,
}

/// The index arrives as a string (`"42"`); accept plain numbers too.
fn deserialize_index<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s.trim().parse().map_err(D::Error::custom),
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| D::Error::custom(format!("index out of range: {n}"))),
        other => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Fear & Greed classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketMood {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

impl MarketMood {
    pub fn from_classification(s: &str) -> Option<Self> {
        match s {
            "Extreme Fear" => Some(MarketMood::ExtremeFear),
            "Fear" => Some(MarketMood::Fear),
            "Neutral" => Some(MarketMood::Neutral),
            "Greed" => Some(MarketMood::Greed),
            "Extreme Greed" => Some(MarketMood::ExtremeGreed),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MarketMood::ExtremeFear => "Ekstrem frykt",
            MarketMood::Fear => "Frykt",
            MarketMood::Neutral => "Nøytral",
            MarketMood::Greed => "Grådighet",
            MarketMood::ExtremeGreed => "Ekstrem grådighet",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            MarketMood::ExtremeFear => "😨",
            MarketMood::Fear => "😟",
            MarketMood::Neutral => "😐",
            MarketMood::Greed => "😊",
            MarketMood::ExtremeGreed => "🤑",
        }
    }
}

/// The index is passed through as the score. Unknown classifications keep
/// their raw text and a generic icon.
pub fn market_signal(index: u32, classification: &str) -> Result<Signal> {
    let score = u8::try_from(index)
        .ok()
        .filter(|v| *v <= 100)
        .ok_or_else(|| anyhow!("fear/greed index {index} outside 0..=100"))?;

    let (display, icon) = match MarketMood::from_classification(classification) {
        Some(m) => (m.label().to_string(), m.icon()),
        None => (classification.to_string(), "📊"),
    };
    Ok(Signal::live(
        score,
        display,
        format!("Index: {score}/100"),
        icon,
    ))
}

/// Crypto Fear & Greed index as a proxy for market mood.
pub struct MarketProvider {
    client: reqwest::Client,
    base_url: String,
}

impl MarketProvider {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SignalProvider for MarketProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::Market
    }

    fn cache_key(&self, _location: &Location) -> String {
        "market".to_string()
    }

    async fn fetch_fresh(&self, _location: &Location) -> Result<Signal> {
        let url = format!("{}/fng/", self.base_url);
        let resp: FngResponse = self
            .client
            .get(&url)
            .send()
            .await
            .context("market http get()")?
            .error_for_status()
            .context("market non-2xx")?
            .json()
            .await
            .context("market json")?;

        let point = resp
            .data
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("market response has no data points"))?;
        market_signal(point.value, &point.value_classification)
    }

    fn name(&self) -> &'static str {
        "market"
    }
}
