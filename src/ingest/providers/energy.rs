// src/ingest/providers/energy.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, Timelike};
use serde::Deserialize;

use crate::clock::SharedClock;
use crate::config::Location;
use crate::ingest::types::SignalProvider;
use crate::signal::{Signal, SignalKind};

#[derive(Debug, Deserialize)]
struct PricePoint {
    #[serde(rename = "NOK_per_kWh")]
    nok_per_kwh: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceTier {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

/// (exclusive upper bound in NOK/kWh, tier). Anything above is `VeryHigh`.
const PRICE_BOUNDS: [(f64, PriceTier); 4] = [
    (0.3, PriceTier::VeryLow),
    (0.7, PriceTier::Low),
    (1.5, PriceTier::Moderate),
    (3.0, PriceTier::High),
];

impl PriceTier {
    pub fn from_price(nok_per_kwh: f64) -> Self {
        PRICE_BOUNDS
            .iter()
            .find(|(max, _)| nok_per_kwh < *max)
            .map(|(_, tier)| *tier)
            .unwrap_or(PriceTier::VeryHigh)
    }

    pub fn score(&self) -> u8 {
        match self {
            PriceTier::VeryLow => 95,
            PriceTier::Low => 80,
            PriceTier::Moderate => 55,
            PriceTier::High => 30,
            PriceTier::VeryHigh => 10,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PriceTier::VeryLow => "Veldig lav",
            PriceTier::Low => "Lav",
            PriceTier::Moderate => "Moderat",
            PriceTier::High => "Høy",
            PriceTier::VeryHigh => "Veldig høy",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            PriceTier::VeryLow => "💚",
            PriceTier::Low => "✅",
            PriceTier::Moderate => "⚡",
            PriceTier::High => "💸",
            PriceTier::VeryHigh => "🔥",
        }
    }
}

pub fn energy_signal(nok_per_kwh: f64) -> Signal {
    let tier = PriceTier::from_price(nok_per_kwh);
    Signal::live(
        tier.score(),
        format!("{:.2} kr/kWh", nok_per_kwh),
        tier.description(),
        tier.icon(),
    )
}

/// Hourly spot prices from hvakosterstrommen.no.
pub struct EnergyProvider {
    client: reqwest::Client,
    base_url: String,
    clock: SharedClock,
}

impl EnergyProvider {
    pub fn new(client: reqwest::Client, base_url: &str, clock: SharedClock) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            clock,
        }
    }

    /// `/api/v1/prices/{YYYY}/{MM}-{DD}_{zone}.json` for today.
    pub fn price_url(&self, zone: &str) -> String {
        let now = self.clock.now();
        format!(
            "{}/api/v1/prices/{}/{:02}-{:02}_{}.json",
            self.base_url,
            now.year(),
            now.month(),
            now.day(),
            zone
        )
    }
}

#[async_trait]
impl SignalProvider for EnergyProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::Energy
    }

    fn cache_key(&self, location: &Location) -> String {
        format!("energy_{}", location.price_zone())
    }

    async fn fetch_fresh(&self, location: &Location) -> Result<Signal> {
        let hour = self.clock.now().hour() as usize;
        let url = self.price_url(location.price_zone());
        let prices: Vec<PricePoint> = self
            .client
            .get(&url)
            .send()
            .await
            .context("energy http get()")?
            .error_for_status()
            .context("energy non-2xx")?
            .json()
            .await
            .context("energy json")?;

        let price = prices
            .get(hour)
            .and_then(|p| p.nok_per_kwh)
            .ok_or_else(|| anyhow!("no price for hour {hour} in zone {}", location.price_zone()))?;
        Ok(energy_signal(price))
    }

    fn name(&self) -> &'static str {
        "energy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Local, TimeZone};
    use std::sync::Arc;

    #[test]
    fn price_tiers_use_exclusive_upper_bounds() {
        let cases = [
            (-0.05, 95),
            (0.29, 95),
            (0.3, 80),
            (0.69, 80),
            (0.7, 55),
            (1.49, 55),
            (1.5, 30),
            (2.99, 30),
            (3.0, 10),
            (7.5, 10),
        ];
        for (price, score) in cases {
            assert_eq!(PriceTier::from_price(price).score(), score, "price {price}");
        }
    }

    #[test]
    fn display_has_two_decimals() {
        let s = energy_signal(0.4567);
        assert_eq!(s.display, "0.46 kr/kWh");
        assert_eq!(s.description, "Lav");
    }

    #[test]
    fn url_is_zero_padded() {
        let clock = Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2026, 3, 7, 9, 15, 0).unwrap(),
        ));
        let p = EnergyProvider::new(reqwest::Client::new(), "https://example.test/", clock);
        assert_eq!(
            p.price_url("NO3"),
            "https://example.test/api/v1/prices/2026/03-07_NO3.json"
        );
    }
}
