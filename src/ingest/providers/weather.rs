// src/ingest/providers/weather.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Location;
use crate::ingest::round_half_up;
use crate::ingest::types::SignalProvider;
use crate::signal::{Signal, SignalKind};

#[derive(Debug, Deserialize)]
struct Forecast {
    current_weather: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    weathercode: u16,
    temperature: f64,
}

/// WMO weather-code bands, best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherTier {
    Clear,
    PartlyCloudy,
    Overcast,
    Drizzle,
    Rain,
    Snow,
    Showers,
    Storm,
}

/// (inclusive upper code bound, tier). Codes above the last bound are `Storm`.
const TIER_BOUNDS: [(u16, WeatherTier); 7] = [
    (1, WeatherTier::Clear),
    (3, WeatherTier::PartlyCloudy),
    (48, WeatherTier::Overcast),
    (57, WeatherTier::Drizzle),
    (67, WeatherTier::Rain),
    (77, WeatherTier::Snow),
    (82, WeatherTier::Showers),
];

impl WeatherTier {
    pub fn from_code(code: u16) -> Self {
        TIER_BOUNDS
            .iter()
            .find(|(max, _)| code <= *max)
            .map(|(_, tier)| *tier)
            .unwrap_or(WeatherTier::Storm)
    }

    pub fn score(&self) -> u8 {
        match self {
            WeatherTier::Clear => 95,
            WeatherTier::PartlyCloudy => 80,
            WeatherTier::Overcast => 60,
            WeatherTier::Drizzle => 45,
            WeatherTier::Rain => 30,
            WeatherTier::Snow => 35,
            WeatherTier::Showers => 20,
            WeatherTier::Storm => 10,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WeatherTier::Clear => "Strålende sol",
            WeatherTier::PartlyCloudy => "Delvis skyet",
            WeatherTier::Overcast => "Skyet/tåke",
            WeatherTier::Drizzle => "Yr",
            WeatherTier::Rain => "Regn",
            WeatherTier::Snow => "Snø",
            WeatherTier::Showers => "Kraftig nedbør",
            WeatherTier::Storm => "Uvær",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            WeatherTier::Clear => "☀️",
            WeatherTier::PartlyCloudy => "⛅",
            WeatherTier::Overcast => "🌥️",
            WeatherTier::Drizzle | WeatherTier::Rain => "🌧️",
            WeatherTier::Snow => "❄️",
            WeatherTier::Showers => "⛈️",
            WeatherTier::Storm => "🌪️",
        }
    }
}

/// Turn a weather code + temperature into a signal.
pub fn weather_signal(code: u16, temperature_c: f64) -> Signal {
    let tier = WeatherTier::from_code(code);
    Signal::live(
        tier.score(),
        format!("{}°C", round_half_up(temperature_c) as i64),
        tier.description(),
        tier.icon(),
    )
}

/// Current conditions from Open-Meteo.
pub struct WeatherProvider {
    client: reqwest::Client,
    base_url: String,
}

impl WeatherProvider {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SignalProvider for WeatherProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::Weather
    }

    fn cache_key(&self, location: &Location) -> String {
        format!("weather_{}_{}", location.lat, location.lon)
    }

    async fn fetch_fresh(&self, location: &Location) -> Result<Signal> {
        let url = format!("{}/v1/forecast", self.base_url);
        let forecast: Forecast = self
            .client
            .get(&url)
            .query(&[
                ("latitude", location.lat.to_string()),
                ("longitude", location.lon.to_string()),
                ("current_weather", "true".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .context("weather http get()")?
            .error_for_status()
            .context("weather non-2xx")?
            .json()
            .await
            .context("weather json")?;

        let cw = forecast.current_weather;
        Ok(weather_signal(cw.weathercode, cw.temperature))
    }

    fn name(&self) -> &'static str {
        "weather"
    }
}
