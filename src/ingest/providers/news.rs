// src/ingest/providers/news.rs
//! News mood from NRK top stories, with r/norge as a fallback source.
//!
//! Primary: keyword count over the latest 10 headlines.
//! Fallback: average upvote ratio of the forum's hottest posts, used only
//! when the primary feed cannot be fetched or parsed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::config::Location;
use crate::ingest::types::SignalProvider;
use crate::ingest::{normalize_text, round_half_up};
use crate::signal::{Origin, Signal, SignalKind};

pub const HEADLINE_WINDOW: usize = 10;

pub const NEGATIVE_WORDS: [&str; 20] = [
    "krig", "konflikt", "død", "drept", "krise", "ulykke", "angrep", "trussel", "frykt", "fare",
    "katastrofe", "eksplosjon", "skadet", "terror", "vold", "brann", "flom", "ras", "dødsfall",
    "smitte",
];

pub const POSITIVE_WORDS: [&str; 16] = [
    "rekord",
    "seier",
    "vinner",
    "gjennombrudd",
    "fred",
    "vekst",
    "bedring",
    "suksess",
    "glede",
    "feiring",
    "reddet",
    "trygg",
    "fremgang",
    "avtale",
    "enighet",
    "prisvinner",
];

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    upvote_ratio: Option<f64>,
}

/// Keyword counts over a set of headlines. Each keyword counts once per headline.
pub fn keyword_counts<S: AsRef<str>>(headlines: &[S]) -> (u32, u32) {
    let mut neg = 0u32;
    let mut pos = 0u32;
    for h in headlines {
        let title = h.as_ref().to_lowercase();
        neg += NEGATIVE_WORDS.iter().filter(|w| title.contains(*w)).count() as u32;
        pos += POSITIVE_WORDS.iter().filter(|w| title.contains(*w)).count() as u32;
    }
    (neg, pos)
}

/// `clamp(55 - 6*neg + 8*pos, 15, 90)`.
pub fn headline_score(neg: u32, pos: u32) -> u8 {
    let raw = 55i64 - 6 * i64::from(neg) + 8 * i64::from(pos);
    raw.clamp(15, 90) as u8
}

/// Signal from the primary feed. `total_items` is the size of the whole feed.
pub fn headline_signal<S: AsRef<str>>(headlines: &[S], total_items: usize) -> Signal {
    let window = &headlines[..headlines.len().min(HEADLINE_WINDOW)];
    let (neg, pos) = keyword_counts(window);
    let score = headline_score(neg, pos);

    let (display, icon) = if score > 65 {
        ("Positivt", "📈")
    } else if score < 40 {
        ("Urolig", "📉")
    } else {
        ("Nøytralt", "📰")
    };

    let top = window.iter().take(3).map(|h| h.as_ref().to_string()).collect();
    Signal::live(score, display, format!("{total_items} saker"), icon).with_headlines(top)
}

/// `clamp(round(55 + Σ(ratio - 0.5) * 10), 30, 75)`. A missing or zero ratio counts as 0.5.
pub fn forum_score(ratios: &[Option<f64>]) -> u8 {
    let sum: f64 = ratios
        .iter()
        .map(|r| r.filter(|v| *v != 0.0).unwrap_or(0.5))
        .map(|r| (r - 0.5) * 10.0)
        .sum();
    round_half_up(55.0 + sum).clamp(30.0, 75.0) as u8
}

pub fn forum_signal(ratios: &[Option<f64>]) -> Signal {
    let score = forum_score(ratios);
    let display = if score > 55 { "OK stemning" } else { "Blandet" };
    Signal::live(score, display, "Reddit r/norge", "📱").with_origin(Origin::Fallback)
}

/// Parse an RSS document into normalized headline titles (all items).
pub fn parse_headlines(xml: &str) -> Result<Vec<String>> {
    let rss: Rss = from_str(xml).context("parsing news rss xml")?;
    Ok(rss
        .channel
        .item
        .into_iter()
        .map(|it| normalize_text(it.title.as_deref().unwrap_or_default()))
        .collect())
}

pub struct NewsProvider {
    client: reqwest::Client,
    feed_url: String,
    proxy_url: Option<String>,
    forum_base: String,
}

impl NewsProvider {
    pub fn new(
        client: reqwest::Client,
        feed_url: &str,
        proxy_url: Option<&str>,
        forum_base: &str,
    ) -> Self {
        Self {
            client,
            feed_url: feed_url.to_string(),
            proxy_url: proxy_url.map(str::to_string),
            forum_base: forum_base.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_primary(&self) -> Result<Signal> {
        let req = match &self.proxy_url {
            Some(proxy) => self
                .client
                .get(proxy)
                .query(&[("url", self.feed_url.as_str())]),
            None => self.client.get(&self.feed_url),
        };
        let body = req
            .send()
            .await
            .context("news http get()")?
            .error_for_status()
            .context("news non-2xx")?
            .text()
            .await
            .context("news http .text()")?;

        let headlines = parse_headlines(&body)?;
        Ok(headline_signal(&headlines, headlines.len()))
    }

    async fn fetch_forum(&self) -> Result<Signal> {
        let url = format!("{}/r/norge/hot.json", self.forum_base);
        let listing: Listing = self
            .client
            .get(&url)
            .query(&[("limit", "10")])
            .send()
            .await
            .context("forum http get()")?
            .error_for_status()
            .context("forum non-2xx")?
            .json()
            .await
            .context("forum json")?;

        let ratios: Vec<Option<f64>> = listing
            .data
            .children
            .into_iter()
            .map(|c| c.data.upvote_ratio)
            .collect();
        Ok(forum_signal(&ratios))
    }
}

#[async_trait]
impl SignalProvider for NewsProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::News
    }

    fn cache_key(&self, _location: &Location) -> String {
        "news_nrk".to_string()
    }

    async fn fetch_fresh(&self, _location: &Location) -> Result<Signal> {
        match self.fetch_primary().await {
            Ok(s) => Ok(s),
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, provider = "news", "primary feed failed, trying forum");
                counter!("ingest_news_fallback_total").increment(1);
                self.fetch_forum()
                    .await
                    .context("news fallback source failed")
            }
        }
    }

    fn name(&self) -> &'static str {
        "news"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_feed_scores_55() {
        let s = headline_signal(&["Været i helgen", "Ny bok lansert"], 2);
        assert_eq!(s.score, 55);
        assert_eq!(s.display, "Nøytralt");
        assert_eq!(s.description, "2 saker");
    }

    #[test]
    fn keywords_are_case_insensitive_substrings() {
        let (neg, pos) = keyword_counts(&["KRIG i øst", "Rekordvekst for eksport"]);
        assert_eq!(neg, 1);
        assert_eq!(pos, 2); // "rekord" + "vekst"
    }

    #[test]
    fn score_is_clamped() {
        assert_eq!(headline_score(20, 0), 15);
        assert_eq!(headline_score(0, 10), 90);
        assert_eq!(headline_score(3, 0), 37);
    }

    #[test]
    fn display_bands() {
        let s = headline_signal(&["Fred og seier", "Avtale om vekst"], 2);
        assert!(s.score > 65);
        assert_eq!(s.display, "Positivt");
        assert_eq!(s.icon, "📈");

        let s = headline_signal(&["Krig og krise", "Brann og flom"], 2);
        assert!(s.score < 40);
        assert_eq!(s.display, "Urolig");
        assert_eq!(s.icon, "📉");
    }

    #[test]
    fn only_first_ten_headlines_count() {
        let mut hs: Vec<String> = (0..10).map(|i| format!("Nyhet {i}")).collect();
        hs.push("Krig".into());
        let s = headline_signal(&hs, hs.len());
        assert_eq!(s.score, 55);
        assert_eq!(s.description, "11 saker");
        assert_eq!(s.headlines.len(), 3);
    }

    #[test]
    fn forum_score_bounds_and_missing_ratio() {
        assert_eq!(forum_score(&[]), 55);
        assert_eq!(forum_score(&[None, Some(0.0)]), 55);
        assert_eq!(forum_score(&[Some(0.95); 10]), 75);
        assert_eq!(forum_score(&[Some(0.05); 10]), 30);
        assert_eq!(forum_score(&[Some(0.75)]), 58); // 55 + 2.5 rounds up
    }

    #[test]
    fn forum_signal_is_fallback() {
        let s = forum_signal(&[Some(0.9), Some(0.9)]);
        assert_eq!(s.origin, Origin::Fallback);
        assert_eq!(s.display, "OK stemning");
        let s = forum_signal(&[Some(0.5)]);
        assert_eq!(s.display, "Blandet");
    }

    #[test]
    fn parses_rss_titles() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0"><channel><title>NRK</title>
<item><title>Rekord for &amp; norsk laks</title><link>https://nrk.no/1</link></item>
<item><title><![CDATA[Storm  ventes]]></title></item>
</channel></rss>"#;
        let hs = parse_headlines(xml).unwrap();
        assert_eq!(hs, vec!["Rekord for & norsk laks", "Storm ventes"]);
    }

    #[test]
    fn empty_channel_is_not_an_error() {
        let xml = r#"<rss><channel><title>NRK</title></channel></rss>"#;
        assert!(parse_headlines(xml).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_headlines("<html><body>502 Bad Gateway</body></html>").is_err());
    }
}
