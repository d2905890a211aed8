//! One persisted score per calendar day, newest first, capped at 30.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregate::Mood;
use crate::clock::{day_key, SharedClock};
use crate::storage::KvStore;

pub const HISTORY_KEY: &str = "dagens_vibe_history";
pub const HISTORY_CAP: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Calendar-day key, e.g. `19.10.2026`.
    pub date: String,
    pub score: u8,
    #[serde(alias = "vibes")]
    pub mood: Mood,
    #[serde(alias = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<chrono::Utc>,
}

pub struct HistoryStore {
    store: Arc<dyn KvStore>,
    clock: SharedClock,
    // Serializes read-modify-write on the history document.
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KvStore>, clock: SharedClock) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Newest first. Missing or corrupt documents read as empty; single
    /// entries that do not parse are skipped and the rest are kept.
    pub fn history(&self) -> Vec<HistoryEntry> {
        let Some(raw) = self.store.get(HISTORY_KEY) else {
            return Vec::new();
        };
        let items = match serde_json::from_str::<Option<Vec<Value>>>(&raw) {
            Ok(v) => v.unwrap_or_default(),
            Err(e) => {
                tracing::debug!(target: "history", error = %e, "history document corrupt, treating as empty");
                return Vec::new();
            }
        };
        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<HistoryEntry>(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!(target: "history", error = %e, "skipping unreadable history entry");
                    None
                }
            })
            .collect()
    }

    /// Replace today's entry (if any) with a new one at the front, keep the newest 30.
    pub fn record_today(&self, score: u8, mood: Mood) -> Result<HistoryEntry> {
        let _guard = self.write_lock.lock().expect("history mutex poisoned");
        let now = self.clock.now();
        let today = day_key(&now);

        let mut entries = self.history();
        entries.retain(|e| e.date != today);
        let entry = HistoryEntry {
            date: today,
            score: score.min(100),
            mood,
            created_at: now.with_timezone(&chrono::Utc),
        };
        entries.insert(0, entry.clone());
        entries.truncate(HISTORY_CAP);

        let doc = serde_json::to_string(&entries).context("serializing history")?;
        self.store
            .set(HISTORY_KEY, &doc)
            .context("persisting history")?;
        tracing::debug!(target: "history", date = %entry.date, score, "recorded day score");
        Ok(entry)
    }

    /// Mood recorded earlier today, if any.
    pub fn today_mood(&self) -> Option<Mood> {
        let today = day_key(&self.clock.now());
        self.history()
            .into_iter()
            .find(|e| e.date == today)
            .map(|e| e.mood)
    }

    /// Today's mood, or the default (`meh`) when nothing was recorded today.
    pub fn today_mood_or_default(&self) -> Mood {
        self.today_mood().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use chrono::{Duration, Local, TimeZone};

    fn setup() -> (Arc<ManualClock>, Arc<MemoryStore>, HistoryStore) {
        let clock = Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap(),
        ));
        let store = Arc::new(MemoryStore::new());
        let h = HistoryStore::new(store.clone(), clock.clone());
        (clock, store, h)
    }

    #[test]
    fn same_day_is_deduplicated_later_wins() {
        let (clock, _store, h) = setup();
        h.record_today(40, Mood::Meh).unwrap();
        clock.advance(Duration::days(1));
        h.record_today(60, Mood::Good).unwrap();
        clock.advance(Duration::hours(2));
        h.record_today(70, Mood::Great).unwrap();

        let all = h.history();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].date, "2.10.2026");
        assert_eq!(all[0].score, 70);
        assert_eq!(all[0].mood, Mood::Great);
        assert_eq!(all[1].date, "1.10.2026");
        assert_eq!(all[1].score, 40);
    }

    #[test]
    fn cap_drops_oldest() {
        let (clock, _store, h) = setup();
        for i in 0..31u8 {
            h.record_today(i, Mood::Meh).unwrap();
            clock.advance(Duration::days(1));
        }
        let all = h.history();
        assert_eq!(all.len(), HISTORY_CAP);
        assert_eq!(all[0].score, 30);
        assert_eq!(all.last().unwrap().score, 1, "day 0 must be dropped");
        assert!(all.iter().all(|e| e.date != "1.10.2026"));
    }

    #[test]
    fn corrupt_or_null_document_reads_empty() {
        let (_clock, store, h) = setup();
        store.set(HISTORY_KEY, "{not json").unwrap();
        assert!(h.history().is_empty());
        store.set(HISTORY_KEY, "null").unwrap();
        assert!(h.history().is_empty());

        // and recording over a corrupt document recovers
        store.set(HISTORY_KEY, "{not json").unwrap();
        h.record_today(50, Mood::Bad).unwrap();
        assert_eq!(h.history().len(), 1);
    }

    #[test]
    fn unreadable_entries_are_skipped_not_the_whole_history() {
        let (_clock, store, h) = setup();
        store
            .set(
                HISTORY_KEY,
                r#"[
                    {"date":"30.9.2026","score":61,"mood":"ecstatic","createdAt":1790000000000},
                    {"date":"29.9.2026","score":55,"mood":"good","createdAt":1789900000000},
                    {"date":"28.9.2026","score":"high","mood":"meh","createdAt":1789800000000},
                    {"date":"27.9.2026","score":40,"mood":"bad","createdAt":1789700000000}
                ]"#,
            )
            .unwrap();
        let all = h.history();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].date, "29.9.2026");
        assert_eq!(all[1].date, "27.9.2026");

        // recording today keeps the readable days
        h.record_today(70, Mood::Good).unwrap();
        let all = h.history();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].date, "1.10.2026");
        assert_eq!(all[2].mood, Mood::Bad);
    }

    #[test]
    fn today_mood_lookup() {
        let (clock, _store, h) = setup();
        assert_eq!(h.today_mood(), None);
        assert_eq!(h.today_mood_or_default(), Mood::Meh);
        h.record_today(80, Mood::Great).unwrap();
        assert_eq!(h.today_mood(), Some(Mood::Great));
        clock.advance(Duration::days(1));
        assert_eq!(h.today_mood(), None);
    }

    #[test]
    fn reads_legacy_field_names() {
        let (_clock, store, h) = setup();
        store
            .set(
                HISTORY_KEY,
                r#"[{"date":"1.10.2026","score":61,"vibes":"good","timestamp":1790000000000}]"#,
            )
            .unwrap();
        let all = h.history();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].mood, Mood::Good);
        assert_eq!(h.today_mood(), Some(Mood::Good));
    }
}
