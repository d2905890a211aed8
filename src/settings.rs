//! User settings document (currently just the selected location).

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{resolve_location, Location};
use crate::storage::KvStore;

pub const SETTINGS_KEY: &str = "dagens_vibe_settings";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
}

pub struct SettingsStore {
    store: Arc<dyn KvStore>,
    write_lock: Mutex<()>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Missing or corrupt documents read as defaults.
    pub fn get(&self) -> Settings {
        self.store
            .get(SETTINGS_KEY)
            .and_then(|raw| match serde_json::from_str::<Option<Settings>>(&raw) {
                Ok(s) => s,
                Err(e) => {
                    tracing::debug!(target: "settings", error = %e, "settings document corrupt, using defaults");
                    None
                }
            })
            .unwrap_or_default()
    }

    /// Merge `patch` into the stored document; only fields set in `patch`
    /// change, and keys this version does not know about are kept.
    pub fn save(&self, patch: Settings) -> Result<Settings> {
        let _guard = self.write_lock.lock().expect("settings mutex poisoned");
        let mut doc = self.raw_document();
        if let Value::Object(fields) = serde_json::to_value(&patch).context("serializing settings")? {
            doc.extend(fields);
        }
        let doc = Value::Object(doc);
        let raw = serde_json::to_string(&doc).context("serializing settings")?;
        self.store
            .set(SETTINGS_KEY, &raw)
            .context("persisting settings")?;
        Ok(serde_json::from_value(doc).unwrap_or_default())
    }

    fn raw_document(&self) -> Map<String, Value> {
        match self
            .store
            .get(SETTINGS_KEY)
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
        {
            Some(Value::Object(fields)) => fields,
            _ => Map::new(),
        }
    }

    /// Stored location, or the default if unset or unknown.
    pub fn location(&self) -> Location {
        resolve_location(self.get().location_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn defaults_and_merge() {
        let mem = Arc::new(MemoryStore::new());
        let s = SettingsStore::new(mem.clone());
        assert_eq!(s.location().id, "NO1");

        s.save(Settings {
            location_id: Some("NO3".into()),
        })
        .unwrap();
        assert_eq!(s.location().name, "Trondheim");

        // empty patch keeps existing values
        s.save(Settings::default()).unwrap();
        assert_eq!(s.get().location_id.as_deref(), Some("NO3"));
    }

    #[test]
    fn save_keeps_unknown_keys() {
        let mem = Arc::new(MemoryStore::new());
        let s = SettingsStore::new(mem.clone());
        mem.set(SETTINGS_KEY, r#"{"theme":"dark","locationId":"NO2"}"#)
            .unwrap();

        let merged = s
            .save(Settings {
                location_id: Some("NO5".into()),
            })
            .unwrap();
        assert_eq!(merged.location_id.as_deref(), Some("NO5"));

        let raw: Value = serde_json::from_str(&mem.get(SETTINGS_KEY).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw["locationId"], "NO5");
    }

    #[test]
    fn corrupt_or_unknown_falls_back() {
        let mem = Arc::new(MemoryStore::new());
        let s = SettingsStore::new(mem.clone());
        mem.set(SETTINGS_KEY, "][").unwrap();
        assert_eq!(s.get(), Settings::default());
        mem.set(SETTINGS_KEY, r#"{"locationId":"SE3"}"#).unwrap();
        assert_eq!(s.location().id, "NO1");
    }
}
