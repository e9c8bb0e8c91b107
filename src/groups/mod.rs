//! Skip-duration groups as kept by the extension's settings store.
//!
//! The store is `{"groups": {<name>: {"skip1", "skip2", "pinned", "pinnedTime"}}}`.
//! The core only ever reads it; the settings UI owns writes.

mod selection;

pub use selection::{preferred_group, ActiveSelection};

use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SkipperError};

/// Which of the two per-group durations a shortcut uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipSlot {
    First,
    Second,
}

impl fmt::Display for SkipSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipSlot::First => write!(f, "skip1"),
            SkipSlot::Second => write!(f, "skip2"),
        }
    }
}

/// One named skip profile. Durations are seconds; zero or less disables the slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigGroup {
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub skip1: f64,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub skip2: f64,
    #[serde(default)]
    pub pinned: bool,
    /// Epoch millis of the last pin; only meaningful while pinned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_time: Option<i64>,
}

/// A blank duration field is saved as `null`; anything that is not a number
/// disables the slot instead of rejecting the whole store.
fn lenient_seconds<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<f64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().unwrap_or(0.0))
}

impl ConfigGroup {
    pub fn new(skip1: f64, skip2: f64) -> Self {
        Self {
            skip1,
            skip2,
            ..Default::default()
        }
    }

    pub fn pinned_at(mut self, pinned_time: i64) -> Self {
        self.pinned = true;
        self.pinned_time = Some(pinned_time);
        self
    }

    pub fn duration(&self, slot: SkipSlot) -> f64 {
        match slot {
            SkipSlot::First => self.skip1,
            SkipSlot::Second => self.skip2,
        }
    }

    fn normalized(mut self) -> Self {
        if !self.pinned {
            self.pinned_time = None;
        }
        self
    }
}

/// Groups in the order the store lists them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupStore {
    entries: Vec<(String, ConfigGroup)>,
}

impl GroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced group keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, group: ConfigGroup) {
        let name = name.into();
        let group = group.normalized();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = group,
            None => self.entries.push((name, group)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, group: ConfigGroup) -> Self {
        self.insert(name, group);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ConfigGroup> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, group)| group)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigGroup)> {
        self.entries.iter().map(|(name, group)| (name.as_str(), group))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read the storage area file. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Group store {} not found, starting empty", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let area: StorageArea = serde_json::from_str(&content).map_err(|e| {
            SkipperError::InvalidConfiguration(format!(
                "cannot parse group store {}: {}",
                path.display(),
                e
            ))
        })?;
        tracing::debug!(
            "Loaded {} group(s) from {}",
            area.groups.len(),
            path.display()
        );
        Ok(area.groups)
    }
}

impl Serialize for GroupStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, group) in &self.entries {
            map.serialize_entry(name, group)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for GroupStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct StoreVisitor;

        impl<'de> Visitor<'de> for StoreVisitor {
            type Value = GroupStore;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of group name to skip settings")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<GroupStore, A::Error> {
                let mut store = GroupStore::default();
                while let Some((name, group)) = map.next_entry::<String, ConfigGroup>()? {
                    store.insert(name, group);
                }
                Ok(store)
            }

            fn visit_unit<E>(self) -> std::result::Result<GroupStore, E> {
                Ok(GroupStore::default())
            }

            fn visit_none<E>(self) -> std::result::Result<GroupStore, E> {
                Ok(GroupStore::default())
            }
        }

        deserializer.deserialize_any(StoreVisitor)
    }
}

/// The `chrome.storage.local` area as persisted by the settings UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageArea {
    #[serde(default)]
    pub groups: GroupStore,
}
