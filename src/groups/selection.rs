use super::{ConfigGroup, GroupStore};
use crate::error::{Result, SkipperError};

/// The group the pinned-then-first policy picks: the pinned group with the
/// latest pin time (store order breaks ties), else the first group.
pub fn preferred_group(store: &GroupStore) -> Option<&str> {
    let mut best: Option<(&str, i64)> = None;
    for (name, group) in store.iter().filter(|(_, group)| group.pinned) {
        let pinned_time = group.pinned_time.unwrap_or(0);
        match best {
            Some((_, best_time)) if best_time >= pinned_time => {}
            _ => best = Some((name, pinned_time)),
        }
    }

    best.map(|(name, _)| name).or_else(|| store.names().next())
}

/// Which group the shortcuts currently read their durations from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSelection {
    current: Option<String>,
}

impl ActiveSelection {
    pub fn from_store(store: &GroupStore) -> Self {
        let mut selection = Self::default();
        selection.apply_policy(store);
        selection
    }

    pub fn current_group_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Re-derive the selection from the store. Called on load and on every store change.
    pub fn apply_policy(&mut self, store: &GroupStore) -> Option<&str> {
        self.current = preferred_group(store).map(str::to_string);
        self.current.as_deref()
    }

    /// Explicit override from the settings UI. The name is not checked against the store.
    pub fn set_current(&mut self, name: Option<String>) {
        self.current = name;
    }

    /// The selected group's settings, or why there are none.
    pub fn resolve<'a>(&self, store: &'a GroupStore) -> Result<(&'a str, &'a ConfigGroup)> {
        let name = self.current.as_deref().ok_or_else(|| {
            SkipperError::InvalidConfiguration("no group selected".to_string())
        })?;
        store
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .ok_or_else(|| {
                SkipperError::InvalidConfiguration(format!("group {:?} is not in the store", name))
            })
    }
}
