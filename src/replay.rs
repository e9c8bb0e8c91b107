//! Timed event scenarios run against a fresh session.
//!
//! A scenario file is `{"page": <snapshot>, "storage"?: {"groups": ...},
//! "events": [{"atMs": n, "type": ..., ...}]}`. Events fire at their offset
//! from the start; the run ends once every scheduled retry and rescan is done.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::dom::{Page, PageSnapshot};
use crate::error::{Result, SkipperError};
use crate::groups::{GroupStore, StorageArea};
use crate::session::{PageEvent, Reply, Session, SessionStatus};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub page: PageSnapshot,
    /// Overrides the store file when present.
    #[serde(default)]
    pub storage: Option<StorageArea>,
    #[serde(default)]
    pub events: Vec<TimedEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedEvent {
    #[serde(default)]
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: PageEvent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub at_ms: u64,
    pub event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<Reply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub events: Vec<EventRecord>,
    #[serde(rename = "final")]
    pub status: SessionStatus,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SkipperError::Snapshot(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            SkipperError::Snapshot(format!("invalid scenario {}: {}", path.display(), e))
        })
    }
}

/// Run `scenario` to completion. `store` is used unless the scenario brings its own.
pub async fn replay(scenario: &Scenario, store: GroupStore, config: &Config) -> Result<ReplayReport> {
    let page = Page::from_snapshot(&scenario.page)?;
    let store = match &scenario.storage {
        Some(area) => area.groups.clone(),
        None => store,
    };
    let session = Session::new(page, store, config);
    let poller = session.spawn_poller();

    let mut timeline: Vec<&TimedEvent> = scenario.events.iter().collect();
    timeline.sort_by_key(|timed| timed.at_ms);

    let start = tokio::time::Instant::now();
    let mut events = Vec::with_capacity(timeline.len());
    for timed in timeline {
        tokio::time::sleep_until(start + Duration::from_millis(timed.at_ms)).await;
        tracing::debug!("+{}ms {}", timed.at_ms, timed.event.kind());

        let (reply, error) = match session.handle_event(timed.event.clone()).await {
            Ok(reply) => (Some(reply), None),
            Err(e) => {
                tracing::warn!("Event at +{}ms failed: {}", timed.at_ms, e);
                (None, Some(e.to_string()))
            }
        };
        events.push(EventRecord {
            at_ms: timed.at_ms,
            event: timed.event.kind(),
            reply,
            error,
        });
    }

    session.settle().await;
    poller.abort();

    Ok(ReplayReport {
        events,
        status: session.status().await,
    })
}
