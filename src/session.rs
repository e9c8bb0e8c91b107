//! The context object tying store, selection, locator and engine to one page.
//!
//! All mutable state sits behind a single lock that is released before every
//! sleep. Locate retries, delayed observer rescans and the periodic poll run
//! as spawned tasks on the current runtime. Overlapping chains are neither
//! cancelled nor coalesced: whichever finishes last wins the cache and the
//! undo slot.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::{Config, RetryConfig, WatchConfig};
use crate::dispatcher::ShortcutAction;
use crate::dom::{NodeSnapshot, Page};
use crate::engine::{SeekOutcome, SkipEngine};
use crate::error::{Result, SkipperError};
use crate::groups::{ActiveSelection, GroupStore, SkipSlot};
use crate::locator::VideoLocator;

/// Everything a skip or undo reads or writes.
#[derive(Debug)]
pub struct SkipperState {
    pub page: Page,
    pub store: GroupStore,
    pub selection: ActiveSelection,
    pub locator: VideoLocator,
    pub engine: SkipEngine,
}

/// One event from the page side, as sent by the extension.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PageEvent {
    Keydown {
        key: String,
    },
    /// `groups` absent: some other key changed. `null`: the groups were removed.
    StorageChanged {
        #[serde(default, deserialize_with = "present_store")]
        groups: Option<GroupStore>,
    },
    Message(RuntimeMessage),
    NodesAdded {
        /// Selector in the main document; the document root when absent.
        #[serde(default)]
        parent: Option<String>,
        nodes: Vec<NodeSnapshot>,
    },
    Status,
}

impl PageEvent {
    /// The `type` tag this event arrived with.
    pub fn kind(&self) -> &'static str {
        match self {
            PageEvent::Keydown { .. } => "keydown",
            PageEvent::StorageChanged { .. } => "storageChanged",
            PageEvent::Message(_) => "message",
            PageEvent::NodesAdded { .. } => "nodesAdded",
            PageEvent::Status => "status",
        }
    }
}

/// Runtime messages from the settings UI.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RuntimeMessage {
    UpdateCurrentGroup {
        #[serde(default)]
        group: Option<String>,
    },
}

fn present_store<'de, D>(deserializer: D) -> std::result::Result<Option<GroupStore>, D::Error>
where
    D: Deserializer<'de>,
{
    GroupStore::deserialize(deserializer).map(Some)
}

/// Reply to a handled event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Reply {
    Ack,
    Status(SessionStatus),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub hostname: String,
    pub active_group: Option<String>,
    /// Label of the cached video element.
    pub video: Option<String>,
    pub position: Option<f64>,
    pub undo_position: Option<f64>,
    pub groups: usize,
}

#[derive(Debug, Clone, Copy)]
enum ChainAction {
    Skip(f64),
    Undo,
}

#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SkipperState>>,
    retry: RetryConfig,
    watch: WatchConfig,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Session {
    pub fn new(page: Page, store: GroupStore, config: &Config) -> Self {
        let selection = ActiveSelection::from_store(&store);
        tracing::debug!(
            "Session for {} starts with group {:?}",
            page.hostname(),
            selection.current_group_name()
        );

        Self {
            state: Arc::new(Mutex::new(SkipperState {
                page,
                store,
                selection,
                locator: VideoLocator::new(),
                engine: SkipEngine::new(),
            })),
            retry: config.retry.clone(),
            watch: config.watch.clone(),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Apply one page event. Engine-side problems are logged, not returned;
    /// only malformed events come back as errors.
    pub async fn handle_event(&self, event: PageEvent) -> Result<Reply> {
        match event {
            PageEvent::Keydown { key } => {
                self.key_down(&key).await;
            }
            PageEvent::StorageChanged { groups: Some(store) } => {
                self.store_changed(store).await;
            }
            PageEvent::StorageChanged { groups: None } => {
                tracing::debug!("Storage change without groups, ignored");
            }
            PageEvent::Message(RuntimeMessage::UpdateCurrentGroup { group }) => {
                self.set_active_group(group).await;
            }
            PageEvent::NodesAdded { parent, nodes } => {
                self.nodes_inserted(parent.as_deref(), &nodes).await?;
            }
            PageEvent::Status => return Ok(Reply::Status(self.status().await)),
        }
        Ok(Reply::Ack)
    }

    /// Dispatch a key press. Returns the action it mapped to, if any.
    pub async fn key_down(&self, key: &str) -> Option<ShortcutAction> {
        let action = ShortcutAction::from_key(key)?;
        tracing::debug!("Key {:?} -> {}", key, action);

        match action {
            ShortcutAction::Skip(slot) => {
                if let Err(e) = self.skip(slot).await {
                    tracing::info!("Skip ignored: {}", e);
                }
            }
            ShortcutAction::Undo => self.undo().await,
        }
        Some(action)
    }

    /// Skip by the active group's duration for `slot`.
    ///
    /// Configuration problems short-circuit before any locate attempt. The
    /// first attempt runs immediately; later ones are scheduled.
    pub async fn skip(&self, slot: SkipSlot) -> Result<()> {
        let seconds = {
            let state = self.state.lock().await;
            let (name, group) = state.selection.resolve(&state.store)?;
            let seconds = group.duration(slot);
            if seconds <= 0.0 {
                return Err(SkipperError::InvalidConfiguration(format!(
                    "{} of group {:?} is {}",
                    slot, name, seconds
                )));
            }
            seconds
        };

        self.run_chain(ChainAction::Skip(seconds)).await;
        Ok(())
    }

    /// Restore the position recorded by the last skip. No-op without one.
    pub async fn undo(&self) {
        if !self.state.lock().await.engine.can_undo() {
            tracing::info!("Nothing to undo");
            return;
        }
        self.run_chain(ChainAction::Undo).await;
    }

    async fn run_chain(&self, action: ChainAction) {
        if self.attempt(action).await {
            return;
        }
        if self.retry.max_attempts <= 1 {
            tracing::info!("{}", SkipperError::VideoNotFound(self.retry.max_attempts));
            return;
        }

        let session = self.clone();
        let handle = tokio::spawn(async move {
            for attempt in 2..=session.retry.max_attempts {
                tokio::time::sleep(session.retry.interval()).await;
                tracing::debug!("Locate attempt {}/{}", attempt, session.retry.max_attempts);
                if session.attempt(action).await {
                    return;
                }
            }
            tracing::info!("{}", SkipperError::VideoNotFound(session.retry.max_attempts));
        });
        self.track(handle).await;
    }

    /// One locate-and-apply pass. Returns whether a video was found.
    async fn attempt(&self, action: ChainAction) -> bool {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let Some(handle) = state.locator.locate(&state.page) else {
            return false;
        };

        let outcome = match action {
            ChainAction::Skip(seconds) => state.engine.skip(&mut state.page, &handle, seconds),
            ChainAction::Undo => state.engine.undo(&mut state.page, &handle),
        };
        if let SeekOutcome::Applied { via, position } = outcome {
            tracing::info!("{:?} applied via {:?}, now at {}s", action, via, position);
        }
        true
    }

    /// Replace the store wholesale and re-run the selection policy.
    pub async fn store_changed(&self, store: GroupStore) {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.store = store;
        let selected = state.selection.apply_policy(&state.store);
        tracing::info!("Groups reloaded, active group {:?}", selected);
    }

    /// Explicit group choice from the settings UI; not checked against the store.
    pub async fn set_active_group(&self, group: Option<String>) {
        tracing::info!("Active group set to {:?}", group);
        self.state.lock().await.selection.set_current(group);
    }

    /// Insert nodes into the page and run the mutation observer over them.
    /// Returns the number of delayed rescans scheduled.
    pub async fn nodes_inserted(
        &self,
        parent: Option<&str>,
        nodes: &[NodeSnapshot],
    ) -> Result<usize> {
        let rescans = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let root = state
                .page
                .root(state.page.main_document())
                .ok_or_else(|| SkipperError::Snapshot("page has no main document".to_string()))?;
            let parent_node = match parent {
                Some(selector) => state.page.query_selector(root, selector)?.ok_or_else(|| {
                    SkipperError::Snapshot(format!("no insertion parent matches {:?}", selector))
                })?,
                None => root,
            };

            let inserted = state.page.insert_snapshot(parent_node, nodes)?;
            state.locator.observe_insertions(&state.page, &inserted)
        };

        for _ in 0..rescans {
            let session = self.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(session.watch.rescan_delay()).await;
                let mut guard = session.state.lock().await;
                let state = &mut *guard;
                state.locator.locate(&state.page);
            });
            self.track(handle).await;
        }
        if rescans > 0 {
            tracing::debug!("Scheduled {} player rescans", rescans);
        }
        Ok(rescans)
    }

    /// Start the periodic search that runs while no video is cached.
    /// The task runs until aborted.
    pub fn spawn_poller(&self) -> JoinHandle<()> {
        let session = self.clone();
        let period = self.watch.poll_interval();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticks.tick().await;
                let mut guard = session.state.lock().await;
                let state = &mut *guard;
                if state.locator.cached().is_none() {
                    tracing::debug!("Periodic video search");
                    state.locator.locate(&state.page);
                }
            }
        })
    }

    /// Wait for every scheduled retry and rescan, including ones they schedule.
    pub async fn settle(&self) {
        loop {
            let pending: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock().await);
            if pending.is_empty() {
                return;
            }
            for handle in pending {
                if let Err(e) = handle.await {
                    tracing::warn!("Scheduled task failed: {}", e);
                }
            }
        }
    }

    pub async fn status(&self) -> SessionStatus {
        let state = self.state.lock().await;
        let video = state.locator.cached().map(|handle| handle.video);
        SessionStatus {
            hostname: state.page.hostname().to_string(),
            active_group: state.selection.current_group_name().map(str::to_string),
            video: video.map(|node| state.page.describe(node)),
            position: video.and_then(|node| state.page.current_time(node)),
            undo_position: state.engine.last_position(),
            groups: state.store.len(),
        }
    }

    /// Run `f` against the locked state.
    pub async fn inspect<R>(&self, f: impl FnOnce(&mut SkipperState) -> R) -> R {
        let mut state = self.state.lock().await;
        f(&mut state)
    }

    async fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::ConfigGroup;

    #[test]
    fn parses_page_events() {
        let event: PageEvent = serde_json::from_str(r#"{"type": "keydown", "key": "["}"#).unwrap();
        assert!(matches!(event, PageEvent::Keydown { key } if key == "["));

        let event: PageEvent = serde_json::from_str(
            r#"{"type": "message", "action": "updateCurrentGroup", "group": "News"}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            PageEvent::Message(RuntimeMessage::UpdateCurrentGroup { group: Some(g) }) if g == "News"
        ));

        let event: PageEvent =
            serde_json::from_str(r#"{"type": "nodesAdded", "nodes": [{"tag": "video"}]}"#).unwrap();
        assert!(matches!(event, PageEvent::NodesAdded { parent: None, nodes } if nodes.len() == 1));

        assert!(serde_json::from_str::<PageEvent>(r#"{"type": "scroll"}"#).is_err());
    }

    #[test]
    fn storage_change_distinguishes_missing_and_null_groups() {
        let event: PageEvent = serde_json::from_str(r#"{"type": "storageChanged"}"#).unwrap();
        assert!(matches!(event, PageEvent::StorageChanged { groups: None }));

        let event: PageEvent =
            serde_json::from_str(r#"{"type": "storageChanged", "groups": null}"#).unwrap();
        assert!(matches!(event, PageEvent::StorageChanged { groups: Some(store) } if store.is_empty()));

        let event: PageEvent = serde_json::from_str(
            r#"{"type": "storageChanged", "groups": {"B": {"skip1": 5}, "A": {"skip1": 6}}}"#,
        )
        .unwrap();
        let PageEvent::StorageChanged { groups: Some(store) } = event else {
            panic!("expected groups");
        };
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["B", "A"]);
    }

    #[test]
    fn replies_serialize_with_type_tag() {
        assert_eq!(serde_json::to_value(Reply::Ack).unwrap(), serde_json::json!({"type": "ack"}));

        let status = Reply::Status(SessionStatus {
            hostname: "example.com".to_string(),
            active_group: Some("Drama".to_string()),
            video: None,
            position: None,
            undo_position: Some(12.0),
            groups: 2,
        });
        let value = serde_json::to_value(status).unwrap();
        assert_eq!(value["type"], "status");
        assert_eq!(value["activeGroup"], "Drama");
        assert_eq!(value["undoPosition"], 12.0);
    }

    #[tokio::test]
    async fn invalid_configuration_short_circuits_before_locating() {
        let store = GroupStore::new().with("Drama", ConfigGroup::new(90.0, 0.0));
        let session = Session::new(Page::new("example.com"), store, &Config::default());

        assert!(matches!(
            session.skip(SkipSlot::Second).await,
            Err(SkipperError::InvalidConfiguration(_))
        ));
        session.set_active_group(Some("Missing".to_string())).await;
        assert!(matches!(
            session.skip(SkipSlot::First).await,
            Err(SkipperError::InvalidConfiguration(_))
        ));
        // no chain was scheduled
        assert!(session.tasks.lock().await.is_empty());
    }
}
