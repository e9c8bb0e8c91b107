//! JSON page snapshots.
//!
//! Property values are plain JSON with three escapes:
//! `{"$ref": "name"}` points at the node carrying `"ref": "name"`,
//! `{"$fn": true}` marks a callable, and
//! `{"$player": {"video": "name", "broken": false}}` creates a player instance.
//! References are resolved after the whole tree is built, so they may point
//! forward or into frames.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::document::{Element, FrameContent, MediaState};
use super::expando::{Expando, PlayerInstance};
use super::{DocumentId, NodeRef, Page};
use crate::error::{Result, SkipperError};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub hostname: String,
    #[serde(default)]
    pub document: DocumentSnapshot,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentSnapshot {
    #[serde(default)]
    pub children: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeSnapshot>,
    /// Children of an attached shadow root.
    #[serde(default)]
    pub shadow: Option<Vec<NodeSnapshot>>,
    #[serde(default)]
    pub frame: Option<FrameSnapshot>,
    #[serde(default)]
    pub media: Option<MediaSnapshot>,
    #[serde(default)]
    pub props: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    #[serde(default)]
    pub cross_origin: bool,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub document: Option<DocumentSnapshot>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSnapshot {
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub locked: bool,
}

impl NodeSnapshot {
    /// Check the whole subtree, including shadow and frame content.
    fn check(&self) -> Result<()> {
        if self.tag.trim().is_empty() {
            return Err(SkipperError::Snapshot("node without a tag".to_string()));
        }
        let frame_children = self
            .frame
            .as_ref()
            .filter(|frame| !frame.cross_origin)
            .and_then(|frame| frame.document.as_ref())
            .map(|document| document.children.as_slice())
            .unwrap_or_default();
        self.children
            .iter()
            .chain(self.shadow.iter().flatten())
            .chain(frame_children)
            .try_for_each(NodeSnapshot::check)
    }
}

impl From<&MediaSnapshot> for MediaState {
    fn from(snapshot: &MediaSnapshot) -> Self {
        MediaState {
            current_time: snapshot.current_time,
            duration: snapshot.duration,
            locked: snapshot.locked,
        }
    }
}

impl Page {
    pub fn from_snapshot(snapshot: &PageSnapshot) -> Result<Page> {
        let mut page = Page::new(snapshot.hostname.trim().to_ascii_lowercase());
        let root = page
            .root(page.main_document())
            .ok_or_else(|| SkipperError::Snapshot("page has no main document".to_string()))?;
        page.insert_snapshot(root, &snapshot.document.children)?;
        Ok(page)
    }

    pub fn load_snapshot(path: &Path) -> Result<Page> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SkipperError::Snapshot(format!("cannot read {}: {}", path.display(), e))
        })?;
        let snapshot: PageSnapshot = serde_json::from_str(&content)?;
        Page::from_snapshot(&snapshot)
    }

    /// Append snapshot nodes under `parent`, returning the inserted top-level nodes.
    pub fn insert_snapshot(
        &mut self,
        parent: NodeRef,
        nodes: &[NodeSnapshot],
    ) -> Result<Vec<NodeRef>> {
        if self.document(parent.document).is_none() {
            return Err(SkipperError::Snapshot(
                "insertion parent belongs to no document".to_string(),
            ));
        }

        // Reject the batch before touching the tree.
        for node in nodes {
            node.check()?;
        }

        let mut pending = Vec::new();
        let mut inserted = Vec::with_capacity(nodes.len());
        for node in nodes {
            inserted.push(self.build_node(parent, node, &mut pending)?);
        }

        for (node, props) in pending {
            let resolved: BTreeMap<String, Expando> = props
                .iter()
                .map(|(key, value)| (key.clone(), self.to_expando(value)))
                .collect();
            if let Some(element) = self.element_mut(node) {
                element.props.extend(resolved);
            }
        }

        Ok(inserted)
    }

    fn build_node(
        &mut self,
        parent: NodeRef,
        snapshot: &NodeSnapshot,
        pending: &mut Vec<(NodeRef, BTreeMap<String, Value>)>,
    ) -> Result<NodeRef> {
        let tag = snapshot.tag.trim();
        let mut element = Element::new(tag);
        element.id = snapshot.id.clone();
        if let Some(class_attr) = &snapshot.class {
            element = element.with_class(class_attr);
        }
        element.attrs = snapshot.attrs.clone();
        element.media = snapshot.media.as_ref().map(MediaState::from);

        let node = self
            .append_element(parent, element)
            .ok_or_else(|| SkipperError::Snapshot("parent node vanished".to_string()))?;
        if let Some(name) = &snapshot.reference {
            self.name_node(name, node);
        }

        for child in &snapshot.children {
            self.build_node(node, child, pending)?;
        }

        if let Some(shadow_children) = &snapshot.shadow {
            let shadow_root = self.attach_shadow(node).ok_or_else(|| {
                SkipperError::Snapshot(format!("<{}> cannot host a shadow root", tag))
            })?;
            for child in shadow_children {
                self.build_node(shadow_root, child, pending)?;
            }
        }

        if let Some(frame) = &snapshot.frame {
            let content = self.build_frame(frame, pending)?;
            if let Some(element) = self.element_mut(node) {
                element.frame = Some(content);
            }
        }

        if !snapshot.props.is_empty() {
            pending.push((node, snapshot.props.clone()));
        }
        Ok(node)
    }

    fn build_frame(
        &mut self,
        frame: &FrameSnapshot,
        pending: &mut Vec<(NodeRef, BTreeMap<String, Value>)>,
    ) -> Result<FrameContent> {
        if frame.cross_origin {
            return Ok(FrameContent::CrossOrigin {
                src: frame.src.clone(),
            });
        }
        let Some(document) = &frame.document else {
            return Ok(FrameContent::Unloaded);
        };

        let id: DocumentId = self.add_document();
        let root = self
            .root(id)
            .ok_or_else(|| SkipperError::Snapshot("frame document missing".to_string()))?;
        for child in &document.children {
            self.build_node(root, child, pending)?;
        }
        Ok(FrameContent::SameOrigin(id))
    }

    fn to_expando(&mut self, value: &Value) -> Expando {
        match value {
            Value::Null => Expando::Null,
            Value::Bool(b) => Expando::Bool(*b),
            Value::Number(n) => Expando::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Expando::Text(s.clone()),
            Value::Array(items) => Expando::Object(
                items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| (idx.to_string(), self.to_expando(item)))
                    .collect(),
            ),
            Value::Object(fields) => {
                if let Some(name) = fields.get("$ref").and_then(Value::as_str) {
                    return self
                        .node_by_name(name)
                        .map(Expando::Element)
                        .unwrap_or(Expando::Null);
                }
                if fields.contains_key("$fn") {
                    return Expando::Function;
                }
                if let Some(player) = fields.get("$player") {
                    let video = player
                        .get("video")
                        .and_then(Value::as_str)
                        .and_then(|name| self.node_by_name(name));
                    let broken = player.get("broken").and_then(Value::as_bool).unwrap_or(false);
                    let id = self.add_player(PlayerInstance { video, broken });
                    return Expando::Player(id);
                }
                Expando::Object(
                    fields
                        .iter()
                        .map(|(key, item)| (key.clone(), self.to_expando(item)))
                        .collect(),
                )
            }
        }
    }
}
