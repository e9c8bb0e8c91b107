//! Page model the locator and skip engine run against.
//!
//! A [`Page`] owns the main document, the documents of its same-origin
//! frames and the player instances scripts have attached to elements.
//! Every accessor is best-effort: a missing node, property or document
//! comes back as `None` rather than an error, except where the host would
//! throw (cross-origin frames, rejected seeks).

mod document;
mod expando;
mod selector;
mod snapshot;

use std::collections::HashMap;

pub use document::{Document, Element, FrameContent, MediaState, NodeId};
pub use expando::{Expando, PlayerId, PlayerInstance};
pub use selector::SelectorList;
pub use snapshot::{DocumentSnapshot, FrameSnapshot, MediaSnapshot, NodeSnapshot, PageSnapshot};

use crate::error::{Result, SkipperError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub(crate) usize);

/// A node address valid across all documents of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub document: DocumentId,
    pub node: NodeId,
}

impl NodeRef {
    pub fn new(document: DocumentId, node: NodeId) -> Self {
        Self { document, node }
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    hostname: String,
    documents: Vec<Document>,
    players: Vec<PlayerInstance>,
    /// Snapshot-level names (`"ref"`) for nodes, used to wire properties and by callers.
    refs: HashMap<String, NodeRef>,
}

impl Page {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            documents: vec![Document::new()],
            players: Vec::new(),
            refs: HashMap::new(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn main_document(&self) -> DocumentId {
        DocumentId(0)
    }

    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(id.0)
    }

    pub fn document_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
        self.documents.get_mut(id.0)
    }

    pub fn add_document(&mut self) -> DocumentId {
        self.documents.push(Document::new());
        DocumentId(self.documents.len() - 1)
    }

    /// Root node of a document, usable as a query scope.
    pub fn root(&self, id: DocumentId) -> Option<NodeRef> {
        self.document(id).map(|doc| NodeRef::new(id, doc.root()))
    }

    pub fn element(&self, node: NodeRef) -> Option<&Element> {
        self.document(node.document)?.element(node.node)
    }

    pub fn element_mut(&mut self, node: NodeRef) -> Option<&mut Element> {
        self.document_mut(node.document)?.element_mut(node.node)
    }

    pub fn append_element(&mut self, parent: NodeRef, element: Element) -> Option<NodeRef> {
        let doc = self.document_mut(parent.document)?;
        let node = doc.append_element(parent.node, element);
        Some(NodeRef::new(parent.document, node))
    }

    pub fn attach_shadow(&mut self, host: NodeRef) -> Option<NodeRef> {
        let root = self.document_mut(host.document)?.attach_shadow(host.node)?;
        Some(NodeRef::new(host.document, root))
    }

    pub fn name_node(&mut self, name: &str, node: NodeRef) {
        self.refs.insert(name.to_string(), node);
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeRef> {
        self.refs.get(name).copied()
    }

    pub fn add_player(&mut self, player: PlayerInstance) -> PlayerId {
        self.players.push(player);
        PlayerId(self.players.len() - 1)
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerInstance> {
        self.players.get(id.0)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerInstance> {
        self.players.get_mut(id.0)
    }

    /// Light-tree elements of a document in document order.
    pub fn elements(&self, id: DocumentId) -> Vec<NodeRef> {
        self.document(id)
            .map(|doc| {
                doc.elements()
                    .into_iter()
                    .map(|node| NodeRef::new(id, node))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn query_selector(&self, scope: NodeRef, selector: &str) -> Result<Option<NodeRef>> {
        let selectors = SelectorList::parse(selector)?;
        Ok(self.query_parsed(scope, &selectors))
    }

    pub fn query_parsed(&self, scope: NodeRef, selectors: &SelectorList) -> Option<NodeRef> {
        let doc = self.document(scope.document)?;
        doc.query_selector(scope.node, selectors)
            .map(|node| NodeRef::new(scope.document, node))
    }

    pub fn query_selector_all(&self, scope: NodeRef, selector: &str) -> Result<Vec<NodeRef>> {
        let selectors = SelectorList::parse(selector)?;
        let Some(doc) = self.document(scope.document) else {
            return Ok(Vec::new());
        };
        Ok(doc
            .query_selector_all(scope.node, &selectors)
            .into_iter()
            .map(|node| NodeRef::new(scope.document, node))
            .collect())
    }

    pub fn closest(&self, node: NodeRef, selector: &str) -> Result<Option<NodeRef>> {
        let selectors = SelectorList::parse(selector)?;
        let Some(doc) = self.document(node.document) else {
            return Ok(None);
        };
        Ok(doc
            .closest(node.node, &selectors)
            .map(|found| NodeRef::new(node.document, found)))
    }

    pub fn shadow_root(&self, host: NodeRef) -> Option<NodeRef> {
        let root = self.document(host.document)?.shadow_root(host.node)?;
        Some(NodeRef::new(host.document, root))
    }

    /// Content document of an `<iframe>`.
    ///
    /// `Ok(None)` when the element is not a frame or has nothing loaded;
    /// `Err(CrossOriginDenied)` when the parent may not look inside.
    pub fn content_document(&self, frame: NodeRef) -> Result<Option<DocumentId>> {
        match self.element(frame).and_then(|el| el.frame.as_ref()) {
            Some(FrameContent::SameOrigin(id)) => Ok(Some(*id)),
            Some(FrameContent::CrossOrigin { src }) => Err(SkipperError::CrossOriginDenied(
                src.clone().unwrap_or_else(|| "<iframe>".to_string()),
            )),
            Some(FrameContent::Unloaded) | None => Ok(None),
        }
    }

    /// Walk a property path (`["__vue__", "video"]`) on an element.
    pub fn probe(&self, node: NodeRef, path: &[&str]) -> Option<&Expando> {
        let (first, rest) = path.split_first()?;
        let mut value = self.element(node)?.props.get(*first)?;
        for key in rest {
            value = value.get(key)?;
        }
        Some(value)
    }

    /// Snapshot name given to `node`, if any.
    pub fn name_of(&self, node: NodeRef) -> Option<&str> {
        self.refs
            .iter()
            .find(|(_, candidate)| **candidate == node)
            .map(|(name, _)| name.as_str())
    }

    /// Short CSS-like label such as `video#main.player-video`.
    pub fn describe(&self, node: NodeRef) -> String {
        let Some(element) = self.element(node) else {
            return format!("<detached {}:{}>", node.document.0, node.node.0);
        };
        let mut label = element.tag.clone();
        if let Some(id) = &element.id {
            label.push('#');
            label.push_str(id);
        }
        for class in &element.classes {
            label.push('.');
            label.push_str(class);
        }
        if node.document != self.main_document() {
            label.push_str(&format!(" (frame document {})", node.document.0));
        }
        label
    }

    pub fn current_time(&self, node: NodeRef) -> Option<f64> {
        self.element(node)?.media.as_ref().map(|m| m.current_time)
    }

    /// Native playback position write.
    pub fn set_current_time(&mut self, node: NodeRef, position: f64) -> Result<f64> {
        self.element_mut(node)
            .and_then(|el| el.media.as_mut())
            .ok_or_else(|| {
                SkipperError::NativeMutation("element has no playback state".to_string())
            })?
            .seek(position)
    }

    /// `player.currentTime` through the control surface.
    pub fn player_current_time(&self, id: PlayerId) -> Result<f64> {
        let video = self.live_player_video(id)?;
        self.current_time(video).ok_or_else(|| {
            SkipperError::ControlSurface("player video has no playback state".to_string())
        })
    }

    /// `player.seek = position` through the control surface.
    pub fn player_seek(&mut self, id: PlayerId, position: f64) -> Result<f64> {
        let video = self.live_player_video(id)?;
        self.set_current_time(video, position)
            .map_err(|e| SkipperError::ControlSurface(e.to_string()))
    }

    fn live_player_video(&self, id: PlayerId) -> Result<NodeRef> {
        let player = self
            .player(id)
            .ok_or_else(|| SkipperError::ControlSurface("unknown player instance".to_string()))?;
        if player.broken {
            return Err(SkipperError::ControlSurface(
                "player threw while handling the call".to_string(),
            ));
        }
        player
            .video
            .ok_or_else(|| SkipperError::ControlSurface("player has no video bound".to_string()))
    }
}
