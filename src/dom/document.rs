//! Arena-backed document tree. Shadow roots live in the same arena as
//! detached fragments hanging off their host element.

use std::collections::BTreeMap;

use super::expando::Expando;
use super::selector::SelectorList;
use super::DocumentId;
use crate::error::{Result, SkipperError};

/// Index of a node inside one [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Document,
    /// Fragment root of a shadow tree. Not a child of its host in the light tree.
    ShadowRoot,
    Element(Element),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

/// What an `<iframe>` element exposes to scripts running in the parent document.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameContent {
    SameOrigin(DocumentId),
    CrossOrigin { src: Option<String> },
    /// Frame exists but has no content document yet.
    Unloaded,
}

/// Playback state of a media element.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaState {
    pub current_time: f64,
    pub duration: Option<f64>,
    /// A locked element rejects every position write.
    pub locked: bool,
}

impl MediaState {
    pub fn new(current_time: f64) -> Self {
        Self {
            current_time,
            duration: None,
            locked: false,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Move the playback position, clamped to `[0, duration]`.
    pub fn seek(&mut self, position: f64) -> Result<f64> {
        if self.locked {
            return Err(SkipperError::NativeMutation(
                "media element rejected the position write".to_string(),
            ));
        }
        if !position.is_finite() {
            return Err(SkipperError::NativeMutation(format!(
                "non-finite position {}",
                position
            )));
        }

        let mut clamped = position.max(0.0);
        if let Some(duration) = self.duration {
            clamped = clamped.min(duration);
        }
        self.current_time = clamped;
        Ok(clamped)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    pub shadow_root: Option<NodeId>,
    pub frame: Option<FrameContent>,
    pub media: Option<MediaState>,
    pub props: BTreeMap<String, Expando>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class_attr: &str) -> Self {
        self.classes = class_attr.split_whitespace().map(str::to_string).collect();
        self
    }

    pub fn with_media(mut self, media: MediaState) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_prop(mut self, name: &str, value: Expando) -> Self {
        self.props.insert(name.to_string(), value);
        self
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.classes.iter().any(|c| c == class_name)
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Attribute lookup; `class` and `id` are served from their dedicated fields.
    pub fn attr(&self, name: &str) -> Option<String> {
        match name {
            "class" if !self.classes.is_empty() => Some(self.classes.join(" ")),
            "id" => self.id.clone(),
            _ => self.attrs.get(name).cloned(),
        }
    }
}

/// Arena holding one document tree plus the shadow trees attached to it.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            kind,
        });
        id
    }

    /// Append `element` as the last child of `parent` (an element, shadow root or the document).
    pub fn append_element(&mut self, parent: NodeId, element: Element) -> NodeId {
        let id = self.push(Some(parent), NodeKind::Element(element));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Attach (or return the existing) shadow root of `host`.
    pub fn attach_shadow(&mut self, host: NodeId) -> Option<NodeId> {
        if let Some(existing) = self.element(host)?.shadow_root {
            return Some(existing);
        }
        let root = self.push(None, NodeKind::ShadowRoot);
        if let Some(element) = self.element_mut(host) {
            element.shadow_root = Some(root);
        }
        Some(root)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.element(host)?.shadow_root
    }

    /// Light-tree element descendants of `scope` in document order, `scope` excluded.
    /// Shadow trees are not entered.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.element(id).is_some() {
                out.push(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Every element of the light tree.
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(self.root)
    }

    pub fn query_selector_all(&self, scope: NodeId, selectors: &SelectorList) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|id| selectors.matches(self, *id))
            .collect()
    }

    pub fn query_selector(&self, scope: NodeId, selectors: &SelectorList) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|id| selectors.matches(self, *id))
    }

    /// Nearest inclusive ancestor matching `selectors`, stopping at a shadow boundary.
    pub fn closest(&self, id: NodeId, selectors: &SelectorList) -> Option<NodeId> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if selectors.matches(self, current) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.append_element(doc.root(), Element::new("BODY"));
        let wrapper = doc.append_element(body, Element::new("div").with_class("player main"));
        let video = doc.append_element(wrapper, Element::new("video"));
        (doc, body, wrapper, video)
    }

    #[test]
    fn descendants_are_in_document_order() {
        let (mut doc, body, wrapper, video) = sample();
        let sibling = doc.append_element(body, Element::new("p"));

        assert_eq!(doc.elements(), vec![body, wrapper, video, sibling]);
        assert_eq!(doc.element(body).unwrap().tag, "body");
    }

    #[test]
    fn shadow_tree_is_not_part_of_the_light_tree() {
        let (mut doc, body, wrapper, _) = sample();
        let root = doc.attach_shadow(wrapper).unwrap();
        let hidden = doc.append_element(root, Element::new("video"));

        assert!(!doc.descendants(body).contains(&hidden));
        assert_eq!(doc.attach_shadow(wrapper), Some(root));
    }

    #[test]
    fn closest_walks_up_to_matching_ancestor() {
        let (doc, _, wrapper, video) = sample();
        let selectors: SelectorList = ".player".parse().unwrap();

        assert_eq!(doc.closest(video, &selectors), Some(wrapper));
        assert_eq!(doc.closest(doc.root(), &selectors), None);
    }

    #[test]
    fn media_seek_clamps_and_respects_lock() {
        let mut media = MediaState::new(10.0).with_duration(100.0);
        assert_eq!(media.seek(250.0).unwrap(), 100.0);
        assert_eq!(media.seek(-5.0).unwrap(), 0.0);

        media.locked = true;
        assert!(matches!(
            media.seek(20.0),
            Err(SkipperError::NativeMutation(_))
        ));
        assert_eq!(media.current_time, 0.0);
    }

    #[test]
    fn class_attribute_is_synthesized() {
        let element = Element::new("div").with_class("a  b").with_id("x");
        assert_eq!(element.attr("class").as_deref(), Some("a b"));
        assert_eq!(element.attr("id").as_deref(), Some("x"));
        assert_eq!(element.attr("data-missing"), None);
    }
}
