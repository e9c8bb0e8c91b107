use std::collections::BTreeMap;

use super::NodeRef;

/// Index into the page's table of third-party player instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerId(pub(crate) usize);

/// An untyped own property hanging off an element, the way player widgets
/// stash back-references (`el.art`, `el.__vue__`, `el.player`) on their hosts.
#[derive(Debug, Clone, PartialEq)]
pub enum Expando {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Opaque callable; only its presence is observable.
    Function,
    Element(NodeRef),
    Player(PlayerId),
    Object(BTreeMap<String, Expando>),
}

impl Expando {
    pub fn get(&self, key: &str) -> Option<&Expando> {
        match self {
            Expando::Object(fields) => fields.get(key),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<NodeRef> {
        match self {
            Expando::Element(node) => Some(*node),
            _ => None,
        }
    }

    pub fn as_player(&self) -> Option<PlayerId> {
        match self {
            Expando::Player(id) => Some(*id),
            _ => None,
        }
    }

    /// Script truthiness: what `if (el.prop)` would see.
    pub fn is_truthy(&self) -> bool {
        match self {
            Expando::Null => false,
            Expando::Bool(b) => *b,
            Expando::Number(n) => *n != 0.0 && !n.is_nan(),
            Expando::Text(s) => !s.is_empty(),
            Expando::Function | Expando::Element(_) | Expando::Player(_) | Expando::Object(_) => {
                true
            }
        }
    }
}

/// A player widget's control surface: a `currentTime` getter and a `seek`
/// setter that drive the bound video element.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInstance {
    pub video: Option<NodeRef>,
    /// Every call on a broken player throws.
    pub broken: bool,
}

impl PlayerInstance {
    pub fn new(video: Option<NodeRef>) -> Self {
        Self {
            video,
            broken: false,
        }
    }
}
