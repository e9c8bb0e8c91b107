use std::fmt;

use serde::Serialize;

use crate::groups::SkipSlot;

/// What a recognised key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutAction {
    Skip(SkipSlot),
    Undo,
}

impl ShortcutAction {
    /// `[` and `]` skip by the group's first and second duration, `\` undoes.
    /// Matching is on the produced key only; modifiers are not consulted.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "[" => Some(ShortcutAction::Skip(SkipSlot::First)),
            "]" => Some(ShortcutAction::Skip(SkipSlot::Second)),
            "\\" => Some(ShortcutAction::Undo),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            ShortcutAction::Skip(SkipSlot::First) => "[",
            ShortcutAction::Skip(SkipSlot::Second) => "]",
            ShortcutAction::Undo => "\\",
        }
    }
}

impl fmt::Display for ShortcutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortcutAction::Skip(slot) => write!(f, "skip ({})", slot),
            ShortcutAction::Undo => write!(f, "undo"),
        }
    }
}
