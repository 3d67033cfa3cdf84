//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `KeyAction`s. `cmd` is Ctrl on
//! most platforms and ⌘ on macOS; either is accepted.

use crate::input::Modifiers;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Cancel the active gesture, or clear the selection when idle.
    Cancel,
    /// Remove selected deletable nodes and edges.
    Delete,
    SelectAll,
    ZoomIn,
    ZoomOut,
    FitView,
}

pub struct KeyMap;

impl KeyMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"a"`, `"Delete"`).
    /// Returns `None` if the combo has no binding.
    pub fn resolve(key: &str, modifiers: Modifiers) -> Option<KeyAction> {
        // ── Modifier combos first (most specific) ──
        if modifiers.cmd() {
            return match key {
                "a" | "A" => Some(KeyAction::SelectAll),
                "=" | "+" => Some(KeyAction::ZoomIn),
                "-" => Some(KeyAction::ZoomOut),
                "0" => Some(KeyAction::FitView),
                _ => None,
            };
        }

        match key {
            "Escape" => Some(KeyAction::Cancel),
            "Delete" | "Backspace" => Some(KeyAction::Delete),
            "+" | "=" => Some(KeyAction::ZoomIn),
            "-" => Some(KeyAction::ZoomOut),
            _ => None,
        }
    }
}
