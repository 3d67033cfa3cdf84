//! Input abstraction layer.
//!
//! Normalizes mouse, touch and pen events into a unified `InputEvent`
//! consumed by the flow engine. Pointer coordinates are screen pixels
//! relative to the pane's top-left corner.

use nf_core::ElementId;
use nf_core::geometry::XYPosition;
use nf_core::model::{ConnectingHandle, HandleType};

/// Modifier keys held during an input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    /// Ctrl on most platforms, ⌘ on macOS.
    pub fn cmd(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Held to add to (or toggle within) the current selection.
    pub fn multi_select(&self) -> bool {
        self.shift || self.cmd()
    }
}

/// A normalized input event from any pointing device or the keyboard.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },
    PointerMove {
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },
    PointerUp {
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },
    /// The platform took the pointer away (lost capture, touch cancel).
    PointerCancel,

    /// Wheel / pinch at screen point `(x, y)`.
    Scroll {
        x: f32,
        y: f32,
        dx: f32,
        dy: f32,
        /// Zoom factor (1.0 = no change; >1 = zoom in).
        zoom: f32,
    },

    Key {
        /// `KeyboardEvent.key` value, e.g. `"a"`, `"Escape"`.
        key: String,
        modifiers: Modifiers,
    },
}

impl InputEvent {
    pub fn pointer_down(x: f32, y: f32) -> Self {
        Self::PointerDown {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_move(x: f32, y: f32) -> Self {
        Self::PointerMove {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_up(x: f32, y: f32) -> Self {
        Self::PointerUp {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn key(key: &str) -> Self {
        Self::Key {
            key: key.to_string(),
            modifiers: Modifiers::NONE,
        }
    }

    /// Extract the screen position if this is a pointer event.
    pub fn position(&self) -> Option<XYPosition> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. } => Some(XYPosition::new(*x, *y)),
            _ => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            Self::PointerDown { modifiers, .. }
            | Self::PointerMove { modifiers, .. }
            | Self::PointerUp { modifiers, .. }
            | Self::Key { modifiers, .. } => *modifiers,
            _ => Modifiers::NONE,
        }
    }
}

/// What the pointer went down on. Hosts that do their own DOM hit testing
/// pass it explicitly; otherwise the engine resolves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Pane,
    Node(ElementId),
    Edge(ElementId),
    Handle(ConnectingHandle),
    /// The grab area at one end of an edge.
    EdgeUpdater { edge: ElementId, end: HandleType },
}
