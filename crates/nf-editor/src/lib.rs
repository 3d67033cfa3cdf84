pub mod connection;
pub mod drag;
pub mod events;
pub mod flow;
pub mod handles;
pub mod input;
pub mod keys;
pub mod selection;

pub use connection::{
    ConnectionEngine, ConnectionLine, ConnectionOutcome, ConnectionState, ConnectionStatus,
    ConnectorFn, ValidConnectionFn, ValidationContext,
};
pub use drag::{DragStep, NodeDrag};
pub use events::{EventBus, FlowEvent, ListenerId};
pub use flow::FlowEngine;
pub use handles::{HandleBounds, HandleRegistry};
pub use input::{InputEvent, Modifiers, PointerTarget};
pub use keys::{KeyAction, KeyMap};
pub use selection::Marquee;
