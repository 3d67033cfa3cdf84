//! Outbound lifecycle events and the synchronous bus that delivers them.
//!
//! Listeners run in subscription order, on the caller's stack, exactly
//! once per emitted event.

use nf_core::change::{EdgeChange, NodeChange};
use nf_core::error::FlowError;
use nf_core::geometry::XYPosition;
use nf_core::id::ElementId;
use nf_core::model::{ConnectingHandle, Connection};
use nf_core::viewport::ViewportTransform;

#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    ConnectStart(ConnectingHandle),
    /// A validated connection, exactly as the validator saw it.
    Connect(Connection),
    /// `None` when the gesture was aborted.
    ConnectEnd(Option<Connection>),

    /// An edge end was picked up.
    EdgeUpdateStart(ElementId),
    /// The edge was dropped on a valid handle; `connection` is its new
    /// attachment.
    EdgeUpdate {
        edge: ElementId,
        connection: Connection,
    },
    /// The edge update finished, successful or not.
    EdgeUpdateEnd(ElementId),

    NodeDragStart {
        node: ElementId,
        nodes: Vec<ElementId>,
    },
    NodeDrag {
        node: ElementId,
        nodes: Vec<ElementId>,
    },
    NodeDragStop {
        node: ElementId,
        nodes: Vec<ElementId>,
    },

    NodeClick(ElementId),
    EdgeClick(ElementId),
    /// Flow-space position of the click.
    PaneClick(XYPosition),

    SelectionChange {
        nodes: Vec<ElementId>,
        edges: Vec<ElementId>,
    },
    NodesChange(Vec<NodeChange>),
    EdgesChange(Vec<EdgeChange>),
    ViewportChange(ViewportTransform),

    Error(FlowError),
}

/// Token returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&FlowEvent)>;

#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&FlowEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if the listener was already gone.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &FlowEvent) {
        log::trace!("emit {event:?}");
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
