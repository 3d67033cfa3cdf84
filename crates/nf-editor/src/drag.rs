//! Node dragging.
//!
//! A drag snapshots its node set and their start positions when the
//! pointer goes down. Every frame recomputes positions from the start
//! snapshot plus the total pointer delta (screen delta / zoom), so rounding
//! never accumulates and cancel can put everything back.

use nf_core::change::{FlowChange, NodeChange};
use nf_core::geometry::{CoordinateExtent, Dimensions, XYPosition, clamp_position, snap_position};
use nf_core::id::ElementId;
use nf_core::model::{Node, NodeExtent};
use nf_core::store::GraphStore;

#[derive(Debug, Clone, PartialEq)]
struct DragItem {
    id: ElementId,
    /// Position (parent-relative for children) when the drag began.
    start: XYPosition,
    extent: Option<CoordinateExtent>,
    dims: Dimensions,
}

/// Result of one pointer move.
#[derive(Debug, Clone, PartialEq)]
pub enum DragStep {
    /// Still inside the drag threshold; a release now is a click.
    BelowThreshold,
    /// Threshold crossed on this move; carries the first position batch.
    Started(Vec<FlowChange>),
    Moved(Vec<FlowChange>),
    /// Moved, but the (snapped) delta is the same as last frame.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDrag {
    grabbed: ElementId,
    items: Vec<DragItem>,
    /// Screen-space pointer position at press.
    origin: XYPosition,
    started: bool,
    delta: XYPosition,
}

impl NodeDrag {
    /// Prepare a drag of `grabbed`. Returns `None` when the node is unknown,
    /// hidden or not draggable.
    ///
    /// When the grabbed node is selected, every selected draggable node
    /// moves with it (children of a moving parent ride along and are not
    /// moved twice).
    pub fn begin(store: &GraphStore, grabbed: ElementId, pointer: XYPosition) -> Option<Self> {
        let node = store.node(grabbed)?;
        if node.hidden || !store.is_node_draggable(node) {
            log::debug!("node {grabbed} is not draggable");
            return None;
        }

        let ids: Vec<ElementId> = if node.selected {
            let selected = store.selected_nodes();
            selected
                .iter()
                .copied()
                .filter(|id| {
                    store
                        .node(*id)
                        .is_some_and(|n| !n.hidden && store.is_node_draggable(n))
                })
                .filter(|id| !selected.iter().any(|other| store.is_ancestor_of(*other, *id)))
                .collect()
        } else {
            vec![grabbed]
        };

        let items = ids
            .into_iter()
            .filter_map(|id| store.node(id))
            .map(|n| DragItem {
                id: n.id,
                start: n.position,
                extent: resolve_extent(store, n),
                dims: n.dimensions(),
            })
            .collect();

        Some(Self {
            grabbed,
            items,
            origin: pointer,
            started: false,
            delta: XYPosition::ORIGIN,
        })
    }

    pub fn grabbed(&self) -> ElementId {
        self.grabbed
    }

    /// Ids of every node moved by this drag.
    pub fn nodes(&self) -> Vec<ElementId> {
        self.items.iter().map(|i| i.id).collect()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn update(&mut self, store: &GraphStore, pointer: XYPosition) -> DragStep {
        let options = store.options();
        let first = !self.started;
        if first {
            if pointer.distance(self.origin) <= options.node_drag_threshold {
                return DragStep::BelowThreshold;
            }
            self.started = true;
            log::debug!("drag started on {}", self.grabbed);
        }

        let zoom = store.viewport().zoom;
        let mut delta = XYPosition::new(
            (pointer.x - self.origin.x) / zoom,
            (pointer.y - self.origin.y) / zoom,
        );
        if options.snap_to_grid {
            delta = snap_position(delta, options.snap_grid);
        }
        if !first && delta == self.delta {
            return DragStep::Unchanged;
        }
        self.delta = delta;
        log::trace!("drag {} by ({}, {})", self.grabbed, delta.x, delta.y);

        let changes: Vec<FlowChange> = self
            .items
            .iter()
            .map(|item| {
                let mut pos = item.start.offset(delta.x, delta.y);
                if let Some(extent) = &item.extent {
                    pos = clamp_position(pos, extent, item.dims);
                }
                NodeChange::Position {
                    id: item.id,
                    position: Some(pos),
                    dragging: true,
                }
                .into()
            })
            .collect();

        if first {
            DragStep::Started(changes)
        } else {
            DragStep::Moved(changes)
        }
    }

    /// Changes that end a drag: clear the dragging flag, keep positions.
    pub fn finish(&self) -> Vec<FlowChange> {
        if !self.started {
            return Vec::new();
        }
        self.items
            .iter()
            .map(|item| {
                NodeChange::Position {
                    id: item.id,
                    position: None,
                    dragging: false,
                }
                .into()
            })
            .collect()
    }

    /// Changes that undo a drag: restore every start position.
    pub fn cancel(&self) -> Vec<FlowChange> {
        if !self.started {
            return Vec::new();
        }
        log::debug!("drag on {} cancelled", self.grabbed);
        self.items
            .iter()
            .map(|item| {
                NodeChange::Position {
                    id: item.id,
                    position: Some(item.start),
                    dragging: false,
                }
                .into()
            })
            .collect()
    }
}

/// The box a node may move within, in the same space as its `position`.
/// The node's own extent overrides the global one.
///
/// A `Rect` extent is a flow-space box; for a child it is shifted by the
/// parent's absolute position so clamping the relative position keeps the
/// absolute one inside. `Parent` is already relative to the parent.
fn resolve_extent(store: &GraphStore, node: &Node) -> Option<CoordinateExtent> {
    match node.extent.or(store.options().node_extent)? {
        NodeExtent::Rect(extent) => {
            let Some(parent) = node.parent else {
                return Some(extent);
            };
            match store.absolute_position(parent) {
                Ok(origin) => Some(CoordinateExtent::new(
                    extent.min.x - origin.x,
                    extent.min.y - origin.y,
                    extent.max.x - origin.x,
                    extent.max.y - origin.y,
                )),
                Err(err) => {
                    log::warn!("extent of {} ignored: {err}", node.id);
                    None
                }
            }
        }
        NodeExtent::Parent => {
            let parent = node.parent.and_then(|p| store.node(p))?;
            let dims = parent.dimensions();
            if dims.is_empty() {
                log::debug!("parent of {} has no size yet; extent ignored", node.id);
                return None;
            }
            Some(CoordinateExtent::new(0.0, 0.0, dims.width, dims.height))
        }
    }
}
