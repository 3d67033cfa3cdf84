//! Selection: click selection, select-all and marquee (rubber-band).
//!
//! Every function here computes a batch of `Select` descriptors as a diff
//! against the store; nothing writes to the store directly.

use nf_core::change::{EdgeChange, FlowChange, NodeChange};
use nf_core::geometry::{Rect, SelectionMode, XYPosition, rect_selected_by};
use nf_core::id::ElementId;
use nf_core::store::GraphStore;

/// Selectable, visible nodes whose absolute rect is inside `rect` under
/// `mode`, in insertion order.
pub fn nodes_in_rect(store: &GraphStore, rect: &Rect, mode: SelectionMode) -> Vec<ElementId> {
    store
        .nodes()
        .filter(|n| !n.hidden && store.is_node_selectable(n))
        .filter(|n| {
            store
                .node_rect(n.id)
                .is_some_and(|r| rect_selected_by(rect, &r, mode))
        })
        .map(|n| n.id)
        .collect()
}

/// Selectable edges touching any of `nodes`.
pub fn incident_edges(store: &GraphStore, nodes: &[ElementId]) -> Vec<ElementId> {
    store
        .edges()
        .iter()
        .filter(|e| nodes.iter().any(|n| e.touches(*n)))
        .filter(|e| store.is_edge_selectable(e))
        .map(|e| e.id)
        .collect()
}

/// `Select` descriptors that make exactly `nodes`/`edges` selected (plus
/// the current selection when `additive`).
pub fn selection_diff(
    store: &GraphStore,
    nodes: &[ElementId],
    edges: &[ElementId],
    additive: bool,
) -> Vec<FlowChange> {
    let mut changes: Vec<FlowChange> = Vec::new();
    for n in store.nodes() {
        let want = nodes.contains(&n.id) || (additive && n.selected);
        if n.selected != want {
            changes.push(
                NodeChange::Select {
                    id: n.id,
                    selected: want,
                }
                .into(),
            );
        }
    }
    for e in store.edges() {
        let want = edges.contains(&e.id) || (additive && e.selected);
        if e.selected != want {
            changes.push(
                EdgeChange::Select {
                    id: e.id,
                    selected: want,
                }
                .into(),
            );
        }
    }
    changes
}

/// Click on a node: select it alone, or toggle it with `multi`.
pub fn click_node(store: &GraphStore, id: ElementId, multi: bool) -> Vec<FlowChange> {
    let Some(node) = store.node(id) else {
        return Vec::new();
    };
    if !store.is_node_selectable(node) {
        return Vec::new();
    }
    if multi {
        return vec![
            NodeChange::Select {
                id,
                selected: !node.selected,
            }
            .into(),
        ];
    }
    selection_diff(store, &[id], &[], false)
}

/// Click on an edge: select it alone, or toggle it with `multi`.
pub fn click_edge(store: &GraphStore, id: ElementId, multi: bool) -> Vec<FlowChange> {
    let Some(edge) = store.edge(id) else {
        return Vec::new();
    };
    if !store.is_edge_selectable(edge) {
        return Vec::new();
    }
    if multi {
        return vec![
            EdgeChange::Select {
                id,
                selected: !edge.selected,
            }
            .into(),
        ];
    }
    selection_diff(store, &[], &[id], false)
}

pub fn select_all(store: &GraphStore) -> Vec<FlowChange> {
    let nodes: Vec<ElementId> = store
        .nodes()
        .filter(|n| !n.hidden && store.is_node_selectable(n))
        .map(|n| n.id)
        .collect();
    let edges: Vec<ElementId> = store
        .edges()
        .iter()
        .filter(|e| !e.hidden && store.is_edge_selectable(e))
        .map(|e| e.id)
        .collect();
    selection_diff(store, &nodes, &edges, false)
}

pub fn deselect_all(store: &GraphStore) -> Vec<FlowChange> {
    selection_diff(store, &[], &[], false)
}

/// The batch that undoes a batch of `Select` changes. Other changes are
/// dropped.
pub fn invert(changes: &[FlowChange]) -> Vec<FlowChange> {
    changes
        .iter()
        .filter_map(|c| match c {
            FlowChange::Node(NodeChange::Select { id, selected }) => Some(
                NodeChange::Select {
                    id: *id,
                    selected: !selected,
                }
                .into(),
            ),
            FlowChange::Edge(EdgeChange::Select { id, selected }) => Some(
                EdgeChange::Select {
                    id: *id,
                    selected: !selected,
                }
                .into(),
            ),
            _ => None,
        })
        .collect()
}

// ─── Marquee ─────────────────────────────────────────────────────────────

/// A rubber-band selection in progress. Candidates are transient until
/// [`Marquee::commit`].
#[derive(Debug, Clone, PartialEq)]
pub struct Marquee {
    /// Flow-space corner where the drag began.
    start: XYPosition,
    current: XYPosition,
    additive: bool,
    nodes: Vec<ElementId>,
    edges: Vec<ElementId>,
}

impl Marquee {
    pub fn begin(start: XYPosition, additive: bool) -> Self {
        Self {
            start,
            current: start,
            additive,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Normalized flow-space rectangle.
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.start, self.current)
    }

    pub fn has_area(&self) -> bool {
        self.rect().area() > 0.0
    }

    pub fn nodes(&self) -> &[ElementId] {
        &self.nodes
    }

    pub fn edges(&self) -> &[ElementId] {
        &self.edges
    }

    /// Grow the rectangle to `current` and recompute the candidates.
    pub fn update(&mut self, store: &GraphStore, current: XYPosition) {
        self.current = current;
        let rect = self.rect();
        self.nodes = nodes_in_rect(store, &rect, store.options().selection_mode);
        self.edges = incident_edges(store, &self.nodes);
        log::trace!("marquee {rect:?}: {} node(s)", self.nodes.len());
    }

    /// One batch selecting the candidates.
    pub fn commit(&self, store: &GraphStore) -> Vec<FlowChange> {
        selection_diff(store, &self.nodes, &self.edges, self.additive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nf_core::{Edge, FlowOptions, Node};
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> ElementId {
        ElementId::intern(s)
    }

    fn store(mode: SelectionMode) -> GraphStore {
        let mut store = GraphStore::new(FlowOptions {
            selection_mode: mode,
            ..FlowOptions::default()
        });
        store.apply_changes(&[
            NodeChange::add(Node::new("inside", 10.0, 10.0).with_size(20.0, 20.0)).into(),
            NodeChange::add(Node::new("straddle", 40.0, 40.0).with_size(20.0, 20.0)).into(),
            NodeChange::add(Node::new("outside", 200.0, 200.0).with_size(20.0, 20.0)).into(),
            EdgeChange::add(Edge::new("e1", "inside", "outside")).into(),
        ]);
        store
    }

    #[test]
    fn full_mode_marquee_selects_only_contained() {
        let store = store(SelectionMode::Full);
        let mut marquee = Marquee::begin(XYPosition::new(0.0, 0.0), false);
        marquee.update(&store, XYPosition::new(50.0, 50.0));
        assert_eq!(marquee.nodes(), &[id("inside")]);
        assert_eq!(marquee.edges(), &[id("e1")]);
    }

    #[test]
    fn partial_mode_marquee_selects_overlapping() {
        let store = store(SelectionMode::Partial);
        let mut marquee = Marquee::begin(XYPosition::new(50.0, 50.0), false);
        // Dragged up-left: the rect is normalized.
        marquee.update(&store, XYPosition::new(0.0, 0.0));
        assert_eq!(marquee.nodes(), &[id("inside"), id("straddle")]);
    }

    #[test]
    fn marquee_commit_is_a_diff() {
        let mut store = store(SelectionMode::Full);
        store.apply_changes(&[NodeChange::Select {
            id: id("outside"),
            selected: true,
        }
        .into()]);

        let mut marquee = Marquee::begin(XYPosition::ORIGIN, false);
        marquee.update(&store, XYPosition::new(50.0, 50.0));
        let expected: Vec<FlowChange> = vec![
            NodeChange::Select {
                id: id("inside"),
                selected: true,
            }
            .into(),
            NodeChange::Select {
                id: id("outside"),
                selected: false,
            }
            .into(),
            EdgeChange::Select {
                id: id("e1"),
                selected: true,
            }
            .into(),
        ];
        assert_eq!(marquee.commit(&store), expected);
    }

    #[test]
    fn additive_marquee_keeps_existing_selection() {
        let mut store = store(SelectionMode::Full);
        store.apply_changes(&[NodeChange::Select {
            id: id("outside"),
            selected: true,
        }
        .into()]);
        let mut marquee = Marquee::begin(XYPosition::ORIGIN, true);
        marquee.update(&store, XYPosition::new(50.0, 50.0));
        store.apply_changes(&marquee.commit(&store));
        assert_eq!(store.selected_nodes(), &[id("inside"), id("outside")]);
    }

    #[test]
    fn click_replaces_or_toggles() {
        let mut store = store(SelectionMode::Full);
        store.apply_changes(&click_node(&store, id("inside"), false));
        store.apply_changes(&click_node(&store, id("straddle"), true));
        assert_eq!(store.selected_nodes(), &[id("inside"), id("straddle")]);

        store.apply_changes(&click_node(&store, id("inside"), true));
        assert_eq!(store.selected_nodes(), &[id("straddle")]);

        store.apply_changes(&click_edge(&store, id("e1"), false));
        assert!(store.selected_nodes().is_empty());
        assert_eq!(store.selected_edges(), &[id("e1")]);
    }

    #[test]
    fn inverted_click_restores_selection() {
        let mut store = store(SelectionMode::Full);
        store.apply_changes(&click_edge(&store, id("e1"), false));

        let click = click_node(&store, id("inside"), false);
        store.apply_changes(&click);
        assert_eq!(store.selected_nodes(), &[id("inside")]);
        assert!(store.selected_edges().is_empty());

        store.apply_changes(&invert(&click));
        assert!(store.selected_nodes().is_empty());
        assert_eq!(store.selected_edges(), &[id("e1")]);
    }

    #[test]
    fn unselectable_nodes_are_skipped() {
        let mut store = store(SelectionMode::Partial);
        let mut locked = Node::new("locked", 5.0, 5.0).with_size(5.0, 5.0);
        locked.selectable = Some(false);
        store.apply_changes(&[NodeChange::add(locked).into()]);

        assert!(click_node(&store, id("locked"), false).is_empty());
        store.apply_changes(&select_all(&store));
        assert!(!store.selected_nodes().contains(&id("locked")));
        assert_eq!(store.selected_nodes().len(), 3);

        store.apply_changes(&deselect_all(&store));
        assert!(store.selected_nodes().is_empty());
        assert!(store.selected_edges().is_empty());
    }
}
