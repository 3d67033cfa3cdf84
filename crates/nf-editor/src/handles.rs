//! Handle registry and hit testing: pointer → handle lookup.
//!
//! Handles are not part of the graph store. The renderer registers their
//! screen-space boxes after layout and keeps them current when nodes move
//! or the viewport changes.

use crate::connection::ValidConnectionFn;
use nf_core::geometry::{Position, Rect, XYPosition};
use nf_core::id::ElementId;
use nf_core::model::{ConnectingHandle, HandleConnectable, HandleType};
use nf_core::store::GraphStore;

/// A registered connection point on a node.
#[derive(Clone)]
pub struct HandleBounds {
    /// `None` for a node's single default handle of this type.
    pub id: Option<ElementId>,
    pub node_id: ElementId,
    pub handle_type: HandleType,
    pub position: Position,
    /// Screen-space bounding box.
    pub rect: Rect,
    pub connectable: HandleConnectable,
    /// May a connection gesture start here?
    pub connectable_start: bool,
    /// May a connection gesture end here?
    pub connectable_end: bool,
    /// Overrides the engine-wide validator for connections ending here.
    pub is_valid_connection: Option<ValidConnectionFn>,
}

impl HandleBounds {
    pub fn new(
        node_id: impl Into<ElementId>,
        id: Option<&str>,
        handle_type: HandleType,
        rect: Rect,
    ) -> Self {
        Self {
            id: id.map(ElementId::intern),
            node_id: node_id.into(),
            handle_type,
            position: match handle_type {
                HandleType::Source => Position::Bottom,
                HandleType::Target => Position::Top,
            },
            rect,
            connectable: HandleConnectable::Always,
            connectable_start: true,
            connectable_end: true,
            is_valid_connection: None,
        }
    }

    pub fn with_connectable(mut self, connectable: impl Into<HandleConnectable>) -> Self {
        self.connectable = connectable.into();
        self
    }

    /// Screen-space attachment point (centre of the box).
    pub fn anchor(&self) -> XYPosition {
        self.rect.center()
    }

    pub fn as_connecting(&self) -> ConnectingHandle {
        ConnectingHandle {
            node_id: self.node_id,
            handle_id: self.id,
            handle_type: self.handle_type,
        }
    }

    fn is(&self, handle: &ConnectingHandle) -> bool {
        self.node_id == handle.node_id
            && self.id == handle.handle_id
            && self.handle_type == handle.handle_type
    }
}

impl std::fmt::Debug for HandleBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleBounds")
            .field("node_id", &self.node_id)
            .field("id", &self.id)
            .field("handle_type", &self.handle_type)
            .field("rect", &self.rect)
            .field("connectable", &self.connectable)
            .finish_non_exhaustive()
    }
}

/// All currently registered handles, with registration order.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    /// `(sequence, bounds)`; a higher sequence is a more recent registration.
    handles: Vec<(u64, HandleBounds)>,
    next_seq: u64,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or re-register a handle. Re-registering moves it to the
    /// front of the tie-break order.
    pub fn register(&mut self, bounds: HandleBounds) {
        let key = bounds.as_connecting();
        self.handles.retain(|(_, h)| !h.is(&key));
        let seq = self.next_seq;
        self.next_seq += 1;
        self.handles.push((seq, bounds));
    }

    pub fn unregister(&mut self, handle: &ConnectingHandle) -> bool {
        let before = self.handles.len();
        self.handles.retain(|(_, h)| !h.is(handle));
        self.handles.len() != before
    }

    /// Drop every handle of a node (the node was removed or hidden).
    pub fn unregister_node(&mut self, node: ElementId) {
        self.handles.retain(|(_, h)| h.node_id != node);
    }

    pub fn get(&self, handle: &ConnectingHandle) -> Option<&HandleBounds> {
        self.handles.iter().map(|(_, h)| h).find(|h| h.is(handle))
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandleBounds> {
        self.handles.iter().map(|(_, h)| h)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Find the handle a screen point snaps to.
    ///
    /// A handle is in range when the point lies inside its box or within
    /// `radius` pixels of its anchor. The nearest anchor wins; equal
    /// distances go to the most recent registration. `exclude` (the origin
    /// of a gesture) is never returned.
    pub fn hit_test(
        &self,
        p: XYPosition,
        radius: f32,
        exclude: Option<&ConnectingHandle>,
    ) -> Option<&HandleBounds> {
        self.nearest(p, radius, |h| !exclude.is_some_and(|ex| h.is(ex)))
    }

    /// [`hit_test`](Self::hit_test) limited to handles whose node exists in
    /// `store` and is not hidden.
    pub fn hit_test_in(
        &self,
        store: &GraphStore,
        p: XYPosition,
        radius: f32,
        exclude: Option<&ConnectingHandle>,
    ) -> Option<&HandleBounds> {
        self.nearest(p, radius, |h| {
            !exclude.is_some_and(|ex| h.is(ex))
                && store.node(h.node_id).is_some_and(|n| !n.hidden)
        })
    }

    /// The updatable edge end whose handle anchor lies within `radius` of
    /// `p`. Hidden edges are skipped; the nearest end wins and equal
    /// distances go to the edge added last.
    pub fn edge_end_at(
        &self,
        store: &GraphStore,
        p: XYPosition,
        radius: f32,
    ) -> Option<(ElementId, HandleType)> {
        let mut best: Option<(f32, ElementId, HandleType)> = None;
        for edge in store.edges().iter().filter(|e| !e.hidden) {
            for end in [HandleType::Source, HandleType::Target] {
                if !store.is_edge_updatable(edge, end) {
                    continue;
                }
                let Some(h) = self.get(&edge.end(end)) else {
                    continue;
                };
                let distance = h.anchor().distance(p);
                if distance <= radius && best.is_none_or(|(d, _, _)| distance <= d) {
                    best = Some((distance, edge.id, end));
                }
            }
        }
        best.map(|(_, edge, end)| (edge, end))
    }

    fn nearest(
        &self,
        p: XYPosition,
        radius: f32,
        accept: impl Fn(&HandleBounds) -> bool,
    ) -> Option<&HandleBounds> {
        let mut best: Option<(f32, u64, &HandleBounds)> = None;
        for (seq, h) in &self.handles {
            let distance = h.anchor().distance(p);
            if !(h.rect.contains(p.x, p.y) || distance <= radius) || !accept(h) {
                continue;
            }
            let closer = match best {
                None => true,
                Some((d, s, _)) => distance < d || (distance == d && *seq > s),
            };
            if closer {
                best = Some((distance, *seq, h));
            }
        }
        let hit = best.map(|(_, _, h)| h);
        log::trace!("handle hit test at ({}, {}) -> {:?}", p.x, p.y, hit.map(|h| h.node_id));
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(node: &str, id: Option<&str>, ty: HandleType, cx: f32, cy: f32) -> HandleBounds {
        HandleBounds::new(node, id, ty, Rect::new(cx - 4.0, cy - 4.0, 8.0, 8.0))
    }

    #[test]
    fn inside_rect_or_within_radius() {
        let mut reg = HandleRegistry::new();
        reg.register(square("a", None, HandleType::Target, 100.0, 100.0));

        assert!(reg.hit_test(XYPosition::new(102.0, 101.0), 0.0, None).is_some());
        assert!(reg.hit_test(XYPosition::new(115.0, 100.0), 20.0, None).is_some());
        assert!(reg.hit_test(XYPosition::new(130.0, 100.0), 20.0, None).is_none());
    }

    #[test]
    fn nearest_anchor_wins() {
        let mut reg = HandleRegistry::new();
        reg.register(square("a", None, HandleType::Target, 100.0, 100.0));
        reg.register(square("b", None, HandleType::Target, 130.0, 100.0));

        let hit = reg.hit_test(XYPosition::new(110.0, 100.0), 30.0, None).unwrap();
        assert_eq!(hit.node_id.as_str(), "a");
        let hit = reg.hit_test(XYPosition::new(125.0, 100.0), 30.0, None).unwrap();
        assert_eq!(hit.node_id.as_str(), "b");
    }

    #[test]
    fn ties_go_to_most_recent_registration() {
        let mut reg = HandleRegistry::new();
        reg.register(square("old", None, HandleType::Target, 100.0, 100.0));
        reg.register(square("new", None, HandleType::Target, 100.0, 100.0));
        let p = XYPosition::new(100.0, 100.0);
        assert_eq!(reg.hit_test(p, 10.0, None).unwrap().node_id.as_str(), "new");

        // Re-registering refreshes the order.
        reg.register(square("old", None, HandleType::Target, 100.0, 100.0));
        assert_eq!(reg.hit_test(p, 10.0, None).unwrap().node_id.as_str(), "old");
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn origin_is_excluded() {
        let mut reg = HandleRegistry::new();
        let origin = square("a", Some("out"), HandleType::Source, 50.0, 50.0);
        let key = origin.as_connecting();
        reg.register(origin);
        assert!(reg.hit_test(XYPosition::new(50.0, 50.0), 20.0, Some(&key)).is_none());
    }

    #[test]
    fn hidden_and_unknown_nodes_are_not_hit() {
        use nf_core::{FlowChange, Node, NodeChange};

        let mut hidden = Node::new("hidden", 0.0, 0.0);
        hidden.hidden = true;
        let mut store = GraphStore::default();
        let batch: Vec<FlowChange> = vec![
            NodeChange::add(hidden).into(),
            NodeChange::add(Node::new("shown", 0.0, 0.0)).into(),
        ];
        store.apply_changes(&batch);

        let mut reg = HandleRegistry::new();
        reg.register(square("shown", None, HandleType::Target, 0.0, 0.0));
        reg.register(square("hidden", None, HandleType::Target, 0.0, 0.0));
        reg.register(square("gone", None, HandleType::Target, 0.0, 0.0));
        let p = XYPosition::ORIGIN;

        assert_eq!(reg.hit_test(p, 10.0, None).unwrap().node_id.as_str(), "gone");
        assert_eq!(
            reg.hit_test_in(&store, p, 10.0, None).unwrap().node_id.as_str(),
            "shown"
        );
    }

    #[test]
    fn edge_end_at_finds_updatable_ends() {
        use nf_core::{Edge, EdgeUpdatable, FlowChange, Node, NodeChange};

        let mut store = GraphStore::default();
        let mut fixed = Edge::new("fixed", "a", "c");
        fixed.updatable = Some(EdgeUpdatable::Source);
        let batch: Vec<FlowChange> = vec![
            NodeChange::add(Node::new("a", 0.0, 0.0)).into(),
            NodeChange::add(Node::new("b", 0.0, 0.0)).into(),
            NodeChange::add(Node::new("c", 0.0, 0.0)).into(),
        ];
        store.apply_changes(&batch);
        store.add_edge(Edge::new("ab", "a", "b")).unwrap();
        store.add_edge(fixed).unwrap();

        let mut reg = HandleRegistry::new();
        reg.register(square("a", None, HandleType::Source, 0.0, 0.0));
        reg.register(square("b", None, HandleType::Target, 100.0, 0.0));
        reg.register(square("c", None, HandleType::Target, 0.0, 100.0));

        assert_eq!(
            reg.edge_end_at(&store, XYPosition::new(95.0, 3.0), 10.0),
            Some((ElementId::intern("ab"), HandleType::Target))
        );
        // The target end of "fixed" is locked.
        assert_eq!(reg.edge_end_at(&store, XYPosition::new(0.0, 98.0), 10.0), None);
        // Both edges leave a's source; the later one wins.
        assert_eq!(
            reg.edge_end_at(&store, XYPosition::new(1.0, 1.0), 10.0),
            Some((ElementId::intern("fixed"), HandleType::Source))
        );
        assert_eq!(reg.edge_end_at(&store, XYPosition::new(50.0, 50.0), 10.0), None);
    }

    #[test]
    fn unregister_node_drops_all_its_handles() {
        let mut reg = HandleRegistry::new();
        reg.register(square("a", Some("in"), HandleType::Target, 0.0, 0.0));
        reg.register(square("a", Some("out"), HandleType::Source, 0.0, 20.0));
        reg.register(square("b", None, HandleType::Target, 50.0, 0.0));
        reg.unregister_node(ElementId::intern("a"));
        assert_eq!(reg.len(), 1);
    }
}
