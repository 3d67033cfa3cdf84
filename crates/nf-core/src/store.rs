//! The graph store: canonical node and edge collections.
//!
//! Nodes live in a `StableDiGraph` arena whose edges are parent → child
//! links (nested flows). Diagram edges are kept separately in insertion
//! order. Every mutation goes through [`GraphStore::apply_changes`], after
//! which the derived views (selection, visibility, connected-edge index)
//! are rebuilt eagerly, so readers never observe a half-applied batch.

use crate::change::{ApplyReport, EdgeChange, FlowChange, NodeChange};
use crate::error::FlowError;
use crate::geometry::{Dimensions, Rect, XYPosition};
use crate::id::ElementId;
use crate::model::{Connection, ConnectionMode, Edge, HandleType, Node};
use crate::options::{FlowOptions, SELECTED_Z_BOOST};
use crate::snapshot::FlowSnapshot;
use crate::viewport::{ViewportTransform, clamp_pan, clamp_zoom};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Views derived from the collections after every committed batch.
#[derive(Debug, Clone, Default)]
pub struct DerivedViews {
    pub selected_nodes: Vec<ElementId>,
    pub selected_edges: Vec<ElementId>,
    /// Nodes intersecting the viewport (all nodes when culling is off).
    pub visible_nodes: Vec<ElementId>,
    /// Reverse index: node id → incident edge ids.
    connected: HashMap<ElementId, SmallVec<[ElementId; 4]>>,
}

enum Outcome {
    Applied,
    Stale,
    Rejected,
    Fatal(FlowError),
}

#[derive(Debug, Clone)]
pub struct GraphStore {
    /// Node arena; graph edges are parent → child links.
    graph: StableDiGraph<Node, ()>,
    id_index: HashMap<ElementId, NodeIndex>,
    /// Insertion order (arena slots are reused, so indices alone are not).
    node_order: Vec<NodeIndex>,

    edges: Vec<Edge>,
    edge_index: HashMap<ElementId, usize>,

    options: FlowOptions,
    viewport: ViewportTransform,
    /// Pixel size of the pane hosting the flow.
    pane: Dimensions,

    views: DerivedViews,
}

impl GraphStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(options: FlowOptions) -> Self {
        let options = options.normalized();
        let mut viewport = options.default_viewport;
        viewport.zoom = clamp_zoom(viewport.zoom, options.min_zoom, options.max_zoom);
        Self {
            graph: StableDiGraph::new(),
            id_index: HashMap::new(),
            node_order: Vec::new(),
            edges: Vec::new(),
            edge_index: HashMap::new(),
            options,
            viewport,
            pane: Dimensions::ZERO,
            views: DerivedViews::default(),
        }
    }

    /// Build a store from a snapshot.
    ///
    /// Unlike `apply_changes`, construction is strict: duplicate ids,
    /// broken parent references, parent cycles and dangling edges are
    /// escalated as errors.
    pub fn from_snapshot(snapshot: FlowSnapshot, options: FlowOptions) -> Result<Self, FlowError> {
        let mut store = Self::new(options);
        store.viewport = snapshot.viewport;
        store.viewport.zoom = clamp_zoom(
            store.viewport.zoom,
            store.options.min_zoom,
            store.options.max_zoom,
        );

        let mut parents = Vec::new();
        for mut node in snapshot.nodes {
            if store.id_index.contains_key(&node.id) {
                return Err(FlowError::DuplicateId(node.id));
            }
            if let Some(parent) = node.parent.take() {
                parents.push((node.id, parent));
            }
            store.insert_node(node);
        }
        for (child, parent) in parents {
            store.link_parent(child, parent)?;
        }

        for edge in snapshot.edges {
            if store.edge_index.contains_key(&edge.id) {
                return Err(FlowError::DuplicateId(edge.id));
            }
            for end in [edge.source, edge.target] {
                if !store.id_index.contains_key(&end) {
                    return Err(FlowError::DanglingEdge {
                        edge: edge.id,
                        node: end,
                    });
                }
            }
            store.edge_index.insert(edge.id, store.edges.len());
            store.edges.push(edge);
        }

        store.refresh();
        log::debug!(
            "store restored: {} nodes, {} edges",
            store.node_count(),
            store.edge_count()
        );
        Ok(store)
    }

    /// Export nodes, edges and viewport.
    pub fn to_snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges.clone(),
            viewport: self.viewport,
        }
    }

    // ─── Configuration & viewport ────────────────────────────────────────

    pub fn options(&self) -> &FlowOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: FlowOptions) {
        self.options = options.normalized();
        let vp = self.viewport;
        self.set_viewport(vp);
        self.refresh();
    }

    pub fn viewport(&self) -> ViewportTransform {
        self.viewport
    }

    pub fn pane(&self) -> Dimensions {
        self.pane
    }

    /// Set the viewport, clamping zoom and pan. Returns `true` when the
    /// stored transform changed.
    pub fn set_viewport(&mut self, requested: ViewportTransform) -> bool {
        let mut vp = requested;
        vp.zoom = clamp_zoom(vp.zoom, self.options.min_zoom, self.options.max_zoom);
        let vp = clamp_pan(vp, self.options.translate_extent.as_ref(), self.pane);
        if vp == self.viewport {
            return false;
        }
        self.viewport = vp;
        self.refresh_visible();
        true
    }

    pub fn set_pane(&mut self, pane: Dimensions) {
        self.pane = pane;
        self.refresh_visible();
    }

    // ─── Lookup ──────────────────────────────────────────────────────────

    pub fn node(&self, id: ElementId) -> Option<&Node> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn edge(&self, id: ElementId) -> Option<&Edge> {
        self.edge_index.get(&id).map(|i| &self.edges[*i])
    }

    pub fn contains_node(&self, id: ElementId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().map(|idx| &self.graph[*idx])
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.node_order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        let idx = self.index_of(id)?;
        self.parent_index(idx).map(|p| self.graph[p].id)
    }

    /// Direct children in insertion order.
    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        self.node_order
            .iter()
            .filter(|c| self.parent_index(**c) == Some(idx))
            .map(|c| self.graph[*c].id)
            .collect()
    }

    /// Check if `ancestor` is a parent/grandparent/etc. of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: ElementId, descendant: ElementId) -> bool {
        if ancestor == descendant {
            return false;
        }
        let Some(mut current) = self.index_of(descendant) else {
            return false;
        };
        let mut steps = 0;
        while let Some(parent) = self.parent_index(current) {
            if self.graph[parent].id == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.node_count() {
                break;
            }
            current = parent;
        }
        false
    }

    /// Position in flow space, walking the parent chain once.
    ///
    /// A cycle in the chain is a configuration error, reported instead of
    /// looping forever.
    pub fn absolute_position(&self, id: ElementId) -> Result<XYPosition, FlowError> {
        let idx = self.index_of(id).ok_or(FlowError::UnknownNode(id))?;
        let mut pos = self.graph[idx].position;
        let mut current = idx;
        let mut steps = 0;
        while let Some(parent) = self.parent_index(current) {
            steps += 1;
            if steps > self.node_count() {
                log::warn!("parent cycle detected at {id}");
                return Err(FlowError::ParentCycle(id));
            }
            let p = self.graph[parent].position;
            pos = pos.offset(p.x, p.y);
            current = parent;
        }
        Ok(pos)
    }

    /// Absolute flow-space rect of a node.
    pub fn node_rect(&self, id: ElementId) -> Option<Rect> {
        let node = self.node(id)?;
        let pos = self.absolute_position(id).ok()?;
        Some(Rect::from_parts(pos, node.dimensions()))
    }

    /// Topmost visible node containing a flow-space point.
    pub fn node_at(&self, p: XYPosition) -> Option<ElementId> {
        self.node_render_order().into_iter().rev().find(|id| {
            self.node(*id).is_some_and(|n| !n.hidden)
                && self
                    .node_rect(*id)
                    .is_some_and(|r| r.area() > 0.0 && r.contains(p.x, p.y))
        })
    }

    // ─── Edge queries ────────────────────────────────────────────────────

    /// Incident edge ids for a node (empty for unknown ids).
    pub fn connected_edges(&self, node: ElementId) -> &[ElementId] {
        self.views
            .connected
            .get(&node)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Edges attached to one specific handle end.
    pub fn handle_edges(
        &self,
        node: ElementId,
        handle: Option<ElementId>,
        handle_type: HandleType,
    ) -> Vec<&Edge> {
        self.connected_edges(node)
            .iter()
            .filter_map(|id| self.edge(*id))
            .filter(|e| match handle_type {
                HandleType::Source => e.source == node && e.source_handle == handle,
                HandleType::Target => e.target == node && e.target_handle == handle,
            })
            .collect()
    }

    /// Nodes with an edge pointing at `id`.
    pub fn incomers(&self, id: ElementId) -> Vec<ElementId> {
        self.edges
            .iter()
            .filter(|e| e.target == id)
            .map(|e| e.source)
            .collect()
    }

    /// Nodes `id` has an edge pointing to.
    pub fn outgoers(&self, id: ElementId) -> Vec<ElementId> {
        self.edges
            .iter()
            .filter(|e| e.source == id)
            .map(|e| e.target)
            .collect()
    }

    pub fn connection_exists(&self, c: &Connection) -> bool {
        self.edges.iter().any(|e| e.connection() == *c)
    }

    // ─── Derived views ───────────────────────────────────────────────────

    pub fn views(&self) -> &DerivedViews {
        &self.views
    }

    pub fn selected_nodes(&self) -> &[ElementId] {
        &self.views.selected_nodes
    }

    pub fn selected_edges(&self) -> &[ElementId] {
        &self.views.selected_edges
    }

    pub fn visible_nodes(&self) -> &[ElementId] {
        &self.views.visible_nodes
    }

    // ─── Capabilities ────────────────────────────────────────────────────

    pub fn is_node_draggable(&self, node: &Node) -> bool {
        node.draggable.unwrap_or(self.options.nodes_draggable)
    }

    pub fn is_node_selectable(&self, node: &Node) -> bool {
        node.selectable.unwrap_or(self.options.elements_selectable)
    }

    pub fn is_node_connectable(&self, node: &Node) -> bool {
        node.connectable.unwrap_or(self.options.nodes_connectable)
    }

    pub fn is_node_deletable(&self, node: &Node) -> bool {
        node.deletable.unwrap_or(true)
    }

    pub fn is_edge_selectable(&self, edge: &Edge) -> bool {
        edge.selectable.unwrap_or(self.options.elements_selectable)
    }

    pub fn is_edge_deletable(&self, edge: &Edge) -> bool {
        edge.deletable.unwrap_or(true)
    }

    /// May the `end` of this edge be dragged onto another handle?
    pub fn is_edge_updatable(&self, edge: &Edge, end: HandleType) -> bool {
        edge.updatable
            .unwrap_or(self.options.edges_updatable)
            .allows(end)
    }

    // ─── Z-order ─────────────────────────────────────────────────────────

    /// Effective z-index: explicit or 0, boosted when selected and
    /// elevation is on; a child always sits above its parent.
    pub fn node_z(&self, id: ElementId) -> i32 {
        let Some(mut idx) = self.index_of(id) else {
            return 0;
        };
        let mut z = self.own_z(&self.graph[idx]);
        let mut depth = 0;
        let mut chain = Vec::new();
        while let Some(parent) = self.parent_index(idx) {
            depth += 1;
            if depth > self.node_count() {
                break;
            }
            chain.push(parent);
            idx = parent;
        }
        // Resolve from the root down so each level sits above the previous.
        let mut parent_z: Option<i32> = None;
        for p in chain.iter().rev() {
            let own = self.own_z(&self.graph[*p]);
            parent_z = Some(match parent_z {
                Some(pz) => own.max(pz + 1),
                None => own,
            });
        }
        if let Some(pz) = parent_z {
            z = z.max(pz + 1);
        }
        z
    }

    fn own_z(&self, node: &Node) -> i32 {
        let boost = if node.selected && self.options.elevate_nodes_on_select {
            SELECTED_Z_BOOST
        } else {
            0
        };
        node.z_index.unwrap_or(0) + boost
    }

    pub fn edge_z(&self, edge: &Edge) -> i32 {
        let boost = if edge.selected && self.options.elevate_edges_on_select {
            SELECTED_Z_BOOST
        } else {
            0
        };
        edge.z_index.unwrap_or(0) + boost
    }

    /// Node ids back-to-front: by z, ties in insertion order.
    pub fn node_render_order(&self) -> Vec<ElementId> {
        let mut keyed: Vec<(i32, usize, ElementId)> = self
            .node_order
            .iter()
            .enumerate()
            .map(|(i, idx)| {
                let id = self.graph[*idx].id;
                (self.node_z(id), i, id)
            })
            .collect();
        keyed.sort_by_key(|(z, i, _)| (*z, *i));
        keyed.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Edge ids back-to-front: by z, ties in insertion order.
    pub fn edge_render_order(&self) -> Vec<ElementId> {
        let mut keyed: Vec<(i32, usize, ElementId)> = self
            .edges
            .iter()
            .enumerate()
            .map(|(i, e)| (self.edge_z(e), i, e.id))
            .collect();
        keyed.sort_by_key(|(z, i, _)| (*z, *i));
        keyed.into_iter().map(|(_, _, id)| id).collect()
    }

    // ─── Mutation ────────────────────────────────────────────────────────

    /// Apply a batch of change descriptors in order.
    ///
    /// Each descriptor is validated on its own: unknown ids are counted as
    /// stale, invalid requests as rejected, and a parent cycle is reported
    /// in `errors` without being applied. The derived views are rebuilt
    /// once, after the whole batch.
    pub fn apply_changes(&mut self, batch: &[FlowChange]) -> ApplyReport {
        let mut report = ApplyReport::default();
        for change in batch {
            let outcome = match change {
                FlowChange::Node(c) => self.apply_node_change(c),
                FlowChange::Edge(c) => self.apply_edge_change(c),
            };
            match outcome {
                Outcome::Applied => report.applied += 1,
                Outcome::Stale => report.stale += 1,
                Outcome::Rejected => report.rejected += 1,
                Outcome::Fatal(err) => {
                    log::warn!("change refused: {err}");
                    report.errors.push(err);
                }
            }
        }
        if report.applied > 0 {
            self.refresh();
        }
        if report.stale > 0 {
            log::debug!("dropped {} stale change(s)", report.stale);
        }
        report
    }

    fn apply_node_change(&mut self, change: &NodeChange) -> Outcome {
        match change {
            NodeChange::Add { item } => self.add_node(item.as_ref().clone()),
            NodeChange::Remove { id } => {
                if self.remove_node(*id) {
                    Outcome::Applied
                } else {
                    Outcome::Stale
                }
            }
            NodeChange::Select { id, selected } => match self.node_mut(*id) {
                Some(node) => {
                    node.selected = *selected;
                    Outcome::Applied
                }
                None => Outcome::Stale,
            },
            NodeChange::Position {
                id,
                position,
                dragging,
            } => match self.node_mut(*id) {
                Some(node) => {
                    if let Some(p) = position {
                        node.position = *p;
                    }
                    node.dragging = *dragging;
                    Outcome::Applied
                }
                None => Outcome::Stale,
            },
            NodeChange::Dimensions { id, dimensions } => match self.node_mut(*id) {
                Some(node) => {
                    node.measured = *dimensions;
                    Outcome::Applied
                }
                None => Outcome::Stale,
            },
            NodeChange::Reset { item } => self.reset_node(item.as_ref().clone()),
        }
    }

    fn apply_edge_change(&mut self, change: &EdgeChange) -> Outcome {
        match change {
            EdgeChange::Add { item } => {
                let edge = item.as_ref().clone();
                if self.edge_index.contains_key(&edge.id) {
                    log::warn!("edge {} already exists", edge.id);
                    return Outcome::Rejected;
                }
                if !self.endpoints_exist(&edge) {
                    log::warn!("edge {} references a missing node", edge.id);
                    return Outcome::Rejected;
                }
                self.edge_index.insert(edge.id, self.edges.len());
                self.edges.push(edge);
                Outcome::Applied
            }
            EdgeChange::Remove { id } => {
                let Some(pos) = self.edge_index.get(id).copied() else {
                    return Outcome::Stale;
                };
                self.edges.remove(pos);
                self.rebuild_edge_index();
                Outcome::Applied
            }
            EdgeChange::Select { id, selected } => match self.edge_index.get(id).copied() {
                Some(pos) => {
                    self.edges[pos].selected = *selected;
                    Outcome::Applied
                }
                None => Outcome::Stale,
            },
            EdgeChange::Reset { item } => {
                let Some(pos) = self.edge_index.get(&item.id).copied() else {
                    return Outcome::Stale;
                };
                if !self.endpoints_exist(item) {
                    log::warn!("edge reset {} references a missing node", item.id);
                    return Outcome::Rejected;
                }
                self.edges[pos] = item.as_ref().clone();
                Outcome::Applied
            }
        }
    }

    fn add_node(&mut self, mut node: Node) -> Outcome {
        if self.id_index.contains_key(&node.id) {
            log::warn!("node {} already exists", node.id);
            return Outcome::Rejected;
        }
        let parent = node.parent.take();
        if let Some(parent) = parent {
            if parent == node.id {
                log::warn!("node {} cannot be its own parent", node.id);
                return Outcome::Rejected;
            }
            if !self.id_index.contains_key(&parent) {
                log::warn!("node {} references missing parent {parent}", node.id);
                return Outcome::Rejected;
            }
        }
        let id = node.id;
        self.insert_node(node);
        if let Some(parent) = parent {
            // A fresh node has no children, so linking cannot form a cycle.
            if let Err(err) = self.link_parent(id, parent) {
                return Outcome::Fatal(err);
            }
        }
        Outcome::Applied
    }

    fn reset_node(&mut self, node: Node) -> Outcome {
        let Some(idx) = self.index_of(node.id) else {
            return Outcome::Stale;
        };
        let id = node.id;
        let new_parent = node.parent;
        let old_parent = self.parent_index(idx).map(|p| self.graph[p].id);
        if new_parent != old_parent {
            if let Err(err) = self.validate_parent(id, new_parent) {
                return match err {
                    FlowError::ParentCycle(_) => Outcome::Fatal(err),
                    _ => {
                        log::warn!("node reset refused: {err}");
                        Outcome::Rejected
                    }
                };
            }
        }
        self.graph[idx] = node;
        if new_parent != old_parent {
            self.unlink_parent(idx);
            if let Some(parent) = new_parent
                && let Err(err) = self.link_parent(id, parent)
            {
                return Outcome::Fatal(err);
            }
        }
        Outcome::Applied
    }

    /// Remove a node and every edge touching it. Children are detached and
    /// keep their absolute position. Returns `false` for unknown ids.
    fn remove_node(&mut self, id: ElementId) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        for child in self.children(id) {
            let abs = self.absolute_position(child).ok();
            if let Some(cidx) = self.index_of(child) {
                self.unlink_parent(cidx);
                if let Some(abs) = abs {
                    self.graph[cidx].position = abs;
                }
            }
        }
        let before = self.edges.len();
        self.edges.retain(|e| !e.touches(id));
        if self.edges.len() != before {
            log::debug!("removed {} edge(s) with node {id}", before - self.edges.len());
            self.rebuild_edge_index();
        }
        self.graph.remove_node(idx);
        self.id_index.remove(&id);
        self.node_order.retain(|i| *i != idx);
        true
    }

    /// Re-parent a node, keeping its absolute position.
    ///
    /// Refuses self-parenting, missing parents and cycles.
    pub fn set_parent(&mut self, id: ElementId, parent: Option<ElementId>) -> Result<(), FlowError> {
        let idx = self.index_of(id).ok_or(FlowError::UnknownNode(id))?;
        self.validate_parent(id, parent)?;
        let abs = self.absolute_position(id)?;
        self.unlink_parent(idx);
        let rel = match parent {
            Some(p) => {
                let origin = self.absolute_position(p)?;
                self.link_parent(id, p)?;
                XYPosition::new(abs.x - origin.x, abs.y - origin.y)
            }
            None => abs,
        };
        self.graph[idx].position = rel;
        self.refresh();
        Ok(())
    }

    /// Prepare an edge for insertion without mutating the store.
    ///
    /// Returns `None` when an endpoint is missing, when it is a self loop on
    /// a single handle (allowed only in `Loose` mode), when its id is taken,
    /// or when an edge with the same connection already exists.
    pub fn prepare_edge(&self, edge: Edge) -> Option<Edge> {
        if !self.endpoints_exist(&edge) {
            log::debug!("edge {} rejected: missing endpoint", edge.id);
            return None;
        }
        let connection = edge.connection();
        if connection.is_self_loop_on_handle()
            && self.options.connection_mode != ConnectionMode::Loose
        {
            log::debug!("edge {} rejected: self loop on one handle", edge.id);
            return None;
        }
        if self.edge_index.contains_key(&edge.id) || self.connection_exists(&connection) {
            log::debug!("edge {} rejected: already exists", edge.id);
            return None;
        }
        Some(edge)
    }

    /// The edge `id` re-attached to `connection`, keeping its id and every
    /// other field. `None` when the edge is unknown or the new endpoints are
    /// rejected (missing node, single-handle self loop, taken by another
    /// edge). The store is not touched.
    pub fn reconnect_edge(&self, id: ElementId, connection: &Connection) -> Option<Edge> {
        let mut edge = self.edge(id)?.clone();
        edge.source = connection.source;
        edge.source_handle = connection.source_handle;
        edge.target = connection.target;
        edge.target_handle = connection.target_handle;
        if !self.endpoints_exist(&edge) {
            log::debug!("edge {id} not reconnected: missing endpoint");
            return None;
        }
        if connection.is_self_loop_on_handle()
            && self.options.connection_mode != ConnectionMode::Loose
        {
            log::debug!("edge {id} not reconnected: self loop on one handle");
            return None;
        }
        if self
            .edges
            .iter()
            .any(|e| e.id != id && e.connection() == *connection)
        {
            log::debug!("edge {id} not reconnected: connection already exists");
            return None;
        }
        Some(edge)
    }

    /// Validate and insert an edge. `None` when rejected; the store is
    /// untouched in that case.
    pub fn add_edge(&mut self, edge: Edge) -> Option<ElementId> {
        let edge = self.prepare_edge(edge)?;
        let id = edge.id;
        let report = self.apply_changes(&[EdgeChange::add(edge).into()]);
        (report.applied == 1).then_some(id)
    }

    /// Materialize a connection as an edge with the conventional id.
    pub fn connect(&mut self, connection: &Connection) -> Option<ElementId> {
        self.add_edge(Edge::from_connection(connection))
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn index_of(&self, id: ElementId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    fn node_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        let idx = self.index_of(id)?;
        self.graph.node_weight_mut(idx)
    }

    fn parent_index(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
    }

    fn insert_node(&mut self, mut node: Node) -> NodeIndex {
        node.parent = None;
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        self.node_order.push(idx);
        idx
    }

    fn validate_parent(&self, id: ElementId, parent: Option<ElementId>) -> Result<(), FlowError> {
        let Some(parent) = parent else {
            return Ok(());
        };
        if parent == id {
            return Err(FlowError::SelfParent(id));
        }
        if !self.id_index.contains_key(&parent) {
            return Err(FlowError::MissingParent { node: id, parent });
        }
        if self.is_ancestor_of(id, parent) {
            return Err(FlowError::ParentCycle(id));
        }
        Ok(())
    }

    fn link_parent(&mut self, child: ElementId, parent: ElementId) -> Result<(), FlowError> {
        self.validate_parent(child, Some(parent))?;
        let cidx = self.index_of(child).ok_or(FlowError::UnknownNode(child))?;
        let pidx = self.index_of(parent).ok_or(FlowError::UnknownNode(parent))?;
        self.unlink_parent(cidx);
        self.graph.add_edge(pidx, cidx, ());
        self.graph[cidx].parent = Some(parent);
        Ok(())
    }

    fn unlink_parent(&mut self, idx: NodeIndex) {
        if let Some(parent) = self.parent_index(idx)
            && let Some(link) = self.graph.find_edge(parent, idx)
        {
            self.graph.remove_edge(link);
        }
        self.graph[idx].parent = None;
    }

    fn endpoints_exist(&self, edge: &Edge) -> bool {
        self.id_index.contains_key(&edge.source) && self.id_index.contains_key(&edge.target)
    }

    fn rebuild_edge_index(&mut self) {
        self.edge_index.clear();
        for (i, e) in self.edges.iter().enumerate() {
            self.edge_index.insert(e.id, i);
        }
    }

    /// Rebuild every derived view.
    fn refresh(&mut self) {
        self.views.selected_nodes = self.nodes().filter(|n| n.selected).map(|n| n.id).collect();
        self.views.selected_edges = self
            .edges
            .iter()
            .filter(|e| e.selected)
            .map(|e| e.id)
            .collect();

        let mut connected: HashMap<ElementId, SmallVec<[ElementId; 4]>> = HashMap::new();
        for e in &self.edges {
            connected.entry(e.source).or_default().push(e.id);
            if e.target != e.source {
                connected.entry(e.target).or_default().push(e.id);
            }
        }
        self.views.connected = connected;

        self.refresh_visible();
    }

    fn refresh_visible(&mut self) {
        let cull = self.options.only_render_visible && !self.pane.is_empty();
        let area = self.viewport.flow_rect(self.pane);
        self.views.visible_nodes = self
            .nodes()
            .filter(|n| !n.hidden)
            .filter(|n| {
                !cull
                    || !n.is_measured()
                    || self.node_rect(n.id).is_some_and(|r| r.intersects(&area))
            })
            .map(|n| n.id)
            .collect();
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(FlowOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EdgeUpdatable;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> ElementId {
        ElementId::intern(s)
    }

    fn store_with(nodes: &[Node]) -> GraphStore {
        let mut store = GraphStore::default();
        let batch: Vec<FlowChange> = nodes
            .iter()
            .cloned()
            .map(|n| NodeChange::add(n).into())
            .collect();
        let report = store.apply_changes(&batch);
        assert_eq!(report.applied, nodes.len());
        store
    }

    #[test]
    fn add_and_lookup() {
        let store = store_with(&[Node::new("a", 0.0, 0.0), Node::new("b", 10.0, 0.0)]);
        assert_eq!(store.node_count(), 2);
        assert!(store.node(id("a")).is_some());
        let order: Vec<&str> = store.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let mut store = store_with(&[Node::new("a", 0.0, 0.0)]);
        let report = store.apply_changes(&[NodeChange::add(Node::new("a", 5.0, 5.0)).into()]);
        assert_eq!(report.rejected, 1);
        assert_eq!(store.node(id("a")).unwrap().position, XYPosition::ORIGIN);
    }

    #[test]
    fn stale_updates_are_counted_not_fatal() {
        let mut store = store_with(&[Node::new("a", 0.0, 0.0)]);
        let report = store.apply_changes(&[
            NodeChange::Select {
                id: id("ghost"),
                selected: true,
            }
            .into(),
            NodeChange::Select {
                id: id("a"),
                selected: true,
            }
            .into(),
            EdgeChange::Remove { id: id("nope") }.into(),
        ]);
        assert_eq!(report.applied, 1);
        assert_eq!(report.stale, 2);
        assert!(report.errors.is_empty());
        assert_eq!(store.selected_nodes(), &[id("a")]);
    }

    #[test]
    fn remove_node_prunes_exactly_incident_edges() {
        let mut store = store_with(&[
            Node::new("a", 0.0, 0.0),
            Node::new("b", 0.0, 0.0),
            Node::new("c", 0.0, 0.0),
        ]);
        store.apply_changes(&[
            EdgeChange::add(Edge::new("ab", "a", "b")).into(),
            EdgeChange::add(Edge::new("bc", "b", "c")).into(),
            EdgeChange::add(Edge::new("ac", "a", "c")).into(),
        ]);
        store.apply_changes(&[NodeChange::Remove { id: id("b") }.into()]);

        let left: Vec<&str> = store.edges().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(left, vec!["ac"]);
        assert!(store.connected_edges(id("b")).is_empty());
        assert_eq!(store.connected_edges(id("a")), &[id("ac")]);
    }

    #[test]
    fn dangling_edge_is_rejected() {
        let mut store = store_with(&[Node::new("a", 0.0, 0.0)]);
        let report = store.apply_changes(&[EdgeChange::add(Edge::new("e", "a", "zzz")).into()]);
        assert_eq!(report.rejected, 1);
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn connect_creates_conventional_edge_once() {
        let mut store = store_with(&[Node::new("A", 0.0, 0.0), Node::new("B", 100.0, 100.0)]);
        let c = Connection::new("A", "B");
        assert_eq!(store.connect(&c), Some(id("A-B")));
        assert_eq!(store.connect(&c), None);
        assert_eq!(store.edge_count(), 1);
        let edge = store.edge(id("A-B")).unwrap();
        assert_eq!(edge.source, id("A"));
        assert_eq!(edge.target, id("B"));
    }

    #[test]
    fn self_loop_on_one_handle_depends_on_mode() {
        let mut store = store_with(&[Node::new("a", 0.0, 0.0)]);
        let c = Connection::new("a", "a");
        assert_eq!(store.connect(&c), None);

        let options = FlowOptions {
            connection_mode: ConnectionMode::Loose,
            ..FlowOptions::default()
        };
        store.set_options(options);
        assert!(store.connect(&c).is_some());
    }

    #[test]
    fn nested_absolute_position() {
        let store = store_with(&[
            Node::new("group", 100.0, 100.0).with_size(300.0, 300.0),
            Node::new("inner", 10.0, 20.0).with_parent("group"),
            Node::new("leaf", 1.0, 2.0).with_parent("inner"),
        ]);
        assert_eq!(store.parent_of(id("leaf")), Some(id("inner")));
        assert_eq!(
            store.absolute_position(id("leaf")).unwrap(),
            XYPosition::new(111.0, 122.0)
        );
        assert!(store.is_ancestor_of(id("group"), id("leaf")));
        assert_eq!(store.children(id("group")), vec![id("inner")]);
    }

    #[test]
    fn self_parent_and_missing_parent_are_rejected() {
        let mut store = GraphStore::default();
        let report = store.apply_changes(&[
            NodeChange::add(Node::new("loop", 0.0, 0.0).with_parent("loop")).into(),
            NodeChange::add(Node::new("orphan", 0.0, 0.0).with_parent("nobody")).into(),
        ]);
        assert_eq!(report.rejected, 2);
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn reset_into_cycle_is_fatal_and_not_applied() {
        let mut store = store_with(&[
            Node::new("a", 0.0, 0.0),
            Node::new("b", 0.0, 0.0).with_parent("a"),
        ]);
        let mut a = store.node(id("a")).unwrap().clone();
        a.parent = Some(id("b"));
        let report = store.apply_changes(&[NodeChange::Reset { item: Box::new(a) }.into()]);
        assert_eq!(report.errors, vec![FlowError::ParentCycle(id("a"))]);
        assert_eq!(store.parent_of(id("a")), None);
    }

    #[test]
    fn set_parent_keeps_absolute_position() {
        let mut store = store_with(&[
            Node::new("group", 50.0, 50.0).with_size(100.0, 100.0),
            Node::new("n", 70.0, 80.0),
        ]);
        store.set_parent(id("n"), Some(id("group"))).unwrap();
        assert_eq!(store.node(id("n")).unwrap().position, XYPosition::new(20.0, 30.0));
        assert_eq!(
            store.absolute_position(id("n")).unwrap(),
            XYPosition::new(70.0, 80.0)
        );
        assert_eq!(
            store.set_parent(id("group"), Some(id("n"))),
            Err(FlowError::ParentCycle(id("group")))
        );
    }

    #[test]
    fn removing_parent_detaches_children() {
        let mut store = store_with(&[
            Node::new("group", 50.0, 50.0),
            Node::new("child", 5.0, 5.0).with_parent("group"),
        ]);
        store.apply_changes(&[NodeChange::Remove { id: id("group") }.into()]);
        let child = store.node(id("child")).unwrap();
        assert_eq!(child.parent, None);
        assert_eq!(child.position, XYPosition::new(55.0, 55.0));
    }

    #[test]
    fn selected_nodes_are_elevated() {
        let mut store = store_with(&[Node::new("a", 0.0, 0.0), Node::new("b", 0.0, 0.0)]);
        assert_eq!(store.node_render_order(), vec![id("a"), id("b")]);
        store.apply_changes(&[NodeChange::Select {
            id: id("a"),
            selected: true,
        }
        .into()]);
        assert_eq!(store.node_render_order(), vec![id("b"), id("a")]);
        assert_eq!(store.node_z(id("a")), SELECTED_Z_BOOST);
    }

    #[test]
    fn children_render_above_parent() {
        let mut group = Node::new("group", 0.0, 0.0);
        group.z_index = Some(5);
        let mut store = store_with(&[Node::new("child", 0.0, 0.0), group]);
        store.set_parent(id("child"), Some(id("group"))).unwrap();
        assert_eq!(store.node_z(id("child")), 6);
        assert_eq!(store.node_render_order(), vec![id("group"), id("child")]);
    }

    #[test]
    fn visible_nodes_follow_viewport() {
        let options = FlowOptions {
            only_render_visible: true,
            ..FlowOptions::default()
        };
        let mut store = GraphStore::new(options);
        store.set_pane(Dimensions::new(100.0, 100.0));
        store.apply_changes(&[
            NodeChange::add(Node::new("near", 10.0, 10.0).with_size(10.0, 10.0)).into(),
            NodeChange::add(Node::new("far", 500.0, 500.0).with_size(10.0, 10.0)).into(),
            NodeChange::add(Node::new("unmeasured", 900.0, 900.0)).into(),
        ]);
        assert_eq!(store.visible_nodes(), &[id("near"), id("unmeasured")]);

        store.set_viewport(ViewportTransform::new(-450.0, -450.0, 1.0));
        assert_eq!(store.visible_nodes(), &[id("far"), id("unmeasured")]);
    }

    #[test]
    fn viewport_zoom_is_clamped() {
        let mut store = GraphStore::default();
        assert!(store.set_viewport(ViewportTransform::new(0.0, 0.0, 5.0)));
        assert_eq!(store.viewport().zoom, 2.0);
    }

    #[test]
    fn node_at_prefers_topmost() {
        let mut store = store_with(&[
            Node::new("under", 0.0, 0.0).with_size(100.0, 100.0),
            Node::new("over", 50.0, 50.0).with_size(100.0, 100.0),
        ]);
        assert_eq!(store.node_at(XYPosition::new(60.0, 60.0)), Some(id("over")));
        assert_eq!(store.node_at(XYPosition::new(10.0, 10.0)), Some(id("under")));
        assert_eq!(store.node_at(XYPosition::new(500.0, 500.0)), None);

        store.apply_changes(&[NodeChange::Select {
            id: id("under"),
            selected: true,
        }
        .into()]);
        assert_eq!(store.node_at(XYPosition::new(60.0, 60.0)), Some(id("under")));
    }

    #[test]
    fn reconnect_keeps_id_and_rejects_taken_endpoints() {
        let mut store = store_with(&[
            Node::new("a", 0.0, 0.0),
            Node::new("b", 0.0, 0.0),
            Node::new("c", 0.0, 0.0),
        ]);
        let mut e = Edge::new("e1", "a", "b");
        e.label = Some("keep".into());
        store.add_edge(e).unwrap();
        store.add_edge(Edge::new("e2", "a", "c")).unwrap();

        // Moving e1 onto a -> c would duplicate e2.
        assert!(store.reconnect_edge(id("e1"), &Connection::new("a", "c")).is_none());
        assert!(store.reconnect_edge(id("e1"), &Connection::new("a", "zz")).is_none());
        assert!(store.reconnect_edge(id("nope"), &Connection::new("a", "b")).is_none());

        let moved = store.reconnect_edge(id("e1"), &Connection::new("c", "b")).unwrap();
        assert_eq!(moved.id, id("e1"));
        assert_eq!(moved.source, id("c"));
        assert_eq!(moved.label.as_deref(), Some("keep"));
        // Nothing is written until the reset is applied.
        assert_eq!(store.edge(id("e1")).unwrap().source, id("a"));

        store.apply_changes(&[EdgeChange::Reset {
            item: Box::new(moved),
        }
        .into()]);
        assert_eq!(store.edge(id("e1")).unwrap().source, id("c"));
        assert_eq!(store.connected_edges(id("c")).len(), 2);
    }

    #[test]
    fn updatable_end_falls_back_to_global_option() {
        let mut store = store_with(&[Node::new("a", 0.0, 0.0), Node::new("b", 0.0, 0.0)]);
        let mut e = Edge::new("e", "a", "b");
        assert!(store.is_edge_updatable(&e, HandleType::Source));

        store.set_options(FlowOptions {
            edges_updatable: EdgeUpdatable::Target,
            ..FlowOptions::default()
        });
        assert!(!store.is_edge_updatable(&e, HandleType::Source));
        assert!(store.is_edge_updatable(&e, HandleType::Target));

        e.updatable = Some(EdgeUpdatable::Both);
        assert!(store.is_edge_updatable(&e, HandleType::Source));
    }

    #[test]
    fn handle_edges_filter_by_end() {
        let mut store = store_with(&[Node::new("a", 0.0, 0.0), Node::new("b", 0.0, 0.0)]);
        let mut e = Edge::new("e1", "a", "b");
        e.source_handle = Some(id("out"));
        store.add_edge(e).unwrap();

        assert_eq!(store.handle_edges(id("a"), Some(id("out")), HandleType::Source).len(), 1);
        assert!(store.handle_edges(id("a"), None, HandleType::Source).is_empty());
        assert_eq!(store.handle_edges(id("b"), None, HandleType::Target).len(), 1);
        assert_eq!(store.incomers(id("b")), vec![id("a")]);
        assert_eq!(store.outgoers(id("a")), vec![id("b")]);
    }

    #[test]
    fn zero_min_zoom_never_reaches_zero() {
        let mut store = GraphStore::new(FlowOptions {
            min_zoom: 0.0,
            ..FlowOptions::default()
        });
        store.set_viewport(ViewportTransform::new(0.0, 0.0, 0.0));
        assert_eq!(store.viewport().zoom, crate::options::MIN_ZOOM_FLOOR);

        store.set_options(FlowOptions {
            min_zoom: -3.0,
            ..FlowOptions::default()
        });
        assert_eq!(store.options().min_zoom, crate::options::MIN_ZOOM_FLOOR);
    }
}
