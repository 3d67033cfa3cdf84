//! The flow engine: one interactive diagram.
//!
//! Owns the graph store (single source of truth), the handle registry, the
//! connection state machine and whatever pointer gesture is in flight.
//! Input events are routed to the right interaction; interactions produce
//! change batches, which are committed atomically and announced on the
//! event bus.
//!
//! With `apply_default` off, interaction batches are only announced
//! (`NodesChange` / `EdgesChange`) and the host decides what to pass back
//! through [`FlowEngine::apply_changes`].

use crate::connection::{
    ConnectionEngine, ConnectionLine, ConnectionOutcome, ConnectionState, ConnectorFn,
    ValidConnectionFn,
};
use crate::drag::{DragStep, NodeDrag};
use crate::events::{EventBus, FlowEvent, ListenerId};
use crate::handles::{HandleBounds, HandleRegistry};
use crate::input::{InputEvent, Modifiers, PointerTarget};
use crate::keys::{KeyAction, KeyMap};
use crate::selection::{self, Marquee};
use nf_core::change::{ApplyReport, EdgeChange, FlowChange, NodeChange, split_changes};
use nf_core::error::FlowError;
use nf_core::geometry::{Dimensions, Rect, XYPosition, get_bounding_box};
use nf_core::id::ElementId;
use nf_core::model::{Connection, Edge, Node};
use nf_core::options::FlowOptions;
use nf_core::snapshot::FlowSnapshot;
use nf_core::store::GraphStore;
use nf_core::viewport::{
    ViewportTransform, ZOOM_STEP, center_on, clamp_zoom, get_transform_for_bounds, screen_to_flow,
};
use smallvec::SmallVec;

/// Pointer gesture in flight. At most one at a time.
#[derive(Debug, Default)]
enum Gesture {
    #[default]
    Idle,
    /// Pressed on a node: becomes a drag past the threshold, else a click.
    NodePress {
        node: ElementId,
        drag: Option<NodeDrag>,
        modifiers: Modifiers,
        /// Undoes the selection made when the drag started.
        reselect: Vec<FlowChange>,
    },
    EdgePress {
        edge: ElementId,
        modifiers: Modifiers,
    },
    /// Pressed on the empty pane: pans (when enabled) or clicks.
    PanePress { last: XYPosition, moved: bool },
    Marquee(Marquee),
    /// Drag-connection from a handle, or an edge end being dragged.
    Connecting { down: XYPosition, moved: bool },
}

pub struct FlowEngine {
    store: GraphStore,
    handles: HandleRegistry,
    connection: ConnectionEngine,
    connector: Option<ConnectorFn>,
    gesture: Gesture,
    bus: EventBus,
}

impl FlowEngine {
    pub fn new(options: FlowOptions) -> Self {
        Self::with_store(GraphStore::new(options))
    }

    pub fn from_snapshot(snapshot: FlowSnapshot, options: FlowOptions) -> Result<Self, FlowError> {
        Ok(Self::with_store(GraphStore::from_snapshot(snapshot, options)?))
    }

    fn with_store(store: GraphStore) -> Self {
        Self {
            store,
            handles: HandleRegistry::new(),
            connection: ConnectionEngine::new(),
            connector: None,
            gesture: Gesture::Idle,
            bus: EventBus::new(),
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn options(&self) -> &FlowOptions {
        self.store.options()
    }

    pub fn set_options(&mut self, options: FlowOptions) {
        let before = self.store.viewport();
        self.store.set_options(options);
        if self.store.viewport() != before {
            self.emit(FlowEvent::ViewportChange(self.store.viewport()));
        }
    }

    pub fn viewport(&self) -> ViewportTransform {
        self.store.viewport()
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    pub fn register_handle(&mut self, bounds: HandleBounds) {
        self.handles.register(bounds);
    }

    pub fn connection(&self) -> &ConnectionEngine {
        &self.connection
    }

    /// Install the engine-wide `is_valid_connection` predicate.
    pub fn set_is_valid_connection(&mut self, validator: Option<ValidConnectionFn>) {
        self.connection.set_validator(validator);
    }

    /// Install (or clear) the auto-connect hook. Only consulted while
    /// `auto_connect` is on.
    pub fn set_connector(&mut self, connector: Option<ConnectorFn>) {
        self.connector = connector;
    }

    /// Line to draw for the connection in progress, in flow space.
    pub fn connection_line(&self) -> Option<ConnectionLine> {
        self.connection.connection_line(&self.store.viewport())
    }

    /// Flow-space rectangle of the marquee in progress.
    pub fn marquee_rect(&self) -> Option<Rect> {
        match &self.gesture {
            Gesture::Marquee(m) => Some(m.rect()),
            _ => None,
        }
    }

    /// Node ids the marquee in progress would select.
    pub fn marquee_candidates(&self) -> &[ElementId] {
        match &self.gesture {
            Gesture::Marquee(m) => m.nodes(),
            _ => &[],
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&FlowEvent) + 'static) -> ListenerId {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }

    fn emit(&mut self, event: FlowEvent) {
        self.bus.emit(&event);
    }

    // ─── Input routing ───────────────────────────────────────────────────

    /// Route one input event. `target` is what the pointer is over; `None`
    /// lets the engine hit-test handles and nodes itself (edges can only be
    /// targeted explicitly).
    pub fn handle_input(&mut self, event: &InputEvent, target: Option<PointerTarget>) {
        match event {
            InputEvent::PointerDown { x, y, modifiers } => {
                let p = XYPosition::new(*x, *y);
                let target = target.unwrap_or_else(|| self.resolve_target(p));
                self.pointer_down(p, *modifiers, target);
            }
            InputEvent::PointerMove { x, y, .. } => self.pointer_move(XYPosition::new(*x, *y)),
            InputEvent::PointerUp { x, y, .. } => self.pointer_up(XYPosition::new(*x, *y)),
            InputEvent::PointerCancel => self.cancel_gesture(),
            InputEvent::Scroll {
                x,
                y,
                dx,
                dy,
                zoom,
            } => self.scroll(XYPosition::new(*x, *y), *dx, *dy, *zoom),
            InputEvent::Key { key, modifiers } => {
                if let Some(action) = KeyMap::resolve(key, *modifiers) {
                    self.key_action(action);
                }
            }
        }
    }

    /// What lies under a screen point: a handle, else an edge end, else the
    /// topmost node, else the pane.
    pub fn resolve_target(&self, p: XYPosition) -> PointerTarget {
        if let Some(h) = self.handles.hit_test_in(&self.store, p, 0.0, None) {
            return PointerTarget::Handle(h.as_connecting());
        }
        let radius = self.options().edge_updater_radius;
        if let Some((edge, end)) = self.handles.edge_end_at(&self.store, p, radius) {
            return PointerTarget::EdgeUpdater { edge, end };
        }
        let flow = screen_to_flow(p, &self.store.viewport());
        match self.store.node_at(flow) {
            Some(id) => PointerTarget::Node(id),
            None => PointerTarget::Pane,
        }
    }

    fn pointer_down(&mut self, p: XYPosition, modifiers: Modifiers, target: PointerTarget) {
        // A click-connection waits for the next handle click; anything else
        // abandons it.
        if matches!(self.connection.state(), ConnectionState::ClickPending(_)) {
            if let PointerTarget::Handle(h) = target {
                let outcome = self.connection.click_handle(&h, &self.store, &self.handles);
                self.on_connection(outcome);
                return;
            }
            let outcome = self.connection.cancel();
            self.on_connection(outcome);
        }

        if !matches!(self.gesture, Gesture::Idle) {
            log::debug!("pointer down ignored: gesture in progress");
            return;
        }

        self.gesture = match target {
            PointerTarget::Handle(h) => {
                let outcome = self.connection.start(&h, p, &self.store, &self.handles);
                let started = matches!(outcome, ConnectionOutcome::Started(_));
                self.on_connection(outcome);
                if started {
                    Gesture::Connecting {
                        down: p,
                        moved: false,
                    }
                } else {
                    Gesture::Idle
                }
            }
            PointerTarget::EdgeUpdater { edge, end } => {
                let outcome = self
                    .connection
                    .start_update(edge, end, p, &self.store, &self.handles);
                let started = matches!(outcome, ConnectionOutcome::UpdateStarted(_));
                self.on_connection(outcome);
                if started {
                    Gesture::Connecting {
                        down: p,
                        moved: false,
                    }
                } else {
                    Gesture::Idle
                }
            }
            PointerTarget::Node(node) => Gesture::NodePress {
                node,
                drag: NodeDrag::begin(&self.store, node, p),
                modifiers,
                reselect: Vec::new(),
            },
            PointerTarget::Edge(edge) => Gesture::EdgePress { edge, modifiers },
            PointerTarget::Pane => {
                // Shift draws a marquee; so does any pane drag when panning is off.
                let options = self.options();
                if options.elements_selectable && (modifiers.shift || !options.pan_on_drag) {
                    let start = screen_to_flow(p, &self.store.viewport());
                    Gesture::Marquee(Marquee::begin(start, modifiers.cmd()))
                } else {
                    Gesture::PanePress {
                        last: p,
                        moved: false,
                    }
                }
            }
        };
    }

    fn pointer_move(&mut self, p: XYPosition) {
        let mut gesture = std::mem::take(&mut self.gesture);
        match &mut gesture {
            Gesture::Idle => {
                // Keep the connection line of a click-connection under the pointer.
                if matches!(self.connection.state(), ConnectionState::ClickPending(_)) {
                    self.connection.update(p, &self.store, &self.handles);
                }
            }
            Gesture::Connecting { down, moved } => {
                if p != *down {
                    *moved = true;
                }
                self.connection.update(p, &self.store, &self.handles);
            }
            Gesture::NodePress {
                drag: Some(drag),
                modifiers,
                reselect,
                ..
            } => match drag.update(&self.store, p) {
                DragStep::Started(changes) => {
                    let grabbed = drag.grabbed();
                    if self.options().select_nodes_on_drag
                        && self.store.node(grabbed).is_some_and(|n| !n.selected)
                    {
                        let select =
                            selection::click_node(&self.store, grabbed, modifiers.multi_select());
                        *reselect = selection::invert(&select);
                        self.commit(select);
                    }
                    let nodes = drag.nodes();
                    self.emit(FlowEvent::NodeDragStart {
                        node: grabbed,
                        nodes: nodes.clone(),
                    });
                    self.commit(changes);
                    self.emit(FlowEvent::NodeDrag {
                        node: grabbed,
                        nodes,
                    });
                }
                DragStep::Moved(changes) => {
                    self.commit(changes);
                    self.emit(FlowEvent::NodeDrag {
                        node: drag.grabbed(),
                        nodes: drag.nodes(),
                    });
                }
                DragStep::BelowThreshold | DragStep::Unchanged => {}
            },
            Gesture::NodePress { drag: None, .. } | Gesture::EdgePress { .. } => {}
            Gesture::PanePress { last, moved } => {
                if p != *last {
                    *moved = true;
                    if self.options().pan_on_drag {
                        let mut vp = self.store.viewport();
                        vp.pan_by(p.x - last.x, p.y - last.y);
                        self.set_viewport(vp);
                    }
                    *last = p;
                }
            }
            Gesture::Marquee(marquee) => {
                let current = screen_to_flow(p, &self.store.viewport());
                marquee.update(&self.store, current);
            }
        }
        self.gesture = gesture;
    }

    fn pointer_up(&mut self, p: XYPosition) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => {}
            Gesture::Connecting { moved, .. } => {
                let updating = self.connection.updating().is_some();
                if !moved && !updating && self.options().connect_on_click {
                    self.connection.park();
                } else {
                    let outcome = self.connection.end(p, &self.store, &self.handles);
                    self.on_connection(outcome);
                }
            }
            Gesture::NodePress {
                node,
                drag,
                modifiers,
                ..
            } => match drag {
                Some(drag) if drag.is_started() => {
                    self.commit(drag.finish());
                    self.emit(FlowEvent::NodeDragStop {
                        node: drag.grabbed(),
                        nodes: drag.nodes(),
                    });
                }
                _ => {
                    let select = selection::click_node(&self.store, node, modifiers.multi_select());
                    self.commit(select);
                    self.emit(FlowEvent::NodeClick(node));
                }
            },
            Gesture::EdgePress { edge, modifiers } => {
                let select = selection::click_edge(&self.store, edge, modifiers.multi_select());
                self.commit(select);
                self.emit(FlowEvent::EdgeClick(edge));
            }
            Gesture::PanePress { moved, .. } => {
                if !moved {
                    self.pane_click(p);
                }
            }
            Gesture::Marquee(marquee) => {
                if marquee.has_area() {
                    let changes = marquee.commit(&self.store);
                    self.commit(changes);
                } else {
                    self.pane_click(p);
                }
            }
        }
    }

    fn pane_click(&mut self, p: XYPosition) {
        let deselect = selection::deselect_all(&self.store);
        self.commit(deselect);
        let flow = screen_to_flow(p, &self.store.viewport());
        self.emit(FlowEvent::PaneClick(flow));
    }

    /// Abort the gesture in flight, leaving the store as it was before it.
    pub fn cancel_gesture(&mut self) {
        match std::mem::take(&mut self.gesture) {
            Gesture::NodePress {
                drag: Some(drag),
                reselect,
                ..
            } if drag.is_started() => {
                self.commit(drag.cancel());
                self.commit(reselect);
                self.emit(FlowEvent::NodeDragStop {
                    node: drag.grabbed(),
                    nodes: drag.nodes(),
                });
            }
            _ => {}
        }
        let outcome = self.connection.cancel();
        self.on_connection(outcome);
    }

    fn is_busy(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle) || self.connection.is_active()
    }

    fn scroll(&mut self, anchor: XYPosition, dx: f32, dy: f32, zoom: f32) {
        let mut vp = self.store.viewport();
        if (zoom - 1.0).abs() > f32::EPSILON {
            let (min, max) = (self.options().min_zoom, self.options().max_zoom);
            if !vp.zoom_at(anchor, zoom, min, max) {
                return;
            }
        } else {
            vp.pan_by(-dx, -dy);
        }
        self.set_viewport(vp);
    }

    fn key_action(&mut self, action: KeyAction) {
        match action {
            KeyAction::Cancel => {
                if self.is_busy() {
                    self.cancel_gesture();
                } else {
                    let deselect = selection::deselect_all(&self.store);
                    self.commit(deselect);
                }
            }
            KeyAction::Delete => {
                if self.is_busy() {
                    log::debug!("delete ignored: gesture in progress");
                    return;
                }
                let changes = self.delete_selected_changes();
                self.commit(changes);
            }
            KeyAction::SelectAll => {
                let select = selection::select_all(&self.store);
                self.commit(select);
            }
            KeyAction::ZoomIn => {
                self.zoom_in();
            }
            KeyAction::ZoomOut => {
                self.zoom_out();
            }
            KeyAction::FitView => {
                self.fit_view(None);
            }
        }
    }

    /// Removal batch for the selected deletable elements: edge removals
    /// first (selected edges plus every edge of a removed node), then nodes.
    fn delete_selected_changes(&self) -> Vec<FlowChange> {
        let nodes: Vec<ElementId> = self
            .store
            .selected_nodes()
            .iter()
            .copied()
            .filter(|id| {
                self.store
                    .node(*id)
                    .is_some_and(|n| self.store.is_node_deletable(n))
            })
            .collect();

        let mut edges: SmallVec<[ElementId; 8]> = self
            .store
            .selected_edges()
            .iter()
            .copied()
            .filter(|id| {
                self.store
                    .edge(*id)
                    .is_some_and(|e| self.store.is_edge_deletable(e))
            })
            .collect();
        for node in &nodes {
            for edge in self.store.connected_edges(*node) {
                if !edges.contains(edge) {
                    edges.push(*edge);
                }
            }
        }

        let mut changes: Vec<FlowChange> = edges
            .into_iter()
            .map(|id| EdgeChange::Remove { id }.into())
            .collect();
        changes.extend(nodes.into_iter().map(|id| FlowChange::from(NodeChange::Remove { id })));
        changes
    }

    fn on_connection(&mut self, outcome: ConnectionOutcome) {
        match outcome {
            ConnectionOutcome::Started(handle) => self.emit(FlowEvent::ConnectStart(handle)),
            ConnectionOutcome::Committed(connection) => {
                self.emit(FlowEvent::Connect(connection));
                let materialize = if !self.options().auto_connect {
                    None
                } else if let Some(connector) = &self.connector {
                    connector(&connection)
                } else {
                    Some(connection)
                };
                if let Some(edge) = materialize.and_then(|c| self.new_edge(&c)) {
                    self.commit(vec![EdgeChange::add(edge).into()]);
                }
                self.emit(FlowEvent::ConnectEnd(Some(connection)));
            }
            ConnectionOutcome::Aborted => self.emit(FlowEvent::ConnectEnd(None)),
            ConnectionOutcome::UpdateStarted(edge) => self.emit(FlowEvent::EdgeUpdateStart(edge)),
            ConnectionOutcome::Reconnected { edge, connection } => {
                self.emit(FlowEvent::EdgeUpdate { edge, connection });
                if let Some(updated) = self.store.reconnect_edge(edge, &connection) {
                    self.commit(vec![EdgeChange::Reset {
                        item: Box::new(updated),
                    }
                    .into()]);
                }
                self.emit(FlowEvent::EdgeUpdateEnd(edge));
            }
            ConnectionOutcome::UpdateAborted(edge) => self.emit(FlowEvent::EdgeUpdateEnd(edge)),
            ConnectionOutcome::Ignored
            | ConnectionOutcome::Updated(_)
            | ConnectionOutcome::Parked => {}
        }
    }

    /// A validated edge for `connection`, with the default edge options
    /// stamped on.
    fn new_edge(&self, connection: &Connection) -> Option<Edge> {
        let mut edge = Edge::from_connection(connection);
        if let Some(defaults) = &self.options().default_edge_options {
            defaults.apply_to(&mut edge);
        }
        self.store.prepare_edge(edge)
    }

    // ─── Committing ──────────────────────────────────────────────────────

    /// Announce an interaction batch and, unless the host took over
    /// application, apply it.
    fn commit(&mut self, changes: Vec<FlowChange>) {
        if changes.is_empty() {
            return;
        }
        let (nodes, edges) = split_changes(&changes);
        if !nodes.is_empty() {
            self.emit(FlowEvent::NodesChange(nodes));
        }
        if !edges.is_empty() {
            self.emit(FlowEvent::EdgesChange(edges));
        }
        if self.options().apply_default {
            self.apply(&changes);
        }
    }

    /// Apply a batch, then report selection changes and fatal errors.
    fn apply(&mut self, changes: &[FlowChange]) -> ApplyReport {
        let nodes_before = self.store.selected_nodes().to_vec();
        let edges_before = self.store.selected_edges().to_vec();

        let report = self.store.apply_changes(changes);

        for change in changes {
            if let FlowChange::Node(NodeChange::Remove { id }) = change
                && !self.store.contains_node(*id)
            {
                self.handles.unregister_node(*id);
            }
        }
        if self.store.selected_nodes() != nodes_before.as_slice()
            || self.store.selected_edges() != edges_before.as_slice()
        {
            self.emit(FlowEvent::SelectionChange {
                nodes: self.store.selected_nodes().to_vec(),
                edges: self.store.selected_edges().to_vec(),
            });
        }
        for err in &report.errors {
            self.emit(FlowEvent::Error(err.clone()));
        }
        report
    }

    // ─── Programmatic API ────────────────────────────────────────────────

    /// Apply a batch directly (host-driven; not re-announced as
    /// `NodesChange` / `EdgesChange`).
    pub fn apply_changes(&mut self, changes: &[FlowChange]) -> ApplyReport {
        self.apply(changes)
    }

    pub fn add_nodes(&mut self, nodes: Vec<Node>) -> ApplyReport {
        let changes: Vec<FlowChange> = nodes.into_iter().map(|n| NodeChange::add(n).into()).collect();
        self.apply(&changes)
    }

    pub fn remove_nodes(&mut self, ids: &[ElementId]) -> ApplyReport {
        let changes: Vec<FlowChange> = ids
            .iter()
            .map(|id| NodeChange::Remove { id: *id }.into())
            .collect();
        self.apply(&changes)
    }

    /// Materialize a connection as an edge. `None` when it is rejected
    /// (missing endpoint, duplicate, single-handle self loop).
    pub fn add_edge(&mut self, connection: &Connection) -> Option<ElementId> {
        let edge = self.new_edge(connection)?;
        let id = edge.id;
        let report = self.apply(&[EdgeChange::add(edge).into()]);
        (report.applied == 1).then_some(id)
    }

    /// Renderer write-back of a node's measured size.
    pub fn update_node_dimensions(&mut self, id: ElementId, dimensions: Dimensions) -> bool {
        let report = self.apply(&[NodeChange::Dimensions {
            id,
            dimensions: Some(dimensions),
        }
        .into()]);
        report.applied == 1
    }

    /// Set the viewport (clamped). Returns `true` when it changed.
    pub fn set_viewport(&mut self, vp: ViewportTransform) -> bool {
        if !self.store.set_viewport(vp) {
            return false;
        }
        self.emit(FlowEvent::ViewportChange(self.store.viewport()));
        true
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) -> bool {
        let mut vp = self.store.viewport();
        vp.pan_by(dx, dy);
        self.set_viewport(vp)
    }

    /// Zoom around the pane centre.
    pub fn zoom_to(&mut self, zoom: f32) -> bool {
        let current = self.store.viewport().zoom;
        self.zoom_by(zoom / current)
    }

    pub fn zoom_in(&mut self) -> bool {
        self.zoom_by(ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.zoom_by(1.0 / ZOOM_STEP)
    }

    fn zoom_by(&mut self, factor: f32) -> bool {
        let pane = self.store.pane();
        let center = XYPosition::new(pane.width / 2.0, pane.height / 2.0);
        let (min, max) = (self.options().min_zoom, self.options().max_zoom);
        let mut vp = self.store.viewport();
        if !vp.zoom_at(center, factor, min, max) {
            return false;
        }
        self.set_viewport(vp)
    }

    /// Fit every visible, measured node into the pane. Returns `false` when
    /// there is nothing to fit or the pane size is unknown.
    pub fn fit_view(&mut self, padding: Option<f32>) -> bool {
        let pane = self.store.pane();
        if pane.is_empty() {
            log::debug!("fit_view skipped: pane size unknown");
            return false;
        }
        let rects: Vec<Rect> = self
            .store
            .nodes()
            .filter(|n| !n.hidden && n.is_measured())
            .filter_map(|n| self.store.node_rect(n.id))
            .collect();
        if rects.is_empty() {
            return false;
        }
        let bounds = get_bounding_box(&rects).to_rect();
        let options = self.options();
        let padding = padding.unwrap_or(options.fit_view_padding);
        let vp = get_transform_for_bounds(&bounds, pane, options.min_zoom, options.max_zoom, padding);
        self.set_viewport(vp);
        true
    }

    /// Centre the viewport on a flow point, optionally changing the zoom.
    pub fn set_center(&mut self, x: f32, y: f32, zoom: Option<f32>) -> bool {
        let options = self.options();
        let zoom = clamp_zoom(
            zoom.unwrap_or(self.store.viewport().zoom),
            options.min_zoom,
            options.max_zoom,
        );
        let vp = center_on(x, y, zoom, self.store.pane());
        self.set_viewport(vp)
    }

    pub fn set_pane_size(&mut self, pane: Dimensions) {
        self.store.set_pane(pane);
        // A new pane size can push the viewport past the translate extent.
        let vp = self.store.viewport();
        self.set_viewport(vp);
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        self.store.to_snapshot()
    }

    /// Replace the whole flow. The current store is kept when the snapshot
    /// is invalid.
    pub fn restore(&mut self, snapshot: FlowSnapshot) -> Result<(), FlowError> {
        let mut store = GraphStore::from_snapshot(snapshot, self.options().clone())?;
        self.cancel_gesture();
        store.set_pane(self.store.pane());
        self.store = store;
        self.handles = HandleRegistry::new();
        let vp = self.store.viewport();
        self.store.set_viewport(vp);
        self.emit(FlowEvent::ViewportChange(self.store.viewport()));
        Ok(())
    }
}

impl Default for FlowEngine {
    fn default() -> Self {
        Self::new(FlowOptions::default())
    }
}

impl std::fmt::Debug for FlowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowEngine")
            .field("nodes", &self.store.node_count())
            .field("edges", &self.store.edge_count())
            .field("gesture", &self.gesture)
            .field("connection", &self.connection)
            .field("connector", &self.connector.is_some())
            .finish_non_exhaustive()
    }
}
