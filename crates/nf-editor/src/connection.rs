//! Connection state machine.
//!
//! `Idle → Pending → (candidate updates) → Committed | Aborted → Idle`.
//! A press-and-release on a handle without moving parks the gesture in
//! `ClickPending` when click-to-connect is on; the next handle click then
//! commits or aborts it.
//!
//! Dragging an edge end runs the same machine with the edge's fixed end
//! as origin; it finishes as `Reconnected` or `UpdateAborted`.
//!
//! The engine never writes to the store. It reports outcomes and the
//! caller turns a commit into an edge.

use crate::handles::{HandleBounds, HandleRegistry};
use nf_core::geometry::XYPosition;
use nf_core::id::ElementId;
use nf_core::model::{ConnectingHandle, Connection, ConnectionMode, Edge, HandleType, Node};
use nf_core::store::GraphStore;
use nf_core::viewport::{ViewportTransform, screen_to_flow};
use std::rc::Rc;

/// What a validator sees besides the proposed connection.
pub struct ValidationContext<'a> {
    pub edges: &'a [Edge],
    pub source_node: Option<&'a Node>,
    pub target_node: Option<&'a Node>,
}

pub type ValidConnectionFn = Rc<dyn Fn(&Connection, &ValidationContext<'_>) -> bool>;

/// Decides what auto-connect materializes for a committed connection:
/// the connection itself, a rewritten one, or nothing.
pub type ConnectorFn = Rc<dyn Fn(&Connection) -> Option<Connection>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No candidate handle in range.
    Pending,
    Valid,
    Invalid,
}

/// Transient state of a connection gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionInProgress {
    pub origin: ConnectingHandle,
    /// Screen-space anchor of the origin handle.
    pub origin_anchor: XYPosition,
    /// Last pointer position, screen space.
    pub pointer: XYPosition,
    pub candidate: Option<ConnectingHandle>,
    /// The normalized connection to `candidate`, when there is one.
    pub connection: Option<Connection>,
    pub status: ConnectionStatus,
    /// The edge being re-attached, for an edge update.
    pub updating: Option<ElementId>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    /// Pointer is held down and dragging from the origin.
    Pending(ConnectionInProgress),
    /// Started by a click; waiting for a click on a second handle.
    ClickPending(ConnectionInProgress),
}

/// Result of feeding one step into the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionOutcome {
    /// Nothing happened (wrong state, refused start, ...).
    Ignored,
    Started(ConnectingHandle),
    Updated(ConnectionStatus),
    /// Moved to `ClickPending`.
    Parked,
    Committed(Connection),
    Aborted,
    UpdateStarted(ElementId),
    /// An edge update dropped on a valid handle.
    Reconnected {
        edge: ElementId,
        connection: Connection,
    },
    UpdateAborted(ElementId),
}

/// Line from the origin anchor to the pointer, in flow space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionLine {
    pub from: XYPosition,
    pub to: XYPosition,
    pub status: ConnectionStatus,
}

#[derive(Default)]
pub struct ConnectionEngine {
    state: ConnectionState,
    validator: Option<ValidConnectionFn>,
}

impl ConnectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, ConnectionState::Idle)
    }

    /// Install (or clear) the engine-wide `is_valid_connection` predicate.
    pub fn set_validator(&mut self, validator: Option<ValidConnectionFn>) {
        self.validator = validator;
    }

    fn progress(&self) -> Option<&ConnectionInProgress> {
        match &self.state {
            ConnectionState::Idle => None,
            ConnectionState::Pending(p) | ConnectionState::ClickPending(p) => Some(p),
        }
    }

    fn progress_mut(&mut self) -> Option<&mut ConnectionInProgress> {
        match &mut self.state {
            ConnectionState::Idle => None,
            ConnectionState::Pending(p) | ConnectionState::ClickPending(p) => Some(p),
        }
    }

    pub fn connection_line(&self, vp: &ViewportTransform) -> Option<ConnectionLine> {
        self.progress().map(|p| ConnectionLine {
            from: screen_to_flow(p.origin_anchor, vp),
            to: screen_to_flow(p.pointer, vp),
            status: p.status,
        })
    }

    /// Begin a drag-connection from `origin`.
    ///
    /// Only starts from `Idle`; a start while another gesture is pending
    /// is ignored.
    pub fn start(
        &mut self,
        origin: &ConnectingHandle,
        pointer: XYPosition,
        store: &GraphStore,
        handles: &HandleRegistry,
    ) -> ConnectionOutcome {
        if self.is_active() {
            log::debug!("connection start from {} ignored: gesture pending", origin.node_id);
            return ConnectionOutcome::Ignored;
        }
        let Some(progress) = Self::begin(origin, pointer, store, handles) else {
            return ConnectionOutcome::Ignored;
        };
        log::debug!("connection started at {}", origin.node_id);
        self.state = ConnectionState::Pending(progress);
        ConnectionOutcome::Started(*origin)
    }

    fn begin(
        origin: &ConnectingHandle,
        pointer: XYPosition,
        store: &GraphStore,
        handles: &HandleRegistry,
    ) -> Option<ConnectionInProgress> {
        let Some(node) = store.node(origin.node_id) else {
            log::warn!("connection start on unknown node {}", origin.node_id);
            return None;
        };
        if node.hidden || !store.is_node_connectable(node) {
            log::debug!("node {} is not connectable", origin.node_id);
            return None;
        }
        let bounds = handles.get(origin);
        if let Some(b) = bounds {
            if !b.connectable_start {
                log::debug!("handle on {} cannot start connections", origin.node_id);
                return None;
            }
            let existing = store.handle_edges(origin.node_id, origin.handle_id, origin.handle_type);
            if !b.connectable.allows(node, &existing) {
                log::debug!("handle on {} is full", origin.node_id);
                return None;
            }
        }
        Some(ConnectionInProgress {
            origin: *origin,
            origin_anchor: bounds.map(HandleBounds::anchor).unwrap_or(pointer),
            pointer,
            candidate: None,
            connection: None,
            status: ConnectionStatus::Pending,
            updating: None,
        })
    }

    /// Pick up the `end` of an edge. The other end stays attached and acts
    /// as the origin.
    pub fn start_update(
        &mut self,
        edge: ElementId,
        end: HandleType,
        pointer: XYPosition,
        store: &GraphStore,
        handles: &HandleRegistry,
    ) -> ConnectionOutcome {
        if self.is_active() {
            log::debug!("edge update on {edge} ignored: gesture pending");
            return ConnectionOutcome::Ignored;
        }
        let Some(e) = store.edge(edge) else {
            log::warn!("edge update on unknown edge {edge}");
            return ConnectionOutcome::Ignored;
        };
        if !store.is_edge_updatable(e, end) {
            log::debug!("edge {edge} cannot be updated at its {end:?} end");
            return ConnectionOutcome::Ignored;
        }
        let origin = e.end(end.opposite());
        log::debug!("edge update started on {edge}");
        self.state = ConnectionState::Pending(ConnectionInProgress {
            origin,
            origin_anchor: handles.get(&origin).map(HandleBounds::anchor).unwrap_or(pointer),
            pointer,
            candidate: None,
            connection: None,
            status: ConnectionStatus::Pending,
            updating: Some(edge),
        });
        ConnectionOutcome::UpdateStarted(edge)
    }

    /// The edge being re-attached, if an edge update is in flight.
    pub fn updating(&self) -> Option<ElementId> {
        self.progress().and_then(|p| p.updating)
    }

    /// Track the pointer and re-evaluate the candidate handle.
    pub fn update(
        &mut self,
        pointer: XYPosition,
        store: &GraphStore,
        handles: &HandleRegistry,
    ) -> ConnectionOutcome {
        let validator = self.validator.clone();
        let Some(progress) = self.progress_mut() else {
            return ConnectionOutcome::Ignored;
        };
        progress.pointer = pointer;
        let radius = store.options().connection_radius;
        match handles.hit_test_in(store, pointer, radius, Some(&progress.origin)) {
            Some(candidate) => {
                let (connection, valid) = evaluate(progress, candidate, store, validator.as_ref());
                progress.candidate = Some(candidate.as_connecting());
                progress.connection = Some(connection);
                progress.status = if valid {
                    ConnectionStatus::Valid
                } else {
                    ConnectionStatus::Invalid
                };
            }
            None => {
                progress.candidate = None;
                progress.connection = None;
                progress.status = ConnectionStatus::Pending;
            }
        }
        ConnectionOutcome::Updated(progress.status)
    }

    /// Release the pointer: commit a valid candidate, otherwise abort.
    pub fn end(
        &mut self,
        pointer: XYPosition,
        store: &GraphStore,
        handles: &HandleRegistry,
    ) -> ConnectionOutcome {
        if !matches!(self.state, ConnectionState::Pending(_)) {
            return ConnectionOutcome::Ignored;
        }
        self.update(pointer, store, handles);
        self.finish()
    }

    /// Turn a press-and-release on the origin into a click-connection.
    pub fn park(&mut self) -> ConnectionOutcome {
        match std::mem::take(&mut self.state) {
            ConnectionState::Pending(p) => {
                log::debug!("connection parked at {}", p.origin.node_id);
                self.state = ConnectionState::ClickPending(p);
                ConnectionOutcome::Parked
            }
            other => {
                self.state = other;
                ConnectionOutcome::Ignored
            }
        }
    }

    /// Click on a handle while click-to-connect is enabled.
    ///
    /// From `Idle` this starts a click-connection; from `ClickPending` it
    /// validates `handle` as the candidate and commits or aborts.
    pub fn click_handle(
        &mut self,
        handle: &ConnectingHandle,
        store: &GraphStore,
        handles: &HandleRegistry,
    ) -> ConnectionOutcome {
        match self.state {
            ConnectionState::Idle => {
                let anchor = handles
                    .get(handle)
                    .map(HandleBounds::anchor)
                    .unwrap_or_default();
                match Self::begin(handle, anchor, store, handles) {
                    Some(progress) => {
                        self.state = ConnectionState::ClickPending(progress);
                        ConnectionOutcome::Started(*handle)
                    }
                    None => ConnectionOutcome::Ignored,
                }
            }
            ConnectionState::ClickPending(_) => {
                let validator = self.validator.clone();
                if let Some(progress) = self.progress_mut() {
                    match handles.get(handle) {
                        Some(candidate) if *handle != progress.origin => {
                            let (connection, valid) =
                                evaluate(progress, candidate, store, validator.as_ref());
                            progress.candidate = Some(*handle);
                            progress.connection = Some(connection);
                            progress.status = if valid {
                                ConnectionStatus::Valid
                            } else {
                                ConnectionStatus::Invalid
                            };
                        }
                        _ => {
                            progress.candidate = None;
                            progress.connection = None;
                            progress.status = ConnectionStatus::Invalid;
                        }
                    }
                }
                self.finish()
            }
            ConnectionState::Pending(_) => ConnectionOutcome::Ignored,
        }
    }

    /// Abort whatever is in flight.
    pub fn cancel(&mut self) -> ConnectionOutcome {
        if !self.is_active() {
            return ConnectionOutcome::Ignored;
        }
        log::debug!("connection cancelled");
        let updating = self.updating();
        self.state = ConnectionState::Idle;
        match updating {
            Some(edge) => ConnectionOutcome::UpdateAborted(edge),
            None => ConnectionOutcome::Aborted,
        }
    }

    fn finish(&mut self) -> ConnectionOutcome {
        let state = std::mem::take(&mut self.state);
        match state {
            ConnectionState::Pending(p) | ConnectionState::ClickPending(p) => {
                match (p.status, p.connection, p.updating) {
                    (ConnectionStatus::Valid, Some(connection), Some(edge)) => {
                        log::debug!("edge {edge} reconnected");
                        ConnectionOutcome::Reconnected { edge, connection }
                    }
                    (ConnectionStatus::Valid, Some(connection), None) => {
                        log::debug!("connection committed: {}", connection.edge_id());
                        ConnectionOutcome::Committed(connection)
                    }
                    (_, _, Some(edge)) => {
                        log::debug!("edge update on {edge} aborted");
                        ConnectionOutcome::UpdateAborted(edge)
                    }
                    (_, _, None) => {
                        log::debug!("connection aborted");
                        ConnectionOutcome::Aborted
                    }
                }
            }
            ConnectionState::Idle => ConnectionOutcome::Ignored,
        }
    }
}

impl std::fmt::Debug for ConnectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEngine")
            .field("state", &self.state)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// Normalize and validate a candidate against the origin. An edge being
/// re-attached does not count against the candidate's connection limit.
fn evaluate(
    progress: &ConnectionInProgress,
    candidate: &HandleBounds,
    store: &GraphStore,
    global: Option<&ValidConnectionFn>,
) -> (Connection, bool) {
    let origin = &progress.origin;
    let target = candidate.as_connecting();
    let connection = origin.connect_to(&target);

    let mode_ok = match store.options().connection_mode {
        ConnectionMode::Strict => candidate.handle_type != origin.handle_type,
        ConnectionMode::Loose => target != *origin,
    };
    if !mode_ok || !candidate.connectable_end {
        return (connection, false);
    }

    let Some(node) = store.node(candidate.node_id) else {
        return (connection, false);
    };
    if node.hidden || !store.is_node_connectable(node) {
        return (connection, false);
    }
    let mut existing = store.handle_edges(target.node_id, target.handle_id, target.handle_type);
    existing.retain(|e| Some(e.id) != progress.updating);
    if !candidate.connectable.allows(node, &existing) {
        return (connection, false);
    }

    let valid = match candidate.is_valid_connection.as_ref().or(global) {
        Some(f) => {
            let ctx = ValidationContext {
                edges: store.edges(),
                source_node: store.node(connection.source),
                target_node: store.node(connection.target),
            };
            f(&connection, &ctx)
        }
        None => true,
    };
    (connection, valid)
}
