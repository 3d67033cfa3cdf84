//! Core diagram data model: nodes, edges and connections.
//!
//! Nodes and edges are plain serde-friendly values. The store owns them;
//! everything else refers to them by [`ElementId`]. Capability flags are
//! tri-state: `Some(_)` is an explicit per-element value, `None` inherits
//! the global default from [`FlowOptions`](crate::options::FlowOptions).

use crate::geometry::{CoordinateExtent, Dimensions, XYPosition};
use crate::id::ElementId;
use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::rc::Rc;

fn default_kind() -> String {
    "default".to_string()
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// Bounds a node may be dragged within.
///
/// In JSON either a bare extent `[[x0, y0], [x1, y1]]` or the string
/// `"parent"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeExtent {
    /// A flow-space rectangle.
    Rect(CoordinateExtent),
    /// The parent node's own box (nested flows only).
    Parent,
}

impl Serialize for NodeExtent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NodeExtent::Rect(extent) => extent.serialize(serializer),
            NodeExtent::Parent => serializer.serialize_str("parent"),
        }
    }
}

impl<'de> Deserialize<'de> for NodeExtent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Rect(CoordinateExtent),
            Keyword(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Rect(extent) => Ok(NodeExtent::Rect(extent)),
            Repr::Keyword(k) if k == "parent" => Ok(NodeExtent::Parent),
            Repr::Keyword(k) => Err(D::Error::invalid_value(
                Unexpected::Str(&k),
                &"\"parent\" or [[x0, y0], [x1, y1]]",
            )),
        }
    }
}

/// A single node in the diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: ElementId,

    /// Render template tag; opaque to the engine.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,

    /// Relative to the parent's origin when `parent` is set, else absolute.
    pub position: XYPosition,

    /// Explicit size. Takes precedence over `measured`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Dimensions>,

    /// Size reported back by the renderer after layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured: Option<Dimensions>,

    #[serde(default)]
    pub data: serde_json::Value,

    #[serde(default)]
    pub selected: bool,

    /// Set while a drag gesture is moving this node.
    #[serde(default, skip_serializing)]
    pub dragging: bool,

    #[serde(default)]
    pub hidden: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletable: Option<bool>,

    #[serde(default, rename = "parentNode", skip_serializing_if = "Option::is_none")]
    pub parent: Option<ElementId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<NodeExtent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

impl Node {
    pub fn new(id: impl Into<ElementId>, x: f32, y: f32) -> Self {
        Self {
            id: id.into(),
            kind: default_kind(),
            position: XYPosition::new(x, y),
            size: None,
            measured: None,
            data: serde_json::Value::Null,
            selected: false,
            dragging: false,
            hidden: false,
            draggable: None,
            selectable: None,
            connectable: None,
            deletable: None,
            parent: None,
            extent: None,
            z_index: None,
        }
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Some(Dimensions::new(width, height));
        self
    }

    pub fn with_parent(mut self, parent: impl Into<ElementId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Explicit size, else measured size, else zero.
    pub fn dimensions(&self) -> Dimensions {
        self.size.or(self.measured).unwrap_or(Dimensions::ZERO)
    }

    /// Has the node been given or measured a size yet?
    pub fn is_measured(&self) -> bool {
        self.size.is_some() || self.measured.is_some()
    }
}

// ─── Edges ───────────────────────────────────────────────────────────────

/// A visual connection between two node handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: ElementId,
    pub source: ElementId,
    pub target: ElementId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<ElementId>,

    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub data: serde_json::Value,

    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub animated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletable: Option<bool>,
    /// Which ends may be dragged onto another handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updatable: Option<EdgeUpdatable>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

impl Edge {
    /// An edge with an explicit id and no handles.
    pub fn new(
        id: impl Into<ElementId>,
        source: impl Into<ElementId>,
        target: impl Into<ElementId>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            kind: default_kind(),
            label: None,
            data: serde_json::Value::Null,
            selected: false,
            hidden: false,
            animated: false,
            selectable: None,
            deletable: None,
            updatable: None,
            z_index: None,
        }
    }

    /// An edge materialized from a connection, with the conventional id.
    pub fn from_connection(connection: &Connection) -> Self {
        let mut edge = Self::new(connection.edge_id(), connection.source, connection.target);
        edge.source_handle = connection.source_handle;
        edge.target_handle = connection.target_handle;
        edge
    }

    pub fn connection(&self) -> Connection {
        Connection {
            source: self.source,
            source_handle: self.source_handle,
            target: self.target,
            target_handle: self.target_handle,
        }
    }

    pub fn touches(&self, node: ElementId) -> bool {
        self.source == node || self.target == node
    }

    /// The handle this edge is attached to at `end`.
    pub fn end(&self, end: HandleType) -> ConnectingHandle {
        match end {
            HandleType::Source => ConnectingHandle {
                node_id: self.source,
                handle_id: self.source_handle,
                handle_type: HandleType::Source,
            },
            HandleType::Target => ConnectingHandle {
                node_id: self.target,
                handle_id: self.target_handle,
                handle_type: HandleType::Target,
            },
        }
    }
}

/// Which ends of an edge may be re-attached by dragging.
///
/// In JSON a bool or `"source"` / `"target"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeUpdatable {
    #[default]
    Both,
    Source,
    Target,
    Neither,
}

impl EdgeUpdatable {
    pub fn allows(self, end: HandleType) -> bool {
        match self {
            Self::Both => true,
            Self::Neither => false,
            Self::Source => end == HandleType::Source,
            Self::Target => end == HandleType::Target,
        }
    }
}

impl From<bool> for EdgeUpdatable {
    fn from(b: bool) -> Self {
        if b { Self::Both } else { Self::Neither }
    }
}

impl Serialize for EdgeUpdatable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Both => serializer.serialize_bool(true),
            Self::Neither => serializer.serialize_bool(false),
            Self::Source => serializer.serialize_str("source"),
            Self::Target => serializer.serialize_str("target"),
        }
    }
}

impl<'de> Deserialize<'de> for EdgeUpdatable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            End(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Flag(b) => Ok(b.into()),
            Repr::End(end) => match end.as_str() {
                "source" => Ok(Self::Source),
                "target" => Ok(Self::Target),
                _ => Err(D::Error::invalid_value(
                    Unexpected::Str(&end),
                    &"a bool, \"source\" or \"target\"",
                )),
            },
        }
    }
}

/// Fields stamped onto edges the engine creates from a connection.
/// Unset fields leave the edge's own defaults alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DefaultEdgeOptions {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updatable: Option<EdgeUpdatable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

impl DefaultEdgeOptions {
    pub fn apply_to(&self, edge: &mut Edge) {
        if let Some(kind) = &self.kind {
            edge.kind.clone_from(kind);
        }
        if self.label.is_some() {
            edge.label.clone_from(&self.label);
        }
        if let Some(data) = &self.data {
            edge.data = data.clone();
        }
        if let Some(animated) = self.animated {
            edge.animated = animated;
        }
        if let Some(hidden) = self.hidden {
            edge.hidden = hidden;
        }
        edge.selectable = self.selectable.or(edge.selectable);
        edge.deletable = self.deletable.or(edge.deletable);
        edge.updatable = self.updatable.or(edge.updatable);
        edge.z_index = self.z_index.or(edge.z_index);
    }
}

// ─── Connections ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandleType {
    Source,
    Target,
}

impl HandleType {
    pub fn opposite(self) -> Self {
        match self {
            Self::Source => Self::Target,
            Self::Target => Self::Source,
        }
    }
}

/// Which handle types may pair up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionMode {
    /// Only a source handle may connect to a target handle.
    #[default]
    Strict,
    /// Any handle may connect to any other handle.
    Loose,
}

/// A resolved `source → target` tuple, either proposed or committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: ElementId,
    pub source_handle: Option<ElementId>,
    pub target: ElementId,
    pub target_handle: Option<ElementId>,
}

impl Connection {
    pub fn new(source: impl Into<ElementId>, target: impl Into<ElementId>) -> Self {
        Self {
            source: source.into(),
            source_handle: None,
            target: target.into(),
            target_handle: None,
        }
    }

    /// Conventional edge id: `"{source}{sourceHandle}-{target}{targetHandle}"`.
    pub fn edge_id(&self) -> ElementId {
        let sh = self.source_handle.as_ref().map_or("", |h| h.as_str());
        let th = self.target_handle.as_ref().map_or("", |h| h.as_str());
        ElementId::intern(&format!(
            "{}{sh}-{}{th}",
            self.source.as_str(),
            self.target.as_str()
        ))
    }

    /// Identical-handle self loop.
    pub fn is_self_loop_on_handle(&self) -> bool {
        self.source == self.target && self.source_handle == self.target_handle
    }
}

/// A handle taking part in a connection gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectingHandle {
    pub node_id: ElementId,
    pub handle_id: Option<ElementId>,
    pub handle_type: HandleType,
}

impl ConnectingHandle {
    pub fn new(node_id: impl Into<ElementId>, handle_id: Option<&str>, handle_type: HandleType) -> Self {
        Self {
            node_id: node_id.into(),
            handle_id: handle_id.map(ElementId::intern),
            handle_type,
        }
    }

    /// Build the normalized connection between this (origin) handle and
    /// `other`: the origin keeps the slot of its own type.
    pub fn connect_to(&self, other: &ConnectingHandle) -> Connection {
        match self.handle_type {
            HandleType::Source => Connection {
                source: self.node_id,
                source_handle: self.handle_id,
                target: other.node_id,
                target_handle: other.handle_id,
            },
            HandleType::Target => Connection {
                source: other.node_id,
                source_handle: other.handle_id,
                target: self.node_id,
                target_handle: self.handle_id,
            },
        }
    }
}

// ─── Capability predicates ───────────────────────────────────────────────

pub type HandleConnectableFn = Rc<dyn Fn(&Node, &[&Edge]) -> bool>;

/// Whether a handle may take part in (another) connection.
#[derive(Clone, Default)]
pub enum HandleConnectable {
    #[default]
    Always,
    Never,
    /// At most `n` edges on this handle; `MaxCount(1)` is "single".
    MaxCount(usize),
    Custom(HandleConnectableFn),
}

impl HandleConnectable {
    /// Evaluate against the node and the edges already on the handle.
    pub fn allows(&self, node: &Node, connected: &[&Edge]) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::MaxCount(n) => connected.len() < *n,
            Self::Custom(f) => f(node, connected),
        }
    }
}

impl fmt::Debug for HandleConnectable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("Always"),
            Self::Never => f.write_str("Never"),
            Self::MaxCount(n) => write!(f, "MaxCount({n})"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<bool> for HandleConnectable {
    fn from(b: bool) -> Self {
        if b { Self::Always } else { Self::Never }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_id_convention() {
        let c = Connection::new("A", "B");
        assert_eq!(c.edge_id().as_str(), "A-B");

        let c = Connection {
            source_handle: Some(ElementId::intern("out")),
            target_handle: Some(ElementId::intern("in")),
            ..Connection::new("A", "B")
        };
        assert_eq!(c.edge_id().as_str(), "Aout-Bin");
    }

    #[test]
    fn updatable_accepts_flag_or_end() {
        let e: Edge =
            serde_json::from_str(r#"{ "id": "e", "source": "a", "target": "b", "updatable": "target" }"#)
                .unwrap();
        assert_eq!(e.updatable, Some(EdgeUpdatable::Target));
        assert!(!EdgeUpdatable::Target.allows(HandleType::Source));
        assert!(EdgeUpdatable::Target.allows(HandleType::Target));

        let e: Edge =
            serde_json::from_str(r#"{ "id": "e", "source": "a", "target": "b", "updatable": false }"#)
                .unwrap();
        assert_eq!(e.updatable, Some(EdgeUpdatable::Neither));
        assert_eq!(serde_json::to_value(EdgeUpdatable::Both).unwrap(), serde_json::json!(true));
        assert!(serde_json::from_str::<EdgeUpdatable>(r#""middle""#).is_err());
    }

    #[test]
    fn default_edge_options_fill_only_what_they_set() {
        let defaults: DefaultEdgeOptions =
            serde_json::from_str(r#"{ "type": "smoothstep", "animated": true, "zIndex": 3 }"#).unwrap();
        let mut edge = Edge::new("e", "a", "b");
        edge.deletable = Some(false);
        defaults.apply_to(&mut edge);
        assert_eq!(edge.kind, "smoothstep");
        assert!(edge.animated);
        assert_eq!(edge.z_index, Some(3));
        assert_eq!(edge.deletable, Some(false));
        assert_eq!(edge.label, None);
    }

    #[test]
    fn edge_end_names_the_attached_handle() {
        let mut e = Edge::new("e", "a", "b");
        e.target_handle = Some(ElementId::intern("in"));
        assert_eq!(e.end(HandleType::Source), ConnectingHandle::new("a", None, HandleType::Source));
        assert_eq!(e.end(HandleType::Target), ConnectingHandle::new("b", Some("in"), HandleType::Target));
    }

    #[test]
    fn origin_keeps_its_own_slot() {
        let a_src = ConnectingHandle::new("A", None, HandleType::Source);
        let b_tgt = ConnectingHandle::new("B", None, HandleType::Target);

        // Started on A's source handle.
        let forward = a_src.connect_to(&b_tgt);
        // Started on B's target handle.
        let backward = b_tgt.connect_to(&a_src);

        assert_eq!(forward, backward);
        assert_eq!(forward.source.as_str(), "A");
        assert_eq!(forward.target.as_str(), "B");
    }

    #[test]
    fn handle_connectable_variants() {
        let node = Node::new("n", 0.0, 0.0);
        let edge = Edge::new("e", "n", "m");
        let one = [&edge];

        assert!(HandleConnectable::Always.allows(&node, &one));
        assert!(!HandleConnectable::Never.allows(&node, &[]));
        assert!(HandleConnectable::MaxCount(1).allows(&node, &[]));
        assert!(!HandleConnectable::MaxCount(1).allows(&node, &one));

        let custom = HandleConnectable::Custom(Rc::new(|n: &Node, _: &[&Edge]| n.id.as_str() == "n"));
        assert!(custom.allows(&node, &[]));
    }

    #[test]
    fn node_dimensions_prefer_explicit_size() {
        let mut node = Node::new("sized", 0.0, 0.0);
        assert_eq!(node.dimensions(), Dimensions::ZERO);
        assert!(!node.is_measured());

        node.measured = Some(Dimensions::new(10.0, 10.0));
        assert_eq!(node.dimensions(), Dimensions::new(10.0, 10.0));

        node.size = Some(Dimensions::new(40.0, 20.0));
        assert_eq!(node.dimensions(), Dimensions::new(40.0, 20.0));
    }

    #[test]
    fn node_json_shape() {
        let json = r#"{"id":"n1","position":{"x":5.0,"y":6.0},"parentNode":"g","extent":"parent"}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.kind, "default");
        assert_eq!(node.parent, Some(ElementId::intern("g")));
        assert_eq!(node.extent, Some(NodeExtent::Parent));
    }

    #[test]
    fn extent_accepts_bare_rect_or_parent() {
        let rect: NodeExtent = serde_json::from_str("[[0, 0], [100, 50]]").unwrap();
        assert_eq!(rect, NodeExtent::Rect(CoordinateExtent::new(0.0, 0.0, 100.0, 50.0)));
        let parent: NodeExtent = serde_json::from_str(r#""parent""#).unwrap();
        assert_eq!(parent, NodeExtent::Parent);
        assert!(serde_json::from_str::<NodeExtent>(r#""sibling""#).is_err());

        assert_eq!(serde_json::to_string(&NodeExtent::Parent).unwrap(), r#""parent""#);
        assert_eq!(
            serde_json::to_string(&rect).unwrap(),
            "[[0.0,0.0],[100.0,50.0]]"
        );
    }
}
