//! Change descriptors: the only way to mutate a [`GraphStore`](crate::store::GraphStore).
//!
//! Interactions never touch the collections directly; they build a batch
//! of descriptors and hand it to `GraphStore::apply_changes`, or report it
//! to the host when default application is disabled.

use crate::geometry::{Dimensions, XYPosition};
use crate::id::ElementId;
use crate::model::{Edge, Node};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeChange {
    Add {
        item: Box<Node>,
    },
    Remove {
        id: ElementId,
    },
    Select {
        id: ElementId,
        selected: bool,
    },
    /// `position: None` only updates the dragging flag.
    Position {
        id: ElementId,
        position: Option<XYPosition>,
        dragging: bool,
    },
    /// Measured size written back by the renderer.
    Dimensions {
        id: ElementId,
        dimensions: Option<Dimensions>,
    },
    /// Replace the node with the same id.
    Reset {
        item: Box<Node>,
    },
}

impl NodeChange {
    pub fn add(node: Node) -> Self {
        Self::Add {
            item: Box::new(node),
        }
    }

    pub fn id(&self) -> ElementId {
        match self {
            Self::Add { item } | Self::Reset { item } => item.id,
            Self::Remove { id }
            | Self::Select { id, .. }
            | Self::Position { id, .. }
            | Self::Dimensions { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EdgeChange {
    Add { item: Box<Edge> },
    Remove { id: ElementId },
    Select { id: ElementId, selected: bool },
    Reset { item: Box<Edge> },
}

impl EdgeChange {
    pub fn add(edge: Edge) -> Self {
        Self::Add {
            item: Box::new(edge),
        }
    }

    pub fn id(&self) -> ElementId {
        match self {
            Self::Add { item } | Self::Reset { item } => item.id,
            Self::Remove { id } | Self::Select { id, .. } => *id,
        }
    }
}

/// One atomic mutation intent against either collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowChange {
    Node(NodeChange),
    Edge(EdgeChange),
}

impl From<NodeChange> for FlowChange {
    fn from(c: NodeChange) -> Self {
        Self::Node(c)
    }
}

impl From<EdgeChange> for FlowChange {
    fn from(c: EdgeChange) -> Self {
        Self::Edge(c)
    }
}

/// Split a mixed batch into its node and edge halves, preserving order
/// within each half.
pub fn split_changes(batch: &[FlowChange]) -> (Vec<NodeChange>, Vec<EdgeChange>) {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for change in batch {
        match change {
            FlowChange::Node(c) => nodes.push(c.clone()),
            FlowChange::Edge(c) => edges.push(c.clone()),
        }
    }
    (nodes, edges)
}

/// Outcome of applying one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Descriptors that changed the store.
    pub applied: usize,
    /// Descriptors naming ids that no longer exist (dropped silently).
    pub stale: usize,
    /// Descriptors refused by validation (duplicates, dangling refs, ...).
    pub rejected: usize,
    /// Fatal configuration errors surfaced to the host.
    pub errors: Vec<crate::error::FlowError>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.stale == 0 && self.rejected == 0 && self.errors.is_empty()
    }
}
