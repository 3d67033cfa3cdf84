//! Serializable export of a flow: nodes, edges and viewport.
//!
//! JSON is the interchange format; MessagePack (named fields) is the
//! compact binary form for host-side persistence.

use crate::error::SnapshotError;
use crate::model::{Edge, Node};
use crate::options::FlowOptions;
use crate::store::GraphStore;
use crate::viewport::ViewportTransform;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub viewport: ViewportTransform,
}

impl FlowSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, SnapshotError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Parse and validate in one step.
    pub fn restore_json(json: &str, options: FlowOptions) -> Result<GraphStore, SnapshotError> {
        let snapshot = Self::from_json(json)?;
        Ok(GraphStore::from_snapshot(snapshot, options)?)
    }
}
