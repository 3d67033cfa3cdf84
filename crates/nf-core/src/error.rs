//! Error types.
//!
//! Interaction paths never fail: stale or invalid descriptors become
//! counted no-ops. Only configuration errors that would corrupt the parent
//! tree, and id collisions at construction time, are escalated as
//! [`FlowError`].

use crate::id::ElementId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("duplicate element id `{0}`")]
    DuplicateId(ElementId),

    #[error("node `{node}` references missing parent `{parent}`")]
    MissingParent { node: ElementId, parent: ElementId },

    #[error("node `{0}` cannot be its own parent")]
    SelfParent(ElementId),

    #[error("parent chain of node `{0}` contains a cycle")]
    ParentCycle(ElementId),

    #[error("unknown node `{0}`")]
    UnknownNode(ElementId),

    #[error("edge `{edge}` references missing node `{node}`")]
    DanglingEdge { edge: ElementId, node: ElementId },
}

/// Errors from encoding or decoding a [`FlowSnapshot`](crate::snapshot::FlowSnapshot).
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot msgpack encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("snapshot msgpack decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("invalid snapshot: {0}")]
    Invalid(#[from] FlowError),
}
