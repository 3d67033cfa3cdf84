pub mod change;
pub mod error;
pub mod geometry;
pub mod id;
pub mod model;
pub mod options;
pub mod snapshot;
pub mod store;
pub mod viewport;

pub use change::{ApplyReport, EdgeChange, FlowChange, NodeChange, split_changes};
pub use error::{FlowError, SnapshotError};
pub use geometry::{
    CoordinateExtent, Dimensions, Position, Rect, SelectionMode, SnapGrid, XYPosition,
};
pub use id::ElementId;
pub use model::*;
pub use options::FlowOptions;
pub use snapshot::FlowSnapshot;
pub use store::GraphStore;
pub use viewport::ViewportTransform;
