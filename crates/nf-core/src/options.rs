//! Engine configuration.
//!
//! Every field has a default so hosts only spell out what they change.
//! Options deserialize from camelCase JSON, matching the option names the
//! presentation layer already uses.

use crate::geometry::{CoordinateExtent, SelectionMode, SnapGrid};
use crate::model::{ConnectionMode, DefaultEdgeOptions, EdgeUpdatable, NodeExtent};
use crate::viewport::ViewportTransform;
use serde::{Deserialize, Serialize};

/// z-index boost given to selected elements when elevation is on.
pub const SELECTED_Z_BOOST: i32 = 1000;

/// Smallest zoom the engine accepts; flow coordinates divide by the zoom.
pub const MIN_ZOOM_FLOOR: f32 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowOptions {
    /// Which handle types may pair. Default: **Strict**.
    pub connection_mode: ConnectionMode,

    /// Pixel radius around a handle anchor that still counts as a hit.
    pub connection_radius: f32,

    /// Pixels the pointer must travel before a press on a node becomes a drag.
    pub node_drag_threshold: f32,

    /// Marquee membership rule. Default: **Full**.
    pub selection_mode: SelectionMode,

    /// Flow-space rectangle bounding how far the viewport may pan.
    pub translate_extent: Option<CoordinateExtent>,

    /// Global drag bound for nodes without their own `extent`.
    pub node_extent: Option<NodeExtent>,

    pub min_zoom: f32,
    pub max_zoom: f32,
    pub default_viewport: ViewportTransform,

    /// Quantize drag deltas to `snap_grid`.
    pub snap_to_grid: bool,
    pub snap_grid: SnapGrid,

    pub elevate_nodes_on_select: bool,
    pub elevate_edges_on_select: bool,

    /// Apply change batches to the store. When off, batches are only
    /// reported and the host decides what to apply.
    pub apply_default: bool,

    /// Materialize an edge when a connection commits.
    pub auto_connect: bool,

    /// Stamped onto edges created by `auto_connect` and `FlowEngine::add_edge`.
    pub default_edge_options: Option<DefaultEdgeOptions>,

    /// Ends of edges without their own `updatable` that may be re-attached.
    pub edges_updatable: EdgeUpdatable,

    /// Pixel radius of the grab area around each edge end.
    pub edge_updater_radius: f32,

    /// Allow click-handle, click-handle connections.
    pub connect_on_click: bool,

    pub nodes_draggable: bool,
    pub nodes_connectable: bool,
    pub elements_selectable: bool,

    /// Select an unselected node when a drag on it starts.
    pub select_nodes_on_drag: bool,

    /// Dragging the empty pane pans; shift-drag draws a marquee instead.
    pub pan_on_drag: bool,

    /// Restrict `visible_nodes` to the current viewport.
    pub only_render_visible: bool,

    /// Fraction of the content bounds left around `fit_view`.
    pub fit_view_padding: f32,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            connection_mode: ConnectionMode::Strict,
            connection_radius: 20.0,
            node_drag_threshold: 0.0,
            selection_mode: SelectionMode::Full,
            translate_extent: None,
            node_extent: None,
            min_zoom: 0.5,
            max_zoom: 2.0,
            default_viewport: ViewportTransform::default(),
            snap_to_grid: false,
            snap_grid: (15.0, 15.0),
            elevate_nodes_on_select: true,
            elevate_edges_on_select: false,
            apply_default: true,
            auto_connect: true,
            default_edge_options: None,
            edges_updatable: EdgeUpdatable::Both,
            edge_updater_radius: 10.0,
            connect_on_click: true,
            nodes_draggable: true,
            nodes_connectable: true,
            elements_selectable: true,
            select_nodes_on_drag: true,
            pan_on_drag: true,
            only_render_visible: false,
            fit_view_padding: 0.1,
        }
    }
}

impl FlowOptions {
    /// Parse options from a (possibly partial) JSON object.
    ///
    /// # Errors
    /// Returns the serde error for malformed JSON or mistyped fields.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::normalized)
    }

    /// Repair zoom limits the engine cannot work with: `min_zoom` is raised
    /// to [`MIN_ZOOM_FLOOR`] and `max_zoom` to at least `min_zoom`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.min_zoom.is_nan() || self.min_zoom < MIN_ZOOM_FLOOR {
            log::warn!("minZoom {} raised to {MIN_ZOOM_FLOOR}", self.min_zoom);
            self.min_zoom = MIN_ZOOM_FLOOR;
        }
        if self.max_zoom.is_nan() || self.max_zoom < self.min_zoom {
            log::warn!("maxZoom {} raised to minZoom {}", self.max_zoom, self.min_zoom);
            self.max_zoom = self.min_zoom;
        }
        self
    }
}
