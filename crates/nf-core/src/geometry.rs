//! Flow-space geometry primitives.
//!
//! All coordinates are `f32`. Rectangles are axis-aligned; a `Rect` is
//! origin + size, a `Box` is two corners. Degenerate inputs (empty rect
//! sets, zero-size rects) yield well-defined degenerate outputs instead of
//! errors.

use serde::{Deserialize, Serialize};

// ─── Points & sizes ──────────────────────────────────────────────────────

/// A point in either screen or flow space (the caller knows which).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct XYPosition {
    pub x: f32,
    pub y: f32,
}

impl XYPosition {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Self) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
}

impl Dimensions {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

// ─── Rect / Box ──────────────────────────────────────────────────────────

/// Origin + size rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_parts(position: XYPosition, dims: Dimensions) -> Self {
        Self::new(position.x, position.y, dims.width, dims.height)
    }

    /// Normalized rectangle spanned by two arbitrary corners.
    pub fn from_corners(a: XYPosition, b: XYPosition) -> Self {
        Self::new(
            a.x.min(b.x),
            a.y.min(b.y),
            (b.x - a.x).abs(),
            (b.y - a.y).abs(),
        )
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn center(&self) -> XYPosition {
        XYPosition::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// AABB overlap test (touching edges do not count).
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    pub fn to_box(&self) -> Box {
        Box {
            x: self.x,
            y: self.y,
            x2: self.x + self.width,
            y2: self.y + self.height,
        }
    }
}

/// Corner-pair rectangle (`x2 >= x`, `y2 >= y` for well-formed boxes).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Box {
    pub x: f32,
    pub y: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Box {
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x2 - self.x, self.y2 - self.y)
    }

    fn union(self, other: Box) -> Box {
        Box {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }
}

/// Minimal box covering every rect.
///
/// An empty input yields the degenerate box `{0, 0, 0, 0}` at the origin.
pub fn get_bounding_box<'a, I>(rects: I) -> Box
where
    I: IntoIterator<Item = &'a Rect>,
{
    rects
        .into_iter()
        .map(Rect::to_box)
        .reduce(Box::union)
        .unwrap_or_default()
}

/// Intersection area of two rects, 0 when they are disjoint.
pub fn get_overlapping_area(a: &Rect, b: &Rect) -> f32 {
    let x_overlap = ((a.x + a.width).min(b.x + b.width) - a.x.max(b.x)).max(0.0);
    let y_overlap = ((a.y + a.height).min(b.y + b.height) - a.y.max(b.y)).max(0.0);
    x_overlap * y_overlap
}

// ─── Selection ───────────────────────────────────────────────────────────

/// How much of a node must lie inside a marquee rect to be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionMode {
    /// Any overlap selects.
    Partial,
    /// The node rect must be fully contained.
    #[default]
    Full,
}

/// Does `node` count as inside `selection` under `mode`?
/// Zero-size node rects never match.
pub fn rect_selected_by(selection: &Rect, node: &Rect, mode: SelectionMode) -> bool {
    let node_area = node.area();
    if node_area <= 0.0 {
        return false;
    }
    let overlap = get_overlapping_area(selection, node);
    match mode {
        SelectionMode::Partial => overlap > 0.0,
        SelectionMode::Full => overlap >= node_area,
    }
}

// ─── Extents & snapping ──────────────────────────────────────────────────

/// A flow-space rectangle given as `[[x0, y0], [x1, y1]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f32; 2]; 2]", into = "[[f32; 2]; 2]")]
pub struct CoordinateExtent {
    pub min: XYPosition,
    pub max: XYPosition,
}

impl CoordinateExtent {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            min: XYPosition::new(x0, y0),
            max: XYPosition::new(x1, y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }
}

impl From<[[f32; 2]; 2]> for CoordinateExtent {
    fn from(v: [[f32; 2]; 2]) -> Self {
        Self::new(v[0][0], v[0][1], v[1][0], v[1][1])
    }
}

impl From<CoordinateExtent> for [[f32; 2]; 2] {
    fn from(e: CoordinateExtent) -> Self {
        [[e.min.x, e.min.y], [e.max.x, e.max.y]]
    }
}

/// Clamp a node position so a box of `dims` stays inside `extent`.
///
/// When the node is larger than the extent the upper bound wins over the
/// lower one, pinning the node to the extent's origin side.
pub fn clamp_position(pos: XYPosition, extent: &CoordinateExtent, dims: Dimensions) -> XYPosition {
    XYPosition::new(
        clamp_axis(pos.x, extent.min.x, extent.max.x - dims.width),
        clamp_axis(pos.y, extent.min.y, extent.max.y - dims.height),
    )
}

fn clamp_axis(v: f32, lo: f32, hi: f32) -> f32 {
    v.max(lo).min(hi.max(lo))
}

/// Grid step used for snapping: `(x_step, y_step)`.
pub type SnapGrid = (f32, f32);

/// Round a value to the nearest multiple of `step`; non-positive steps
/// leave the value untouched.
pub fn snap_value(v: f32, step: f32) -> f32 {
    if step > 0.0 { (v / step).round() * step } else { v }
}

pub fn snap_position(pos: XYPosition, grid: SnapGrid) -> XYPosition {
    XYPosition::new(snap_value(pos.x, grid.0), snap_value(pos.y, grid.1))
}

// ─── Handle sides ────────────────────────────────────────────────────────

/// Which side of its node a handle sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Position {
    Left,
    #[default]
    Top,
    Right,
    Bottom,
}
