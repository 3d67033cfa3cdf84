//! Pan/zoom transform between screen (pixel) space and flow space.
//!
//! `x`/`y` are the pixel offset of the flow origin, `zoom` the scale
//! factor: `screen = flow * zoom + (x, y)`.

use crate::geometry::{CoordinateExtent, Dimensions, Rect, SnapGrid, XYPosition, snap_position};
use serde::{Deserialize, Serialize};

/// Default factor used by `zoom_in` / `zoom_out`.
pub const ZOOM_STEP: f32 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// Convert a screen point into flow space.
pub fn screen_to_flow(p: XYPosition, vp: &ViewportTransform) -> XYPosition {
    XYPosition::new((p.x - vp.x) / vp.zoom, (p.y - vp.y) / vp.zoom)
}

/// Like [`screen_to_flow`], then rounded to the grid.
pub fn screen_to_flow_snapped(
    p: XYPosition,
    vp: &ViewportTransform,
    grid: SnapGrid,
) -> XYPosition {
    snap_position(screen_to_flow(p, vp), grid)
}

/// Exact inverse of [`screen_to_flow`].
pub fn flow_to_screen(p: XYPosition, vp: &ViewportTransform) -> XYPosition {
    XYPosition::new(p.x * vp.zoom + vp.x, p.y * vp.zoom + vp.y)
}

pub fn clamp_zoom(requested: f32, min: f32, max: f32) -> f32 {
    requested.max(min).min(max.max(min))
}

/// Constrain a transform so `extent` never retreats further into the
/// visible pane than allowed.
///
/// Mirrors d3-zoom's default constrain: along each axis, when the extent
/// is smaller than the pane it is centered, otherwise the offset is pushed
/// back until the extent edge meets the pane edge. `None` leaves the
/// transform unconstrained.
pub fn clamp_pan(
    vp: ViewportTransform,
    extent: Option<&CoordinateExtent>,
    pane: Dimensions,
) -> ViewportTransform {
    let Some(extent) = extent else {
        return vp;
    };
    let k = vp.zoom;
    let dx0 = (0.0 - vp.x) / k - extent.min.x;
    let dx1 = (pane.width - vp.x) / k - extent.max.x;
    let dy0 = (0.0 - vp.y) / k - extent.min.y;
    let dy1 = (pane.height - vp.y) / k - extent.max.y;

    let dx = constrain_axis(dx0, dx1);
    let dy = constrain_axis(dy0, dy1);

    ViewportTransform {
        x: vp.x + k * dx,
        y: vp.y + k * dy,
        zoom: k,
    }
}

fn constrain_axis(d0: f32, d1: f32) -> f32 {
    if d1 > d0 {
        (d0 + d1) / 2.0
    } else {
        let low = d0.min(0.0);
        if low != 0.0 { low } else { d1.max(0.0) }
    }
}

impl ViewportTransform {
    pub const fn new(x: f32, y: f32, zoom: f32) -> Self {
        Self { x, y, zoom }
    }

    /// Set the zoom (clamped), keeping the pane origin fixed.
    /// Returns `false` when nothing changed.
    pub fn zoom_to(&mut self, requested: f32, min: f32, max: f32) -> bool {
        let zoom = clamp_zoom(requested, min, max);
        if zoom == self.zoom {
            return false;
        }
        self.zoom = zoom;
        true
    }

    /// Multiply the zoom by `factor` around a screen-space anchor so the
    /// flow point under the anchor stays put. Returns `false` on no-op.
    pub fn zoom_at(&mut self, anchor: XYPosition, factor: f32, min: f32, max: f32) -> bool {
        let zoom = clamp_zoom(self.zoom * factor, min, max);
        if zoom == self.zoom {
            return false;
        }
        let ratio = zoom / self.zoom;
        self.x = anchor.x - (anchor.x - self.x) * ratio;
        self.y = anchor.y - (anchor.y - self.y) * ratio;
        self.zoom = zoom;
        true
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    /// The flow-space rectangle currently visible in a pane of `pane` pixels.
    pub fn flow_rect(&self, pane: Dimensions) -> Rect {
        let origin = screen_to_flow(XYPosition::ORIGIN, self);
        Rect::new(
            origin.x,
            origin.y,
            pane.width / self.zoom,
            pane.height / self.zoom,
        )
    }
}

/// Transform that fits `bounds` into a pane, leaving `padding` (fraction
/// of the bounds) around it.
pub fn get_transform_for_bounds(
    bounds: &Rect,
    pane: Dimensions,
    min_zoom: f32,
    max_zoom: f32,
    padding: f32,
) -> ViewportTransform {
    let x_zoom = pane.width / (bounds.width * (1.0 + padding));
    let y_zoom = pane.height / (bounds.height * (1.0 + padding));
    // Degenerate bounds divide by zero; fall back to the max zoom.
    let raw = x_zoom.min(y_zoom);
    let zoom = clamp_zoom(if raw.is_finite() { raw } else { max_zoom }, min_zoom, max_zoom);
    let center = bounds.center();
    ViewportTransform {
        x: pane.width / 2.0 - center.x * zoom,
        y: pane.height / 2.0 - center.y * zoom,
        zoom,
    }
}

/// Transform that puts flow point `(x, y)` in the middle of the pane.
pub fn center_on(x: f32, y: f32, zoom: f32, pane: Dimensions) -> ViewportTransform {
    ViewportTransform {
        x: pane.width / 2.0 - x * zoom,
        y: pane.height / 2.0 - y * zoom,
        zoom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: XYPosition, b: XYPosition) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    #[test]
    fn screen_flow_roundtrip() {
        let viewports = [
            ViewportTransform::new(0.0, 0.0, 1.0),
            ViewportTransform::new(120.0, -40.0, 0.5),
            ViewportTransform::new(-300.0, 75.5, 2.0),
        ];
        let points = [
            XYPosition::new(0.0, 0.0),
            XYPosition::new(10.0, 20.0),
            XYPosition::new(-250.0, 999.0),
        ];
        for vp in &viewports {
            for &p in &points {
                let back = flow_to_screen(screen_to_flow(p, vp), vp);
                assert!(close(back, p), "{p:?} -> {back:?} at {vp:?}");
            }
        }
    }

    #[test]
    fn screen_to_flow_divides_by_zoom() {
        let vp = ViewportTransform::new(100.0, 50.0, 2.0);
        let p = screen_to_flow(XYPosition::new(300.0, 250.0), &vp);
        assert_eq!(p, XYPosition::new(100.0, 100.0));
    }

    #[test]
    fn zoom_clamps_to_max() {
        let mut vp = ViewportTransform::default();
        assert!(vp.zoom_to(5.0, 0.5, 2.0));
        assert_eq!(vp.zoom, 2.0);
        // Same request again is a no-op.
        assert!(!vp.zoom_to(5.0, 0.5, 2.0));
    }

    #[test]
    fn zoom_at_keeps_anchor_fixed() {
        let mut vp = ViewportTransform::new(10.0, 20.0, 1.0);
        let anchor = XYPosition::new(200.0, 150.0);
        let before = screen_to_flow(anchor, &vp);
        assert!(vp.zoom_at(anchor, 1.5, 0.5, 2.0));
        let after = screen_to_flow(anchor, &vp);
        assert!(close(before, after));
    }

    #[test]
    fn clamp_pan_without_extent_is_identity() {
        let vp = ViewportTransform::new(-5000.0, 3000.0, 1.0);
        assert_eq!(clamp_pan(vp, None, Dimensions::new(800.0, 600.0)), vp);
    }

    #[test]
    fn clamp_pan_pushes_extent_edge_back() {
        let extent = CoordinateExtent::new(0.0, 0.0, 1000.0, 1000.0);
        let pane = Dimensions::new(500.0, 500.0);
        // Panned so the extent's left edge sits 100px inside the pane.
        let vp = ViewportTransform::new(100.0, 0.0, 1.0);
        let clamped = clamp_pan(vp, Some(&extent), pane);
        assert_eq!(clamped.x, 0.0);

        // Panned past the right edge.
        let vp = ViewportTransform::new(-800.0, 0.0, 1.0);
        let clamped = clamp_pan(vp, Some(&extent), pane);
        assert_eq!(clamped.x, -500.0);
    }

    #[test]
    fn clamp_pan_centers_small_extent() {
        let extent = CoordinateExtent::new(0.0, 0.0, 100.0, 100.0);
        let pane = Dimensions::new(500.0, 300.0);
        let clamped = clamp_pan(ViewportTransform::default(), Some(&extent), pane);
        assert_eq!(clamped.x, 200.0);
        assert_eq!(clamped.y, 100.0);
    }

    #[test]
    fn fit_bounds_centers_content() {
        let bounds = Rect::new(0.0, 0.0, 400.0, 200.0);
        let vp = get_transform_for_bounds(&bounds, Dimensions::new(800.0, 600.0), 0.5, 2.0, 0.0);
        assert_eq!(vp.zoom, 2.0);
        let center = flow_to_screen(bounds.center(), &vp);
        assert!(close(center, XYPosition::new(400.0, 300.0)));
    }

    #[test]
    fn flow_rect_scales_with_zoom() {
        let vp = ViewportTransform::new(-100.0, -50.0, 2.0);
        let r = vp.flow_rect(Dimensions::new(800.0, 600.0));
        assert_eq!(r, Rect::new(50.0, 25.0, 400.0, 300.0));
    }
}
