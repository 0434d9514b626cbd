//! Drawing session: point acquisition for one new feature.

use crate::feature::{Geometry, GeometryKind};
use crate::snap::{self, SnapCandidate};
use kurbo::Point;

/// Accumulates clicked vertices for one new polygon or line feature.
///
/// At most one session is open at a time; starting a new one discards any
/// uncommitted predecessor (enforced by the coordinator). The session
/// exposes its points as data; the coordinator keeps the preview overlay
/// in sync after each accepted point.
#[derive(Debug, Clone)]
pub struct DrawingSession {
    kind: GeometryKind,
    points: Vec<Point>,
    snap_enabled: bool,
    snap_distance_px: f64,
    allow_double_click_finish: bool,
}

impl DrawingSession {
    /// Open a session for the given geometry kind.
    pub fn new(
        kind: GeometryKind,
        snap_enabled: bool,
        snap_distance_px: f64,
        allow_double_click_finish: bool,
    ) -> Self {
        Self {
            kind,
            points: Vec::new(),
            snap_enabled,
            snap_distance_px,
            allow_double_click_finish,
        }
    }

    /// The geometry kind being drawn.
    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    /// Points accepted so far, in click order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Minimum number of points before the session can be confirmed.
    pub fn min_points(&self) -> usize {
        self.kind.min_points()
    }

    /// Whether enough points were placed to build the geometry.
    pub fn can_finish(&self) -> bool {
        self.points.len() >= self.min_points()
    }

    /// Whether a double-click may finish this session implicitly.
    pub fn allow_double_click_finish(&self) -> bool {
        self.allow_double_click_finish
    }

    /// Accept one clicked point.
    ///
    /// When snapping is on and an existing vertex lies within the snap
    /// radius, that vertex's geographic coordinate is substituted verbatim
    /// so the new shape shares the vertex exactly. Returns the accepted
    /// coordinate.
    pub fn push_point(
        &mut self,
        screen: Point,
        geo: Point,
        candidates: &[SnapCandidate],
    ) -> Point {
        let accepted = if self.snap_enabled {
            snap::nearest_vertex(screen, candidates, self.snap_distance_px)
                .map(|hit| hit.geo)
                .unwrap_or(geo)
        } else {
            geo
        };
        self.points.push(accepted);
        accepted
    }

    /// Build the final geometry, closing the ring for polygons.
    ///
    /// Returns `None` while below the minimum point count; the session is
    /// untouched either way so it can keep accepting points.
    pub fn finish(&self) -> Option<Geometry> {
        if !self.can_finish() {
            return None;
        }
        Some(Geometry::from_open_vertices(self.kind, self.points.clone()))
    }
}
