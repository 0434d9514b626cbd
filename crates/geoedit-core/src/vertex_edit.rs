//! Vertex editing: one batch transaction over the selected features.

use crate::feature::{Feature, FeatureId, Geometry, GeometryKind};
use crate::snap;
use crate::surface::EditSurface;
use kurbo::Point;

/// Active sub-mode of a vertex-edit session.
///
/// The three are mutually exclusive; `Move` is the neutral default the
/// session starts in and falls back to when another mode is toggled off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexMode {
    /// Drag individual vertex handles. No snapping is applied: moving is
    /// deliberately free-form.
    #[default]
    Move,
    /// Splice a new vertex into the nearest edge on click.
    Add,
    /// Delete the clicked vertex handle, down to the minimum count.
    Remove,
}

/// Per-feature record inside the batch.
#[derive(Debug, Clone)]
pub struct VertexEntry {
    feature_id: FeatureId,
    /// Pristine snapshot taken at session open; never mutated. This is the
    /// rollback source for a cancelled session.
    original: Vec<Point>,
    /// Vertices under edit, without a polygon's closing duplicate.
    live: Vec<Point>,
    kind: GeometryKind,
}

impl VertexEntry {
    fn from_feature(feature: &Feature) -> Self {
        let open = feature.geometry.open_vertices().to_vec();
        Self {
            feature_id: feature.id,
            original: open.clone(),
            live: open,
            kind: feature.geometry.kind(),
        }
    }

    /// Id of the feature this entry edits.
    pub fn feature_id(&self) -> FeatureId {
        self.feature_id
    }

    /// Vertices under edit.
    pub fn live(&self) -> &[Point] {
        &self.live
    }

    /// The snapshot taken when the session opened.
    pub fn original(&self) -> &[Point] {
        &self.original
    }

    /// Geometry kind of the underlying feature.
    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    fn min_vertices(&self) -> usize {
        self.kind.min_points()
    }

    /// Live vertices closed back into committable geometry.
    pub fn live_geometry(&self) -> Geometry {
        Geometry::from_open_vertices(self.kind, self.live.clone())
    }

    /// The snapshot closed back into geometry, for rollback.
    pub fn original_geometry(&self) -> Geometry {
        Geometry::from_open_vertices(self.kind, self.original.clone())
    }
}

/// Identifies one vertex inside the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexRef {
    /// Index of the entry within the session.
    pub entry: usize,
    /// Index of the vertex within the entry's live list.
    pub vertex: usize,
}

/// One vertex-edit transaction spanning every selected feature.
///
/// All entries share one sub-mode and are committed or rolled back
/// together. The session only ever mutates its detached live copies; the
/// store is untouched until the coordinator confirms.
#[derive(Debug, Clone)]
pub struct VertexEditSession {
    entries: Vec<VertexEntry>,
    mode: VertexMode,
    drag: Option<VertexRef>,
}

impl VertexEditSession {
    /// Snapshot the given features into a new session. The initial sub-mode
    /// is `Move`: vertices are draggable as soon as editing starts.
    pub fn open(features: &[&Feature]) -> Self {
        Self {
            entries: features.iter().map(|f| VertexEntry::from_feature(f)).collect(),
            mode: VertexMode::Move,
            drag: None,
        }
    }

    /// The active sub-mode.
    pub fn mode(&self) -> VertexMode {
        self.mode
    }

    /// Switch sub-mode. Any in-flight drag is dropped.
    pub fn set_mode(&mut self, mode: VertexMode) {
        self.mode = mode;
        self.drag = None;
    }

    /// Per-feature records of the batch.
    pub fn entries(&self) -> &[VertexEntry] {
        &self.entries
    }

    /// Whether a vertex drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Hit-test vertex handles at a screen position.
    pub fn vertex_at(
        &self,
        screen: Point,
        surface: &dyn EditSurface,
        hit_radius_px: f64,
    ) -> Option<VertexRef> {
        for (entry_index, entry) in self.entries.iter().enumerate() {
            for (vertex_index, &vertex) in entry.live.iter().enumerate() {
                let projected = surface.project(vertex);
                let dx = screen.x - projected.x;
                let dy = screen.y - projected.y;
                if dx * dx + dy * dy <= hit_radius_px * hit_radius_px {
                    return Some(VertexRef {
                        entry: entry_index,
                        vertex: vertex_index,
                    });
                }
            }
        }
        None
    }

    /// Begin a drag on the handle under the pointer. Returns the grabbed
    /// vertex, if any.
    pub fn begin_drag(
        &mut self,
        screen: Point,
        surface: &dyn EditSurface,
        hit_radius_px: f64,
    ) -> Option<VertexRef> {
        let hit = self.vertex_at(screen, surface, hit_radius_px)?;
        self.drag = Some(hit);
        Some(hit)
    }

    /// Move the dragged vertex to the pointer's geographic coordinate.
    /// Returns the vertex that moved, or `None` when no drag is active.
    pub fn drag_to(&mut self, geo: Point) -> Option<VertexRef> {
        let at = self.drag?;
        self.entries[at.entry].live[at.vertex] = geo;
        Some(at)
    }

    /// End the active drag, if any.
    pub fn end_drag(&mut self) -> Option<VertexRef> {
        self.drag.take()
    }

    /// Splice a new vertex into the edge nearest to the click.
    ///
    /// The click is projected onto every edge of every entry in screen
    /// space; the closest edge across the whole batch takes the new vertex
    /// at the raw click coordinate (no snapping), immediately before the
    /// edge's second endpoint. The wrap-around edge is considered for
    /// polygons only. A click landing on an existing handle does nothing.
    pub fn add_vertex(
        &mut self,
        screen: Point,
        geo: Point,
        surface: &dyn EditSurface,
        hit_radius_px: f64,
    ) -> Option<VertexRef> {
        if self.vertex_at(screen, surface, hit_radius_px).is_some() {
            return None;
        }
        let mut best: Option<(usize, snap::EdgeHit)> = None;
        for (entry_index, entry) in self.entries.iter().enumerate() {
            let projected: Vec<Point> = entry.live.iter().map(|&v| surface.project(v)).collect();
            let closed = entry.kind == GeometryKind::Polygon;
            if let Some(hit) = snap::nearest_edge(screen, &projected, closed) {
                if best.is_none_or(|(_, b)| hit.distance < b.distance) {
                    best = Some((entry_index, hit));
                }
            }
        }
        let (entry_index, hit) = best?;
        self.entries[entry_index].live.insert(hit.insert_index, geo);
        Some(VertexRef {
            entry: entry_index,
            vertex: hit.insert_index,
        })
    }

    /// Delete the vertex handle under the pointer, unless that would drop
    /// the entry below its minimum vertex count (3 for a polygon ring, 2
    /// for a line). The minimum is checked before any mutation; a violating
    /// click is a no-op.
    pub fn remove_vertex(
        &mut self,
        screen: Point,
        surface: &dyn EditSurface,
        hit_radius_px: f64,
    ) -> Option<VertexRef> {
        let at = self.vertex_at(screen, surface, hit_radius_px)?;
        let entry = &mut self.entries[at.entry];
        if entry.live.len() <= entry.min_vertices() {
            log::warn!(
                "removal refused: feature {} is at its minimum of {} vertices",
                entry.feature_id,
                entry.min_vertices()
            );
            return None;
        }
        entry.live.remove(at.vertex);
        self.drag = None;
        Some(at)
    }

    /// Geometry to write into the store on confirm, one per entry, rings
    /// closed.
    pub fn committed_geometries(&self) -> Vec<(FeatureId, Geometry)> {
        self.entries
            .iter()
            .map(|entry| (entry.feature_id, entry.live_geometry()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{OverlayId, OverlayStyle};

    /// Identity-projection surface for hit tests.
    struct FlatSurface;

    impl EditSurface for FlatSurface {
        fn project(&self, geo: Point) -> Point {
            geo
        }
        fn add_overlay(&mut self, _coords: &[Point], _style: &OverlayStyle) -> OverlayId {
            OverlayId(0)
        }
        fn update_overlay(&mut self, _id: OverlayId, _coords: &[Point]) {}
        fn remove_overlay(&mut self, _id: OverlayId) {}
        fn set_double_click_zoom(&mut self, _enabled: bool) {}
    }

    const HIT_RADIUS: f64 = 8.0;

    fn square_feature() -> Feature {
        Feature::new(Geometry::from_open_vertices(
            GeometryKind::Polygon,
            vec![
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(100.0, 100.0),
                Point::new(0.0, 100.0),
            ],
        ))
    }

    fn line_feature() -> Feature {
        Feature::new(Geometry::Line(vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
        ]))
    }

    #[test]
    fn test_open_snapshots_without_closing_duplicate() {
        let feature = square_feature();
        let session = VertexEditSession::open(&[&feature]);
        assert_eq!(session.entries().len(), 1);
        assert_eq!(session.entries()[0].live().len(), 4);
        assert_eq!(session.entries()[0].original().len(), 4);
        assert_eq!(session.mode(), VertexMode::Move);
    }

    #[test]
    fn test_add_vertex_on_edge_midpoint() {
        // Square A(0,0) B(100,0) C(100,100) D(0,100): clicking the midpoint
        // of edge C-D splices X between them.
        let feature = square_feature();
        let mut session = VertexEditSession::open(&[&feature]);
        let click = Point::new(50.0, 100.0);

        let at = session
            .add_vertex(click, click, &FlatSurface, HIT_RADIUS)
            .unwrap();
        assert_eq!(at, VertexRef { entry: 0, vertex: 3 });

        let live = session.entries()[0].live();
        assert_eq!(live.len(), 5);
        assert_eq!(live[3], click);
        assert_eq!(live[4], Point::new(0.0, 100.0));
    }

    #[test]
    fn test_add_then_remove_restores_vertex_list() {
        let feature = square_feature();
        let mut session = VertexEditSession::open(&[&feature]);
        let click = Point::new(50.0, 100.0);

        session.add_vertex(click, click, &FlatSurface, HIT_RADIUS).unwrap();
        session.set_mode(VertexMode::Remove);
        session.remove_vertex(click, &FlatSurface, HIT_RADIUS).unwrap();

        assert_eq!(session.entries()[0].live(), session.entries()[0].original());
    }

    #[test]
    fn test_add_vertex_ignores_click_on_handle() {
        let feature = square_feature();
        let mut session = VertexEditSession::open(&[&feature]);
        let on_corner = Point::new(100.0, 100.0);
        assert!(session
            .add_vertex(on_corner, on_corner, &FlatSurface, HIT_RADIUS)
            .is_none());
    }

    #[test]
    fn test_remove_respects_polygon_minimum() {
        let feature = Feature::new(Geometry::from_open_vertices(
            GeometryKind::Polygon,
            vec![
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(50.0, 100.0),
            ],
        ));
        let mut session = VertexEditSession::open(&[&feature]);
        session.set_mode(VertexMode::Remove);

        // Three vertices is the floor; every removal attempt is refused
        for &(x, y) in &[(0.0, 0.0), (100.0, 0.0), (50.0, 100.0)] {
            let click = Point::new(x, y);
            assert!(session.remove_vertex(click, &FlatSurface, HIT_RADIUS).is_none());
        }
        assert_eq!(session.entries()[0].live().len(), 3);
    }

    #[test]
    fn test_remove_respects_line_minimum() {
        let feature = line_feature();
        let mut session = VertexEditSession::open(&[&feature]);
        session.set_mode(VertexMode::Remove);

        let click = Point::new(0.0, 0.0);
        assert!(session.remove_vertex(click, &FlatSurface, HIT_RADIUS).is_none());
        assert_eq!(session.entries()[0].live().len(), 2);
    }

    #[test]
    fn test_drag_moves_only_grabbed_vertex() {
        let feature = square_feature();
        let mut session = VertexEditSession::open(&[&feature]);

        let grab = Point::new(0.0, 0.0);
        let at = session.begin_drag(grab, &FlatSurface, HIT_RADIUS).unwrap();
        assert_eq!(at, VertexRef { entry: 0, vertex: 0 });
        assert!(session.is_dragging());

        session.drag_to(Point::new(-20.0, -30.0));
        session.end_drag();
        assert!(!session.is_dragging());

        let live = session.entries()[0].live();
        assert_eq!(live[0], Point::new(-20.0, -30.0));
        assert_eq!(live[1], Point::new(100.0, 0.0));
        // Drag without a grab does nothing
        assert!(session.drag_to(Point::new(5.0, 5.0)).is_none());
    }

    #[test]
    fn test_begin_drag_misses_empty_space() {
        let feature = square_feature();
        let mut session = VertexEditSession::open(&[&feature]);
        assert!(session
            .begin_drag(Point::new(50.0, 50.0), &FlatSurface, HIT_RADIUS)
            .is_none());
    }

    #[test]
    fn test_original_survives_all_edits() {
        let feature = square_feature();
        let pristine: Vec<Point> = feature.geometry.open_vertices().to_vec();
        let mut session = VertexEditSession::open(&[&feature]);

        let mid = Point::new(50.0, 0.0);
        session.set_mode(VertexMode::Add);
        session.add_vertex(mid, mid, &FlatSurface, HIT_RADIUS).unwrap();
        session.set_mode(VertexMode::Move);
        session.begin_drag(Point::new(0.0, 0.0), &FlatSurface, HIT_RADIUS);
        session.drag_to(Point::new(-1.0, -1.0));
        session.end_drag();

        assert_eq!(session.entries()[0].original(), pristine.as_slice());
        assert_eq!(
            session.entries()[0].original_geometry(),
            feature.geometry
        );
    }

    #[test]
    fn test_committed_geometries_close_rings() {
        let feature = square_feature();
        let session = VertexEditSession::open(&[&feature]);
        let committed = session.committed_geometries();
        assert_eq!(committed.len(), 1);
        let (id, geometry) = &committed[0];
        assert_eq!(*id, feature.id);
        assert_eq!(geometry.vertices().first(), geometry.vertices().last());
    }

    #[test]
    fn test_batch_add_targets_nearest_feature() {
        let square = square_feature();
        let far_line = Feature::new(Geometry::Line(vec![
            Point::new(1000.0, 1000.0),
            Point::new(1100.0, 1000.0),
        ]));
        let mut session = VertexEditSession::open(&[&square, &far_line]);

        let click = Point::new(50.0, 0.0);
        let at = session
            .add_vertex(click, click, &FlatSurface, HIT_RADIUS)
            .unwrap();
        assert_eq!(at.entry, 0);
        assert_eq!(session.entries()[1].live().len(), 2);
    }
}
