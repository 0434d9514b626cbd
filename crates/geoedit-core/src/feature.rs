//! Feature data model: geometry, attributes, and collections.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Stable identifier for a feature, preserved across edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(Uuid);

impl FeatureId {
    /// Mint a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FeatureId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The kind of geometry a feature or drawing session produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Polygon,
    Line,
}

impl GeometryKind {
    /// Minimum number of distinct vertices: 3 for a polygon ring (before
    /// closure), 2 for a line path. The same bound applies to drawing a new
    /// feature and to removing vertices from an existing one.
    pub fn min_points(self) -> usize {
        match self {
            GeometryKind::Polygon => 3,
            GeometryKind::Line => 2,
        }
    }
}

/// Feature geometry.
///
/// A polygon ring is stored closed (first coordinate == last coordinate);
/// a line path is stored as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Polygon(Vec<Point>),
    Line(Vec<Point>),
}

impl Geometry {
    /// Build geometry from an open vertex list, closing the ring for
    /// polygons by re-appending the first vertex.
    pub fn from_open_vertices(kind: GeometryKind, points: Vec<Point>) -> Self {
        match kind {
            GeometryKind::Polygon => {
                let mut ring = points;
                if let Some(&first) = ring.first() {
                    ring.push(first);
                }
                Geometry::Polygon(ring)
            }
            GeometryKind::Line => Geometry::Line(points),
        }
    }

    /// The kind of this geometry.
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::Line(_) => GeometryKind::Line,
        }
    }

    /// All stored vertices, including a polygon's closing duplicate.
    pub fn vertices(&self) -> &[Point] {
        match self {
            Geometry::Polygon(ring) => ring,
            Geometry::Line(path) => path,
        }
    }

    /// Vertices without a polygon's closing duplicate; identity for lines.
    pub fn open_vertices(&self) -> &[Point] {
        match self {
            Geometry::Polygon(ring) => {
                if ring.len() >= 2 && ring.first() == ring.last() {
                    &ring[..ring.len() - 1]
                } else {
                    ring
                }
            }
            Geometry::Line(path) => path,
        }
    }

    /// Axis-aligned bounding box of the vertices.
    pub fn bounds(&self) -> Rect {
        let points = self.vertices();
        if points.is_empty() {
            return Rect::ZERO;
        }
        let (min_x, max_x) = points.iter().fold((f64::MAX, f64::MIN), |(mn, mx), p| {
            (mn.min(p.x), mx.max(p.x))
        });
        let (min_y, max_y) = points.iter().fold((f64::MAX, f64::MIN), |(mn, mx), p| {
            (mn.min(p.y), mx.max(p.y))
        });
        Rect::new(min_x, min_y, max_x, max_y)
    }

    /// Check the structural invariants: a closed ring with at least 3
    /// distinct vertices, or a path with at least 2 vertices.
    pub fn is_valid(&self) -> bool {
        match self {
            Geometry::Polygon(ring) => {
                if ring.len() < 4 || ring.first() != ring.last() {
                    return false;
                }
                let open = &ring[..ring.len() - 1];
                let mut distinct = 0;
                for (i, p) in open.iter().enumerate() {
                    if !open[..i].contains(p) {
                        distinct += 1;
                    }
                }
                distinct >= 3
            }
            Geometry::Line(path) => path.len() >= 2,
        }
    }
}

/// A geometry + attribute record.
///
/// Features are owned by the feature store; the editing engine only borrows
/// them for the duration of a session and writes geometry back on an
/// explicit confirm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    /// Stable identifier, opaque to the engine.
    pub id: FeatureId,
    /// Polygon ring or line path.
    pub geometry: Geometry,
    /// Attribute map; key order carries no meaning.
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl Feature {
    /// Create a feature with a fresh id and no attributes.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: FeatureId::new(),
            geometry,
            attributes: HashMap::new(),
        }
    }

    /// Create a feature with the given attributes.
    pub fn with_attributes(
        geometry: Geometry,
        attributes: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: FeatureId::new(),
            geometry,
            attributes,
        }
    }

    /// Set or replace one attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(key.into(), value);
    }

    /// Look up one attribute.
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }
}

/// A snapshot of features: the payload of
/// [`EditingCoordinator::current_features`](crate::EditingCoordinator::current_features)
/// and the unit of host-side persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Serialize the collection to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a collection from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_ring_closed_on_build() {
        let geometry = Geometry::from_open_vertices(
            GeometryKind::Polygon,
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
            ],
        );
        let ring = geometry.vertices();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_open_vertices_strips_closing_duplicate() {
        let geometry = Geometry::from_open_vertices(
            GeometryKind::Polygon,
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
            ],
        );
        assert_eq!(geometry.open_vertices().len(), 3);

        let line = Geometry::Line(vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)]);
        assert_eq!(line.open_vertices().len(), 2);
    }

    #[test]
    fn test_polygon_validity() {
        let valid = Geometry::from_open_vertices(
            GeometryKind::Polygon,
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
            ],
        );
        assert!(valid.is_valid());

        // Open ring
        let open = Geometry::Polygon(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(5.0, 5.0),
        ]);
        assert!(!open.is_valid());

        // Closed but collapsed to two distinct vertices
        let collapsed = Geometry::Polygon(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
        ]);
        assert!(!collapsed.is_valid());
    }

    #[test]
    fn test_line_validity() {
        assert!(Geometry::Line(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]).is_valid());
        assert!(!Geometry::Line(vec![Point::new(0.0, 0.0)]).is_valid());
    }

    #[test]
    fn test_bounds() {
        let line = Geometry::Line(vec![Point::new(10.0, 20.0), Point::new(50.0, 80.0)]);
        let bounds = line.bounds();
        assert!((bounds.x0 - 10.0).abs() < f64::EPSILON);
        assert!((bounds.y0 - 20.0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 50.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_attributes() {
        let mut attributes = HashMap::new();
        attributes.insert("kind".to_string(), serde_json::json!("waterway"));
        let mut feature = Feature::with_attributes(
            Geometry::Line(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]),
            attributes,
        );
        feature.set_attribute("name", serde_json::json!("ditch"));
        assert_eq!(feature.attribute("kind"), Some(&serde_json::json!("waterway")));
        assert_eq!(feature.attribute("name"), Some(&serde_json::json!("ditch")));
        assert_eq!(feature.attribute("missing"), None);
    }

    #[test]
    fn test_collection_json_round_trip() {
        let mut feature = Feature::new(Geometry::from_open_vertices(
            GeometryKind::Polygon,
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
            ],
        ));
        feature.set_attribute("storeys", serde_json::json!(3));
        let collection = FeatureCollection {
            features: vec![feature.clone()],
        };

        let json = collection.to_json().unwrap();
        let restored = FeatureCollection::from_json(&json).unwrap();

        assert_eq!(restored.len(), 1);
        assert_eq!(restored.features[0].id, feature.id);
        assert_eq!(restored.features[0].geometry, feature.geometry);
        assert_eq!(
            restored.features[0].attribute("storeys"),
            Some(&serde_json::json!(3))
        );
    }
}
