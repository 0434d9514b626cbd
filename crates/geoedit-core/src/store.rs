//! Feature storage: the collaborator trait and an in-memory reference
//! implementation.

use crate::feature::{Feature, FeatureCollection, FeatureId, Geometry};
use std::collections::HashMap;

/// The persistent feature store consumed by the editing engine.
///
/// Features are owned by the store. The engine reads geometry continuously
/// while a session is open but writes it back only on an explicit confirm;
/// no other actor may mutate a feature's geometry while a session holds it
/// (single-writer discipline, enforced by convention).
pub trait FeatureStore {
    /// Insert a new feature.
    fn add(&mut self, feature: Feature);

    /// Remove a feature, returning it if present.
    fn remove(&mut self, id: FeatureId) -> Option<Feature>;

    /// Replace a feature's geometry. Returns false if the id is unknown.
    fn update_geometry(&mut self, id: FeatureId, geometry: Geometry) -> bool;

    /// Look up a feature.
    fn get(&self, id: FeatureId) -> Option<&Feature>;

    /// All features, in insertion order.
    fn features(&self) -> Vec<&Feature>;

    /// Number of stored features.
    fn len(&self) -> usize;

    /// Check if the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store keyed by id, preserving insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    features: HashMap<FeatureId, Feature>,
    order: Vec<FeatureId>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the contents as a collection.
    pub fn to_collection(&self) -> FeatureCollection {
        FeatureCollection {
            features: self.features().into_iter().cloned().collect(),
        }
    }

    /// Build a store from a collection snapshot.
    pub fn from_collection(collection: FeatureCollection) -> Self {
        let mut store = Self::new();
        for feature in collection.features {
            store.add(feature);
        }
        store
    }
}

impl FeatureStore for MemoryStore {
    fn add(&mut self, feature: Feature) {
        let id = feature.id;
        if self.features.insert(id, feature).is_none() {
            self.order.push(id);
        }
    }

    fn remove(&mut self, id: FeatureId) -> Option<Feature> {
        self.order.retain(|&existing| existing != id);
        self.features.remove(&id)
    }

    fn update_geometry(&mut self, id: FeatureId, geometry: Geometry) -> bool {
        match self.features.get_mut(&id) {
            Some(feature) => {
                feature.geometry = geometry;
                true
            }
            None => false,
        }
    }

    fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(&id)
    }

    fn features(&self) -> Vec<&Feature> {
        self.order
            .iter()
            .filter_map(|id| self.features.get(id))
            .collect()
    }

    fn len(&self) -> usize {
        self.features.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::GeometryKind;
    use kurbo::Point;

    fn line(points: &[(f64, f64)]) -> Feature {
        Feature::new(Geometry::Line(
            points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        ))
    }

    #[test]
    fn test_add_and_get() {
        let mut store = MemoryStore::new();
        let feature = line(&[(0.0, 0.0), (1.0, 0.0)]);
        let id = feature.id;

        store.add(feature);
        assert_eq!(store.len(), 1);
        assert!(store.get(id).is_some());
    }

    #[test]
    fn test_remove() {
        let mut store = MemoryStore::new();
        let feature = line(&[(0.0, 0.0), (1.0, 0.0)]);
        let id = feature.id;

        store.add(feature);
        assert!(store.remove(id).is_some());
        assert!(store.is_empty());
        assert!(store.remove(id).is_none());
    }

    #[test]
    fn test_update_geometry() {
        let mut store = MemoryStore::new();
        let feature = line(&[(0.0, 0.0), (1.0, 0.0)]);
        let id = feature.id;
        store.add(feature);

        let replacement = Geometry::from_open_vertices(
            GeometryKind::Line,
            vec![Point::new(0.0, 0.0), Point::new(9.0, 9.0)],
        );
        assert!(store.update_geometry(id, replacement.clone()));
        assert_eq!(store.get(id).unwrap().geometry, replacement);

        assert!(!store.update_geometry(FeatureId::new(), replacement));
    }

    #[test]
    fn test_insertion_order() {
        let mut store = MemoryStore::new();
        let first = line(&[(0.0, 0.0), (1.0, 0.0)]);
        let second = line(&[(2.0, 0.0), (3.0, 0.0)]);
        let (id1, id2) = (first.id, second.id);

        store.add(first);
        store.add(second);

        let ids: Vec<FeatureId> = store.features().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![id1, id2]);
    }

    #[test]
    fn test_collection_round_trip() {
        let mut store = MemoryStore::new();
        store.add(line(&[(0.0, 0.0), (1.0, 0.0)]));
        store.add(line(&[(2.0, 0.0), (3.0, 0.0)]));

        let restored = MemoryStore::from_collection(store.to_collection());
        assert_eq!(restored.len(), 2);
    }
}
