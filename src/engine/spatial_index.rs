//! Spatial indexing for candidate polygon lookup.
//!
//! Uses an R-tree over operation extents, inflated by the near-zone distance,
//! so a point query returns every polygon that could possibly classify as
//! `Inside` or `NearZone`.

use rstar::{RTree, RTreeObject, AABB};

use crate::geometry;
use crate::OperationPolygon;

/// Operation extent wrapper for R-tree indexing.
///
/// The stored corners are already inflated; intersecting a point envelope is
/// therefore the whole candidate test.
#[derive(Debug, Clone)]
pub struct PolygonBounds {
    /// Position of the polygon in the slice the index was built from.
    pub slot: usize,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl RTreeObject for PolygonBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

/// R-tree over inflated operation extents.
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<PolygonBounds>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk-build the index over a polygon slice.
    ///
    /// `inflate` is the near-zone distance added on every side of each
    /// extent. Polygons with empty geometry are not indexed.
    pub fn build(polygons: &[OperationPolygon], inflate: f64) -> Self {
        let bounds: Vec<PolygonBounds> = polygons
            .iter()
            .enumerate()
            .filter_map(|(slot, poly)| {
                geometry::area_bounds(&poly.geometry).map(|rect| PolygonBounds {
                    slot,
                    min_x: rect.min().x - inflate,
                    max_x: rect.max().x + inflate,
                    min_y: rect.min().y - inflate,
                    max_y: rect.max().y + inflate,
                })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(bounds),
        }
    }

    /// Slots of every polygon whose inflated extent contains the point.
    ///
    /// Sorted so downstream iteration order does not depend on tree shape.
    pub fn candidates_for(&self, x: f64, y: f64) -> Vec<usize> {
        let probe = AABB::from_point([x, y]);
        let mut slots: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&probe)
            .map(|b| b.slot)
            .collect();
        slots.sort_unstable();
        slots
    }

    /// Clear the index.
    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    /// Number of indexed polygons.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
