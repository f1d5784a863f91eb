//! Study region derivation for bounded layer loading.
//!
//! The filtered observations span a convex hull; an operation can only match
//! when it lies within the near-zone distance of some observation, so the
//! geometry store never needs to materialize features farther from the hull
//! than that margin. Degenerate observation sets (a single point, a collinear
//! transect) fall back to a margin-expanded bounding rectangle, which keeps
//! the region a valid area and errs on the inclusive side.

use geo::{Area, ConvexHull, MultiPoint, MultiPolygon, Point, Polygon, Rect};
use log::debug;

use crate::geometry;
use crate::Observation;

/// Convex query region around the filtered observations.
///
/// Immutable once built. The geometry store consults it for every candidate
/// feature; the observations themselves are never exposed through it.
#[derive(Debug, Clone)]
pub struct StudyRegion {
    hull: Polygon<f64>,
    reach: Rect<f64>,
    margin: f64,
}

impl StudyRegion {
    /// Build the region around a set of observations.
    ///
    /// `margin` is the near-zone distance; every polygon within `margin` of
    /// any observation is guaranteed to pass [`StudyRegion::covers`]. The
    /// reverse does not hold, exact classification happens later.
    ///
    /// Returns `None` when `observations` is empty.
    pub fn from_observations(observations: &[Observation], margin: f64) -> Option<Self> {
        let points: Vec<Point<f64>> = observations.iter().map(|o| o.point()).collect();
        let count = points.len();
        let bounds = geometry::point_bounds(&points)?;
        let reach = geometry::expand_rect(&bounds, margin);

        // A usable hull needs three non-collinear points; anything flatter
        // falls back to the expanded rectangle itself.
        let hull = if count >= 3 {
            let candidate = MultiPoint::new(points).convex_hull();
            if candidate.unsigned_area() > 0.0 {
                candidate
            } else {
                reach.to_polygon()
            }
        } else {
            reach.to_polygon()
        };

        debug!(
            "Study region from {} points, margin {} m, reach [{:.0}, {:.0}] - [{:.0}, {:.0}]",
            count,
            margin,
            reach.min().x,
            reach.min().y,
            reach.max().x,
            reach.max().y
        );

        Some(Self {
            hull,
            reach,
            margin,
        })
    }

    /// The hull polygon (or the fallback rectangle for degenerate sets).
    pub fn hull(&self) -> &Polygon<f64> {
        &self.hull
    }

    /// Bounding rectangle of the region, margin included.
    pub fn reach(&self) -> &Rect<f64> {
        &self.reach
    }

    /// Near-zone margin in meters.
    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Cheap test on a feature's extent alone.
    ///
    /// Failing proves the feature is out of reach; passing only means it may
    /// be within reach and deserves the exact test.
    pub fn covers_extent(&self, extent: &Rect<f64>) -> bool {
        geometry::rects_overlap(&self.reach, extent)
    }

    /// Exact test: is any part of `area` within the margin of the hull?
    ///
    /// Empty geometries are never covered.
    pub fn covers(&self, area: &MultiPolygon<f64>) -> bool {
        match geometry::area_bounds(area) {
            Some(extent) if self.covers_extent(&extent) => {
                geometry::area_distance(area, &self.hull) <= self.margin
            }
            _ => false,
        }
    }
}
