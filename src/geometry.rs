//! Planar geometry helpers shared by the prefilter, store and classifier.
//!
//! All coordinates are projected meters, so euclidean arithmetic applies
//! directly. Multipolygon operations iterate the parts and combine, which
//! keeps every primitive a plain point/polygon test.

use geo::{BoundingRect, Coord, EuclideanDistance, Intersects, MultiPolygon, Point, Polygon, Rect};

/// Check whether a point lies within a multipolygon, boundary inclusive.
pub fn point_within(point: &Point<f64>, area: &MultiPolygon<f64>) -> bool {
    area.0.iter().any(|part| part.intersects(point))
}

/// Minimum euclidean distance from a point to a multipolygon.
///
/// Zero when the point lies inside or on the boundary of any part. Returns
/// `f64::INFINITY` for an empty multipolygon.
pub fn point_distance(point: &Point<f64>, area: &MultiPolygon<f64>) -> f64 {
    area.0
        .iter()
        .map(|part| point.euclidean_distance(part))
        .fold(f64::INFINITY, f64::min)
}

/// Minimum euclidean distance between a multipolygon and a polygon.
///
/// Zero when they intersect. Returns `f64::INFINITY` for an empty
/// multipolygon.
pub fn area_distance(area: &MultiPolygon<f64>, other: &Polygon<f64>) -> f64 {
    area.0
        .iter()
        .map(|part| part.euclidean_distance(other))
        .fold(f64::INFINITY, f64::min)
}

/// Axis-aligned bounds of a multipolygon. `None` for empty geometry.
pub fn area_bounds(area: &MultiPolygon<f64>) -> Option<Rect<f64>> {
    area.bounding_rect()
}

/// Axis-aligned bounds of a point set. `None` when the set is empty.
pub fn point_bounds(points: &[Point<f64>]) -> Option<Rect<f64>> {
    if points.is_empty() {
        return None;
    }
    let mut min_x = f64::MAX;
    let mut max_x = f64::MIN;
    let mut min_y = f64::MAX;
    let mut max_y = f64::MIN;

    for p in points {
        min_x = min_x.min(p.x());
        max_x = max_x.max(p.x());
        min_y = min_y.min(p.y());
        max_y = max_y.max(p.y());
    }

    Some(Rect::new(
        Coord { x: min_x, y: min_y },
        Coord { x: max_x, y: max_y },
    ))
}

/// Expand a rect outward by `margin` meters on every side.
pub fn expand_rect(rect: &Rect<f64>, margin: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: rect.min().x - margin,
            y: rect.min().y - margin,
        },
        Coord {
            x: rect.max().x + margin,
            y: rect.max().y + margin,
        },
    )
}

/// Check whether two rects overlap. Shared edges count as overlap.
pub fn rects_overlap(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x
        && b.min().x <= a.max().x
        && a.min().y <= b.max().y
        && b.min().y <= a.max().y
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn unit_square() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 100.0, y: 0.0),
            (x: 100.0, y: 100.0),
            (x: 0.0, y: 100.0),
        ]])
    }

    #[test]
    fn test_point_within_interior_and_boundary() {
        let square = unit_square();
        assert!(point_within(&Point::new(50.0, 50.0), &square));
        assert!(point_within(&Point::new(0.0, 50.0), &square));
        assert!(!point_within(&Point::new(150.0, 50.0), &square));
    }

    #[test]
    fn test_point_distance_zero_inside() {
        let square = unit_square();
        assert_eq!(point_distance(&Point::new(50.0, 50.0), &square), 0.0);
        let d = point_distance(&Point::new(130.0, 50.0), &square);
        assert!((d - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_distance_empty_area() {
        let empty = MultiPolygon::new(vec![]);
        assert_eq!(point_distance(&Point::new(0.0, 0.0), &empty), f64::INFINITY);
    }

    #[test]
    fn test_point_bounds_fold() {
        let points = vec![
            Point::new(10.0, 20.0),
            Point::new(-5.0, 40.0),
            Point::new(30.0, 0.0),
        ];
        let rect = point_bounds(&points).unwrap();
        assert_eq!(rect.min().x, -5.0);
        assert_eq!(rect.min().y, 0.0);
        assert_eq!(rect.max().x, 30.0);
        assert_eq!(rect.max().y, 40.0);
        assert!(point_bounds(&[]).is_none());
    }

    #[test]
    fn test_expand_rect_and_overlap() {
        let a = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 10.0 });
        let b = Rect::new(Coord { x: 20.0, y: 0.0 }, Coord { x: 30.0, y: 10.0 });
        assert!(!rects_overlap(&a, &b));
        assert!(rects_overlap(&expand_rect(&a, 10.0), &b));
    }
}
