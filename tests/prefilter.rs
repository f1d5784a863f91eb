//! Study region: hull construction, degenerate fallbacks, reach soundness.

use fellmatch::{Observation, StudyRegion};
use geo::{polygon, Area, MultiPolygon};

fn obs(id: u32, easting: f64, northing: f64) -> Observation {
    Observation {
        id,
        species: "Picoides tridactylus".to_string(),
        easting,
        northing,
        accuracy_m: 10.0,
        observed: None,
        source: "export.xlsx".to_string(),
    }
}

fn square(min_x: f64, min_y: f64, side: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon![
        (x: min_x, y: min_y),
        (x: min_x + side, y: min_y),
        (x: min_x + side, y: min_y + side),
        (x: min_x, y: min_y + side),
    ]])
}

#[test]
fn test_empty_observation_set_yields_no_region() {
    assert!(StudyRegion::from_observations(&[], 50.0).is_none());
}

#[test]
fn test_single_point_region_is_valid_area() {
    let region = StudyRegion::from_observations(&[obs(0, 1000.0, 1000.0)], 50.0)
        .expect("one point is enough");
    assert!(region.hull().unsigned_area() > 0.0);
    // A polygon touching the margin is covered.
    assert!(region.covers(&square(1040.0, 990.0, 100.0)));
    // One starting 60 m away is not.
    assert!(!region.covers(&square(1060.0, 990.0, 100.0)));
}

#[test]
fn test_collinear_points_fall_back_to_rectangle() {
    let observations = vec![
        obs(0, 0.0, 0.0),
        obs(1, 500.0, 0.0),
        obs(2, 1000.0, 0.0),
    ];
    let region = StudyRegion::from_observations(&observations, 50.0).expect("transect");
    assert!(region.hull().unsigned_area() > 0.0);
    assert!(region.covers(&square(400.0, 30.0, 100.0)));
}

#[test]
fn test_soundness_within_margin_of_hull() {
    let observations = vec![
        obs(0, 0.0, 0.0),
        obs(1, 1000.0, 0.0),
        obs(2, 500.0, 1000.0),
    ];
    let region = StudyRegion::from_observations(&observations, 50.0).expect("triangle");

    // 30 m below the base edge: must be covered (within the near zone).
    assert!(region.covers(&square(450.0, -130.0, 100.0)));
    // Inside the hull: covered.
    assert!(region.covers(&square(450.0, 200.0, 100.0)));
    // 80 m below the base edge: out of reach.
    assert!(!region.covers(&square(450.0, -180.0, 100.0)));
}

#[test]
fn test_extent_test_is_conservative() {
    let observations = vec![
        obs(0, 0.0, 0.0),
        obs(1, 1000.0, 0.0),
        obs(2, 500.0, 1000.0),
    ];
    let region = StudyRegion::from_observations(&observations, 50.0).expect("triangle");

    // Near the hull's corner the bounding rect passes but the exact test can
    // still reject; the extent test may only err on the inclusive side.
    use geo::BoundingRect;
    let corner = square(950.0, 900.0, 100.0);
    let extent = corner.bounding_rect().expect("square has bounds");
    assert!(region.covers_extent(&extent));

    // Whatever the exact test accepts, the extent test must accept too.
    if region.covers(&corner) {
        assert!(region.covers_extent(&extent));
    }
}

#[test]
fn test_empty_geometry_never_covered() {
    let region = StudyRegion::from_observations(&[obs(0, 0.0, 0.0)], 50.0).expect("point");
    assert!(!region.covers(&MultiPolygon::new(vec![])));
}
