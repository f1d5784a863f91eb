//! Match classifier: tiering, date floor, per-pair exclusivity.

use chrono::NaiveDate;
use fellmatch::engine::passes_date_floor;
use fellmatch::{
    classify_matches, MatchPolicy, Observation, OperationKind, OperationPolygon, RelationTier,
};
use geo::{polygon, MultiPolygon};

fn obs(id: u32, easting: f64, northing: f64, date: Option<(i32, u32, u32)>) -> Observation {
    Observation {
        id,
        species: "Lobaria pulmonaria".to_string(),
        easting,
        northing,
        accuracy_m: 10.0,
        observed: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        source: "export.xlsx".to_string(),
    }
}

fn operation(id: u32, min_x: f64, min_y: f64, date: Option<(i32, u32, u32)>) -> OperationPolygon {
    OperationPolygon {
        id,
        kind: OperationKind::Completed,
        date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        geometry: MultiPolygon::new(vec![polygon![
            (x: min_x, y: min_y),
            (x: min_x + 100.0, y: min_y),
            (x: min_x + 100.0, y: min_y + 100.0),
            (x: min_x, y: min_y + 100.0),
        ]]),
    }
}

fn floor(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

#[test]
fn test_inside_yields_single_inside_record() {
    let observations = vec![obs(0, 50.0, 50.0, Some((2019, 5, 1)))];
    let polygons = vec![operation(0, 0.0, 0.0, Some((2020, 6, 1)))];
    let records = classify_matches(
        &observations,
        &polygons,
        floor(2019, 5, 1),
        &MatchPolicy::default(),
    );
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].tier, RelationTier::Inside);
    // No parallel NearZone record for the same pair.
    assert_eq!(
        records
            .iter()
            .filter(|r| r.observation_id == 0 && r.polygon_id == 0)
            .count(),
        1
    );
}

#[test]
fn test_near_zone_distances() {
    // 30 m east of the square: NearZone. 80 m east: nothing.
    let observations = vec![
        obs(0, 130.0, 50.0, Some((2019, 5, 1))),
        obs(1, 180.0, 50.0, Some((2019, 5, 1))),
    ];
    let polygons = vec![operation(0, 0.0, 0.0, Some((2020, 6, 1)))];
    let records = classify_matches(
        &observations,
        &polygons,
        floor(2019, 5, 1),
        &MatchPolicy::default(),
    );
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].observation_id, 0);
    assert_eq!(records[0].tier, RelationTier::NearZone);
}

#[test]
fn test_boundary_point_is_inside() {
    let observations = vec![obs(0, 100.0, 50.0, None)];
    let polygons = vec![operation(0, 0.0, 0.0, None)];
    let records = classify_matches(&observations, &polygons, None, &MatchPolicy::default());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].tier, RelationTier::Inside);
}

#[test]
fn test_exact_near_zone_limit_included() {
    let observations = vec![obs(0, 150.0, 50.0, None)];
    let polygons = vec![operation(0, 0.0, 0.0, None)];
    let records = classify_matches(&observations, &polygons, None, &MatchPolicy::default());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].tier, RelationTier::NearZone);
}

#[test]
fn test_date_floor_excludes_regardless_of_geometry() {
    // The operation contains the point but predates the floor.
    let observations = vec![obs(0, 50.0, 50.0, Some((2019, 5, 1)))];
    let polygons = vec![operation(0, 0.0, 0.0, Some((2018, 1, 1)))];
    let records = classify_matches(
        &observations,
        &polygons,
        floor(2019, 5, 1),
        &MatchPolicy::default(),
    );
    assert!(records.is_empty());
}

#[test]
fn test_undated_operation_survives_floor() {
    let polygons = vec![operation(0, 0.0, 0.0, None)];
    assert!(passes_date_floor(&polygons[0], floor(2019, 5, 1)));

    let observations = vec![obs(0, 50.0, 50.0, Some((2019, 5, 1)))];
    let records = classify_matches(
        &observations,
        &polygons,
        floor(2019, 5, 1),
        &MatchPolicy::default(),
    );
    assert_eq!(records.len(), 1);
}

#[test]
fn test_floor_date_itself_survives() {
    let op = operation(0, 0.0, 0.0, Some((2019, 5, 1)));
    assert!(passes_date_floor(&op, floor(2019, 5, 1)));
    assert!(!passes_date_floor(&op, floor(2019, 5, 2)));
}

#[test]
fn test_tiers_independent_across_polygons() {
    // Inside one operation, 30 m from a second: both records materialize.
    let observations = vec![obs(0, 50.0, 50.0, None)];
    let polygons = vec![
        operation(0, 0.0, 0.0, None),
        operation(1, 80.0, 0.0, None),
    ];
    let records = classify_matches(&observations, &polygons, None, &MatchPolicy::default());
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].polygon_id, 0);
    assert_eq!(records[0].tier, RelationTier::Inside);
    assert_eq!(records[1].polygon_id, 1);
    assert_eq!(records[1].tier, RelationTier::NearZone);
}

#[test]
fn test_record_order_deterministic() {
    let observations = vec![
        obs(1, 50.0, 50.0, None),
        obs(0, 60.0, 50.0, None),
    ];
    let polygons = vec![
        operation(1, 0.0, 0.0, None),
        operation(0, 0.0, 0.0, None),
    ];
    let records = classify_matches(&observations, &polygons, None, &MatchPolicy::default());
    let keys: Vec<(u32, u32)> = records
        .iter()
        .map(|r| (r.observation_id, r.polygon_id))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(keys, sorted);
    assert_eq!(records.len(), 4);
}

#[test]
fn test_no_observations_no_records() {
    let polygons = vec![operation(0, 0.0, 0.0, None)];
    let records = classify_matches(&[], &polygons, None, &MatchPolicy::default());
    assert!(records.is_empty());
}
