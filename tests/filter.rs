//! Observation filter: coordinate and accuracy rules, date floor.

use chrono::NaiveDate;
use fellmatch::loader::RawObservation;
use fellmatch::{filter_observations, MatchPolicy};

fn row(easting: Option<f64>, northing: Option<f64>, accuracy: Option<f64>) -> RawObservation {
    RawObservation {
        species: "Lobaria pulmonaria".to_string(),
        easting,
        northing,
        accuracy_m: accuracy,
        observed: None,
        source: "export.xlsx".to_string(),
    }
}

fn dated(accuracy: f64, date: (i32, u32, u32)) -> RawObservation {
    RawObservation {
        observed: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
        ..row(Some(512_000.0), Some(6_712_000.0), Some(accuracy))
    }
}

#[test]
fn test_missing_coordinates_dropped() {
    let rows = vec![
        row(Some(512_000.0), Some(6_712_000.0), Some(10.0)),
        row(None, Some(6_712_000.0), Some(10.0)),
        row(Some(512_000.0), None, Some(10.0)),
        row(Some(f64::NAN), Some(6_712_000.0), Some(10.0)),
    ];
    let outcome = filter_observations(rows, &MatchPolicy::default());
    assert_eq!(outcome.observations.len(), 1);
    assert_eq!(outcome.dropped_coordinates, 3);
    assert_eq!(outcome.dropped_accuracy, 0);
}

#[test]
fn test_accuracy_limit_inclusive() {
    let rows = vec![
        row(Some(512_000.0), Some(6_712_000.0), Some(50.0)),
        row(Some(512_000.0), Some(6_712_000.0), Some(50.1)),
        row(Some(512_000.0), Some(6_712_000.0), None),
    ];
    let outcome = filter_observations(rows, &MatchPolicy::default());
    assert_eq!(outcome.observations.len(), 1);
    assert_eq!(outcome.observations[0].accuracy_m, 50.0);
    assert_eq!(outcome.dropped_accuracy, 2);
}

#[test]
fn test_date_floor_over_survivors_only() {
    // The 60 m row carries the middle date; it must not contribute.
    let rows = vec![
        dated(10.0, (2019, 5, 1)),
        dated(60.0, (2018, 1, 1)),
        dated(20.0, (2021, 3, 1)),
    ];
    let outcome = filter_observations(rows, &MatchPolicy::default());
    assert_eq!(outcome.observations.len(), 2);
    assert_eq!(outcome.date_floor, NaiveDate::from_ymd_opt(2019, 5, 1));
}

#[test]
fn test_undated_rows_survive_without_floor() {
    let rows = vec![
        row(Some(512_000.0), Some(6_712_000.0), Some(10.0)),
        row(Some(513_000.0), Some(6_713_000.0), Some(20.0)),
    ];
    let outcome = filter_observations(rows, &MatchPolicy::default());
    assert_eq!(outcome.observations.len(), 2);
    assert_eq!(outcome.date_floor, None);
}

#[test]
fn test_ids_sequential_in_input_order() {
    let rows = vec![
        dated(10.0, (2019, 5, 1)),
        row(None, None, Some(10.0)),
        dated(20.0, (2021, 3, 1)),
    ];
    let outcome = filter_observations(rows, &MatchPolicy::default());
    let ids: Vec<u32> = outcome.observations.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![0, 1]);
}

#[test]
fn test_empty_input_is_empty_outcome() {
    let outcome = filter_observations(Vec::new(), &MatchPolicy::default());
    assert!(outcome.is_empty());
    assert_eq!(outcome.date_floor, None);
}
