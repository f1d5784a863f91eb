//! Tiered classification of observation/operation pairs.
//!
//! Every surviving observation is tested against every candidate operation
//! the spatial index returns for it. A pair yields at most one record:
//! `Inside` when the point lies within the operation area (boundary
//! inclusive), otherwise `NearZone` when it lies within the near-zone
//! distance, otherwise nothing.

use chrono::NaiveDate;
use log::{debug, info};

use crate::engine::spatial_index::SpatialIndex;
use crate::geometry;
use crate::{MatchPolicy, MatchRecord, Observation, OperationPolygon, RelationTier};

/// Check whether an operation survives the date floor.
///
/// Operations dated strictly before the floor predate every observation and
/// are excluded from matching. An unknown operation date never excludes;
/// exclusion requires a known, earlier date. With no floor (no dated
/// observations) every operation survives.
pub fn passes_date_floor(polygon: &OperationPolygon, floor: Option<NaiveDate>) -> bool {
    match (polygon.date, floor) {
        (Some(date), Some(floor)) => date >= floor,
        _ => true,
    }
}

/// Classify every observation/operation pair into relation tiers.
///
/// Tiers are mutually exclusive per pair and independent across pairs: one
/// observation may be `Inside` one operation area and `NearZone` to another,
/// and each such pair produces its own record.
///
/// The result is ordered by `(observation_id, polygon_id)`, so identical
/// inputs always produce an identical record list.
pub fn classify_matches(
    observations: &[Observation],
    polygons: &[OperationPolygon],
    date_floor: Option<NaiveDate>,
    policy: &MatchPolicy,
) -> Vec<MatchRecord> {
    let eligible: Vec<bool> = polygons
        .iter()
        .map(|p| passes_date_floor(p, date_floor))
        .collect();
    let eligible_count = eligible.iter().filter(|&&e| e).count();
    if eligible_count < polygons.len() {
        debug!(
            "Date floor {:?} excluded {} of {} operations",
            date_floor,
            polygons.len() - eligible_count,
            polygons.len()
        );
    }

    let index = SpatialIndex::build(polygons, policy.near_zone_m);

    let mut records = Vec::new();
    for obs in observations {
        let point = obs.point();
        for slot in index.candidates_for(obs.easting, obs.northing) {
            if !eligible[slot] {
                continue;
            }
            let poly = &polygons[slot];
            let tier = if geometry::point_within(&point, &poly.geometry) {
                RelationTier::Inside
            } else if geometry::point_distance(&point, &poly.geometry) <= policy.near_zone_m {
                RelationTier::NearZone
            } else {
                continue;
            };
            records.push(MatchRecord {
                observation_id: obs.id,
                polygon_id: poly.id,
                tier,
            });
        }
    }

    records.sort_unstable_by_key(|r| (r.observation_id, r.polygon_id));

    info!(
        "Classified {} observations against {} eligible operations: {} records",
        observations.len(),
        eligible_count,
        records.len()
    );

    records
}
