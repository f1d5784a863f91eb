//! Observation filtering ahead of spatial matching.
//!
//! Two rules gate every row: coordinates must be present and usable, and the
//! reported accuracy must not exceed the policy limit. The minimum observation
//! date over the surviving rows becomes the date floor that later excludes
//! operations predating the earliest record.

use chrono::NaiveDate;
use log::{info, warn};

use crate::loader::RawObservation;
use crate::{MatchPolicy, Observation};

/// Outcome of the observation filter.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Rows that passed every rule, ids assigned sequentially in input order.
    pub observations: Vec<Observation>,
    /// Earliest observation date among survivors, when any carries a date.
    pub date_floor: Option<NaiveDate>,
    /// Rows dropped for missing or non-finite coordinates.
    pub dropped_coordinates: usize,
    /// Rows dropped for unknown or too-coarse accuracy.
    pub dropped_accuracy: usize,
}

impl FilterOutcome {
    /// True when nothing survived filtering.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Apply the coordinate and accuracy rules to raw export rows.
///
/// Rows with an unknown accuracy are dropped along with too-coarse ones; an
/// unknown uncertainty cannot be attributed to the near-zone distance any
/// better than a 100 m one. Rows without a parseable date survive but do not
/// contribute to the date floor.
pub fn filter_observations(rows: Vec<RawObservation>, policy: &MatchPolicy) -> FilterOutcome {
    let total = rows.len();
    let mut outcome = FilterOutcome::default();

    for row in rows {
        let (easting, northing) = match (row.easting, row.northing) {
            (Some(e), Some(n)) if e.is_finite() && n.is_finite() => (e, n),
            _ => {
                outcome.dropped_coordinates += 1;
                continue;
            }
        };

        let accuracy = match row.accuracy_m {
            Some(a) if a <= policy.max_accuracy_m => a,
            _ => {
                outcome.dropped_accuracy += 1;
                continue;
            }
        };

        let id = outcome.observations.len() as u32;
        outcome.observations.push(Observation {
            id,
            species: row.species,
            easting,
            northing,
            accuracy_m: accuracy,
            observed: row.observed,
            source: row.source,
        });
    }

    outcome.date_floor = outcome.observations.iter().filter_map(|o| o.observed).min();

    info!(
        "Observation filter: kept {} of {} rows ({} missing coordinates, {} failing the {} m accuracy limit)",
        outcome.observations.len(),
        total,
        outcome.dropped_coordinates,
        outcome.dropped_accuracy,
        policy.max_accuracy_m
    );
    if outcome.is_empty() {
        warn!("No usable observations after filtering; all statistics will be zero");
    }

    outcome
}
