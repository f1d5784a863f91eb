//! # Fellmatch
//!
//! Spatial correlation engine for species occurrence records and forestry
//! operations.
//!
//! This library provides:
//! - Tiered point-in-polygon classification (`Inside` / `NearZone`)
//! - Accuracy filtering and a global date floor for observation records
//! - Convex-hull bounded loading of national polygon layers
//! - R-tree candidate prefiltering for point/polygon tests
//! - A fingerprint-keyed columnar result cache
//! - Per-species and per-layer exposure statistics with Excel export
//!
//! All coordinates are planar meters in a single fixed projected CRS
//! (SWEREF 99 TM, EPSG:3006). No reprojection is performed.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use fellmatch::{classify_matches, MatchPolicy, Observation, OperationKind,
//!                 OperationPolygon, RelationTier};
//! use geo::{polygon, MultiPolygon};
//!
//! let observations = vec![Observation {
//!     id: 0,
//!     species: "Lobaria pulmonaria".to_string(),
//!     easting: 500_100.0,
//!     northing: 6_580_200.0,
//!     accuracy_m: 10.0,
//!     observed: NaiveDate::from_ymd_opt(2021, 5, 3),
//!     source: "survey.xlsx".to_string(),
//! }];
//!
//! let stand = polygon![
//!     (x: 500_050.0, y: 6_580_150.0),
//!     (x: 500_150.0, y: 6_580_150.0),
//!     (x: 500_150.0, y: 6_580_250.0),
//!     (x: 500_050.0, y: 6_580_250.0),
//! ];
//!
//! let polygons = vec![OperationPolygon {
//!     id: 0,
//!     kind: OperationKind::Completed,
//!     date: NaiveDate::from_ymd_opt(2022, 1, 10),
//!     geometry: MultiPolygon::new(vec![stand]),
//! }];
//!
//! let floor = observations[0].observed;
//! let records = classify_matches(&observations, &polygons, floor, &MatchPolicy::default());
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].tier, RelationTier::Inside);
//! ```

use chrono::NaiveDate;
use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{FellmatchError, OptionExt, Result};

// Planar geometry helpers (distance, containment, bounds)
pub mod geometry;

// Observation filtering (accuracy limit, date floor)
pub mod filter;
pub use filter::{filter_observations, FilterOutcome};

// Convex-hull study region for bounded layer loading
pub mod prefilter;
pub use prefilter::StudyRegion;

// Matching engine with extracted components
pub mod engine;
pub use engine::{
    classify_matches, AnalysisRun, GeometryStore, MatchEngine, ResultCache, SpatialIndex,
};

// Observation spreadsheet ingestion
pub mod loader;
pub use loader::{load_observation_files, RawObservation};

// Exposure statistics and report export
pub mod report;
pub use report::{summarize, write_report, LayerStats, SpeciesStats, Summary};

// Project path layout
pub mod config;
pub use config::ProjectPaths;

// ============================================================================
// Policy Constants
// ============================================================================

/// Maximum accepted coordinate uncertainty in meters.
///
/// Observations with a coarser (or unknown) accuracy cannot be reliably
/// attributed to a 50 m proximity test and are dropped before matching.
pub const ACCURACY_LIMIT_METERS: f64 = 50.0;

/// Reach of the near zone around an operation polygon, in meters.
pub const NEAR_ZONE_METERS: f64 = 50.0;

// ============================================================================
// Core Types
// ============================================================================

/// A species occurrence record with projected coordinates.
///
/// Produced by the observation filter; rows that reach this type always carry
/// coordinates and a known accuracy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Stable identifier within one analysis run (assigned by the filter).
    pub id: u32,
    /// Species name as given in the export.
    pub species: String,
    /// Projected easting in meters.
    pub easting: f64,
    /// Projected northing in meters.
    pub northing: f64,
    /// Reported coordinate uncertainty in meters.
    pub accuracy_m: f64,
    /// Observation start date, when the export carried a parseable one.
    pub observed: Option<NaiveDate>,
    /// Name of the export file the row came from.
    pub source: String,
}

impl Observation {
    /// The observation location as a geo point.
    pub fn point(&self) -> Point<f64> {
        Point::new(self.easting, self.northing)
    }

    /// Check that the coordinates are usable numbers.
    pub fn is_valid(&self) -> bool {
        self.easting.is_finite() && self.northing.is_finite()
    }
}

/// Which national layer an operation polygon came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Notified felling that may not have been carried out yet.
    Reported,
    /// Felling recorded as completed.
    Completed,
}

impl OperationKind {
    /// Both layer kinds, in load order.
    pub const ALL: [OperationKind; 2] = [OperationKind::Reported, OperationKind::Completed];

    /// Short lowercase tag, used in logs and file-facing contexts.
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Reported => "reported",
            OperationKind::Completed => "completed",
        }
    }
}

/// One forestry operation area from a polygon layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationPolygon {
    /// Identifier unique across both layers within one run.
    pub id: u32,
    /// Source layer.
    pub kind: OperationKind,
    /// Operation date (registration date for reported fellings, felling date
    /// for completed ones), when the layer carried a parseable one.
    pub date: Option<NaiveDate>,
    /// Operation area; single polygons are stored as one-part multipolygons.
    pub geometry: MultiPolygon<f64>,
}

/// Spatial relation between an observation and an operation polygon.
///
/// Pairs outside the near zone produce no record at all, so an absent pair
/// means "no relation".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationTier {
    /// The observation point lies within the polygon (boundary inclusive).
    Inside,
    /// The point is outside the polygon but within the near-zone distance.
    NearZone,
}

impl RelationTier {
    /// Short human-readable tag, used in logs and report cells.
    pub fn label(&self) -> &'static str {
        match self {
            RelationTier::Inside => "inside",
            RelationTier::NearZone => "near zone",
        }
    }
}

/// One classified observation/polygon pair.
///
/// Records are independent across polygons: a single observation may be
/// `Inside` one operation area and `NearZone` to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub observation_id: u32,
    pub polygon_id: u32,
    pub tier: RelationTier,
}

/// Thresholds applied by the filter and the classifier.
#[derive(Debug, Clone)]
pub struct MatchPolicy {
    /// Maximum accepted coordinate uncertainty in meters. Rows above it are
    /// dropped by the observation filter.
    /// Default: 50.0 ([`ACCURACY_LIMIT_METERS`])
    pub max_accuracy_m: f64,

    /// Distance in meters within which an outside observation still counts
    /// as `NearZone`.
    /// Default: 50.0 ([`NEAR_ZONE_METERS`])
    pub near_zone_m: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            max_accuracy_m: ACCURACY_LIMIT_METERS,
            near_zone_m: NEAR_ZONE_METERS,
        }
    }
}
