//! # Matching Engine
//!
//! Cache-wrapped orchestration of the analysis pipeline.
//!
//! ## Architecture
//!
//! The engine is composed of focused modules:
//! - `GeometryStore` - bounded streaming load of the operation layers
//! - `SpatialIndex` - R-tree candidate lookup for point tests
//! - `classifier` - date floor and tiered pair classification
//! - `ResultCache` - fingerprint-keyed columnar snapshot
//!
//! The pipeline itself is a straight line from inputs to records; the cache
//! wraps it at the boundary, so a fingerprint hit skips every stage.

pub mod classifier;
pub mod geometry_store;
pub mod result_cache;
pub mod spatial_index;

pub use classifier::{classify_matches, passes_date_floor};
pub use geometry_store::GeometryStore;
pub use result_cache::{fingerprint_inputs, CachedRun, ResultCache};
pub use spatial_index::{PolygonBounds, SpatialIndex};

use chrono::NaiveDate;
use log::{info, warn};

use crate::config::ProjectPaths;
use crate::error::{FellmatchError, Result};
use crate::filter::filter_observations;
use crate::loader::load_observation_files;
use crate::prefilter::StudyRegion;
use crate::{MatchPolicy, MatchRecord, Observation, OperationKind, OperationPolygon};

/// Complete outcome of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    /// Observations that survived filtering, in export order.
    pub observations: Vec<Observation>,
    /// Operations within the study region, both layers.
    pub polygons: Vec<OperationPolygon>,
    /// Classified pairs, ordered by `(observation_id, polygon_id)`.
    pub records: Vec<MatchRecord>,
    /// Earliest observation date, when any survivor carries one.
    pub date_floor: Option<NaiveDate>,
    /// Fingerprint of the inputs this run reflects.
    pub fingerprint: String,
    /// Whether the run was answered from the snapshot.
    pub from_cache: bool,
}

impl AnalysisRun {
    /// True when no observation survived filtering.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Cache-wrapped analysis pipeline over one project layout.
pub struct MatchEngine {
    paths: ProjectPaths,
    policy: MatchPolicy,
    cache: ResultCache,
}

impl MatchEngine {
    /// Create an engine with default thresholds.
    pub fn new(paths: ProjectPaths) -> Self {
        Self::with_policy(paths, MatchPolicy::default())
    }

    /// Create an engine with custom thresholds.
    pub fn with_policy(paths: ProjectPaths, policy: MatchPolicy) -> Self {
        let cache = ResultCache::at(paths.cache_snapshot.clone());
        Self {
            paths,
            policy,
            cache,
        }
    }

    /// The result cache this engine consults.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Fingerprint of the current input file set.
    ///
    /// Doubles as the existence check for the layer files: a fingerprint can
    /// only be computed over inputs that are actually there.
    pub fn fingerprint(&self) -> Result<String> {
        let mut inputs = self.paths.observation_files()?;
        for kind in OperationKind::ALL {
            let layer = self.paths.layer_file(kind);
            if !layer.is_file() {
                return Err(FellmatchError::LayerRead {
                    path: layer,
                    message: "file not found".to_string(),
                });
            }
            inputs.push(layer);
        }
        fingerprint_inputs(&inputs)
    }

    /// Run the analysis, consulting the cache first.
    pub fn run(&self) -> Result<AnalysisRun> {
        let fingerprint = self.fingerprint()?;

        if let Some(cached) = self.cache.load(&fingerprint) {
            return Ok(AnalysisRun {
                observations: cached.observations,
                polygons: cached.polygons,
                records: cached.records,
                date_floor: cached.date_floor,
                fingerprint,
                from_cache: true,
            });
        }

        self.compute(&fingerprint)
    }

    /// Full pipeline; writes the snapshot on completion.
    fn compute(&self, fingerprint: &str) -> Result<AnalysisRun> {
        // ====================================================================
        // Ingest and filter
        // ====================================================================
        let files = self.paths.observation_files()?;
        let rows = load_observation_files(&files)?;
        let outcome = filter_observations(rows, &self.policy);
        let date_floor = outcome.date_floor;
        let observations = outcome.observations;

        // ====================================================================
        // Study region and bounded layer load
        // ====================================================================
        let mut store = GeometryStore::new();
        match StudyRegion::from_observations(&observations, self.policy.near_zone_m) {
            Some(region) => {
                for kind in OperationKind::ALL {
                    store.load_layer(&self.paths.layer_file(kind), kind, &region)?;
                }
            }
            None => warn!("Empty observation set; skipping layer load"),
        }
        let polygons = store.into_polygons();
        if polygons.is_empty() && !observations.is_empty() {
            warn!("No operations intersect the study region; all exposure figures will be zero");
        }

        // ====================================================================
        // Classification and persist
        // ====================================================================
        let records = classify_matches(&observations, &polygons, date_floor, &self.policy);

        let cached = CachedRun {
            observations,
            polygons,
            records,
            date_floor,
        };
        self.cache.store(fingerprint, &cached)?;
        info!(
            "Analysis complete: {} observations, {} operations, {} records",
            cached.observations.len(),
            cached.polygons.len(),
            cached.records.len()
        );

        Ok(AnalysisRun {
            observations: cached.observations,
            polygons: cached.polygons,
            records: cached.records,
            date_floor: cached.date_floor,
            fingerprint: fingerprint.to_string(),
            from_cache: false,
        })
    }
}
