//! Fingerprint-keyed columnar result cache.
//!
//! One bincode snapshot on disk stores the complete outcome of a pipeline
//! run in struct-of-arrays layout: parallel column vectors for observations,
//! operations and match records. The snapshot is keyed by a fingerprint of
//! the input files; version skew, fingerprint mismatch, truncation or plain
//! garbage all downgrade to a miss, and the next full run rewrites the
//! snapshot wholesale. The snapshot is never mutated in place.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::NaiveDate;
use geo::MultiPolygon;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{FellmatchError, Result};
use crate::{MatchRecord, Observation, OperationKind, OperationPolygon, RelationTier};

/// Bump when the snapshot layout changes; older snapshots become misses.
const SNAPSHOT_VERSION: u32 = 1;

/// Identity of an input file set.
///
/// Hashes each file's path, size and modification time; contents are never
/// read. Editing, touching, adding, removing or renaming any input changes
/// the fingerprint. The snapshot format version participates too, so a
/// layout bump invalidates even untouched inputs.
pub fn fingerprint_inputs(paths: &[PathBuf]) -> Result<String> {
    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    hasher.update(SNAPSHOT_VERSION.to_le_bytes());
    for path in sorted {
        let meta = fs::metadata(path)?;
        let mtime = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(meta.len().to_le_bytes());
        hasher.update(mtime.to_le_bytes());
    }
    Ok(hex::encode(hasher.finalize()))
}

/// A complete pipeline outcome, in row form.
///
/// What a hit returns and what a full run hands over for persisting.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRun {
    pub observations: Vec<Observation>,
    pub polygons: Vec<OperationPolygon>,
    pub records: Vec<MatchRecord>,
    pub date_floor: Option<NaiveDate>,
}

/// Result cache bound to one snapshot file.
#[derive(Debug, Clone)]
pub struct ResultCache {
    path: PathBuf,
}

impl ResultCache {
    /// Bind the cache to a snapshot file path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// The snapshot file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a snapshot for this fingerprint. Every failure is a miss.
    pub fn load(&self, fingerprint: &str) -> Option<CachedRun> {
        if !self.path.exists() {
            debug!("No cache snapshot at '{}'", self.path.display());
            return None;
        }
        match self.try_load(fingerprint) {
            Ok(run) => {
                info!(
                    "Cache hit: {} observations, {} operations, {} records",
                    run.observations.len(),
                    run.polygons.len(),
                    run.records.len()
                );
                Some(run)
            }
            Err(e) => {
                warn!("Cache miss, recomputing: {}", e);
                None
            }
        }
    }

    /// Strict load behind [`ResultCache::load`].
    ///
    /// Callers outside the pipeline (status commands, tests) get the reason
    /// a snapshot is unusable instead of a silent miss.
    pub fn try_load(&self, fingerprint: &str) -> Result<CachedRun> {
        let bytes = fs::read(&self.path)?;
        let snapshot: Snapshot = bincode::deserialize(&bytes).map_err(|e| {
            FellmatchError::CacheCorruption(format!("snapshot does not decode: {e}"))
        })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(FellmatchError::CacheCorruption(format!(
                "snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        if snapshot.fingerprint != fingerprint {
            return Err(FellmatchError::CacheCorruption(
                "input fingerprint changed".to_string(),
            ));
        }
        snapshot.into_rows()
    }

    /// Write a fresh snapshot, replacing any previous one.
    pub fn store(&self, fingerprint: &str, run: &CachedRun) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let snapshot = Snapshot::from_rows(fingerprint, run);
        let bytes = bincode::serialize(&snapshot)
            .map_err(|e| FellmatchError::CacheCorruption(format!("snapshot encode: {e}")))?;
        fs::write(&self.path, &bytes)?;
        info!(
            "Cache snapshot written: '{}' ({} bytes)",
            self.path.display(),
            bytes.len()
        );
        Ok(())
    }

    /// Delete the snapshot if present. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

// ============================================================================
// Columnar layout
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    fingerprint: String,
    date_floor: Option<NaiveDate>,
    observations: ObservationColumns,
    operations: OperationColumns,
    matches: MatchColumns,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ObservationColumns {
    id: Vec<u32>,
    species: Vec<String>,
    easting: Vec<f64>,
    northing: Vec<f64>,
    accuracy_m: Vec<f64>,
    observed: Vec<Option<NaiveDate>>,
    source: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OperationColumns {
    id: Vec<u32>,
    kind: Vec<OperationKind>,
    date: Vec<Option<NaiveDate>>,
    geometry: Vec<MultiPolygon<f64>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MatchColumns {
    observation_id: Vec<u32>,
    polygon_id: Vec<u32>,
    tier: Vec<RelationTier>,
}

impl Snapshot {
    fn from_rows(fingerprint: &str, run: &CachedRun) -> Self {
        let mut observations = ObservationColumns::default();
        for o in &run.observations {
            observations.id.push(o.id);
            observations.species.push(o.species.clone());
            observations.easting.push(o.easting);
            observations.northing.push(o.northing);
            observations.accuracy_m.push(o.accuracy_m);
            observations.observed.push(o.observed);
            observations.source.push(o.source.clone());
        }

        let mut operations = OperationColumns::default();
        for p in &run.polygons {
            operations.id.push(p.id);
            operations.kind.push(p.kind);
            operations.date.push(p.date);
            operations.geometry.push(p.geometry.clone());
        }

        let mut matches = MatchColumns::default();
        for r in &run.records {
            matches.observation_id.push(r.observation_id);
            matches.polygon_id.push(r.polygon_id);
            matches.tier.push(r.tier);
        }

        Self {
            version: SNAPSHOT_VERSION,
            fingerprint: fingerprint.to_string(),
            date_floor: run.date_floor,
            observations,
            operations,
            matches,
        }
    }

    fn into_rows(self) -> Result<CachedRun> {
        let o = &self.observations;
        let n = o.id.len();
        if o.species.len() != n
            || o.easting.len() != n
            || o.northing.len() != n
            || o.accuracy_m.len() != n
            || o.observed.len() != n
            || o.source.len() != n
        {
            return Err(FellmatchError::CacheCorruption(
                "observation columns disagree in length".to_string(),
            ));
        }
        let mut observations = Vec::with_capacity(n);
        for i in 0..n {
            observations.push(Observation {
                id: o.id[i],
                species: o.species[i].clone(),
                easting: o.easting[i],
                northing: o.northing[i],
                accuracy_m: o.accuracy_m[i],
                observed: o.observed[i],
                source: o.source[i].clone(),
            });
        }

        let ops = self.operations;
        let n = ops.id.len();
        if ops.kind.len() != n || ops.date.len() != n || ops.geometry.len() != n {
            return Err(FellmatchError::CacheCorruption(
                "operation columns disagree in length".to_string(),
            ));
        }
        let polygons: Vec<OperationPolygon> = ops
            .id
            .into_iter()
            .zip(ops.kind)
            .zip(ops.date)
            .zip(ops.geometry)
            .map(|(((id, kind), date), geometry)| OperationPolygon {
                id,
                kind,
                date,
                geometry,
            })
            .collect();

        let m = self.matches;
        let n = m.observation_id.len();
        if m.polygon_id.len() != n || m.tier.len() != n {
            return Err(FellmatchError::CacheCorruption(
                "match columns disagree in length".to_string(),
            ));
        }
        let records: Vec<MatchRecord> = m
            .observation_id
            .into_iter()
            .zip(m.polygon_id)
            .zip(m.tier)
            .map(|((observation_id, polygon_id), tier)| MatchRecord {
                observation_id,
                polygon_id,
                tier,
            })
            .collect();

        Ok(CachedRun {
            observations,
            polygons,
            records,
            date_floor: self.date_floor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn sample_run() -> CachedRun {
        CachedRun {
            observations: vec![Observation {
                id: 0,
                species: "Picoides tridactylus".to_string(),
                easting: 512_000.0,
                northing: 6_712_000.0,
                accuracy_m: 25.0,
                observed: NaiveDate::from_ymd_opt(2020, 6, 1),
                source: "export.xlsx".to_string(),
            }],
            polygons: vec![OperationPolygon {
                id: 0,
                kind: OperationKind::Reported,
                date: NaiveDate::from_ymd_opt(2021, 1, 1),
                geometry: MultiPolygon::new(vec![polygon![
                    (x: 511_900.0, y: 6_711_900.0),
                    (x: 512_100.0, y: 6_711_900.0),
                    (x: 512_100.0, y: 6_712_100.0),
                    (x: 511_900.0, y: 6_712_100.0),
                ]]),
            }],
            records: vec![MatchRecord {
                observation_id: 0,
                polygon_id: 0,
                tier: RelationTier::Inside,
            }],
            date_floor: NaiveDate::from_ymd_opt(2020, 6, 1),
        }
    }

    #[test]
    fn test_columns_round_trip() {
        let run = sample_run();
        let rebuilt = Snapshot::from_rows("abc", &run)
            .into_rows()
            .expect("round trip");
        assert_eq!(rebuilt, run);
    }

    #[test]
    fn test_column_length_mismatch_is_corruption() {
        let mut snapshot = Snapshot::from_rows("abc", &sample_run());
        snapshot.matches.tier.clear();
        let err = snapshot.into_rows().expect_err("must not decode");
        assert!(matches!(err, FellmatchError::CacheCorruption(_)));
    }
}
