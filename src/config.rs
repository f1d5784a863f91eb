//! Project directory layout.
//!
//! Everything derives from one root directory: observation exports sit in
//! the root itself, the national layer extracts next to them, and every
//! generated artifact goes under `processed/`.

use std::fs;
use std::path::PathBuf;

use crate::error::{FellmatchError, Result};
use crate::OperationKind;

/// Identifier of the projected CRS every input must share (SWEREF 99 TM).
/// Informational; no reprojection is performed.
pub const PROJECTED_CRS: &str = "EPSG:3006";

const REPORTED_LAYER: &str = "operations_reported.geojson";
const COMPLETED_LAYER: &str = "operations_completed.geojson";
const OUTPUT_DIR: &str = "processed";
const CACHE_SNAPSHOT: &str = "match_cache.bin";
const REPORT_FILE: &str = "analysis_report.xlsx";

/// Paths of one analysis project.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    /// Project root; observation exports live directly in it.
    pub root: PathBuf,
    /// Directory for generated artifacts.
    pub output_dir: PathBuf,
    /// Columnar cache snapshot.
    pub cache_snapshot: PathBuf,
    /// Excel report workbook.
    pub report_file: PathBuf,
}

impl ProjectPaths {
    /// Derive the standard layout from a root directory.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let output_dir = root.join(OUTPUT_DIR);
        let cache_snapshot = output_dir.join(CACHE_SNAPSHOT);
        let report_file = output_dir.join(REPORT_FILE);
        Self {
            root,
            output_dir,
            cache_snapshot,
            report_file,
        }
    }

    /// Layer extract path for one operation kind.
    pub fn layer_file(&self, kind: OperationKind) -> PathBuf {
        match kind {
            OperationKind::Reported => self.root.join(REPORTED_LAYER),
            OperationKind::Completed => self.root.join(COMPLETED_LAYER),
        }
    }

    /// Observation exports (`*.xlsx`) in the root, sorted by name.
    ///
    /// A root without a single export is fatal; there is nothing to analyze.
    pub fn observation_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_xlsx = path
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("xlsx"));
            if !is_xlsx || !path.is_file() {
                continue;
            }
            // Spreadsheet lock files (~$...) are not exports.
            let skip = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(true, |n| n.starts_with("~$") || n.starts_with('.'));
            if !skip {
                files.push(path);
            }
        }
        files.sort();
        if files.is_empty() {
            return Err(FellmatchError::NoObservationFiles {
                dir: self.root.clone(),
            });
        }
        Ok(files)
    }

    /// Create the output directory when missing.
    pub fn ensure_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }
}
