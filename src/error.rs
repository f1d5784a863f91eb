//! Unified error handling for the matching pipeline.
//!
//! Fatal conditions (unreadable layers, structurally invalid observation
//! exports) surface as [`FellmatchError`]. Recoverable conditions (a stale or
//! corrupt cache snapshot) stay internal to the cache module, which downgrades
//! them to a miss.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FellmatchError>;

/// Errors produced by the matching pipeline.
#[derive(Debug, Error)]
pub enum FellmatchError {
    /// A required column could not be located in an observation export.
    #[error("column '{column}' not found in observation file '{file}'")]
    MissingColumn { column: String, file: String },

    /// The project root contains no observation exports at all.
    #[error("no observation spreadsheets (*.xlsx) found in '{}'", dir.display())]
    NoObservationFiles { dir: PathBuf },

    /// An observation spreadsheet could not be opened or read.
    #[error("failed to read spreadsheet '{}': {source}", path.display())]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// A required polygon layer is missing or unreadable.
    #[error("failed to read polygon layer '{}': {message}", path.display())]
    LayerRead { path: PathBuf, message: String },

    /// A cache snapshot exists but cannot be trusted.
    ///
    /// Never escapes the cache module during a pipeline run; exposed so the
    /// inner load path can be exercised directly.
    #[error("cache snapshot unusable: {0}")]
    CacheCorruption(String),

    /// Report workbook could not be written.
    #[error("failed to write report: {0}")]
    Report(#[from] rust_xlsxwriter::XlsxError),

    /// Underlying filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extension trait for converting `Option` to `Result` with loader errors.
pub trait OptionExt<T> {
    /// Convert `None` to a [`FellmatchError::MissingColumn`].
    fn ok_or_missing_column(self, column: &str, file: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_missing_column(self, column: &str, file: &str) -> Result<T> {
        self.ok_or_else(|| FellmatchError::MissingColumn {
            column: column.to_string(),
            file: file.to_string(),
        })
    }
}
