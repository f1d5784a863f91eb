//! Observation spreadsheet ingestion.
//!
//! Export files arrive with a couple of preamble rows, localized headers and
//! loosely typed cells. The loader scans for the header row, resolves the
//! known column aliases and coerces cells the way the exports actually look:
//! numbers as floats, integers or comma-decimal text, dates as date cells or
//! ISO text. Whatever it cannot coerce becomes `None`; the observation
//! filter decides what survives.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::NaiveDate;
use log::info;

use crate::error::{FellmatchError, OptionExt, Result};

/// How many leading rows may precede the header in an export sheet.
const HEADER_SCAN_ROWS: usize = 10;

// Column aliases, compared lowercase and trimmed.
const SPECIES_ALIASES: &[&str] = &["artnamn", "species", "species name"];
const EASTING_ALIASES: &[&str] = &["ost", "öst", "easting", "east"];
const NORTHING_ALIASES: &[&str] = &["nord", "northing", "north"];
const ACCURACY_ALIASES: &[&str] = &["noggrannhet", "accuracy", "accuracy (m)"];
const DATE_ALIASES: &[&str] = &["startdatum", "start date", "date", "observation date"];

/// One export row before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawObservation {
    pub species: String,
    pub easting: Option<f64>,
    pub northing: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub observed: Option<NaiveDate>,
    /// Name of the export file the row came from.
    pub source: String,
}

/// Read every export file, in the given order.
///
/// Rows keep file order; each row is tagged with its source file name. A
/// file whose header lacks any of the expected columns is fatal.
pub fn load_observation_files(files: &[PathBuf]) -> Result<Vec<RawObservation>> {
    let mut rows = Vec::new();
    for path in files {
        let before = rows.len();
        read_export(path, &mut rows)?;
        info!("Export '{}': {} rows", path.display(), rows.len() - before);
    }
    Ok(rows)
}

/// Resolved header of one export sheet.
struct Header {
    row: usize,
    species: usize,
    easting: usize,
    northing: usize,
    accuracy: usize,
    date: usize,
}

fn read_export(path: &Path, rows: &mut Vec<RawObservation>) -> Result<()> {
    let file_label = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("export")
        .to_string();

    let mut workbook = open_workbook_auto(path).map_err(|e| FellmatchError::Spreadsheet {
        path: path.to_path_buf(),
        source: e,
    })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(FellmatchError::Spreadsheet {
            path: path.to_path_buf(),
            source: calamine::Error::Msg("workbook has no sheets"),
        })?
        .map_err(|e| FellmatchError::Spreadsheet {
            path: path.to_path_buf(),
            source: e,
        })?;

    let sheet: Vec<&[Data]> = range.rows().collect();
    let header = find_header(&sheet, &file_label)?;

    for row in sheet.iter().skip(header.row + 1) {
        rows.push(RawObservation {
            species: cell_string(row, header.species).unwrap_or_default(),
            easting: cell_number(row, header.easting),
            northing: cell_number(row, header.northing),
            accuracy_m: cell_number(row, header.accuracy),
            observed: cell_date(row, header.date),
            source: file_label.clone(),
        });
    }

    Ok(())
}

/// Locate the header row within the leading rows of the sheet.
///
/// The row containing both coordinate columns is the header. Once found,
/// every expected column must resolve there; a column absent from the header
/// is fatal, unlike an empty cell in a data row.
fn find_header(sheet: &[&[Data]], file: &str) -> Result<Header> {
    for (idx, row) in sheet.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let labels: Vec<Option<String>> = row.iter().map(normalize_label).collect();
        let (Some(easting), Some(northing)) = (
            find_alias(&labels, EASTING_ALIASES),
            find_alias(&labels, NORTHING_ALIASES),
        ) else {
            continue;
        };
        return Ok(Header {
            row: idx,
            species: find_alias(&labels, SPECIES_ALIASES).ok_or_missing_column("Artnamn", file)?,
            easting,
            northing,
            accuracy: find_alias(&labels, ACCURACY_ALIASES)
                .ok_or_missing_column("Noggrannhet", file)?,
            date: find_alias(&labels, DATE_ALIASES).ok_or_missing_column("Startdatum", file)?,
        });
    }
    Err(FellmatchError::MissingColumn {
        column: "Ost/Nord".to_string(),
        file: file.to_string(),
    })
}

fn normalize_label(cell: &Data) -> Option<String> {
    let text = cell.as_string()?;
    let trimmed = text.trim().to_lowercase();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn find_alias(labels: &[Option<String>], aliases: &[&str]) -> Option<usize> {
    labels
        .iter()
        .position(|l| l.as_deref().map_or(false, |l| aliases.contains(&l)))
}

fn cell_string(row: &[Data], idx: usize) -> Option<String> {
    let text = row.get(idx)?.as_string()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Numbers arrive as floats, integers or text, the text sometimes with a
/// decimal comma.
fn cell_number(row: &[Data], idx: usize) -> Option<f64> {
    match row.get(idx)? {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

/// Dates arrive as native date cells or as ISO text, sometimes with a time
/// suffix.
fn cell_date(row: &[Data], idx: usize) -> Option<NaiveDate> {
    let value = row.get(idx)?;
    match value {
        Data::String(s) => {
            let text = s.trim();
            NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().or_else(|| {
                text.get(..10)
                    .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
            })
        }
        other => other.as_date(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_number_coercion() {
        let row = vec![
            Data::Float(512000.5),
            Data::Int(6712000),
            Data::String("  25,5 ".to_string()),
            Data::String("n/a".to_string()),
            Data::Empty,
        ];
        assert_eq!(cell_number(&row, 0), Some(512000.5));
        assert_eq!(cell_number(&row, 1), Some(6712000.0));
        assert_eq!(cell_number(&row, 2), Some(25.5));
        assert_eq!(cell_number(&row, 3), None);
        assert_eq!(cell_number(&row, 4), None);
        // Past the end of a short row.
        assert_eq!(cell_number(&row, 17), None);
    }

    #[test]
    fn test_cell_date_text_forms() {
        let row = vec![
            Data::String("2020-06-01".to_string()),
            Data::String("2020-06-01 00:00:00".to_string()),
            Data::String("spring".to_string()),
        ];
        assert_eq!(cell_date(&row, 0), NaiveDate::from_ymd_opt(2020, 6, 1));
        assert_eq!(cell_date(&row, 1), NaiveDate::from_ymd_opt(2020, 6, 1));
        assert_eq!(cell_date(&row, 2), None);
    }

    #[test]
    fn test_find_alias_normalization() {
        let labels = vec![
            Some("artnamn".to_string()),
            Some("ost".to_string()),
            None,
            Some("nord".to_string()),
        ];
        assert_eq!(find_alias(&labels, SPECIES_ALIASES), Some(0));
        assert_eq!(find_alias(&labels, EASTING_ALIASES), Some(1));
        assert_eq!(find_alias(&labels, NORTHING_ALIASES), Some(3));
        assert_eq!(find_alias(&labels, ACCURACY_ALIASES), None);
    }
}
