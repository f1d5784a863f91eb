//! Exposure statistics and report export.
//!
//! The aggregator is a thin consumer of the match records. Observation
//! exposure is counted once per observation with `Inside` taking priority
//! over `NearZone`; operation exposure is counted per layer over the
//! operations that were within the region and survived the date floor. The
//! figures feed the CLI's console block and an Excel workbook with summary,
//! species and match detail sheets.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::NaiveDate;
use log::info;
use rust_xlsxwriter::{Format, Workbook};

use crate::engine::classifier::passes_date_floor;
use crate::engine::AnalysisRun;
use crate::error::Result;
use crate::{Observation, OperationKind, OperationPolygon, RelationTier};

/// Observation exposure for one species.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesStats {
    pub species: String,
    /// Observations of this species that reached matching.
    pub total: usize,
    /// Observations inside at least one operation area.
    pub inside: usize,
    /// Observations near an operation area but inside none.
    pub near_zone: usize,
    /// Observations with no relation to any operation.
    pub unmatched: usize,
}

impl SpeciesStats {
    /// Observations with any relation to an operation.
    pub fn affected(&self) -> usize {
        self.inside + self.near_zone
    }

    /// Affected observations as a percentage of the species total.
    pub fn affected_share(&self) -> f64 {
        share(self.affected(), self.total)
    }
}

/// Operation exposure for one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStats {
    pub kind: OperationKind,
    /// Operations within the region that survive the date floor.
    pub considered: usize,
    /// Operations containing at least one observation.
    pub with_inside: usize,
    /// Operations matched only through the near zone.
    pub near_only: usize,
    /// Distinct observations inside any operation of this layer.
    pub observations_inside: usize,
    /// Distinct observations near (but inside none) of this layer's
    /// operations.
    pub observations_near: usize,
}

impl LayerStats {
    /// Operations with at least one matching observation.
    pub fn affected(&self) -> usize {
        self.with_inside + self.near_only
    }

    /// Affected operations as a percentage of those considered.
    pub fn affected_share(&self) -> f64 {
        share(self.affected(), self.considered)
    }
}

/// Aggregated outcome of one analysis run.
#[derive(Debug, Clone)]
pub struct Summary {
    /// Observations that reached matching.
    pub observation_total: usize,
    /// Distinct observations with any match record.
    pub observations_affected: usize,
    /// Per-species figures, ordered by species name.
    pub species: Vec<SpeciesStats>,
    /// Per-layer figures, in [`OperationKind::ALL`] order.
    pub layers: Vec<LayerStats>,
    /// Date floor the run used.
    pub date_floor: Option<NaiveDate>,
    /// Whether the run came from the cache snapshot.
    pub from_cache: bool,
}

impl Summary {
    /// Affected observations as a percentage of all matched-against ones.
    pub fn observations_affected_share(&self) -> f64 {
        share(self.observations_affected, self.observation_total)
    }
}

fn share(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Aggregate a run into per-species and per-layer exposure figures.
pub fn summarize(run: &AnalysisRun) -> Summary {
    let kind_of: HashMap<u32, OperationKind> =
        run.polygons.iter().map(|p| (p.id, p.kind)).collect();

    // Best tier per observation, overall and per layer; Inside wins.
    let mut best: HashMap<u32, RelationTier> = HashMap::new();
    let mut best_by_layer: HashMap<(u32, OperationKind), RelationTier> = HashMap::new();
    // Operation id -> whether any observation lies inside it.
    let mut operation_hits: HashMap<u32, bool> = HashMap::new();

    for r in &run.records {
        let slot = best.entry(r.observation_id).or_insert(r.tier);
        if r.tier == RelationTier::Inside {
            *slot = RelationTier::Inside;
        }

        if let Some(&kind) = kind_of.get(&r.polygon_id) {
            let slot = best_by_layer.entry((r.observation_id, kind)).or_insert(r.tier);
            if r.tier == RelationTier::Inside {
                *slot = RelationTier::Inside;
            }
        }

        let hit = operation_hits.entry(r.polygon_id).or_insert(false);
        if r.tier == RelationTier::Inside {
            *hit = true;
        }
    }

    let mut species: BTreeMap<String, SpeciesStats> = BTreeMap::new();
    for obs in &run.observations {
        let entry = species
            .entry(obs.species.clone())
            .or_insert_with(|| SpeciesStats {
                species: obs.species.clone(),
                ..SpeciesStats::default()
            });
        entry.total += 1;
        match best.get(&obs.id) {
            Some(RelationTier::Inside) => entry.inside += 1,
            Some(RelationTier::NearZone) => entry.near_zone += 1,
            None => entry.unmatched += 1,
        }
    }

    let mut layers = Vec::new();
    for kind in OperationKind::ALL {
        let considered = run
            .polygons
            .iter()
            .filter(|p| p.kind == kind && passes_date_floor(p, run.date_floor))
            .count();

        let mut with_inside = 0;
        let mut near_only = 0;
        for (id, has_inside) in &operation_hits {
            if kind_of.get(id) == Some(&kind) {
                if *has_inside {
                    with_inside += 1;
                } else {
                    near_only += 1;
                }
            }
        }

        let observations_inside = best_by_layer
            .iter()
            .filter(|((_, k), &tier)| *k == kind && tier == RelationTier::Inside)
            .count();
        let observations_near = best_by_layer
            .iter()
            .filter(|((_, k), &tier)| *k == kind && tier == RelationTier::NearZone)
            .count();

        layers.push(LayerStats {
            kind,
            considered,
            with_inside,
            near_only,
            observations_inside,
            observations_near,
        });
    }

    Summary {
        observation_total: run.observations.len(),
        observations_affected: best.len(),
        species: species.into_values().collect(),
        layers,
        date_floor: run.date_floor,
        from_cache: run.from_cache,
    }
}

/// Write the report workbook: summary, species and match detail sheets.
pub fn write_report(run: &AnalysisRun, summary: &Summary, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    // ------------------------------------------------------------------
    // Summary sheet
    // ------------------------------------------------------------------
    let sheet = workbook.add_worksheet();
    sheet.set_name("Summary")?;
    sheet.set_column_width(0, 34)?;

    sheet.write_string_with_format(0, 0, "Species exposure analysis", &bold)?;
    sheet.write_string(1, 0, "Date floor")?;
    sheet.write_string(1, 1, &date_text(summary.date_floor))?;
    sheet.write_string(2, 0, "Observations analyzed")?;
    sheet.write_number(2, 1, summary.observation_total as f64)?;
    sheet.write_string(3, 0, "Observations affected")?;
    sheet.write_number(3, 1, summary.observations_affected as f64)?;
    sheet.write_string(4, 0, "Observations affected (%)")?;
    sheet.write_number(4, 1, summary.observations_affected_share())?;

    let headers = [
        "Layer",
        "Operations considered",
        "With observations inside",
        "Near zone only",
        "Affected",
        "Affected (%)",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(6, col as u16, *header, &bold)?;
    }
    for (i, layer) in summary.layers.iter().enumerate() {
        let row = 7 + i as u32;
        sheet.write_string(row, 0, layer.kind.label())?;
        sheet.write_number(row, 1, layer.considered as f64)?;
        sheet.write_number(row, 2, layer.with_inside as f64)?;
        sheet.write_number(row, 3, layer.near_only as f64)?;
        sheet.write_number(row, 4, layer.affected() as f64)?;
        sheet.write_number(row, 5, layer.affected_share())?;
    }

    // ------------------------------------------------------------------
    // Species sheet
    // ------------------------------------------------------------------
    let sheet = workbook.add_worksheet();
    sheet.set_name("Species")?;
    sheet.set_column_width(0, 34)?;

    let headers = [
        "Species",
        "Observations",
        "Inside",
        "Near zone",
        "Unmatched",
        "Affected (%)",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (i, s) in summary.species.iter().enumerate() {
        let row = 1 + i as u32;
        sheet.write_string(row, 0, &s.species)?;
        sheet.write_number(row, 1, s.total as f64)?;
        sheet.write_number(row, 2, s.inside as f64)?;
        sheet.write_number(row, 3, s.near_zone as f64)?;
        sheet.write_number(row, 4, s.unmatched as f64)?;
        sheet.write_number(row, 5, s.affected_share())?;
    }

    // ------------------------------------------------------------------
    // Match detail sheet
    // ------------------------------------------------------------------
    let sheet = workbook.add_worksheet();
    sheet.set_name("Matches")?;
    sheet.set_column_width(1, 30)?;
    sheet.set_column_width(2, 24)?;

    let headers = [
        "Observation",
        "Species",
        "Source file",
        "Layer",
        "Operation",
        "Operation date",
        "Relation",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    let obs_by_id: HashMap<u32, &Observation> =
        run.observations.iter().map(|o| (o.id, o)).collect();
    let poly_by_id: HashMap<u32, &OperationPolygon> =
        run.polygons.iter().map(|p| (p.id, p)).collect();

    let mut row = 1u32;
    for r in &run.records {
        let (Some(obs), Some(poly)) = (obs_by_id.get(&r.observation_id), poly_by_id.get(&r.polygon_id))
        else {
            continue;
        };
        sheet.write_number(row, 0, r.observation_id as f64)?;
        sheet.write_string(row, 1, &obs.species)?;
        sheet.write_string(row, 2, &obs.source)?;
        sheet.write_string(row, 3, poly.kind.label())?;
        sheet.write_number(row, 4, r.polygon_id as f64)?;
        sheet.write_string(row, 5, &date_text(poly.date))?;
        sheet.write_string(row, 6, r.tier.label())?;
        row += 1;
    }

    workbook.save(path)?;
    info!("Report written: '{}'", path.display());
    Ok(())
}

fn date_text(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}
