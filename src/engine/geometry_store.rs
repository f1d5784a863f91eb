//! Bounded loading of the national operation layers.
//!
//! Layers are GeoJSON feature collections streamed feature by feature; only
//! features whose geometry can reach the study region are materialized as
//! [`OperationPolygon`]s, everything else is dropped as it is read. A
//! feature-level `bbox` member, when present, settles most rejections before
//! the geometry is converted at all.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDate;
use geo::{Coord, LineString, MultiPolygon, Polygon, Rect};
use geojson::{Feature, FeatureReader, JsonValue};
use log::{info, warn};

use crate::error::{FellmatchError, Result};
use crate::prefilter::StudyRegion;
use crate::{OperationKind, OperationPolygon};

/// Accepted date property names per layer, in lookup order.
fn date_properties(kind: OperationKind) -> &'static [&'static str] {
    match kind {
        OperationKind::Reported => &["Inkomdatum", "operation_date", "date"],
        OperationKind::Completed => &["Avvdatum", "operation_date", "date"],
    }
}

/// Owner of all operation polygons loaded for one analysis run.
///
/// Identifiers are assigned sequentially across layers, so they are unique
/// over both kinds within the run.
#[derive(Debug, Default)]
pub struct GeometryStore {
    polygons: Vec<OperationPolygon>,
    next_id: u32,
}

impl GeometryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream one layer file, keeping the features within the region's reach.
    ///
    /// Returns the number of operations materialized. A missing or unreadable
    /// file, or a malformed feature stream, is fatal.
    pub fn load_layer(
        &mut self,
        path: &Path,
        kind: OperationKind,
        region: &StudyRegion,
    ) -> Result<usize> {
        let file = File::open(path).map_err(|e| FellmatchError::LayerRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let reader = FeatureReader::from_reader(BufReader::new(file));

        let mut loaded = 0usize;
        let mut outside = 0usize;
        let mut unusable = 0usize;

        for feature in reader.features() {
            let feature = feature.map_err(|e| FellmatchError::LayerRead {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

            if let Some(extent) = feature_extent(&feature) {
                if !region.covers_extent(&extent) {
                    outside += 1;
                    continue;
                }
            }

            let area = match feature.geometry.as_ref().and_then(|g| to_multipolygon(&g.value)) {
                Some(area) => area,
                None => {
                    unusable += 1;
                    continue;
                }
            };
            if !region.covers(&area) {
                outside += 1;
                continue;
            }

            let date = parse_feature_date(&feature, kind);
            let id = self.next_id;
            self.next_id += 1;
            self.polygons.push(OperationPolygon {
                id,
                kind,
                date,
                geometry: area,
            });
            loaded += 1;
        }

        if unusable > 0 {
            warn!(
                "Layer '{}': skipped {} features without polygon geometry",
                path.display(),
                unusable
            );
        }
        info!(
            "Layer '{}' ({}): {} operations within region, {} outside",
            path.display(),
            kind.label(),
            loaded,
            outside
        );

        Ok(loaded)
    }

    /// All loaded operations, in load order.
    pub fn polygons(&self) -> &[OperationPolygon] {
        &self.polygons
    }

    /// Consume the store, handing the polygons to the caller.
    pub fn into_polygons(self) -> Vec<OperationPolygon> {
        self.polygons
    }

    /// Number of operations from one layer.
    pub fn count_of(&self, kind: OperationKind) -> usize {
        self.polygons.iter().filter(|p| p.kind == kind).count()
    }

    /// Total number of loaded operations.
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// Check if nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

/// Extent from a feature-level `bbox`, when one is present and well-formed.
fn feature_extent(feature: &Feature) -> Option<Rect<f64>> {
    let bbox = feature.bbox.as_ref()?;
    let (min_x, min_y, max_x, max_y) = match bbox.len() {
        4 => (bbox[0], bbox[1], bbox[2], bbox[3]),
        6 => (bbox[0], bbox[1], bbox[3], bbox[4]),
        _ => return None,
    };
    Some(Rect::new(
        Coord { x: min_x, y: min_y },
        Coord { x: max_x, y: max_y },
    ))
}

/// Convert a GeoJSON geometry to a multipolygon.
///
/// Single polygons become one-part multipolygons; anything that is not a
/// polygon, or has no usable exterior ring, yields `None`.
fn to_multipolygon(value: &geojson::Value) -> Option<MultiPolygon<f64>> {
    match value {
        geojson::Value::Polygon(rings) => rings_to_polygon(rings).map(|p| MultiPolygon::new(vec![p])),
        geojson::Value::MultiPolygon(parts) => {
            let polys: Vec<Polygon<f64>> = parts.iter().filter_map(|r| rings_to_polygon(r)).collect();
            if polys.is_empty() {
                None
            } else {
                Some(MultiPolygon::new(polys))
            }
        }
        _ => None,
    }
}

fn rings_to_polygon(rings: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
    let mut converted = rings.iter().map(|ring| {
        LineString::new(
            ring.iter()
                .filter(|pos| pos.len() >= 2)
                .map(|pos| Coord {
                    x: pos[0],
                    y: pos[1],
                })
                .collect(),
        )
    });
    let exterior = converted.next()?;
    // A closed ring needs at least four positions.
    if exterior.0.len() < 4 {
        return None;
    }
    Some(Polygon::new(exterior, converted.collect()))
}

/// First parseable date among the layer's accepted property names.
fn parse_feature_date(feature: &Feature, kind: OperationKind) -> Option<NaiveDate> {
    date_properties(kind)
        .iter()
        .filter_map(|key| feature.property(key))
        .find_map(json_date)
}

/// Parse an ISO date from a JSON property, tolerating datetime suffixes.
fn json_date(value: &JsonValue) -> Option<NaiveDate> {
    let text = value.as_str()?;
    let prefix = text.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}
