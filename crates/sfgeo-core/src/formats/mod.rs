//! Vector format I/O
//!
//! Three formats cover every input this pipeline sees: GeoJSON (also the
//! persisted container), ESRI Shapefile (TIGER/Line extracts), and Overpass
//! API JSON. Dispatch is by extension, with JSON content sniffed to tell an
//! Overpass response from a FeatureCollection.

use std::fs;
use std::path::Path;

use crate::error::{Result, SfGeoError};
use crate::models::VectorDataset;

pub mod geojson;
pub mod overpass;
pub mod shapefile;

pub use geojson::{read_geojson, write_geojson};
pub use overpass::read_overpass_json;
pub use shapefile::read_shapefile;

/// Dataset name derived from a file path.
pub(crate) fn dataset_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed")
        .to_string()
}

/// Read any supported vector file, detecting the format from the path.
pub fn read_vector_file(path: &Path) -> Result<VectorDataset> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "shp" => shapefile::read_shapefile(path),
        "json" | "geojson" => {
            let content = fs::read_to_string(path)?;
            let value: serde_json::Value =
                serde_json::from_str(&content).map_err(|e| SfGeoError::Format {
                    format: "JSON".to_string(),
                    reason: format!("Failed to parse {}: {}", path.display(), e),
                })?;
            if overpass::is_overpass_response(&value) {
                overpass::parse_overpass(&value, dataset_name(path))
            } else {
                geojson::parse_geojson(&content, dataset_name(path))
            }
        }
        other => Err(SfGeoError::Format {
            format: "Vector".to_string(),
            reason: format!(
                "Unsupported vector format '.{}' for {}. Supported: .shp, .geojson, .json",
                other,
                path.display()
            ),
        }),
    }
}
