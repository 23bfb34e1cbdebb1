//! Overpass API response parsing
//!
//! Overpass returns its own JSON shape (`elements` with inline geometry when
//! queried with `out geom`), always in geographic coordinates. Ways tagged as
//! water bodies close into polygons; other ways become lines, nodes become
//! points.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{Result, SfGeoError};
use crate::models::{Crs, Feature, VectorDataset};

/// Whether a parsed JSON document looks like an Overpass response.
pub fn is_overpass_response(value: &Value) -> bool {
    value.get("elements").map(Value::is_array).unwrap_or(false)
}

/// Read an Overpass response file into a dataset (CRS is always EPSG:4326).
pub fn read_overpass_json(path: &Path) -> Result<VectorDataset> {
    let content = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content).map_err(|e| SfGeoError::Format {
        format: "Overpass".to_string(),
        reason: format!("Failed to parse {}: {}", path.display(), e),
    })?;
    parse_overpass(&value, super::dataset_name(path))
}

/// Convert a parsed Overpass response into a dataset.
pub fn parse_overpass(value: &Value, name: String) -> Result<VectorDataset> {
    let elements = value
        .get("elements")
        .and_then(Value::as_array)
        .ok_or_else(|| SfGeoError::Format {
            format: "Overpass".to_string(),
            reason: "Response has no 'elements' array".to_string(),
        })?;

    let mut dataset = VectorDataset::new(name, Some(Crs::epsg(4326)));

    for element in elements {
        let Some(element_type) = element.get("type").and_then(Value::as_str) else {
            continue;
        };

        let geometry = match element_type {
            "node" => node_geometry(element),
            "way" => way_geometry(element),
            // Relations without resolved geometry are skipped.
            _ => None,
        };

        let Some(geometry) = geometry else { continue };

        let mut feature = Feature::new(geometry);
        if let Some(id) = element.get("id").and_then(Value::as_i64) {
            feature.properties.insert("osm_id".to_string(), id.into());
        }
        feature
            .properties
            .insert("element".to_string(), element_type.into());
        if let Some(tags) = element.get("tags").and_then(Value::as_object) {
            for (key, tag_value) in tags {
                feature.properties.insert(key.clone(), tag_value.clone());
            }
        }
        dataset.features.push(feature);
    }

    Ok(dataset)
}

fn node_geometry(element: &Value) -> Option<geo::Geometry<f64>> {
    let lat = element.get("lat").and_then(Value::as_f64)?;
    let lon = element.get("lon").and_then(Value::as_f64)?;
    Some(geo::Geometry::Point(geo::Point::new(lon, lat)))
}

fn way_geometry(element: &Value) -> Option<geo::Geometry<f64>> {
    let coords: Vec<geo::Coord<f64>> = element
        .get("geometry")?
        .as_array()?
        .iter()
        .filter_map(|vertex| {
            let lat = vertex.get("lat").and_then(Value::as_f64)?;
            let lon = vertex.get("lon").and_then(Value::as_f64)?;
            Some(geo::Coord { x: lon, y: lat })
        })
        .collect();

    if coords.len() < 2 {
        return None;
    }

    let line = geo::LineString::new(coords);
    if line.is_closed() && line.0.len() >= 4 && is_area_way(element) {
        Some(geo::Geometry::Polygon(geo::Polygon::new(line, Vec::new())))
    } else {
        Some(geo::Geometry::LineString(line))
    }
}

/// Closed ways represent areas only for area-style tags; a circular road
/// stays a line.
fn is_area_way(element: &Value) -> bool {
    let Some(tags) = element.get("tags").and_then(Value::as_object) else {
        return false;
    };
    tags.get("natural").and_then(Value::as_str) == Some("water")
        || tags.contains_key("landuse")
        || tags.contains_key("building")
}
