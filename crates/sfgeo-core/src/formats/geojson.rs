//! GeoJSON reading and writing
//!
//! GeoJSON doubles as the persisted container for processed datasets. The
//! writer always emits a `crs` foreign member (urn form, the way GDAL does);
//! the reader treats an absent member as "CRS unset" so raw third-party
//! files surface the missing-CRS condition instead of a silent default.

use std::fs;
use std::path::Path;

use geojson::{Feature as GeoJsonFeature, FeatureCollection, GeoJson};
use serde_json::{Map, Value};

use crate::error::{Result, SfGeoError};
use crate::models::{Crs, Feature, VectorDataset};

/// Read a GeoJSON file into a dataset.
pub fn read_geojson(path: &Path) -> Result<VectorDataset> {
    let content = fs::read_to_string(path)?;
    parse_geojson(&content, super::dataset_name(path))
}

/// Parse GeoJSON text into a dataset.
pub fn parse_geojson(content: &str, name: String) -> Result<VectorDataset> {
    let geojson: GeoJson = content.parse().map_err(|e| SfGeoError::Format {
        format: "GeoJSON".to_string(),
        reason: format!("Failed to parse GeoJSON: {}", e),
    })?;

    match geojson {
        GeoJson::FeatureCollection(collection) => {
            let crs = collection
                .foreign_members
                .as_ref()
                .and_then(|fm| fm.get("crs"))
                .and_then(crs_from_member);
            let mut dataset = VectorDataset::new(name, crs);
            for feature in &collection.features {
                if let Some(converted) = convert_feature(feature)? {
                    dataset.features.push(converted);
                }
            }
            Ok(dataset)
        }
        GeoJson::Feature(feature) => {
            let mut dataset = VectorDataset::new(name, None);
            if let Some(converted) = convert_feature(&feature)? {
                dataset.features.push(converted);
            }
            Ok(dataset)
        }
        GeoJson::Geometry(geometry) => {
            let geom = geo::Geometry::<f64>::try_from(geometry.value.clone()).map_err(|e| {
                SfGeoError::Format {
                    format: "GeoJSON".to_string(),
                    reason: format!("Unsupported geometry: {}", e),
                }
            })?;
            let mut dataset = VectorDataset::new(name, None);
            dataset.features.push(Feature::new(geom));
            Ok(dataset)
        }
    }
}

/// Write a dataset as a GeoJSON FeatureCollection, creating parent
/// directories as needed.
pub fn write_geojson(dataset: &VectorDataset, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let features = dataset
        .features
        .iter()
        .map(|feature| GeoJsonFeature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(
                &feature.geometry,
            ))),
            id: None,
            properties: Some(feature.properties.clone()),
            foreign_members: None,
        })
        .collect();

    let foreign_members = dataset.crs.as_ref().map(crs_member);
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    };

    fs::write(path, GeoJson::from(collection).to_string())?;
    Ok(())
}

/// Extract a CRS from a GeoJSON `crs` foreign member. Handles both
/// `EPSG:4326` and `urn:ogc:def:crs:EPSG::4326` name forms.
fn crs_from_member(member: &Value) -> Option<Crs> {
    let name = member.get("properties")?.get("name")?.as_str()?;
    let code = name.rsplit(':').next()?;
    code.parse::<u32>().ok().map(Crs::epsg)
}

fn crs_member(crs: &Crs) -> Map<String, Value> {
    let mut members = Map::new();
    members.insert(
        "crs".to_string(),
        serde_json::json!({
            "type": "name",
            "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", crs.code()) }
        }),
    );
    members
}

fn convert_feature(feature: &GeoJsonFeature) -> Result<Option<Feature>> {
    let Some(geometry) = &feature.geometry else {
        tracing::debug!("Skipping feature without geometry");
        return Ok(None);
    };

    let geom =
        geo::Geometry::<f64>::try_from(geometry.value.clone()).map_err(|e| SfGeoError::Format {
            format: "GeoJSON".to_string(),
            reason: format!("Unsupported geometry: {}", e),
        })?;

    Ok(Some(Feature {
        geometry: geom,
        properties: feature.properties.clone().unwrap_or_default(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::4326" } },
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-105.95, 35.69] },
                "properties": { "name": "Plaza" }
            }
        ]
    }"#;

    #[test]
    fn test_parse_collection_with_crs() {
        let dataset = parse_geojson(COLLECTION, "test".to_string()).unwrap();
        assert_eq!(dataset.crs, Some(Crs::epsg(4326)));
        assert_eq!(dataset.feature_count(), 1);
        assert_eq!(dataset.columns(), vec!["name"]);
    }

    #[test]
    fn test_parse_collection_without_crs_member() {
        let plain = r#"{"type": "FeatureCollection", "features": []}"#;
        let dataset = parse_geojson(plain, "test".to_string()).unwrap();
        assert!(dataset.crs.is_none());
    }

    #[test]
    fn test_round_trip_preserves_crs_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.geojson");

        let source = parse_geojson(COLLECTION, "roundtrip".to_string()).unwrap();
        write_geojson(&source, &path).unwrap();
        let restored = read_geojson(&path).unwrap();

        assert_eq!(restored.crs, Some(Crs::epsg(4326)));
        assert_eq!(restored.feature_count(), source.feature_count());
        assert_eq!(restored.columns(), source.columns());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("out.geojson");
        let dataset = VectorDataset::new("empty", Some(Crs::epsg(3857)));
        write_geojson(&dataset, &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_invalid_geojson_is_format_error() {
        let err = parse_geojson("not geojson at all", "bad".to_string()).unwrap_err();
        assert!(matches!(err, SfGeoError::Format { .. }));
    }
}
