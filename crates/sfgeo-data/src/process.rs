//! Raw artifact → processed dataset pipeline
//!
//! Every processed dataset has gone through the same steps: read (extracting
//! archives transparently), establish a CRS, optionally clip to the city
//! boundary, reproject to the target CRS, persist as the processed GeoJSON
//! container.

use std::path::{Path, PathBuf};

use sfgeo_core::config::{DataArea, DatasetKind, ProjectConfig};
use sfgeo_core::error::Result;
use sfgeo_core::formats::{read_vector_file, write_geojson};
use sfgeo_core::loader::load_city_limits;
use sfgeo_core::models::{Crs, VectorDataset};
use sfgeo_geo::{clip_dataset, reproject_dataset};

use crate::census::{extract_archive, find_shapefile};

/// Process a downloaded raw file into the processed area for `kind`.
///
/// `output_crs` defaults to the configured local analysis CRS. Clipping is
/// skipped with a warning when the city-limits dataset has not been
/// processed yet; assuming a geographic CRS for CRS-less input is the only
/// other guarded step.
pub fn process_downloaded_data(
    config: &ProjectConfig,
    kind: DatasetKind,
    raw_file: &Path,
    output_crs: Option<&Crs>,
    clip_to_city: bool,
) -> Result<PathBuf> {
    let mut dataset = read_raw_file(raw_file)?;

    if dataset.crs.is_none() {
        tracing::warn!("{} has no CRS. Assuming EPSG:4326 (WGS84)", kind);
        dataset.crs = Some(Crs::epsg(4326));
    }

    if clip_to_city {
        match load_city_limits(config, None)? {
            Some(limits) => {
                dataset = clip_to_boundary(dataset, &limits)?;
            }
            None => {
                tracing::warn!("City limits not found. Skipping clip for {}", kind);
            }
        }
    }

    let target = output_crs.unwrap_or(&config.local_crs);
    if dataset.crs.as_ref() != Some(target) {
        dataset = reproject_dataset(&dataset, target)?;
    }

    let output_path = config.data_path(kind, DataArea::Processed);
    write_geojson(&dataset, &output_path)?;
    tracing::info!("Processed {} saved to {}", kind, output_path.display());

    Ok(output_path)
}

/// Read a raw artifact, extracting an archive first when given one.
fn read_raw_file(raw_file: &Path) -> Result<VectorDataset> {
    let is_archive = raw_file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"));

    if is_archive {
        let scratch = tempfile::tempdir()?;
        extract_archive(raw_file, scratch.path())?;
        let shapefile = find_shapefile(scratch.path())?;
        read_vector_file(&shapefile)
    } else {
        read_vector_file(raw_file)
    }
}

/// Clip against the city boundary, reprojecting the boundary into the
/// dataset's CRS first so the geometric comparison is meaningful.
fn clip_to_boundary(dataset: VectorDataset, limits: &VectorDataset) -> Result<VectorDataset> {
    let boundary = match (&dataset.crs, &limits.crs) {
        (Some(target), Some(_)) => reproject_dataset(limits, target)?,
        _ => limits.clone(),
    };
    clip_dataset(&dataset, &boundary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfgeo_core::formats::read_geojson;
    use sfgeo_core::loader::{load_parcels, LoadOptions};
    use sfgeo_core::models::Feature;

    fn raw_parcels(dir: &Path, crs: Option<Crs>) -> PathBuf {
        let mut dataset = VectorDataset::new("raw_parcels", crs);
        let mut feature = Feature::new(geo::Geometry::Polygon(geo::Polygon::new(
            geo::LineString::from(vec![
                (-105.95, 35.65),
                (-105.95, 35.66),
                (-105.94, 35.66),
                (-105.94, 35.65),
                (-105.95, 35.65),
            ]),
            vec![],
        )));
        feature.properties.insert("parcel_id".into(), "0001".into());
        let path = dir.join("raw_parcels.geojson");
        write_geojson(&dataset_with(dataset, feature), &path).unwrap();
        path
    }

    fn dataset_with(mut dataset: VectorDataset, feature: Feature) -> VectorDataset {
        dataset.features.push(feature);
        dataset
    }

    #[test]
    fn test_process_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::with_data_root(dir.path().join("data"));
        let raw = raw_parcels(dir.path(), Some(Crs::epsg(4326)));

        // Keep the source CRS so the round trip needs no PROJ database.
        let processed = process_downloaded_data(
            &config,
            DatasetKind::Parcels,
            &raw,
            Some(&Crs::epsg(4326)),
            false,
        )
        .unwrap();
        assert!(processed.exists());

        let options = LoadOptions::new()
            .expected_crs(Crs::epsg(4326))
            .required_columns(["parcel_id"]);
        let loaded = load_parcels(&config, &options).unwrap();
        assert_eq!(loaded.feature_count(), 1);
        assert_eq!(loaded.columns(), vec!["parcel_id"]);
    }

    #[test]
    fn test_missing_crs_assumes_geographic() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::with_data_root(dir.path().join("data"));
        let raw = raw_parcels(dir.path(), None);

        let processed = process_downloaded_data(
            &config,
            DatasetKind::Parcels,
            &raw,
            Some(&Crs::epsg(4326)),
            false,
        )
        .unwrap();

        let dataset = read_geojson(&processed).unwrap();
        assert_eq!(dataset.crs, Some(Crs::epsg(4326)));
    }

    #[test]
    fn test_clip_skipped_when_city_limits_absent() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::with_data_root(dir.path().join("data"));
        let raw = raw_parcels(dir.path(), Some(Crs::epsg(4326)));

        // clip_to_city requested, but no city_limits.geojson exists: the clip
        // is skipped and all features survive.
        let processed = process_downloaded_data(
            &config,
            DatasetKind::Parcels,
            &raw,
            Some(&Crs::epsg(4326)),
            true,
        )
        .unwrap();

        let dataset = read_geojson(&processed).unwrap();
        assert_eq!(dataset.feature_count(), 1);
    }

    #[test]
    fn test_clip_restricts_to_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::with_data_root(dir.path().join("data"));

        // Boundary that excludes the parcel entirely.
        let mut limits = VectorDataset::new("city_limits", Some(Crs::epsg(4326)));
        limits.features.push(Feature::new(geo::Geometry::Polygon(
            geo::Polygon::new(
                geo::LineString::from(vec![
                    (-105.90, 35.70),
                    (-105.90, 35.72),
                    (-105.88, 35.72),
                    (-105.88, 35.70),
                    (-105.90, 35.70),
                ]),
                vec![],
            ),
        )));
        write_geojson(
            &limits,
            &config.data_path(DatasetKind::CityLimits, DataArea::Processed),
        )
        .unwrap();

        let raw = raw_parcels(dir.path(), Some(Crs::epsg(4326)));
        let processed = process_downloaded_data(
            &config,
            DatasetKind::Parcels,
            &raw,
            Some(&Crs::epsg(4326)),
            true,
        )
        .unwrap();

        let dataset = read_geojson(&processed).unwrap();
        assert_eq!(dataset.feature_count(), 0);
    }

    #[test]
    fn test_archive_without_shapefile_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::with_data_root(dir.path().join("data"));

        // A zip with no .shp inside.
        let archive_path = dir.path().join("empty.zip");
        let file = std::fs::File::create(&archive_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("readme.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        use std::io::Write;
        writer.write_all(b"nothing spatial here").unwrap();
        writer.finish().unwrap();

        let result = process_downloaded_data(
            &config,
            DatasetKind::Parcels,
            &archive_path,
            Some(&Crs::epsg(4326)),
            false,
        );
        assert!(result.is_err());
    }
}
