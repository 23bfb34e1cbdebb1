//! Validated loading of processed datasets
//!
//! Each loader resolves the dataset path, fails with a descriptive error if
//! the file is absent, and optionally validates the CRS and required
//! attribute columns against caller expectations. City limits are the one
//! exception: a missing boundary is an expected condition and loads as
//! `None`.

use std::path::{Path, PathBuf};

use crate::config::{DataArea, DatasetKind, ProjectConfig};
use crate::error::{Result, SfGeoError};
use crate::formats::read_geojson;
use crate::models::{BoundingBox, Crs, VectorDataset};

/// Expectations a caller can attach to a load.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    data_dir: Option<PathBuf>,
    expected_crs: Option<Crs>,
    required_columns: Vec<String>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from an explicit directory instead of the configured processed
    /// area.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn expected_crs(mut self, crs: Crs) -> Self {
        self.expected_crs = Some(crs);
        self
    }

    pub fn required_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Load city parcels with zoning attributes.
pub fn load_parcels(config: &ProjectConfig, options: &LoadOptions) -> Result<VectorDataset> {
    load_dataset(
        config,
        DatasetKind::Parcels,
        options,
        "Download from City of Santa Fe GIS and process first.",
    )
}

/// Load census tracts with ACS demographics.
pub fn load_census_tracts(config: &ProjectConfig, options: &LoadOptions) -> Result<VectorDataset> {
    load_dataset(
        config,
        DatasetKind::CensusTracts,
        options,
        "Download from the Census Bureau and process first.",
    )
}

/// Load the river/arroyo hydrology layer.
pub fn load_hydrology(config: &ProjectConfig, options: &LoadOptions) -> Result<VectorDataset> {
    load_dataset(
        config,
        DatasetKind::Hydrology,
        options,
        "Download from OSM or USGS and process first.",
    )
}

/// Load OSM roads and points of interest.
pub fn load_osm_infrastructure(
    config: &ProjectConfig,
    options: &LoadOptions,
) -> Result<VectorDataset> {
    load_dataset(
        config,
        DatasetKind::Osm,
        options,
        "Download via the Overpass API and process first.",
    )
}

/// Load the city limits boundary, or `None` when the file is absent.
///
/// Downstream consumers treat a missing boundary as an optional feature, so
/// absence is never an error here.
pub fn load_city_limits(
    config: &ProjectConfig,
    data_dir: Option<&Path>,
) -> Result<Option<VectorDataset>> {
    let path = match data_dir {
        Some(dir) => dir.join(DatasetKind::CityLimits.file_name()),
        None => config.data_path(DatasetKind::CityLimits, DataArea::Processed),
    };
    if !path.exists() {
        return Ok(None);
    }
    read_geojson(&path).map(Some)
}

/// Bounding box for the city: real city-limits bounds when available,
/// otherwise the fixed fallback box. Never fails.
pub fn santa_fe_bounds(config: &ProjectConfig) -> BoundingBox {
    load_city_limits(config, None)
        .ok()
        .flatten()
        .and_then(|limits| limits.bounds())
        .filter(BoundingBox::is_valid)
        .unwrap_or(BoundingBox::SANTA_FE_FALLBACK)
}

fn load_dataset(
    config: &ProjectConfig,
    kind: DatasetKind,
    options: &LoadOptions,
    hint: &str,
) -> Result<VectorDataset> {
    let path = match &options.data_dir {
        Some(dir) => dir.join(kind.file_name()),
        None => config.data_path(kind, DataArea::Processed),
    };

    if !path.exists() {
        return Err(SfGeoError::DatasetNotFound {
            dataset: kind.label().to_string(),
            path,
            hint: format!(
                "{} Expected location: {}",
                hint,
                config.data_path(kind, DataArea::Processed).display()
            ),
        });
    }

    let dataset = read_geojson(&path)?;
    validate_crs(&dataset, kind, options.expected_crs.as_ref())?;
    validate_columns(&dataset, kind, &options.required_columns)?;
    Ok(dataset)
}

fn validate_crs(dataset: &VectorDataset, kind: DatasetKind, expected: Option<&Crs>) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };

    match &dataset.crs {
        None => Err(SfGeoError::CrsMissing {
            dataset: kind.label().to_string(),
            expected: expected.to_string(),
        }),
        Some(actual) if actual != expected => Err(SfGeoError::CrsMismatch {
            dataset: kind.label().to_string(),
            actual: actual.to_string(),
            expected: expected.to_string(),
        }),
        Some(_) => Ok(()),
    }
}

fn validate_columns(dataset: &VectorDataset, kind: DatasetKind, required: &[String]) -> Result<()> {
    if required.is_empty() {
        return Ok(());
    }

    let available = dataset.columns();
    let missing: Vec<String> = required
        .iter()
        .filter(|column| !available.contains(column))
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SfGeoError::MissingColumns {
            dataset: kind.label().to_string(),
            missing,
            available,
        })
    }
}
