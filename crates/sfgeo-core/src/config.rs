//! Project configuration: data paths, CRS defaults, dataset file map
//!
//! Configuration is read once from the environment at startup and passed by
//! reference into every component; nothing reads the environment afterwards.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, SfGeoError};
use crate::models::Crs;

/// The closed set of logical dataset names this project manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Parcels,
    CensusTracts,
    Hydrology,
    Osm,
    CityLimits,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 5] = [
        DatasetKind::Parcels,
        DatasetKind::CensusTracts,
        DatasetKind::Hydrology,
        DatasetKind::Osm,
        DatasetKind::CityLimits,
    ];

    /// Logical name, as used on the command line and in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::Parcels => "parcels",
            DatasetKind::CensusTracts => "census_tracts",
            DatasetKind::Hydrology => "hydrology",
            DatasetKind::Osm => "osm",
            DatasetKind::CityLimits => "city_limits",
        }
    }

    /// Fixed on-disk file name for the persisted dataset.
    pub fn file_name(&self) -> &'static str {
        match self {
            DatasetKind::Parcels => "parcels_zoning.geojson",
            DatasetKind::CensusTracts => "census_tracts_acs.geojson",
            DatasetKind::Hydrology => "hydrology.geojson",
            DatasetKind::Osm => "osm_roads_pois.geojson",
            DatasetKind::CityLimits => "city_limits.geojson",
        }
    }

    /// Human-readable label used in loader errors.
    pub fn label(&self) -> &'static str {
        match self {
            DatasetKind::Parcels => "Parcels",
            DatasetKind::CensusTracts => "Census tracts",
            DatasetKind::Hydrology => "Hydrology",
            DatasetKind::Osm => "OSM",
            DatasetKind::CityLimits => "City limits",
        }
    }
}

impl FromStr for DatasetKind {
    type Err = SfGeoError;

    fn from_str(s: &str) -> Result<Self> {
        DatasetKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| SfGeoError::UnknownDataset {
                name: s.to_string(),
                available: DatasetKind::ALL.iter().map(|k| k.name()).collect(),
            })
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw/processed selector for [`ProjectConfig::data_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataArea {
    Raw,
    Processed,
}

/// Process-wide configuration, read-only after construction.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub data_root: PathBuf,
    /// Display CRS for web-style maps (Web Mercator by default).
    pub default_crs: Crs,
    /// Local analysis CRS (NM State Plane Central by default).
    pub local_crs: Crs,
    pub maps_dir: PathBuf,
    pub map_dpi: u32,
    census_api_key: Option<String>,
}

impl ProjectConfig {
    /// Read configuration from the environment, applying defaults for any
    /// unset variable. Invalid CRS overrides warn and fall back.
    pub fn from_env() -> Self {
        let data_root = env::var("SANTA_FE_DATA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let default_crs = crs_from_env("SANTA_FE_DEFAULT_CRS", Crs::epsg(3857));
        let local_crs = crs_from_env("SANTA_FE_LOCAL_CRS", Crs::epsg(32113));

        Self {
            data_root,
            default_crs,
            local_crs,
            maps_dir: PathBuf::from("maps").join("static"),
            map_dpi: 300,
            census_api_key: env::var("CENSUS_API_KEY").ok(),
        }
    }

    /// Configuration rooted at an explicit directory, with defaults for
    /// everything else. Used by tests and embedding callers.
    pub fn with_data_root(data_root: impl Into<PathBuf>) -> Self {
        let data_root = data_root.into();
        Self {
            maps_dir: data_root.join("maps"),
            data_root,
            default_crs: Crs::epsg(3857),
            local_crs: Crs::epsg(32113),
            map_dpi: 300,
            census_api_key: None,
        }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_root.join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.data_root.join("processed")
    }

    /// Path to a dataset file by logical name and area.
    pub fn data_path(&self, kind: DatasetKind, area: DataArea) -> PathBuf {
        let base = match area {
            DataArea::Raw => self.raw_dir(),
            DataArea::Processed => self.processed_dir(),
        };
        base.join(kind.file_name())
    }

    /// Path to the processed city-limits dataset, or `None` when the file
    /// does not exist. Absence is an expected condition, not an error.
    pub fn city_limits_path(&self) -> Option<PathBuf> {
        let path = self.data_path(DatasetKind::CityLimits, DataArea::Processed);
        path.exists().then_some(path)
    }

    pub fn census_api_key(&self) -> Option<&str> {
        self.census_api_key.as_deref()
    }

    /// Override the API key after construction. Intended for tests.
    pub fn set_census_api_key(&mut self, key: Option<String>) {
        self.census_api_key = key;
    }
}

fn crs_from_env(var: &str, default: Crs) -> Crs {
    match env::var(var) {
        Ok(value) => match value.parse::<Crs>() {
            Ok(crs) => crs,
            Err(_) => {
                tracing::warn!(
                    "Invalid {} value '{}': expected an EPSG code like EPSG:3857, using {}",
                    var,
                    value,
                    default
                );
                default
            }
        },
        Err(_) => default,
    }
}
