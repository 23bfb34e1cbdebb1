//! sfgeo-data - Raw dataset acquisition and processing
//!
//! Downloads raw files from the Census Bureau, the Overpass API, and
//! caller-supplied URLs into the raw data area, then turns raw artifacts
//! into processed, CRS-normalized datasets. Nothing in this crate writes to
//! the processed area except [`process::process_downloaded_data`].

pub mod census;
pub mod download;
pub mod osm;
pub mod process;
pub mod sources;

pub use census::{download_census_tracts, AcsOutcome, CensusDownload, CensusOptions};
pub use download::download_file;
pub use osm::{download_hydrology, download_osm_data, HydrologySource};
pub use process::process_downloaded_data;
pub use sources::{download_city_limits, download_city_parcels};
