//! Error types for the Santa Fe geospatial pipeline

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SfGeoError {
    // Usage errors
    #[error("Unknown dataset: {name}. Available: {available:?}")]
    UnknownDataset {
        name: String,
        available: Vec<&'static str>,
    },

    #[error("Unknown hydrology source: {name}. Available: {available:?}")]
    UnknownSource {
        name: String,
        available: Vec<&'static str>,
    },

    // Missing required inputs
    #[error("{dataset} data not found at {path}. {hint}")]
    DatasetNotFound {
        dataset: String,
        path: PathBuf,
        hint: String,
    },

    #[error("{dataset} data has no CRS. Expected {expected}. Set CRS during data processing")]
    CrsMissing { dataset: String, expected: String },

    #[error("{dataset} CRS mismatch: got {actual}, expected {expected}. Reproject during data processing")]
    CrsMismatch {
        dataset: String,
        actual: String,
        expected: String,
    },

    #[error("{dataset} data missing required columns: {missing:?}. Available columns: {available:?}")]
    MissingColumns {
        dataset: String,
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("Dataset has no CRS and no target CRS provided. Either set a CRS on the dataset or pass a target CRS")]
    NoCrs,

    #[error("No shapefile found in {path}")]
    NoShapefileInArchive { path: PathBuf },

    // CRS handling
    #[error("Invalid CRS identifier: {value}. Use an EPSG code like EPSG:4326")]
    InvalidCrs { value: String },

    #[error("Projection from {from} to {to} failed: {reason}")]
    Projection {
        from: String,
        to: String,
        reason: String,
    },

    // Network errors
    #[error("Download failed for {url}: HTTP {status}")]
    Download { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // File and format errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {reason}")]
    Archive { reason: String },

    #[error("{format} format error: {reason}")]
    Format { format: String, reason: String },

    #[error("Render error: {reason}")]
    Render { reason: String },
}

pub type Result<T> = std::result::Result<T, SfGeoError>;
