//! sfgeo-core - Configuration, dataset models, vector formats, and loaders
//!
//! This crate contains the domain models and the validated loading layer for
//! the Santa Fe geospatial pipeline.

pub mod config;
pub mod error;
pub mod formats;
pub mod loader;
pub mod models;

pub use error::{Result, SfGeoError};
