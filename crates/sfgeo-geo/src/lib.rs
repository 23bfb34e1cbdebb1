//! sfgeo-geo - CRS transformation and spatial operations
//!
//! Reprojection goes through PROJ; clipping and extent math use the `geo`
//! algorithms directly.

pub mod spatial;
pub mod transform;

pub use spatial::clip_dataset;
pub use transform::{reproject_dataset, reproject_geometry};
