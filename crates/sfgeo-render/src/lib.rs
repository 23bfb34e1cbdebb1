//! sfgeo-render - Static map rendering
//!
//! Renders a vector dataset onto an RGBA canvas, optionally over a basemap
//! tile layer, and writes the result as a static image. The canvas viewport
//! is the dataset's bounding box exactly; aspect ratio is preserved by
//! fitting the box inside the requested figure size.

pub mod basemap;
pub mod canvas;
pub mod maps;

pub use basemap::TileProvider;
pub use maps::{save_map, setup_basemap, BasemapOptions, MapFigure};
