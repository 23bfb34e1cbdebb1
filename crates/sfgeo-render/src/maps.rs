//! Map setup and saving

use std::path::{Path, PathBuf};

use reqwest::Client;

use sfgeo_core::error::{Result, SfGeoError};
use sfgeo_core::models::{Crs, VectorDataset};
use sfgeo_geo::reproject_dataset;

use crate::basemap::{draw_basemap, TileProvider};
use crate::canvas::{MapCanvas, LAYER_COLOR};

/// Working resolution while composing; [`save_map`] rescales to the
/// requested DPI.
const COMPOSE_PIXELS_PER_INCH: f64 = 100.0;

/// Options for [`setup_basemap`].
#[derive(Debug, Clone)]
pub struct BasemapOptions {
    /// Target CRS for the render. `None` means "use the dataset's CRS";
    /// a dataset without a CRS then fails.
    pub crs: Option<Crs>,
    /// Figure size in inches (width, height).
    pub figsize: (f64, f64),
    /// Layer transparency.
    pub alpha: f32,
    /// Whether to fetch basemap tiles (needs network).
    pub add_basemap: bool,
    pub provider: TileProvider,
}

impl Default for BasemapOptions {
    fn default() -> Self {
        Self {
            crs: None,
            figsize: (12.0, 12.0),
            alpha: 0.7,
            add_basemap: true,
            provider: TileProvider::CARTO_POSITRON,
        }
    }
}

/// A composed map: the canvas plus the CRS it was rendered in.
#[derive(Debug, Clone)]
pub struct MapFigure {
    pub canvas: MapCanvas,
    pub crs: Crs,
}

impl MapFigure {
    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }
}

/// Render a dataset over an optional basemap tile layer.
///
/// A dataset without a CRS is assumed to be in the target CRS when one is
/// given (no validation); without a target either, this fails. Basemap
/// failures are soft: the render continues without tiles.
pub async fn setup_basemap(
    client: &Client,
    dataset: &VectorDataset,
    options: &BasemapOptions,
) -> Result<MapFigure> {
    let plot = prepare_dataset(dataset, options.crs.as_ref())?;
    // prepare_dataset guarantees a CRS.
    let crs = plot.crs.clone().unwrap_or_else(|| Crs::epsg(4326));

    let viewport = plot.bounds().ok_or_else(|| SfGeoError::Render {
        reason: format!("dataset {} has no drawable extent", plot.name),
    })?;

    // Fit the viewport into the figure box with equal aspect and no padding:
    // scale by the limiting dimension, sizing the canvas to the viewport's
    // own aspect ratio.
    let fig_width = (options.figsize.0 * COMPOSE_PIXELS_PER_INCH).max(1.0);
    let fig_height = (options.figsize.1 * COMPOSE_PIXELS_PER_INCH).max(1.0);
    let scale = (fig_width / viewport.width()).min(fig_height / viewport.height());
    let width = (viewport.width() * scale).round().max(1.0) as u32;
    let height = (viewport.height() * scale).round().max(1.0) as u32;

    let mut canvas = MapCanvas::new(width, height, viewport);

    if options.add_basemap {
        if let Err(e) = draw_basemap(client, &mut canvas, &crs, &options.provider).await {
            tracing::warn!(
                "Could not add basemap: {}. Continuing without basemap (offline mode or network issue)",
                e
            );
        }
    }

    for feature in &plot.features {
        canvas.draw_geometry(&feature.geometry, LAYER_COLOR, options.alpha);
    }

    Ok(MapFigure { canvas, crs })
}

/// Resolve the dataset into the CRS the map is drawn in.
fn prepare_dataset(dataset: &VectorDataset, target: Option<&Crs>) -> Result<VectorDataset> {
    match (&dataset.crs, target) {
        (None, None) => Err(SfGeoError::NoCrs),
        (None, Some(target)) => {
            // Assume the data already is in the target CRS.
            let mut assumed = dataset.clone();
            assumed.crs = Some(target.clone());
            Ok(assumed)
        }
        (Some(_), None) => Ok(dataset.clone()),
        (Some(current), Some(target)) if current == target => Ok(dataset.clone()),
        (Some(_), Some(target)) => reproject_dataset(dataset, target),
    }
}

/// Write a figure to disk, appending `.png` when the filename has no
/// recognized image extension. The canvas is rescaled from the working
/// resolution to `dpi`.
pub fn save_map(
    figure: &MapFigure,
    filename: &str,
    output_dir: &Path,
    dpi: u32,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let file_name = ensure_image_extension(filename);
    let output_path = output_dir.join(&file_name);

    let scale = f64::from(dpi) / COMPOSE_PIXELS_PER_INCH;
    let image = if (scale - 1.0).abs() < f64::EPSILON {
        figure.canvas.image.clone()
    } else {
        let width = (f64::from(figure.width()) * scale).round().max(1.0) as u32;
        let height = (f64::from(figure.height()) * scale).round().max(1.0) as u32;
        image::imageops::resize(
            &figure.canvas.image,
            width,
            height,
            image::imageops::FilterType::Triangle,
        )
    };

    let is_jpeg = file_name.ends_with(".jpg") || file_name.ends_with(".jpeg");
    if is_jpeg {
        // JPEG has no alpha channel.
        let rgb = image::DynamicImage::ImageRgba8(image).to_rgb8();
        rgb.save(&output_path).map_err(save_error)?;
    } else {
        image.save(&output_path).map_err(save_error)?;
    }

    tracing::info!("Map saved to {}", output_path.display());
    Ok(output_path)
}

fn save_error(e: image::ImageError) -> SfGeoError {
    SfGeoError::Render {
        reason: format!("failed to write image: {}", e),
    }
}

fn ensure_image_extension(filename: &str) -> String {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".png") || lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        filename.to_string()
    } else {
        format!("{}.png", filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfgeo_core::models::Feature;

    fn sample_dataset(crs: Option<Crs>) -> VectorDataset {
        let mut dataset = VectorDataset::new("sample", crs);
        dataset
            .features
            .push(Feature::new(geo::Geometry::Point(geo::Point::new(
                -105.95, 35.65,
            ))));
        dataset
            .features
            .push(Feature::new(geo::Geometry::Point(geo::Point::new(
                -105.94, 35.66,
            ))));
        dataset
    }

    fn no_basemap() -> BasemapOptions {
        BasemapOptions {
            add_basemap: false,
            ..BasemapOptions::default()
        }
    }

    #[tokio::test]
    async fn test_no_crs_no_target_fails() {
        let client = Client::new();
        let options = no_basemap();
        let err = setup_basemap(&client, &sample_dataset(None), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, SfGeoError::NoCrs));
    }

    #[tokio::test]
    async fn test_no_crs_with_target_succeeds() {
        let client = Client::new();
        let options = BasemapOptions {
            crs: Some(Crs::epsg(4326)),
            ..no_basemap()
        };
        let figure = setup_basemap(&client, &sample_dataset(None), &options)
            .await
            .unwrap();
        assert_eq!(figure.crs, Crs::epsg(4326));
        assert!(figure.width() >= 1);
        assert!(figure.height() >= 1);
    }

    #[tokio::test]
    async fn test_dataset_crs_used_when_no_target() {
        let client = Client::new();
        let options = no_basemap();
        let figure = setup_basemap(&client, &sample_dataset(Some(Crs::epsg(4326))), &options)
            .await
            .unwrap();
        assert_eq!(figure.crs, Crs::epsg(4326));
    }

    #[tokio::test]
    async fn test_empty_dataset_fails() {
        let client = Client::new();
        let options = no_basemap();
        let empty = VectorDataset::new("empty", Some(Crs::epsg(4326)));
        assert!(setup_basemap(&client, &empty, &options).await.is_err());
    }

    #[tokio::test]
    async fn test_save_map_appends_png() {
        let client = Client::new();
        let dir = tempfile::tempdir().unwrap();
        let options = no_basemap();
        let figure = setup_basemap(&client, &sample_dataset(Some(Crs::epsg(4326))), &options)
            .await
            .unwrap();

        let path = save_map(&figure, "test_map", dir.path(), 100).unwrap();
        assert_eq!(path, dir.path().join("test_map.png"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_save_map_preserves_given_extension() {
        let client = Client::new();
        let dir = tempfile::tempdir().unwrap();
        let options = no_basemap();
        let figure = setup_basemap(&client, &sample_dataset(Some(Crs::epsg(4326))), &options)
            .await
            .unwrap();

        let path = save_map(&figure, "test_map.jpg", dir.path(), 100).unwrap();
        assert_eq!(path, dir.path().join("test_map.jpg"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_save_map_rescales_for_dpi() {
        let client = Client::new();
        let dir = tempfile::tempdir().unwrap();
        let options = no_basemap();
        let figure = setup_basemap(&client, &sample_dataset(Some(Crs::epsg(4326))), &options)
            .await
            .unwrap();

        let path = save_map(&figure, "highres", dir.path(), 300).unwrap();
        let written = image::open(&path).unwrap();
        assert_eq!(written.width(), figure.width() * 3);
    }
}
