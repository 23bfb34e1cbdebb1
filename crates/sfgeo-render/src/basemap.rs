//! Basemap tile layer
//!
//! Fetches XYZ raster tiles covering the canvas viewport and samples them
//! under the vector layers. Tiles are addressed in the Web Mercator tile
//! scheme, so the viewport CRS must be Web Mercator or geographic; anything
//! else is reported to the caller, which degrades to a tile-less render.

use std::collections::HashMap;

use image::RgbaImage;
use reqwest::Client;

use sfgeo_core::error::{Result, SfGeoError};
use sfgeo_core::models::Crs;

use crate::canvas::MapCanvas;

/// Half the Web Mercator world extent in meters.
const MERCATOR_HALF_WORLD: f64 = 20_037_508.342_789_244;

const TILE_SIZE: u32 = 256;
const MAX_ZOOM: u32 = 19;

/// An XYZ tile endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileProvider {
    pub name: &'static str,
    pub url_template: &'static str,
}

impl TileProvider {
    /// CartoDB Positron: the light, label-sparse default.
    pub const CARTO_POSITRON: TileProvider = TileProvider {
        name: "CartoDB Positron",
        url_template: "https://basemaps.cartocdn.com/light_all/{z}/{x}/{y}.png",
    };

    pub fn tile_url(&self, z: u32, x: u32, y: u32) -> String {
        self.url_template
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

impl Default for TileProvider {
    fn default() -> Self {
        Self::CARTO_POSITRON
    }
}

/// Fetch tiles for the canvas viewport and draw them onto the canvas.
///
/// Individual tile failures leave white gaps; a viewport with no fetched
/// tiles at all is an error so the caller can log one warning and move on.
pub async fn draw_basemap(
    client: &Client,
    canvas: &mut MapCanvas,
    crs: &Crs,
    provider: &TileProvider,
) -> Result<()> {
    let (u0, v0) = unit_mercator(canvas.viewport.minx, canvas.viewport.maxy, crs)?;
    let (u1, v1) = unit_mercator(canvas.viewport.maxx, canvas.viewport.miny, crs)?;

    let zoom = zoom_for_span(canvas.width(), u1 - u0);
    let tile_count = 1u32 << zoom;
    let scale = f64::from(tile_count);

    let tx0 = ((u0 * scale).floor() as u32).min(tile_count - 1);
    let tx1 = ((u1 * scale).floor() as u32).min(tile_count - 1);
    let ty0 = ((v0 * scale).floor() as u32).min(tile_count - 1);
    let ty1 = ((v1 * scale).floor() as u32).min(tile_count - 1);

    let mut tiles: HashMap<(u32, u32), RgbaImage> = HashMap::new();
    for ty in ty0..=ty1 {
        for tx in tx0..=tx1 {
            match fetch_tile(client, provider, zoom, tx, ty).await {
                Ok(tile) => {
                    tiles.insert((tx, ty), tile);
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch tile {}/{}/{}: {}", zoom, tx, ty, e);
                }
            }
        }
    }

    if tiles.is_empty() {
        return Err(SfGeoError::Render {
            reason: format!("no {} tiles could be fetched", provider.name),
        });
    }

    // Sample nearest-neighbor: every canvas pixel maps to one tile pixel.
    let (width, height) = (canvas.width(), canvas.height());
    for py in 0..height {
        for px in 0..width {
            let u = u0 + (u1 - u0) * (f64::from(px) + 0.5) / f64::from(width);
            let v = v0 + (v1 - v0) * (f64::from(py) + 0.5) / f64::from(height);
            let tile_x = (u * scale).floor();
            let tile_y = (v * scale).floor();
            let Some(tile) = tiles.get(&(tile_x as u32, tile_y as u32)) else {
                continue;
            };
            let within_x = ((u * scale - tile_x) * f64::from(TILE_SIZE)) as u32;
            let within_y = ((v * scale - tile_y) * f64::from(TILE_SIZE)) as u32;
            let pixel = tile.get_pixel(within_x.min(TILE_SIZE - 1), within_y.min(TILE_SIZE - 1));
            canvas.image.put_pixel(px, py, *pixel);
        }
    }

    Ok(())
}

async fn fetch_tile(
    client: &Client,
    provider: &TileProvider,
    z: u32,
    x: u32,
    y: u32,
) -> Result<RgbaImage> {
    let url = provider.tile_url(z, x, y);
    let response = client
        .get(&url)
        .header(reqwest::header::USER_AGENT, "sfgeo/0.1")
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(SfGeoError::Download {
            url,
            status: response.status().as_u16(),
        });
    }
    let bytes = response.bytes().await?;
    let tile = image::load_from_memory(&bytes).map_err(|e| SfGeoError::Render {
        reason: format!("undecodable tile {}: {}", url, e),
    })?;
    Ok(tile.to_rgba8())
}

/// Normalize a coordinate to the [0, 1] Web Mercator unit square.
fn unit_mercator(x: f64, y: f64, crs: &Crs) -> Result<(f64, f64)> {
    match crs.code() {
        3857 => Ok((
            (x + MERCATOR_HALF_WORLD) / (2.0 * MERCATOR_HALF_WORLD),
            (MERCATOR_HALF_WORLD - y) / (2.0 * MERCATOR_HALF_WORLD),
        )),
        4326 => {
            let lat = y.clamp(-85.051_128, 85.051_128).to_radians();
            let u = (x + 180.0) / 360.0;
            let v = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0;
            Ok((u, v))
        }
        other => Err(SfGeoError::Render {
            reason: format!(
                "basemap tiles need EPSG:3857 or EPSG:4326, dataset is in EPSG:{}",
                other
            ),
        }),
    }
}

/// Smallest zoom whose tile resolution covers the canvas width.
fn zoom_for_span(canvas_width: u32, u_span: f64) -> u32 {
    if u_span <= 0.0 {
        return MAX_ZOOM;
    }
    let needed = f64::from(canvas_width) / (f64::from(TILE_SIZE) * u_span);
    let zoom = needed.log2().ceil();
    if zoom < 0.0 {
        0
    } else {
        (zoom as u32).min(MAX_ZOOM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_url_substitution() {
        let url = TileProvider::CARTO_POSITRON.tile_url(12, 841, 1617);
        assert_eq!(
            url,
            "https://basemaps.cartocdn.com/light_all/12/841/1617.png"
        );
    }

    #[test]
    fn test_unit_mercator_center() {
        let (u, v) = unit_mercator(0.0, 0.0, &Crs::epsg(3857)).unwrap();
        assert!((u - 0.5).abs() < 1e-12);
        assert!((v - 0.5).abs() < 1e-12);

        let (u, v) = unit_mercator(0.0, 0.0, &Crs::epsg(4326)).unwrap();
        assert!((u - 0.5).abs() < 1e-12);
        assert!((v - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_unit_mercator_rejects_local_crs() {
        assert!(unit_mercator(0.0, 0.0, &Crs::epsg(32113)).is_err());
    }

    #[test]
    fn test_zoom_for_span() {
        // Whole world on one 256px canvas: zoom 0.
        assert_eq!(zoom_for_span(256, 1.0), 0);
        // Whole world on 512px: zoom 1.
        assert_eq!(zoom_for_span(512, 1.0), 1);
        // Tiny span clamps to the max zoom.
        assert_eq!(zoom_for_span(1024, 1e-9), MAX_ZOOM);
    }
}
