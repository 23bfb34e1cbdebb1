//! Manually-sourced city datasets
//!
//! The city GIS portal has no stable direct-download endpoints, so these
//! downloads are URL-gated: with an explicit URL the archive is fetched,
//! without one the functions log where to find the data and return `None`.
//! No network call ever happens without a URL.

use std::fs;
use std::path::PathBuf;

use reqwest::Client;

use sfgeo_core::config::ProjectConfig;
use sfgeo_core::error::Result;

use crate::download::download_file;

/// Download the Santa Fe city limits boundary archive.
pub async fn download_city_limits(
    client: &Client,
    config: &ProjectConfig,
    url: Option<&str>,
    output_dir: Option<PathBuf>,
) -> Result<Option<PathBuf>> {
    let out_dir = output_dir.unwrap_or_else(|| config.raw_dir());
    fs::create_dir_all(&out_dir)?;

    match url {
        Some(url) => {
            tracing::info!("Downloading city limits from provided URL...");
            let output_path = out_dir.join("city_limits.zip");
            download_file(client, url, &output_path).await.map(Some)
        }
        None => {
            tracing::info!(
                "City limits require a manual download: check the city GIS portal at \
                 https://www.santafenm.gov/gis, or Census TIGER/Line places \
                 (Santa Fe city is PLACEFP 70490). Save the archive to {}",
                out_dir.join("city_limits.zip").display()
            );
            Ok(None)
        }
    }
}

/// Download the city parcels and zoning archive.
pub async fn download_city_parcels(
    client: &Client,
    config: &ProjectConfig,
    url: Option<&str>,
    output_dir: Option<PathBuf>,
) -> Result<Option<PathBuf>> {
    let out_dir = output_dir.unwrap_or_else(|| config.raw_dir());
    fs::create_dir_all(&out_dir)?;

    match url {
        Some(url) => {
            tracing::info!("Downloading city parcels from provided URL...");
            let output_path = out_dir.join("city_parcels_zoning.zip");
            download_file(client, url, &output_path).await.map(Some)
        }
        None => {
            tracing::info!(
                "Parcels and zoning require a manual download: visit \
                 https://www.santafenm.gov/gis and export the 'Parcels' or 'Zoning' \
                 layer as Shapefile or GeoJSON, or search ArcGIS Online for \
                 'Santa Fe parcels'. Save the archive to {}",
                out_dir.join("city_parcels_zoning.zip").display()
            );
            Ok(None)
        }
    }
}
