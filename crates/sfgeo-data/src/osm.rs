//! OpenStreetMap downloads via the Overpass API
//!
//! Roads and points of interest are a required download and propagate
//! failure; hydrology is best-effort because the Santa Fe area legitimately
//! returns few or no water features.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;

use sfgeo_core::config::ProjectConfig;
use sfgeo_core::error::{Result, SfGeoError};
use sfgeo_core::models::BoundingBox;

use crate::download::download_file;

const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

const GEOFABRIK_NM_URL: &str =
    "https://download.geofabrik.de/north-america/us/new-mexico-latest-free.shp.zip";

/// Hydrology timeout: Overpass is slow for broad water queries.
const HYDROLOGY_TIMEOUT: Duration = Duration::from_secs(90);

/// Download OSM roads and POIs for the Santa Fe area.
///
/// With `use_overpass` the bounding box is queried directly; otherwise the
/// GeoFabrik New Mexico extract archive is downloaded whole.
pub async fn download_osm_data(
    client: &Client,
    config: &ProjectConfig,
    bbox: Option<BoundingBox>,
    use_overpass: bool,
    output_dir: Option<PathBuf>,
) -> Result<PathBuf> {
    let out_dir = output_dir.unwrap_or_else(|| config.raw_dir());
    fs::create_dir_all(&out_dir)?;
    let bbox = bbox.unwrap_or(BoundingBox::SANTA_FE_FALLBACK);

    if use_overpass {
        tracing::info!("Downloading OSM data via Overpass API...");
        let query = roads_and_pois_query(&bbox);
        let response = client
            .post(OVERPASS_URL)
            .form(&[("data", query.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SfGeoError::Download {
                url: OVERPASS_URL.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        let output_path = out_dir.join("osm_santa_fe.json");
        fs::write(&output_path, body)?;
        tracing::info!("OSM data saved to {}", output_path.display());
        Ok(output_path)
    } else {
        tracing::info!("Downloading New Mexico extract from GeoFabrik...");
        let output_path = out_dir.join("new-mexico-latest-free.shp.zip");
        download_file(client, GEOFABRIK_NM_URL, &output_path).await
    }
}

/// Where hydrology data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrologySource {
    /// OpenStreetMap water features (default; readily available).
    Osm,
    /// USGS 3D Hydrography Program. Manual download only.
    Usgs3dhp,
    /// New Mexico state GIS portal. Manual download only.
    Nm,
}

impl HydrologySource {
    pub const ALL: [HydrologySource; 3] = [
        HydrologySource::Osm,
        HydrologySource::Usgs3dhp,
        HydrologySource::Nm,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HydrologySource::Osm => "osm",
            HydrologySource::Usgs3dhp => "usgs_3dhp",
            HydrologySource::Nm => "nm",
        }
    }
}

impl FromStr for HydrologySource {
    type Err = SfGeoError;

    fn from_str(s: &str) -> Result<Self> {
        HydrologySource::ALL
            .iter()
            .copied()
            .find(|source| source.name() == s)
            .ok_or_else(|| SfGeoError::UnknownSource {
                name: s.to_string(),
                available: HydrologySource::ALL.iter().map(|s| s.name()).collect(),
            })
    }
}

/// Download hydrology data (rivers, streams, waterbodies).
///
/// Only the OSM source performs a network call. Empty results, timeouts, and
/// network failures all resolve to `Ok(None)` with a logged warning; the
/// manual sources log instructions and return `Ok(None)` immediately.
pub async fn download_hydrology(
    client: &Client,
    config: &ProjectConfig,
    source: HydrologySource,
    output_dir: Option<PathBuf>,
) -> Result<Option<PathBuf>> {
    let out_dir = output_dir.unwrap_or_else(|| config.raw_dir());
    fs::create_dir_all(&out_dir)?;

    match source {
        HydrologySource::Osm => {
            tracing::info!("Downloading hydrology data from OpenStreetMap...");
            let query = water_features_query(&BoundingBox::SANTA_FE_FALLBACK);

            let response = match client
                .post(OVERPASS_URL)
                .timeout(HYDROLOGY_TIMEOUT)
                .form(&[("data", query.as_str())])
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    tracing::warn!("Request timed out. Overpass API may be slow; try again later");
                    return Ok(None);
                }
                Err(e) => {
                    tracing::warn!("Network error downloading OSM hydrology: {}", e);
                    return Ok(None);
                }
            };

            if !response.status().is_success() {
                tracing::warn!(
                    "Overpass returned HTTP {} for hydrology query",
                    response.status().as_u16()
                );
                return Ok(None);
            }

            let body: serde_json::Value = match response.json().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("Malformed Overpass hydrology response: {}", e);
                    return Ok(None);
                }
            };

            let element_count = body
                .get("elements")
                .and_then(serde_json::Value::as_array)
                .map(Vec::len)
                .unwrap_or(0);
            if element_count == 0 {
                tracing::warn!(
                    "No water features found in OSM for this area. This can be normal: \
                     Santa Fe is in a semi-arid region. Consider an alternative source \
                     or a larger bounding box"
                );
                return Ok(None);
            }

            let output_path = out_dir.join("hydrology_osm.json");
            fs::write(&output_path, body.to_string())?;
            tracing::info!(
                "OSM hydrology data saved to {} ({} water features)",
                output_path.display(),
                element_count
            );
            Ok(Some(output_path))
        }
        HydrologySource::Usgs3dhp => {
            tracing::info!(
                "USGS 3D Hydrography Program (3DHP): NHD was retired in October 2023. \
                 Download by Hydrologic Unit from \
                 https://www.usgs.gov/3d-hydrography-program/access-3dhp-data-products \
                 (Santa Fe is in HUC 1302, Upper Rio Grande) and extract to {}",
                out_dir.display()
            );
            Ok(None)
        }
        HydrologySource::Nm => {
            tracing::info!(
                "New Mexico state GIS hydrology: search https://www.nmgis.org/ for \
                 'hydrology', 'water', or 'rivers' layers covering Santa Fe County or \
                 the Rio Grande watershed, and save the shapefiles to {}",
                out_dir.display()
            );
            Ok(None)
        }
    }
}

/// Overpass QL for major roads plus amenity and shop nodes.
fn roads_and_pois_query(bbox: &BoundingBox) -> String {
    let extent = bbox_clause(bbox);
    format!(
        "[out:json][timeout:25];\n(\n  \
         way[\"highway\"~\"^(primary|secondary|tertiary|residential|service)$\"]({extent});\n  \
         node[\"amenity\"]({extent});\n  \
         node[\"shop\"]({extent});\n);\nout geom;"
    )
}

/// Overpass QL for waterways and water bodies.
fn water_features_query(bbox: &BoundingBox) -> String {
    let extent = bbox_clause(bbox);
    format!(
        "[out:json][timeout:30];\n(\n  \
         way[\"waterway\"]({extent});\n  \
         way[\"natural\"=\"water\"]({extent});\n);\nout geom;"
    )
}

/// Overpass bounding-box clauses are south,west,north,east.
fn bbox_clause(bbox: &BoundingBox) -> String {
    format!("{},{},{},{}", bbox.miny, bbox.minx, bbox.maxy, bbox.maxx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_source_names_valid_set() {
        let err = "nhd".parse::<HydrologySource>().unwrap_err();
        match err {
            SfGeoError::UnknownSource { name, available } => {
                assert_eq!(name, "nhd");
                assert_eq!(available, vec!["osm", "usgs_3dhp", "nm"]);
            }
            other => panic!("expected UnknownSource, got {:?}", other),
        }
    }

    #[test]
    fn test_source_round_trip() {
        for source in HydrologySource::ALL {
            assert_eq!(source.name().parse::<HydrologySource>().unwrap(), source);
        }
    }

    #[test]
    fn test_roads_query_scopes_to_bbox() {
        let query = roads_and_pois_query(&BoundingBox::SANTA_FE_FALLBACK);
        assert!(query.contains("35.6,-106,35.8,-105.8"));
        assert!(query.contains("highway"));
        assert!(query.contains("amenity"));
        assert!(query.contains("out geom"));
    }

    #[test]
    fn test_water_query_tags() {
        let query = water_features_query(&BoundingBox::SANTA_FE_FALLBACK);
        assert!(query.contains("waterway"));
        assert!(query.contains("natural"));
    }

    #[tokio::test]
    async fn test_manual_sources_never_touch_network() {
        // A client pointed at nothing: if these made a request they'd fail.
        let client = Client::new();
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::with_data_root(dir.path());

        let result =
            download_hydrology(&client, &config, HydrologySource::Usgs3dhp, None).await;
        assert!(matches!(result, Ok(None)));

        let result = download_hydrology(&client, &config, HydrologySource::Nm, None).await;
        assert!(matches!(result, Ok(None)));
    }
}
