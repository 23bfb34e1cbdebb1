//! Download command implementation

use anyhow::{bail, Context, Result};
use reqwest::Client;

use sfgeo_core::config::ProjectConfig;
use sfgeo_core::models::BoundingBox;
use sfgeo_data::{
    download_census_tracts, download_city_limits, download_city_parcels, download_hydrology,
    download_osm_data, AcsOutcome, CensusOptions, HydrologySource,
};

use crate::cli::{DownloadArgs, DownloadCommands};
use crate::output::OutputWriter;

pub async fn execute(
    args: DownloadArgs,
    config: &ProjectConfig,
    client: &Client,
    output: &OutputWriter,
) -> Result<()> {
    match args.source {
        DownloadCommands::CensusTracts {
            state,
            county,
            year,
        } => {
            let options = CensusOptions {
                state_fips: state,
                county_fips: county,
                year,
                output_dir: None,
            };
            let result = download_census_tracts(client, config, &options).await?;
            output.success(format!(
                "Census tract boundaries saved to {}",
                result.boundary_shapefile.display()
            ));
            match result.acs {
                AcsOutcome::Saved { path, tracts } => {
                    output.success(format!("ACS data for {} tracts saved to {}", tracts, path.display()));
                }
                AcsOutcome::SkippedNoKey => {
                    output.warning(
                        "CENSUS_API_KEY not set; ACS demographics were skipped. \
                         Set it in the environment to fetch tract demographics",
                    );
                }
                AcsOutcome::Failed { reason } => {
                    output.warning(format!(
                        "ACS download failed ({}); continuing with boundaries only",
                        reason
                    ));
                }
            }
        }
        DownloadCommands::Osm { bbox, geofabrik } => {
            let bbox = bbox.as_deref().map(parse_bbox).transpose()?;
            let path = download_osm_data(client, config, bbox, !geofabrik, None).await?;
            output.success(format!("OSM data saved to {}", path.display()));
        }
        DownloadCommands::Hydrology { source } => {
            let source: HydrologySource = source.parse()?;
            match download_hydrology(client, config, source, None).await? {
                Some(path) => output.success(format!("Hydrology data saved to {}", path.display())),
                None => output.warning(
                    "No hydrology data downloaded; see the log for details or manual instructions",
                ),
            }
        }
        DownloadCommands::CityLimits { url } => {
            match download_city_limits(client, config, url.as_deref(), None).await? {
                Some(path) => output.success(format!("City limits saved to {}", path.display())),
                None => output.info("No URL given; follow the logged manual-download guidance"),
            }
        }
        DownloadCommands::Parcels { url } => {
            match download_city_parcels(client, config, url.as_deref(), None).await? {
                Some(path) => output.success(format!("Parcels saved to {}", path.display())),
                None => output.info("No URL given; follow the logged manual-download guidance"),
            }
        }
    }

    Ok(())
}

fn parse_bbox(value: &str) -> Result<BoundingBox> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Invalid bounding box '{}'", value))?;
    if parts.len() != 4 {
        bail!("Bounding box must be minx,miny,maxx,maxy; got '{}'", value);
    }
    let bbox = BoundingBox::new(parts[0], parts[1], parts[2], parts[3]);
    if !bbox.is_valid() {
        bail!("Bounding box '{}' has min >= max", value);
    }
    Ok(bbox)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox() {
        let bbox = parse_bbox("-106.0, 35.6, -105.8, 35.8").unwrap();
        assert_eq!(bbox.minx, -106.0);
        assert_eq!(bbox.maxy, 35.8);
    }

    #[test]
    fn test_parse_bbox_rejects_bad_input() {
        assert!(parse_bbox("1,2,3").is_err());
        assert!(parse_bbox("a,b,c,d").is_err());
        assert!(parse_bbox("-105.8,35.6,-106.0,35.8").is_err());
    }
}
