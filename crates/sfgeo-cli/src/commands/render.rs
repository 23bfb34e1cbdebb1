//! Render command implementation

use anyhow::{bail, Context, Result};
use reqwest::Client;

use sfgeo_core::config::{DatasetKind, ProjectConfig};
use sfgeo_core::loader::{
    load_census_tracts, load_city_limits, load_hydrology, load_osm_infrastructure, load_parcels,
    LoadOptions,
};
use sfgeo_core::models::{Crs, VectorDataset};
use sfgeo_render::{save_map, setup_basemap, BasemapOptions};

use crate::cli::RenderArgs;
use crate::output::OutputWriter;

pub async fn execute(
    args: RenderArgs,
    config: &ProjectConfig,
    client: &Client,
    output: &OutputWriter,
) -> Result<()> {
    let kind: DatasetKind = args.dataset.parse()?;
    let dataset = load_for_render(config, kind)?;

    let crs = match args.crs.as_deref() {
        Some(value) => value.parse::<Crs>()?,
        None => config.default_crs.clone(),
    };

    let options = BasemapOptions {
        crs: Some(crs),
        figsize: parse_figsize(&args.figsize)?,
        alpha: args.alpha,
        add_basemap: !args.no_basemap,
        ..BasemapOptions::default()
    };

    let figure = setup_basemap(client, &dataset, &options).await?;

    let name = args
        .output
        .unwrap_or_else(|| format!("map_{}", kind.name()));
    let path = save_map(&figure, &name, &config.maps_dir, config.map_dpi)?;

    output.success(format!("Map saved to {}", path.display()));
    output.kv("Features", dataset.feature_count());
    output.kv("CRS", &figure.crs);
    Ok(())
}

fn load_for_render(config: &ProjectConfig, kind: DatasetKind) -> Result<VectorDataset> {
    let options = LoadOptions::new();
    let dataset = match kind {
        DatasetKind::Parcels => load_parcels(config, &options)?,
        DatasetKind::CensusTracts => load_census_tracts(config, &options)?,
        DatasetKind::Hydrology => load_hydrology(config, &options)?,
        DatasetKind::Osm => load_osm_infrastructure(config, &options)?,
        DatasetKind::CityLimits => match load_city_limits(config, None)? {
            Some(limits) => limits,
            None => bail!(
                "City limits not found at {}. Download and process it first",
                config
                    .data_path(kind, sfgeo_core::config::DataArea::Processed)
                    .display()
            ),
        },
    };
    Ok(dataset)
}

fn parse_figsize(value: &str) -> Result<(f64, f64)> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Invalid figure size '{}'", value))?;
    if parts.len() != 2 || parts[0] <= 0.0 || parts[1] <= 0.0 {
        bail!("Figure size must be two positive numbers as W,H; got '{}'", value);
    }
    Ok((parts[0], parts[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_figsize() {
        assert_eq!(parse_figsize("12,12").unwrap(), (12.0, 12.0));
        assert_eq!(parse_figsize("8.5, 11").unwrap(), (8.5, 11.0));
    }

    #[test]
    fn test_parse_figsize_rejects_bad_input() {
        assert!(parse_figsize("12").is_err());
        assert!(parse_figsize("0,12").is_err());
        assert!(parse_figsize("a,b").is_err());
    }
}
