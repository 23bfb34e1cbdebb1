use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sfgeo - Santa Fe geospatial data preparation and mapping
#[derive(Parser, Debug)]
#[command(name = "sfgeo")]
#[command(about = "Download, process, and map Santa Fe public GIS datasets", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Override the data root directory (default: ./data, or SANTA_FE_DATA_ROOT)
    #[arg(long, global = true)]
    pub data_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a raw dataset into the raw data area
    Download(DownloadArgs),

    /// Process a raw file into the processed data area
    Process(ProcessArgs),

    /// Render a processed dataset to a static map image
    Render(RenderArgs),

    /// Show raw/processed status for every dataset
    Status,
}

#[derive(Parser, Debug)]
pub struct DownloadArgs {
    #[command(subcommand)]
    pub source: DownloadCommands,
}

#[derive(Subcommand, Debug)]
pub enum DownloadCommands {
    /// Census tract boundaries (TIGER/Line) with optional ACS demographics
    CensusTracts {
        /// State FIPS code
        #[arg(long, default_value = "35")]
        state: String,

        /// County FIPS code
        #[arg(long, default_value = "049")]
        county: String,

        /// TIGER/Line and ACS year
        #[arg(long, default_value_t = 2022)]
        year: u16,
    },

    /// OSM roads and points of interest
    Osm {
        /// Bounding box as minx,miny,maxx,maxy (default: Santa Fe area)
        #[arg(long)]
        bbox: Option<String>,

        /// Download the GeoFabrik New Mexico extract instead of querying Overpass
        #[arg(long)]
        geofabrik: bool,
    },

    /// Rivers, streams, and waterbodies
    Hydrology {
        /// Data source (osm, usgs_3dhp, or nm)
        #[arg(long, default_value = "osm")]
        source: String,
    },

    /// City limits boundary (requires a direct URL)
    CityLimits {
        /// Direct download URL
        #[arg(long)]
        url: Option<String>,
    },

    /// City parcels and zoning (requires a direct URL)
    Parcels {
        /// Direct download URL
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(Parser, Debug)]
pub struct ProcessArgs {
    /// Dataset name (parcels, census_tracts, hydrology, osm, city_limits)
    pub dataset: String,

    /// Path to the raw downloaded file (.zip, .shp, .geojson, .json)
    pub raw_file: PathBuf,

    /// Target CRS (default: the local analysis CRS)
    #[arg(long)]
    pub output_crs: Option<String>,

    /// Skip clipping to the city limits boundary
    #[arg(long)]
    pub no_clip: bool,
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Dataset name (parcels, census_tracts, hydrology, osm, city_limits)
    pub dataset: String,

    /// Display CRS (default: the configured display CRS)
    #[arg(long)]
    pub crs: Option<String>,

    /// Output file name (default: map_<dataset>; .png is appended if needed)
    #[arg(long)]
    pub output: Option<String>,

    /// Skip the basemap tile layer
    #[arg(long)]
    pub no_basemap: bool,

    /// Figure size in inches as W,H
    #[arg(long, default_value = "12,12")]
    pub figsize: String,

    /// Layer transparency
    #[arg(long, default_value_t = 0.7)]
    pub alpha: f32,
}
