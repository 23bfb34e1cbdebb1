//! Command dispatch

pub mod download;
pub mod process;
pub mod render;
pub mod status;

use anyhow::Result;
use sfgeo_core::config::ProjectConfig;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;

pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = ProjectConfig::from_env();
    if let Some(data_root) = cli.data_root {
        config.data_root = data_root;
    }

    let writer = OutputWriter::new();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Download(args) => download::execute(args, &config, &client, &writer).await,
        Commands::Process(args) => process::execute(args, &config, &writer),
        Commands::Render(args) => render::execute(args, &config, &client, &writer).await,
        Commands::Status => status::execute(&config, &writer),
    }
}
