//! Process command implementation

use anyhow::{bail, Result};

use sfgeo_core::config::{DatasetKind, ProjectConfig};
use sfgeo_core::models::Crs;
use sfgeo_data::process_downloaded_data;

use crate::cli::ProcessArgs;
use crate::output::OutputWriter;

pub fn execute(args: ProcessArgs, config: &ProjectConfig, output: &OutputWriter) -> Result<()> {
    let kind: DatasetKind = args.dataset.parse()?;

    if !args.raw_file.exists() {
        bail!("Raw file not found: {}", args.raw_file.display());
    }

    let output_crs = args
        .output_crs
        .as_deref()
        .map(str::parse::<Crs>)
        .transpose()?;

    let processed = process_downloaded_data(
        config,
        kind,
        &args.raw_file,
        output_crs.as_ref(),
        !args.no_clip,
    )?;

    output.success(format!("Processed {} saved to {}", kind, processed.display()));
    Ok(())
}
