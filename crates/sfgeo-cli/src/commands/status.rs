//! Status command implementation

use anyhow::Result;
use tabled::Tabled;

use sfgeo_core::config::{DataArea, DatasetKind, ProjectConfig};
use sfgeo_core::formats::read_geojson;

use crate::output::OutputWriter;

#[derive(Tabled)]
struct DatasetRow {
    #[tabled(rename = "Dataset")]
    name: &'static str,
    #[tabled(rename = "Raw")]
    raw: &'static str,
    #[tabled(rename = "Processed")]
    processed: &'static str,
    #[tabled(rename = "Features")]
    features: String,
    #[tabled(rename = "CRS")]
    crs: String,
}

pub fn execute(config: &ProjectConfig, output: &OutputWriter) -> Result<()> {
    output.kv("Data root", config.data_root.display());
    output.kv("Display CRS", &config.default_crs);
    output.kv("Local CRS", &config.local_crs);

    let rows: Vec<DatasetRow> = DatasetKind::ALL
        .iter()
        .map(|&kind| dataset_row(config, kind))
        .collect();
    output.table(rows);

    Ok(())
}

fn dataset_row(config: &ProjectConfig, kind: DatasetKind) -> DatasetRow {
    let raw_exists = config.data_path(kind, DataArea::Raw).exists();
    let processed_path = config.data_path(kind, DataArea::Processed);

    let (features, crs) = if processed_path.exists() {
        match read_geojson(&processed_path) {
            Ok(dataset) => (
                dataset.feature_count().to_string(),
                dataset
                    .crs
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unset".to_string()),
            ),
            Err(_) => ("unreadable".to_string(), "-".to_string()),
        }
    } else {
        ("-".to_string(), "-".to_string())
    };

    DatasetRow {
        name: kind.name(),
        raw: if raw_exists { "✓" } else { "-" },
        processed: if processed_path.exists() { "✓" } else { "-" },
        features,
        crs,
    }
}
