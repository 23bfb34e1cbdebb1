//! Census TIGER/Line boundaries and ACS demographics
//!
//! The tract boundary archive is a required input: its download propagates
//! failure. The ACS table is an optional enrichment: it needs an API key, and
//! every expected failure mode (network, bad status, malformed response) is
//! caught, logged, and reported in the result without aborting the boundary
//! download.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Client;

use sfgeo_core::config::ProjectConfig;
use sfgeo_core::error::{Result, SfGeoError};

use crate::download::download_file;

/// ACS 5-year estimate variables fetched per tract, with the readable column
/// names they are renamed to.
const ACS_VARIABLES: [(&str, &str); 10] = [
    ("B19013_001E", "median_income"),
    ("B25003_001E", "total_occupied_units"),
    ("B25003_002E", "owner_occupied"),
    ("B25003_003E", "renter_occupied"),
    ("B01001_001E", "total_population"),
    ("B03002_003E", "white_alone"),
    ("B03002_004E", "black_alone"),
    ("B03002_005E", "native_alone"),
    ("B03002_006E", "asian_alone"),
    ("B03002_012E", "hispanic_latino"),
];

/// Parameters for a tract download. Defaults target Santa Fe County, NM.
#[derive(Debug, Clone)]
pub struct CensusOptions {
    pub state_fips: String,
    pub county_fips: String,
    pub year: u16,
    pub output_dir: Option<PathBuf>,
}

impl Default for CensusOptions {
    fn default() -> Self {
        Self {
            state_fips: "35".to_string(),
            county_fips: "049".to_string(),
            year: 2022,
            output_dir: None,
        }
    }
}

/// What happened to the optional ACS fetch.
#[derive(Debug, Clone)]
pub enum AcsOutcome {
    Saved { path: PathBuf, tracts: usize },
    SkippedNoKey,
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct CensusDownload {
    pub boundary_shapefile: PathBuf,
    pub acs: AcsOutcome,
}

/// Download census tract boundaries (TIGER/Line) and, when an API key is
/// configured, the ACS demographic table for every tract in the county.
pub async fn download_census_tracts(
    client: &Client,
    config: &ProjectConfig,
    options: &CensusOptions,
) -> Result<CensusDownload> {
    let out_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| config.raw_dir());
    fs::create_dir_all(&out_dir)?;

    let tiger_url = format!(
        "https://www2.census.gov/geo/tiger/TIGER{year}/TRACT/tl_{year}_{state}_tract.zip",
        year = options.year,
        state = options.state_fips,
    );
    let archive_path = out_dir.join(format!("census_tracts_{}.zip", options.year));
    tracing::info!("Downloading census tracts from {}", tiger_url);
    download_file(client, &tiger_url, &archive_path).await?;

    let extract_dir = out_dir.join(format!("census_tracts_{}", options.year));
    extract_archive(&archive_path, &extract_dir)?;
    let boundary_shapefile = find_shapefile(&extract_dir)?;

    let acs = match config.census_api_key() {
        Some(key) => {
            let csv_path = out_dir.join(format!("acs_{}_5yr_santa_fe.csv", options.year));
            match fetch_acs(client, key, options, &csv_path).await {
                Ok(tracts) => {
                    tracing::info!("ACS data for {} tracts saved to {}", tracts, csv_path.display());
                    AcsOutcome::Saved {
                        path: csv_path,
                        tracts,
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Error downloading ACS data: {}. Continuing with tracts shapefile only",
                        e
                    );
                    AcsOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        }
        None => {
            tracing::warn!(
                "CENSUS_API_KEY not set; skipping ACS download. Tracts shapefile saved to {}",
                boundary_shapefile.display()
            );
            AcsOutcome::SkippedNoKey
        }
    };

    Ok(CensusDownload {
        boundary_shapefile,
        acs,
    })
}

/// Extract a zip archive into a directory.
pub(crate) fn extract_archive(archive_path: &Path, target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)?;
    let file = fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| SfGeoError::Archive {
        reason: format!("Failed to open {}: {}", archive_path.display(), e),
    })?;
    archive.extract(target_dir).map_err(|e| SfGeoError::Archive {
        reason: format!("Failed to extract {}: {}", archive_path.display(), e),
    })
}

/// First `.shp` file under a directory, searched recursively.
pub(crate) fn find_shapefile(dir: &Path) -> Result<PathBuf> {
    fn walk(dir: &Path) -> std::io::Result<Option<PathBuf>> {
        let mut entries: Vec<_> = fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
        entries.sort_by_key(|e| e.path());
        for entry in &entries {
            let path = entry.path();
            if path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("shp"))
            {
                return Ok(Some(path));
            }
        }
        for entry in &entries {
            let path = entry.path();
            if path.is_dir() {
                if let Some(found) = walk(&path)? {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }

    walk(dir)?.ok_or_else(|| SfGeoError::NoShapefileInArchive {
        path: dir.to_path_buf(),
    })
}

async fn fetch_acs(
    client: &Client,
    api_key: &str,
    options: &CensusOptions,
    csv_path: &Path,
) -> Result<usize> {
    let url = format!("https://api.census.gov/data/{}/acs/acs5", options.year);
    let variables: Vec<&str> = ACS_VARIABLES.iter().map(|(code, _)| *code).collect();
    let in_clause = format!(
        "state:{} county:{}",
        options.state_fips, options.county_fips
    );

    tracing::info!("Downloading ACS demographic data...");
    let response = client
        .get(&url)
        .query(&[
            ("get", variables.join(",").as_str()),
            ("for", "tract:*"),
            ("in", in_clause.as_str()),
            ("key", api_key),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(SfGeoError::Download {
            url,
            status: response.status().as_u16(),
        });
    }

    // The API returns an array of arrays; the first row holds column names.
    let rows: Vec<Vec<Option<String>>> = response.json().await?;
    let (headers, records) = build_acs_table(rows)?;

    let mut writer = csv::Writer::from_path(csv_path).map_err(csv_error)?;
    writer.write_record(&headers).map_err(csv_error)?;
    let count = records.len();
    for record in records {
        writer.write_record(&record).map_err(csv_error)?;
    }
    writer.flush()?;

    Ok(count)
}

fn csv_error(e: csv::Error) -> SfGeoError {
    SfGeoError::Format {
        format: "CSV".to_string(),
        reason: e.to_string(),
    }
}

/// Turn the raw ACS response rows into renamed, derived, keyed records.
///
/// Output columns are the readable variable names, the geography codes, the
/// derived renter share, and the tract GEOID join key.
fn build_acs_table(rows: Vec<Vec<Option<String>>>) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut iter = rows.into_iter();
    let header_row: Vec<String> = iter
        .next()
        .ok_or_else(|| malformed("empty response"))?
        .into_iter()
        .map(|h| h.unwrap_or_default())
        .collect();

    let column_index = |name: &str| header_row.iter().position(|h| h == name);
    let state_idx = column_index("state").ok_or_else(|| malformed("missing 'state' column"))?;
    let county_idx = column_index("county").ok_or_else(|| malformed("missing 'county' column"))?;
    let tract_idx = column_index("tract").ok_or_else(|| malformed("missing 'tract' column"))?;

    let variable_indices: Vec<Option<usize>> = ACS_VARIABLES
        .iter()
        .map(|(code, _)| column_index(code))
        .collect();
    let renter_idx = column_index("B25003_003E");
    let total_idx = column_index("B25003_001E");

    let mut headers: Vec<String> = ACS_VARIABLES
        .iter()
        .map(|(_, name)| name.to_string())
        .collect();
    headers.extend([
        "state".to_string(),
        "county".to_string(),
        "tract".to_string(),
        "pct_renters".to_string(),
        "GEOID".to_string(),
    ]);

    let mut records = Vec::new();
    for row in iter {
        let cell = |idx: usize| -> String {
            row.get(idx).cloned().flatten().unwrap_or_default()
        };

        let mut record: Vec<String> = variable_indices
            .iter()
            .map(|idx| idx.map(cell).unwrap_or_default())
            .collect();

        let state = zero_pad(&cell(state_idx), 2);
        let county = zero_pad(&cell(county_idx), 3);
        let tract = zero_pad(&cell(tract_idx), 6);
        let geoid = format!("{}{}{}", state, county, tract);

        let pct = renter_share(
            renter_idx.map(cell).and_then(|v| v.parse::<f64>().ok()),
            total_idx.map(cell).and_then(|v| v.parse::<f64>().ok()),
        );

        record.push(state);
        record.push(county);
        record.push(tract);
        record.push(pct.map(|p| format!("{:.2}", p)).unwrap_or_default());
        record.push(geoid);
        records.push(record);
    }

    Ok((headers, records))
}

fn malformed(reason: &str) -> SfGeoError {
    SfGeoError::Format {
        format: "ACS".to_string(),
        reason: reason.to_string(),
    }
}

/// Renter-occupied share of occupied units, as a percentage rounded to two
/// decimals. `None` when the denominator is absent or zero.
fn renter_share(renter_occupied: Option<f64>, total_occupied: Option<f64>) -> Option<f64> {
    let renter = renter_occupied?;
    let total = total_occupied?;
    if total <= 0.0 {
        return None;
    }
    Some((renter / total * 100.0 * 100.0).round() / 100.0)
}

fn zero_pad(value: &str, width: usize) -> String {
    if value.len() >= width {
        value.to_string()
    } else {
        format!("{}{}", "0".repeat(width - value.len()), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_renter_share_rounds_to_two_decimals() {
        assert_eq!(renter_share(Some(1.0), Some(3.0)), Some(33.33));
        assert_eq!(renter_share(Some(1.0), Some(2.0)), Some(50.0));
    }

    #[test]
    fn test_renter_share_guards_division() {
        assert_eq!(renter_share(Some(10.0), Some(0.0)), None);
        assert_eq!(renter_share(None, Some(5.0)), None);
        assert_eq!(renter_share(Some(5.0), None), None);
    }

    #[test]
    fn test_zero_pad() {
        assert_eq!(zero_pad("35", 2), "35");
        assert_eq!(zero_pad("49", 3), "049");
        assert_eq!(zero_pad("1201", 6), "001201");
    }

    #[test]
    fn test_build_acs_table_renames_and_derives() {
        let rows = vec![
            vec![
                Some("B19013_001E".to_string()),
                Some("B25003_001E".to_string()),
                Some("B25003_003E".to_string()),
                Some("state".to_string()),
                Some("county".to_string()),
                Some("tract".to_string()),
            ],
            vec![
                Some("54321".to_string()),
                Some("400".to_string()),
                Some("100".to_string()),
                Some("35".to_string()),
                Some("49".to_string()),
                Some("1201".to_string()),
            ],
        ];

        let (headers, records) = build_acs_table(rows).unwrap();
        assert_eq!(headers[0], "median_income");
        assert!(headers.contains(&"pct_renters".to_string()));
        assert!(headers.contains(&"GEOID".to_string()));

        let record = &records[0];
        let geoid_idx = headers.iter().position(|h| h == "GEOID").unwrap();
        let pct_idx = headers.iter().position(|h| h == "pct_renters").unwrap();
        assert_eq!(record[geoid_idx], "35049001201");
        assert_eq!(record[pct_idx], "25.00");
    }

    #[test]
    fn test_build_acs_table_rejects_missing_geography() {
        let rows = vec![vec![Some("B19013_001E".to_string())]];
        assert!(build_acs_table(rows).is_err());
    }

    #[test]
    fn test_find_shapefile_recurses() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("inner");
        fs::create_dir_all(&nested).unwrap();
        let mut file = fs::File::create(nested.join("tl_2022_35_tract.shp")).unwrap();
        file.write_all(b"stub").unwrap();

        let found = find_shapefile(dir.path()).unwrap();
        assert!(found.to_string_lossy().ends_with("tl_2022_35_tract.shp"));
    }

    #[test]
    fn test_find_shapefile_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_shapefile(dir.path()),
            Err(SfGeoError::NoShapefileInArchive { .. })
        ));
    }
}
