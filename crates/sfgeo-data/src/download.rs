//! Streaming HTTP downloads

use std::io::Write;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;

use sfgeo_core::error::{Result, SfGeoError};

/// Download a file to disk, streaming chunk by chunk.
///
/// With a known `Content-Length` the transfer drives a byte progress bar;
/// without one the whole body is buffered and written at once. Parent
/// directories are created as needed. A non-success status is an error.
pub async fn download_file(client: &Client, url: &str, output_path: &Path) -> Result<PathBuf> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(SfGeoError::Download {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    match response.content_length() {
        Some(total) if total > 0 => {
            let file_name = output_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("download");
            let progress = byte_progress_bar(total, &format!("Downloading {}", file_name));

            let mut file = std::fs::File::create(output_path)?;
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk)?;
                progress.inc(chunk.len() as u64);
            }
            progress.finish_with_message(format!("✓ {}", file_name));
        }
        _ => {
            let body = response.bytes().await?;
            std::fs::write(output_path, &body)?;
        }
    }

    Ok(output_path.to_path_buf())
}

fn byte_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n[{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) ETA: {eta}")
            .unwrap()
            .progress_chars("█▓▒░ "),
    );
    pb.set_message(message.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_nonexistent_host_is_http_error() {
        let client = Client::new();
        let dir = tempfile::tempdir().unwrap();
        let result = download_file(
            &client,
            "http://localhost:1/never-listening",
            &dir.path().join("out.bin"),
        )
        .await;
        assert!(matches!(result, Err(SfGeoError::Http(_))));
    }

    #[test]
    fn test_progress_bar_total() {
        let pb = byte_progress_bar(1024, "Downloading test");
        assert_eq!(pb.length(), Some(1024));
    }
}
