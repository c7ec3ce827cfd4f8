//! Parcel dataset download.
//!
//! The parcel export is large and changes rarely, so it is fetched once
//! into a local cache file and re-used on later starts.

use std::path::{Path, PathBuf};

use futures::StreamExt as _;
use tokio::io::AsyncWriteExt as _;

use crate::SpatialError;

/// Errors from download operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// I/O error writing to disk.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Returns a local path to the parcel dataset, downloading it from `url`
/// into `cache_path` if the file is not already there.
///
/// # Errors
///
/// Returns [`SpatialError::MissingSource`] if the file is absent and no
/// URL is configured, or [`SpatialError::Download`] if the download fails.
pub async fn ensure_local(url: Option<&str>, cache_path: &Path) -> Result<PathBuf, SpatialError> {
    if tokio::fs::try_exists(cache_path).await.unwrap_or(false) {
        log::info!("Using cached parcel dataset at {}", cache_path.display());
        return Ok(cache_path.to_path_buf());
    }

    let Some(url) = url else {
        return Err(SpatialError::MissingSource {
            path: cache_path.display().to_string(),
        });
    };

    download_file(url, cache_path).await?;
    Ok(cache_path.to_path_buf())
}

/// Downloads a file from a URL to a local path with progress logging.
///
/// Streams into a temporary sibling file and renames it on completion so
/// an interrupted download never leaves a truncated dataset behind.
///
/// # Errors
///
/// Returns an error if the HTTP request fails, the response is not
/// successful, or the local file cannot be written.
pub async fn download_file(url: &str, dest: &Path) -> Result<u64, DownloadError> {
    log::info!("Downloading {url}");
    log::info!("  -> {}", dest.display());

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
    }

    let client = reqwest::Client::builder()
        .user_agent("property-snapshot/0.1")
        .build()
        .map_err(DownloadError::Http)?;

    let response = client.get(url).send().await.map_err(DownloadError::Http)?;

    if !response.status().is_success() {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let partial = dest.with_extension("part");
    let io_err = |path: &Path, e: std::io::Error| DownloadError::Io {
        path: path.display().to_string(),
        source: e,
    };

    let mut file = tokio::fs::File::create(&partial)
        .await
        .map_err(|e| io_err(partial.as_path(), e))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(DownloadError::Http)?;
        file.write_all(&chunk)
            .await
            .map_err(|e| io_err(partial.as_path(), e))?;
        downloaded += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| io_err(partial.as_path(), e))?;
    drop(file);

    tokio::fs::rename(&partial, dest)
        .await
        .map_err(|e| io_err(dest, e))?;

    #[allow(clippy::cast_precision_loss)]
    let mb = downloaded as f64 / 1_048_576.0;
    log::info!("  download complete: {mb:.1} MB");

    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn existing_file_is_reused_without_url() {
        let dir = std::env::temp_dir().join(format!("parcels-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("parcels.geojson");
        std::fs::write(&path, "{}").unwrap();

        let resolved = ensure_local(None, &path).await.unwrap();
        assert_eq!(resolved, path);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn missing_file_without_url_is_an_error() {
        let path = std::env::temp_dir().join("property-snapshot-does-not-exist.parquet");
        assert!(matches!(
            ensure_local(None, &path).await,
            Err(SpatialError::MissingSource { .. })
        ));
    }
}
