//! Canonical file paths for locally cached data.
//!
//! All paths are relative to the project root's `data/` directory.

use std::path::{Path, PathBuf};

/// File name used for the downloaded parcel dataset.
pub const PARCELS_FILE_NAME: &str = "tcad_parcels.parquet";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`; falls back to the
/// current directory if the manifest has no grandparent.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the default local path for the downloaded parcel dataset.
#[must_use]
pub fn parcels_cache_path() -> PathBuf {
    data_dir().join("shared").join(PARCELS_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parcels_cache_lives_under_data_dir() {
        let path = parcels_cache_path();
        assert!(path.starts_with(data_dir()));
        assert!(path.ends_with(PARCELS_FILE_NAME));
    }
}
