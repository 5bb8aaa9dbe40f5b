//! Catalog directory discovery and per-file reading.

use std::fs;
use std::path::{Path, PathBuf};

use crate::service::{Service, ServiceFile};

/// List catalog files in `dir`, sorted by file name.
///
/// Only regular, non-hidden `*.toml` files are returned. The catalog is flat,
/// subdirectories are not descended into.
pub(crate) fn scan(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Reading catalog directory failed");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "Error from read_dir");
                None
            }
        })
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.path())
        .filter(|path| is_catalog_file(path))
        .collect();

    paths.sort();
    paths
}

/// Whether a path names a catalog file.
fn is_catalog_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'));
    !hidden && path.extension().is_some_and(|ext| ext == "toml")
}

/// Read the services in one catalog file.
///
/// Returns an empty Vec (after logging) when the file cannot be read or parsed.
pub(crate) fn read_services(path: &Path) -> Vec<Service> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Error reading service file");
            return Vec::new();
        }
    };

    match ServiceFile::parse(&content) {
        Ok(file) => file.into_services(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to parse service file");
            tracing::debug!(path = %path.display(), "bad toml:\n`{content}`");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_catalog_file() {
        assert!(is_catalog_file(Path::new("/cfg/grafana.toml")));
        assert!(!is_catalog_file(Path::new("/cfg/.grafana.toml")));
        assert!(!is_catalog_file(Path::new("/cfg/grafana.toml~")));
        assert!(!is_catalog_file(Path::new("/cfg/grafana")));
    }

    #[test]
    fn test_scan_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(scan(&tmp.path().join("absent")).is_empty());
    }

    #[test]
    fn test_read_services_unreadable_file() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(read_services(&tmp.path().join("gone.toml")).is_empty());
    }
}
