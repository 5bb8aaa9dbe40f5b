//! Service catalog for the home-services dashboard.
//!
//! The catalog is a directory of TOML files, one or more services per file.
//! [`Catalog::load`] reads it leniently: files that fail to read or parse are
//! logged and skipped, so one broken file never blanks the dashboard.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use hs_catalog::Catalog;
//!
//! let catalog = Catalog::load(Path::new("cfg"))?;
//! let list_html = catalog.render_list();
//! ```

mod render;
mod scanner;
mod service;

use std::path::{Path, PathBuf};

use serde::Serialize;

pub use service::Service;

/// Catalog loading error.
///
/// Only failures that make the whole catalog unusable surface here;
/// per-file problems are logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog directory did not exist and could not be created.
    #[error("Error creating catalog directory {}: {source}", path.display())]
    CreateDir {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Ordered list of services shown on the dashboard.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    /// Services in display order.
    #[serde(rename = "service")]
    pub services: Vec<Service>,
}

impl Catalog {
    /// Load every service file from `dir`.
    ///
    /// A missing directory is created and yields an empty catalog.
    /// Services are ordered by file name, then by position within the file.
    pub fn load(dir: &Path) -> Result<Self, CatalogError> {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|source| CatalogError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
            tracing::info!(dir = %dir.display(), "Created empty service catalog directory");
            return Ok(Self::default());
        }

        let services = scanner::scan(dir)
            .iter()
            .flat_map(|path| scanner::read_services(path))
            .collect();

        Ok(Self { services })
    }

    /// Number of services in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether the catalog has no services.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Render the catalog as a sequence of `<li>` entries.
    #[must_use]
    pub fn render_list(&self) -> String {
        render::render_list(&self.services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/cfg");

        let catalog = Catalog::load(&dir).unwrap();

        assert!(catalog.is_empty());
        assert!(dir.is_dir());
    }

    #[test]
    fn test_load_orders_by_file_name() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "b-jellyfin.toml",
            "name = \"Jellyfin\"\nurl = \"http://media:8096\"\ndesc = \"Media\"\n",
        );
        write(
            tmp.path(),
            "a-grafana.toml",
            "name = \"Grafana\"\nurl = \"http://grafana:3000\"\ndesc = \"Dashboards\"\n",
        );

        let catalog = Catalog::load(tmp.path()).unwrap();

        let names: Vec<_> = catalog.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Grafana", "Jellyfin"]);
    }

    #[test]
    fn test_load_skips_broken_files() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "good.toml",
            "name = \"Router\"\nurl = \"http://192.168.1.1\"\ndesc = \"Gateway\"\n",
        );
        write(tmp.path(), "broken.toml", "name = \"Missing url\"\n");
        write(tmp.path(), "garbage.toml", "this is = = not toml");

        let catalog = Catalog::load(tmp.path()).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.services[0].name, "Router");
    }

    #[test]
    fn test_load_ignores_non_toml_and_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "nas.toml",
            "name = \"NAS\"\nurl = \"http://nas\"\ndesc = \"Storage\"\n",
        );
        write(tmp.path(), "nas.toml.swp", "binary junk");
        write(tmp.path(), "README", "notes");
        std::fs::create_dir(tmp.path().join("sub.toml")).unwrap();

        let catalog = Catalog::load(tmp.path()).unwrap();

        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_load_service_array_file() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "infra.toml",
            r#"
[[service]]
name = "Pi-hole"
url = "http://pihole/admin"
desc = "DNS"

[[service]]
name = "Home Assistant"
url = "http://ha:8123"
desc = "Automation"
"#,
        );

        let catalog = Catalog::load(tmp.path()).unwrap();

        let names: Vec<_> = catalog.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Pi-hole", "Home Assistant"]);
    }

    #[test]
    fn test_catalog_serialization() {
        let catalog = Catalog {
            services: vec![Service {
                name: "Grafana".to_owned(),
                url: "http://grafana:3000".to_owned(),
                desc: "Dashboards".to_owned(),
            }],
        };

        let json = serde_json::to_value(&catalog).unwrap();

        assert_eq!(json["service"][0]["name"], "Grafana");
        assert_eq!(json["service"][0]["url"], "http://grafana:3000");
        assert_eq!(json["service"][0]["desc"], "Dashboards");
    }
}
