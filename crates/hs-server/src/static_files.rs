//! Static file serving.
//!
//! Files under the assets directory are served as-is under `/assets`.
//! Directories are not listed and have no index page.

use std::path::Path;

use tower_http::services::ServeDir;

/// Service for the assets directory.
pub(crate) fn assets_service(dir: &Path) -> ServeDir {
    ServeDir::new(dir).append_index_html_on_directories(false)
}
