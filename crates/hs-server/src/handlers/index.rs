//! Dashboard page.
//!
//! The catalog is re-read on every request, so a page reload always shows
//! the current state of the catalog directory.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use hs_catalog::Catalog;
use md5::{Digest, Md5};

use crate::error::ServerError;
use crate::state::AppState;

/// Page template; `{{services-list}}` and `{{live-reload}}` are substituted.
const INDEX_TEMPLATE: &str = include_str!("../../templates/index.template.html");

/// List entry shown when the catalog has no services.
const EMPTY_LIST: &str = r#"<li class="empty">No services configured yet.</li>"#;

/// Handle `GET /`, `GET /index.html` and every unmatched `GET`.
pub(crate) async fn get_index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let catalog = Catalog::load(&state.services_dir)?;
    if state.verbose {
        tracing::info!(
            dir = %state.services_dir.display(),
            services = catalog.len(),
            "Catalog loaded"
        );
    }

    let script = state
        .live_reload_enabled()
        .then(|| live_reload_tag(state.client_debounce_ms));
    let html = render_index(&catalog, script.as_deref());

    let etag = compute_etag(&state.version, &html);
    if if_none_match(&headers, &etag) {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
    }

    Ok((
        [
            (header::ETAG, etag),
            (header::CACHE_CONTROL, "no-cache".to_owned()),
        ],
        Html(html),
    )
        .into_response())
}

/// Fill the page template.
fn render_index(catalog: &Catalog, live_reload: Option<&str>) -> String {
    let list = if catalog.is_empty() {
        EMPTY_LIST.to_owned()
    } else {
        catalog.render_list()
    };

    INDEX_TEMPLATE
        .replace("{{services-list}}", &list)
        .replace("{{live-reload}}", live_reload.unwrap_or_default())
}

/// Script tag that loads the reload client with its debounce window.
fn live_reload_tag(debounce_ms: u64) -> String {
    format!(r#"<script src="/live-reload.js" data-debounce-ms="{debounce_ms}"></script>"#)
}

/// Whether `If-None-Match` names `etag` (or is `*`).
fn if_none_match(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .any(|candidate| candidate == etag || candidate == "*")
}

/// Compute `ETag` from version and content.
///
/// MD5 truncated to 64 bits (16 hex chars).
fn compute_etag(version: &str, content: &str) -> String {
    let hash = Md5::digest(format!("{version}:{content}").as_bytes());
    format!("\"{}\"", &hex::encode(hash)[..16])
}
