//! Live reload page script.

use axum::http::header;
use axum::response::IntoResponse;

/// Client script: debounced reload on `/sse` messages.
const LIVE_RELOAD_JS: &str = include_str!("../../assets/live-reload.js");

/// Handle `GET /live-reload.js`.
pub(crate) async fn get_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        LIVE_RELOAD_JS,
    )
}
