//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::live_reload;
use crate::middleware::security;
use crate::state::AppState;
use crate::static_files;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
/// * `assets_dir` - Directory served under `/assets`
pub(crate) fn create_router(state: Arc<AppState>, assets_dir: &Path) -> Router {
    Router::new()
        .route("/", get(handlers::index::get_index))
        .route("/index.html", get(handlers::index::get_index))
        .route("/api/services", get(handlers::services::get_services))
        .route("/live-reload.js", get(handlers::script::get_script))
        .route("/sse", get(live_reload::sse_handler))
        .nest_service("/assets", static_files::assets_service(assets_dir))
        .fallback(get(handlers::index::get_index))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security::csp_layer())
                .layer(security::content_type_options_layer())
                .layer(security::frame_options_layer()),
        )
        .with_state(state)
}
