//! Application state.
//!
//! Shared state for all request handlers.

use std::path::PathBuf;

use tokio::sync::watch;

use crate::live_reload::LiveReloadManager;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Service catalog directory, read on every index request.
    pub(crate) services_dir: PathBuf,
    /// Live reload manager (if enabled).
    pub(crate) live_reload: Option<LiveReloadManager>,
    /// Quiet period the page script waits for before reloading.
    pub(crate) client_debounce_ms: u64,
    /// Enable verbose output.
    pub(crate) verbose: bool,
    /// Application version for `ETag` computation.
    pub(crate) version: String,
    /// Flipped to `true` when the server starts shutting down.
    pub(crate) shutdown: watch::Sender<bool>,
}

impl AppState {
    /// Check if live reload is enabled.
    #[must_use]
    pub(crate) fn live_reload_enabled(&self) -> bool {
        self.live_reload.is_some()
    }

    /// Signal open event streams to end.
    pub(crate) fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Resolves once shutdown has begun.
    pub(crate) fn shutdown_requested(&self) -> impl Future<Output = ()> + Send + 'static + use<> {
        let mut rx = self.shutdown.subscribe();
        async move {
            // Sender lives in the state; an error only means it is gone
            let _ = rx.wait_for(|stopping| *stopping).await;
        }
    }
}
