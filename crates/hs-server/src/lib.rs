//! HTTP server for the home-services dashboard.
//!
//! Serves:
//! - the dashboard page, rendered from the service catalog on every request
//! - the catalog as JSON for scripts
//! - a server-sent events endpoint that signals catalog changes
//! - the live-reload page script and static assets
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use hs_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         services_dir: PathBuf::from("cfg"),
//!         live_reload_enabled: true,
//!         ..ServerConfig::default()
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum server (hs-server)
//!                        │
//!                        ├─► /, /index.html ──► Catalog::load (per request)
//!                        │
//!                        ├─► /sse (LiveReloadManager)
//!                        │       │
//!                        │       └─► notify ──► EventDebouncer ──► broadcast
//!                        │
//!                        └─► /assets (tower-http ServeDir)
//! ```

mod app;
mod error;
mod handlers;
mod live_reload;
mod middleware;
mod state;
mod static_files;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::sync::{broadcast, watch};

pub use error::ServerError;
pub use live_reload::ReloadEvent;
use state::AppState;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Service catalog directory.
    pub services_dir: PathBuf,
    /// Static assets directory, served under `/assets`.
    pub assets_dir: PathBuf,
    /// Enable live reload.
    pub live_reload_enabled: bool,
    /// Watch patterns for live reload, matched against catalog file names.
    pub watch_patterns: Vec<String>,
    /// Server-side debounce window for filesystem events.
    pub debounce_ms: u64,
    /// Quiet period the page waits for before reloading.
    pub client_debounce_ms: u64,
    /// Enable verbose output.
    pub verbose: bool,
    /// Application version (for `ETag` computation).
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
            services_dir: PathBuf::from("cfg"),
            assets_dir: PathBuf::from("assets"),
            live_reload_enabled: false,
            watch_patterns: vec!["*.toml".to_owned()],
            debounce_ms: 100,
            client_debounce_ms: 200,
            verbose: false,
            version: String::new(),
        }
    }
}

/// A configured server, ready to bind.
///
/// The catalog watcher is already running once this exists.
pub struct Server {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl Server {
    /// Prepare the server: ensure the catalog directory exists and start
    /// the live reload watcher if enabled.
    ///
    /// Must be called inside a Tokio runtime when live reload is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog directory cannot be created or the
    /// file watcher cannot be started.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        std::fs::create_dir_all(&config.services_dir).map_err(|source| {
            ServerError::Catalog(hs_catalog::CatalogError::CreateDir {
                path: config.services_dir.clone(),
                source,
            })
        })?;

        let live_reload = if config.live_reload_enabled {
            let (tx, _rx) = broadcast::channel::<ReloadEvent>(100);
            let mut manager = live_reload::LiveReloadManager::new(
                config.services_dir.clone(),
                config.watch_patterns.clone(),
                tx,
            )
            .with_debounce_ms(config.debounce_ms);
            manager.start()?;
            Some(manager)
        } else {
            None
        };

        let (shutdown, _) = watch::channel(false);

        let state = Arc::new(AppState {
            services_dir: config.services_dir.clone(),
            live_reload,
            client_debounce_ms: config.client_debounce_ms,
            verbose: config.verbose,
            version: config.version.clone(),
            shutdown,
        });

        Ok(Self { config, state })
    }

    /// Build the application router.
    #[must_use]
    pub fn router(&self) -> Router {
        app::create_router(Arc::clone(&self.state), &self.config.assets_dir)
    }

    /// End every open `/sse` stream, and any opened later.
    ///
    /// [`Server::run`] calls this once a shutdown signal arrives.
    pub fn shutdown(&self) {
        self.state.begin_shutdown();
    }

    /// Bind and serve until Ctrl-C or SIGTERM.
    ///
    /// Open event streams are ended on shutdown so that graceful shutdown
    /// does not wait on them.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or serving fails.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = self.router();

        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        tracing::info!(
            address = %listener.local_addr()?,
            services_dir = %self.config.services_dir.display(),
            live_reload = self.state.live_reload_enabled(),
            "Starting server"
        );

        let state = Arc::clone(&self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                state.begin_shutdown();
            })
            .await?;

        Ok(())
    }
}

/// Run the server.
///
/// # Arguments
///
/// * `config` - Server configuration
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    Server::new(config)?.run().await
}

/// Wait for a shutdown signal (Ctrl-C, or SIGTERM from systemd).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from a loaded home-services config.
///
/// # Arguments
///
/// * `config` - Loaded configuration
/// * `version` - Application version
/// * `verbose` - Enable verbose output
#[must_use]
pub fn server_config_from_config(
    config: &hs_config::Config,
    version: String,
    verbose: bool,
) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        services_dir: config.services_resolved.dir.clone(),
        assets_dir: config.assets_resolved.dir.clone(),
        live_reload_enabled: config.live_reload.enabled,
        watch_patterns: config.watch_patterns(),
        debounce_ms: config.live_reload.debounce_ms,
        client_debounce_ms: config.live_reload.client_debounce_ms,
        verbose,
        version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_server_config_from_config() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("home-services.toml");
        std::fs::write(&config_path, "").unwrap();
        let config = hs_config::Config::load(Some(&config_path), None).unwrap();

        let server = server_config_from_config(&config, "1.2.3".to_owned(), true);

        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8080);
        assert_eq!(server.services_dir, tmp.path().join("cfg"));
        assert_eq!(server.assets_dir, tmp.path().join("assets"));
        assert!(server.live_reload_enabled);
        assert_eq!(server.watch_patterns, vec!["*.toml".to_owned()]);
        assert_eq!(server.debounce_ms, 100);
        assert_eq!(server.client_debounce_ms, 200);
        assert!(server.verbose);
        assert_eq!(server.version, "1.2.3");
    }

    #[test]
    fn test_new_creates_services_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            services_dir: tmp.path().join("cfg"),
            ..ServerConfig::default()
        };

        let server = Server::new(config).unwrap();

        assert!(tmp.path().join("cfg").is_dir());
        assert!(!server.state.live_reload_enabled());
    }
}
