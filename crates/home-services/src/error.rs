//! CLI error types.

use hs_config::ConfigError;
use hs_reload::ReloadError;
use hs_server::ServerError;
use hs_systemd::UnitError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Server(#[from] ServerError),

    #[error("{0}")]
    Reload(#[from] ReloadError),

    #[error("{0}")]
    Unit(#[from] UnitError),
}
