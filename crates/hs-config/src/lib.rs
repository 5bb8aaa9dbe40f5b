//! Configuration management for home-services.
//!
//! Parses `home-services.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `services.dir`
//! - `assets.dir`
//! - every string in `[systemd]`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override the service catalog directory.
    pub services_dir: Option<PathBuf>,
    /// Override the static assets directory.
    pub assets_dir: Option<PathBuf>,
    /// Override live reload enabled flag.
    pub live_reload_enabled: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "home-services.toml";

/// Environment variable naming the service catalog directory.
pub const SERVICES_DIR_ENV: &str = "HOME_SERVICE_CFG_DIR";

/// Upper bound for both debounce windows, in milliseconds.
const MAX_DEBOUNCE_MS: u64 = 60_000;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Service catalog configuration (paths are relative strings from TOML).
    services: DirConfigRaw,
    /// Static assets configuration (paths are relative strings from TOML).
    assets: DirConfigRaw,
    /// Live reload configuration.
    pub live_reload: LiveReloadConfig,
    /// Values for the generated systemd unit.
    pub systemd: SystemdConfig,

    /// Resolved service catalog directory (set after loading).
    #[serde(skip)]
    pub services_resolved: DirConfig,
    /// Resolved static assets directory (set after loading).
    #[serde(skip)]
    pub assets_resolved: DirConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
        }
    }
}

/// Raw directory section as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DirConfigRaw {
    dir: Option<String>,
}

/// Resolved directory with an absolute (or cwd-relative) path.
#[derive(Debug, Default)]
pub struct DirConfig {
    /// Directory path.
    pub dir: PathBuf,
}

/// Live reload configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LiveReloadConfig {
    /// Whether live reload is enabled.
    pub enabled: bool,
    /// Window used to coalesce filesystem events on the server.
    pub debounce_ms: u64,
    /// Quiet period the browser waits for before reloading.
    pub client_debounce_ms: u64,
    /// File name patterns inside the catalog directory that trigger a reload.
    pub watch_patterns: Option<Vec<String>>,
}

impl Default for LiveReloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 100,
            client_debounce_ms: 200,
            watch_patterns: None,
        }
    }
}

/// Values for the systemd unit that supervises the server.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SystemdConfig {
    /// `Description=`.
    pub description: String,
    /// Account the service runs as.
    pub user: String,
    /// Group the service runs as.
    pub group: String,
    /// `WorkingDirectory=`.
    pub working_directory: String,
    /// `ExecStart=` command line.
    pub exec_start: String,
    /// `ConditionPathExists=`; defaults to the `exec_start` program.
    pub condition_path: Option<String>,
    /// Log directory prepared by the `ExecStartPre` steps.
    pub log_dir: String,
    /// `SyslogIdentifier=`.
    pub syslog_identifier: String,
}

impl Default for SystemdConfig {
    fn default() -> Self {
        Self {
            description: "Home services dashboard".to_owned(),
            user: "home-services".to_owned(),
            group: "home-services".to_owned(),
            working_directory: "/opt/home-services".to_owned(),
            exec_start: "/opt/home-services/home-services serve".to_owned(),
            condition_path: None,
            log_dir: "/var/log/home-services".to_owned(),
            syslog_identifier: "home-services".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`services.dir`").
        field: String,
        /// Error message (e.g., "${`HOME_SERVICE_CFG_DIR`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a millisecond window to be within `1..=MAX_DEBOUNCE_MS`.
fn require_window(value: u64, field: &str) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_DEBOUNCE_MS {
        return Err(ConfigError::Validation(format!(
            "{field} must be between 1 and {MAX_DEBOUNCE_MS}"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `home-services.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values. The `[server]`
    /// checks run again on the result.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or a value (from the file or an override) is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            // Overrides get the same checks as file values
            config.validate_server()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(services_dir) = &settings.services_dir {
            self.services_resolved.dir.clone_from(services_dir);
        }
        if let Some(assets_dir) = &settings.assets_dir {
            self.assets_resolved.dir.clone_from(assets_dir);
        }
        if let Some(live_reload_enabled) = settings.live_reload_enabled {
            self.live_reload.enabled = live_reload_enabled;
        }
    }

    /// Watch patterns with the default applied.
    #[must_use]
    pub fn watch_patterns(&self) -> Vec<String> {
        self.live_reload
            .watch_patterns
            .clone()
            .unwrap_or_else(|| vec!["*.toml".to_owned()])
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            services: DirConfigRaw::default(),
            assets: DirConfigRaw::default(),
            live_reload: LiveReloadConfig::default(),
            systemd: SystemdConfig::default(),
            services_resolved: DirConfig {
                dir: base.join("cfg"),
            },
            assets_resolved: DirConfig {
                dir: base.join("assets"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file. The `[systemd]` section
    /// is checked only when a unit is rendered.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_live_reload()?;
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 lets the OS pick, which nobody can bookmark
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Validate live reload configuration.
    fn validate_live_reload(&self) -> Result<(), ConfigError> {
        require_window(self.live_reload.debounce_ms, "live_reload.debounce_ms")?;
        require_window(
            self.live_reload.client_debounce_ms,
            "live_reload.client_debounce_ms",
        )?;

        for pattern in self.live_reload.watch_patterns.iter().flatten() {
            glob::Pattern::new(pattern).map_err(|e| {
                ConfigError::Validation(format!(
                    "live_reload.watch_patterns: invalid pattern {pattern:?}: {e}"
                ))
            })?;
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        expand::expand_in_place(&mut self.server.host, "server.host")?;
        expand::expand_opt(&mut self.services.dir, "services.dir")?;
        expand::expand_opt(&mut self.assets.dir, "assets.dir")?;

        let systemd = &mut self.systemd;
        expand::expand_in_place(&mut systemd.description, "systemd.description")?;
        expand::expand_in_place(&mut systemd.user, "systemd.user")?;
        expand::expand_in_place(&mut systemd.group, "systemd.group")?;
        expand::expand_in_place(&mut systemd.working_directory, "systemd.working_directory")?;
        expand::expand_in_place(&mut systemd.exec_start, "systemd.exec_start")?;
        expand::expand_opt(&mut systemd.condition_path, "systemd.condition_path")?;
        expand::expand_in_place(&mut systemd.log_dir, "systemd.log_dir")?;
        expand::expand_in_place(&mut systemd.syslog_identifier, "systemd.syslog_identifier")?;

        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.services_resolved = DirConfig {
            dir: resolve(self.services.dir.as_deref(), "cfg"),
        };
        self.assets_resolved = DirConfig {
            dir: resolve(self.assets.dir.as_deref(), "assets"),
        };
    }
}
