//! systemd unit generation for home-services.
//!
//! The unit only declares supervision; restarts, backoff and log routing are
//! left to systemd. Restart delay and descriptor limit are fixed:
//!
//! - `Restart=on-failure` with `RestartSec=10`
//! - `LimitNOFILE=1024`
//!
//! The log directory is prepared by three `ExecStartPre` steps that run as
//! root (`PermissionsStartOnly=true`) before the service drops to its user.

use std::fmt::Write;
use std::path::Path;

use hs_config::SystemdConfig;

/// Seconds systemd waits before restarting a failed service.
pub const RESTART_SEC: u32 = 10;

/// Open file descriptor limit for the service.
pub const LIMIT_NOFILE: u32 = 1024;

/// Mode applied to the log directory.
pub const LOG_DIR_MODE: &str = "755";

/// Unit rendering error.
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    /// A field has a value systemd would reject or misread.
    #[error("Invalid unit field {field}: {message}")]
    InvalidField {
        /// Config field path (e.g., "`systemd.user`").
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Everything needed to render the unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
    /// `Description=`.
    pub description: String,
    /// `ConditionPathExists=`.
    pub condition_path: String,
    /// `After=`.
    pub after: String,
    /// `User=`.
    pub user: String,
    /// `Group=`.
    pub group: String,
    /// `WorkingDirectory=`.
    pub working_directory: String,
    /// `ExecStart=`.
    pub exec_start: String,
    /// Directory created and chowned before start.
    pub log_dir: String,
    /// `SyslogIdentifier=`.
    pub syslog_identifier: String,
}

impl UnitSpec {
    /// Build a unit spec from the `[systemd]` config section.
    ///
    /// `ConditionPathExists=` falls back to the program named by `exec_start`.
    #[must_use]
    pub fn from_config(config: &SystemdConfig) -> Self {
        let condition_path = config
            .condition_path
            .clone()
            .unwrap_or_else(|| program(&config.exec_start).to_owned());

        Self {
            description: config.description.clone(),
            condition_path,
            after: "network.target".to_owned(),
            user: config.user.clone(),
            group: config.group.clone(),
            working_directory: config.working_directory.clone(),
            exec_start: config.exec_start.clone(),
            log_dir: config.log_dir.clone(),
            syslog_identifier: config.syslog_identifier.clone(),
        }
    }

    /// Check the fields systemd is strict about.
    pub fn validate(&self) -> Result<(), UnitError> {
        require_word(&self.user, "systemd.user")?;
        require_word(&self.group, "systemd.group")?;
        require_word(&self.syslog_identifier, "systemd.syslog_identifier")?;
        require_absolute(&self.working_directory, "systemd.working_directory")?;
        require_absolute(&self.log_dir, "systemd.log_dir")?;
        require_absolute(&self.condition_path, "systemd.condition_path")?;
        require_absolute(program(&self.exec_start), "systemd.exec_start")?;
        if self.description.contains('\n') {
            return Err(UnitError::InvalidField {
                field: "systemd.description",
                message: "must be a single line".to_owned(),
            });
        }
        Ok(())
    }

    /// Validate and render the unit file.
    pub fn render(&self) -> Result<String, UnitError> {
        self.validate()?;

        let Self {
            description,
            condition_path,
            after,
            user,
            group,
            working_directory,
            exec_start,
            log_dir,
            syslog_identifier,
        } = self;

        let mut unit = String::new();
        let _ = writeln!(unit, "[Unit]");
        let _ = writeln!(unit, "Description={description}");
        let _ = writeln!(unit, "ConditionPathExists={condition_path}");
        let _ = writeln!(unit, "After={after}");
        let _ = writeln!(unit);
        let _ = writeln!(unit, "[Service]");
        let _ = writeln!(unit, "Type=simple");
        let _ = writeln!(unit, "User={user}");
        let _ = writeln!(unit, "Group={group}");
        let _ = writeln!(unit, "LimitNOFILE={LIMIT_NOFILE}");
        let _ = writeln!(unit);
        let _ = writeln!(unit, "Restart=on-failure");
        let _ = writeln!(unit, "RestartSec={RESTART_SEC}");
        let _ = writeln!(unit);
        let _ = writeln!(unit, "WorkingDirectory={working_directory}");
        let _ = writeln!(unit, "ExecStart={exec_start}");
        let _ = writeln!(unit);
        let _ = writeln!(unit, "PermissionsStartOnly=true");
        let _ = writeln!(unit, "ExecStartPre=/bin/mkdir -p {log_dir}");
        let _ = writeln!(unit, "ExecStartPre=/bin/chown {user}:{group} {log_dir}");
        let _ = writeln!(unit, "ExecStartPre=/bin/chmod {LOG_DIR_MODE} {log_dir}");
        let _ = writeln!(unit, "StandardOutput=syslog");
        let _ = writeln!(unit, "StandardError=syslog");
        let _ = writeln!(unit, "SyslogIdentifier={syslog_identifier}");
        let _ = writeln!(unit);
        let _ = writeln!(unit, "[Install]");
        let _ = writeln!(unit, "WantedBy=multi-user.target");

        Ok(unit)
    }
}

/// First word of a command line.
fn program(command: &str) -> &str {
    command.split_whitespace().next().unwrap_or("")
}

/// Require a non-empty value without whitespace.
fn require_word(value: &str, field: &'static str) -> Result<(), UnitError> {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(UnitError::InvalidField {
            field,
            message: format!("{value:?} must be a single non-empty word"),
        });
    }
    Ok(())
}

/// Require an absolute path.
fn require_absolute(value: &str, field: &'static str) -> Result<(), UnitError> {
    if !Path::new(value).is_absolute() {
        return Err(UnitError::InvalidField {
            field,
            message: format!("{value:?} must be an absolute path"),
        });
    }
    Ok(())
}
