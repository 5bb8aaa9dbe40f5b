//! `home-services unit` command implementation.

use std::path::PathBuf;

use clap::Args;
use console::Term;
use hs_config::Config;
use hs_systemd::UnitSpec;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the unit command.
#[derive(Args)]
pub(crate) struct UnitArgs {
    /// Path to configuration file (default: auto-discover home-services.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the unit to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl UnitArgs {
    /// Execute the unit command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the `[systemd]` values are
    /// invalid, or the output cannot be written.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let config = Config::load(self.config.as_deref(), None)?;
        let unit = UnitSpec::from_config(&config.systemd).render()?;

        match self.output {
            Some(path) => {
                std::fs::write(&path, unit)?;
                Output::new().done(format_args!("Wrote {}", path.display()));
            }
            None => Term::stdout().write_str(&unit)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_writes_default_unit_to_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join("home-services.toml");
        std::fs::write(&config, "").unwrap();
        let out = tmp.path().join("home-services.service");

        UnitArgs {
            config: Some(config),
            output: Some(out.clone()),
        }
        .execute()
        .unwrap();

        assert_eq!(
            std::fs::read_to_string(out).unwrap(),
            include_str!("../../../../deploy/home-services.service")
        );
    }

    #[test]
    fn test_invalid_systemd_section_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join("home-services.toml");
        std::fs::write(&config, "[systemd]\nuser = \"home services\"\n").unwrap();

        let err = UnitArgs {
            config: Some(config),
            output: Some(tmp.path().join("out.service")),
        }
        .execute()
        .unwrap_err();

        assert!(matches!(err, CliError::Unit(_)));
        assert!(!tmp.path().join("out.service").exists());
    }
}
