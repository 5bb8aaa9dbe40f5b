//! `home-services serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use hs_config::{CliSettings, Config};
use hs_server::{run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover home-services.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service catalog directory (overrides config).
    #[arg(short, long, env = "HOME_SERVICE_CFG_DIR")]
    services_dir: Option<PathBuf>,

    /// Static assets directory (overrides config).
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose output (debug logging, per-request catalog summary).
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable live reload (default: enabled).
    #[arg(long)]
    live_reload: Option<bool>,

    /// Disable live reload.
    #[arg(long, conflicts_with = "live_reload")]
    no_live_reload: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            live_reload_enabled: self.resolve_live_reload_enabled(),
            host: self.host,
            port: self.port,
            services_dir: self.services_dir,
            assets_dir: self.assets_dir,
        };

        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.banner(version);
        output.setting(
            "Listening on",
            format_args!("{}:{}", config.server.host, config.server.port),
        );
        output.setting("Service catalog", config.services_resolved.dir.display());
        output.setting("Assets", config.assets_resolved.dir.display());
        if config.live_reload.enabled {
            output.setting(
                "Live reload",
                format_args!("watching {}", config.watch_patterns().join(", ")),
            );
        } else {
            output.setting("Live reload", "off");
        }

        let server_config = server_config_from_config(&config, version.to_owned(), self.verbose);
        run_server(server_config).await?;

        output.done("Server stopped");
        Ok(())
    }

    /// Resolve `live_reload_enabled` from --live-reload/--no-live-reload flags.
    fn resolve_live_reload_enabled(&self) -> Option<bool> {
        self.no_live_reload.then_some(false).or(self.live_reload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ServeArgs,
    }

    fn parse(args: &[&str]) -> ServeArgs {
        TestCli::try_parse_from(std::iter::once("serve").chain(args.iter().copied()))
            .unwrap()
            .args
    }

    #[test]
    fn test_live_reload_flags() {
        assert_eq!(parse(&[]).resolve_live_reload_enabled(), None);
        assert_eq!(
            parse(&["--no-live-reload"]).resolve_live_reload_enabled(),
            Some(false)
        );
        assert_eq!(
            parse(&["--live-reload", "true"]).resolve_live_reload_enabled(),
            Some(true)
        );
    }

    #[test]
    fn test_live_reload_flags_conflict() {
        let result = TestCli::try_parse_from(["serve", "--live-reload", "true", "--no-live-reload"]);

        assert!(result.is_err());
    }

    #[test]
    fn test_services_dir_flag() {
        let args = parse(&["--services-dir", "/srv/cfg", "-p", "9000"]);

        assert_eq!(args.services_dir, Some(PathBuf::from("/srv/cfg")));
        assert_eq!(args.port, Some(9000));
    }
}
