//! `home-services watch` command implementation.
//!
//! A headless stand-in for the dashboard page: subscribe to a running
//! server's `/sse` endpoint and act on each debounced reload.

use clap::Args;
use hs_reload::Watcher;
use tokio::time::Duration;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    /// Event stream of a running dashboard.
    #[arg(long, default_value = "http://127.0.0.1:8080/sse")]
    url: String,

    /// Quiet period after the last update before reloading, in milliseconds.
    #[arg(long, default_value_t = 200)]
    window_ms: u64,

    /// Shell command to run on every reload (through `sh -c`).
    #[arg(long)]
    exec: Option<String>,

    /// Enable verbose output (debug logging).
    #[arg(short, long)]
    pub verbose: bool,
}

impl WatchArgs {
    /// Execute the watch command.
    ///
    /// Runs until the event stream fails before it ever opened.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the first
    /// connection fails.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let watcher = Watcher::new(self.url, Duration::from_millis(self.window_ms))?;

        output.setting("Watching", watcher.url());

        let output = &output;
        let exec = self.exec.as_deref();
        watcher
            .run(move || async move {
                output.done("Catalog changed, reloading");
                if let Some(command) = exec {
                    run_hook(command).await;
                }
            })
            .await?;

        Ok(())
    }
}

/// Run the reload hook; failures are logged and do not stop watching.
async fn run_hook(command: &str) {
    match tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .await
    {
        Ok(status) if status.success() => {
            tracing::debug!(command, "Reload hook finished");
        }
        Ok(status) => {
            tracing::warn!(command, %status, "Reload hook failed");
        }
        Err(e) => {
            tracing::warn!(command, error = %e, "Failed to run reload hook");
        }
    }
}
