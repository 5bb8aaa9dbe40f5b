//! Human-facing status lines on stderr.
//!
//! Stdout is reserved for command output such as a rendered unit file, so
//! everything here goes to the error stream.

use std::fmt::Display;

use console::{Style, Term};

/// Status printer for the CLI commands.
pub(crate) struct Output {
    term: Term,
    title: Style,
    label: Style,
    ok: Style,
    failed: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            ok: Style::new().green(),
            failed: Style::new().red().bold(),
        }
    }

    /// `home-services <version>` heading printed before serving.
    pub(crate) fn banner(&self, version: &str) {
        self.line(&self.title.apply_to(format!("home-services {version}")));
    }

    /// One `label: value` line describing the running setup.
    pub(crate) fn setting(&self, label: &str, value: impl Display) {
        self.line(&format_args!("{} {value}", self.label.apply_to(format!("{label}:"))));
    }

    /// Something finished as intended.
    pub(crate) fn done(&self, msg: impl Display) {
        self.line(&self.ok.apply_to(msg));
    }

    /// The command failed; printed once before exiting non-zero.
    pub(crate) fn failure(&self, err: &dyn Display) {
        self.line(&format_args!("{} {err}", self.failed.apply_to("error:")));
    }

    // Terminal write errors are not worth failing a command over
    fn line(&self, text: &dyn Display) {
        let _ = self.term.write_line(&text.to_string());
    }
}
