//! Debounced live-reload client for home-services.
//!
//! The dashboard page subscribes to `/sse` and reloads once updates stop
//! arriving for a short window. This crate holds that behaviour as a
//! testable state machine ([`ReloadClient`]), an event-stream decoder
//! ([`SseDecoder`]) and a headless driver ([`Watcher`]) for kiosks and
//! scripts that want the same signal without a browser.
//!
//! # Example
//!
//! ```ignore
//! use hs_reload::{Watcher, DEFAULT_WINDOW};
//!
//! let watcher = Watcher::new("http://dashboard:8080/sse", DEFAULT_WINDOW)?;
//! watcher.run(|| async { println!("reload") }).await?;
//! ```

mod client;
mod decoder;
mod session;
mod watcher;

pub use client::{ClientState, DEFAULT_WINDOW, ErrorDisposition, ReloadClient};
pub use decoder::{MAX_LINE_BYTES, SseDecoder, SseEvent};
pub use session::{StreamEnd, drive_stream, race_deadline, wait_for_reconnect};
pub use watcher::{DEFAULT_RETRY, SessionOutcome, Watcher};

/// Reload client error.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with something other than an event stream.
    #[error("Expected text/event-stream, got {content_type:?}")]
    NotEventStream {
        /// `Content-Type` the server sent.
        content_type: String,
    },

    /// The channel failed before it ever opened and was closed.
    #[error("Event stream at {url} failed before opening; channel closed")]
    Closed {
        /// Endpoint that was being watched.
        url: String,
    },
}
