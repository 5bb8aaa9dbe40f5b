//! Headless reload watcher.
//!
//! Does what the dashboard page does, without a browser: subscribe to the
//! server's event stream and fire a hook after each debounced burst. Each
//! reload starts a fresh session, the way a reloaded page opens a fresh
//! channel.

use std::future::Future;

use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use tokio::time::Duration;

use crate::ReloadError;
use crate::client::{ErrorDisposition, ReloadClient};
use crate::decoder::SseDecoder;
use crate::session::{StreamEnd, drive_stream, race_deadline, wait_for_reconnect};

/// Reconnection delay used until the server sends a `retry:` field.
pub const DEFAULT_RETRY: Duration = Duration::from_millis(3000);

/// How one session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The debounce timer fired.
    Reloaded,
    /// The first connection failed; the channel was closed without reload.
    Closed,
}

/// Subscribes to an event-stream endpoint and reloads on debounced updates.
#[derive(Debug)]
pub struct Watcher {
    url: String,
    window: Duration,
    http: reqwest::Client,
}

impl Watcher {
    /// Create a watcher for `url` with the given debounce window.
    pub fn new(url: impl Into<String>, window: Duration) -> Result<Self, ReloadError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            url: url.into(),
            window,
            http,
        })
    }

    /// Endpoint being watched.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run sessions forever, calling `on_reload` after each reload.
    ///
    /// Returns `ReloadError::Closed` once a session closes before its first
    /// open; no retry is attempted.
    pub async fn run<F, Fut>(&self, mut on_reload: F) -> Result<(), ReloadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        loop {
            match self.run_session().await {
                SessionOutcome::Reloaded => {
                    tracing::info!(url = %self.url, "Reload triggered");
                    on_reload().await;
                }
                SessionOutcome::Closed => {
                    return Err(ReloadError::Closed {
                        url: self.url.clone(),
                    });
                }
            }
        }
    }

    /// Run one session: connect, debounce updates, stop at reload or close.
    pub async fn run_session(&self) -> SessionOutcome {
        let mut client = ReloadClient::new(self.window);
        let mut decoder = SseDecoder::new();

        loop {
            let last_event_id = decoder.last_event_id().map(str::to_owned);
            // A reload pending from the previous connection still fires on time
            let attempt = self.connect(last_event_id.as_deref());
            let Some(connected) = race_deadline(&mut client, attempt).await else {
                tracing::debug!(url = %self.url, "Reload fired while reconnecting");
                return SessionOutcome::Reloaded;
            };
            match connected {
                Ok(response) => {
                    client.on_open();
                    tracing::debug!(url = %self.url, "Event stream open");
                    let end = drive_stream(&mut client, &mut decoder, response.bytes_stream()).await;
                    if end == StreamEnd::Reloaded {
                        return SessionOutcome::Reloaded;
                    }
                    // Handler was discarded on open, so this is a no-op
                    client.on_error();
                }
                Err(e) => match client.on_error() {
                    ErrorDisposition::Close => {
                        tracing::warn!(url = %self.url, error = %e, "Event stream failed to open, closing");
                        return SessionOutcome::Closed;
                    }
                    ErrorDisposition::Ignored => {
                        tracing::debug!(url = %self.url, error = %e, "Reconnect failed");
                    }
                },
            }

            let delay = decoder.retry().unwrap_or(DEFAULT_RETRY);
            if wait_for_reconnect(&mut client, delay).await {
                return SessionOutcome::Reloaded;
            }
        }
    }

    /// Open the event stream.
    async fn connect(&self, last_event_id: Option<&str>) -> Result<reqwest::Response, ReloadError> {
        let mut request = self
            .http
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(id) = last_event_id {
            request = request.header("last-event-id", id);
        }

        let response = request.send().await?.error_for_status()?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !is_event_stream(content_type) {
            return Err(ReloadError::NotEventStream {
                content_type: content_type.to_owned(),
            });
        }

        Ok(response)
    }
}

/// Whether a `Content-Type` value names `text/event-stream`.
fn is_event_stream(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/event-stream"))
}
