//! Reload client state machine.
//!
//! One event channel, one debounce timer. The page script served by
//! `hs-server` follows the same rules:
//!
//! - an error before the channel has ever opened closes it, nothing else
//! - the first successful open discards the error handler, later errors are
//!   left to the channel's own reconnect logic
//! - every message restarts the timer
//! - when the timer runs out the channel is closed and the page reloads

use tokio::time::{Duration, Instant};

/// Quiet period after the last message before reloading.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(200);

/// Lifecycle of a reload client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    /// Waiting for the channel to open for the first time.
    Connecting,
    /// Channel has opened at least once.
    Open,
    /// Closed by an error before the first open. Terminal.
    Closed,
    /// The debounce timer fired. Terminal.
    Reloaded,
}

/// What an error did to the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// The error handler was still armed: the channel is closed, no reload.
    Close,
    /// No handler registered any more: the error has no effect.
    Ignored,
}

/// Debounced reload state for one page lifetime.
#[derive(Debug)]
pub struct ReloadClient {
    window: Duration,
    state: ClientState,
    error_armed: bool,
    deadline: Option<Instant>,
}

impl ReloadClient {
    /// Create a client that reloads after `window` of silence.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: ClientState::Connecting,
            error_armed: true,
            deadline: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// When the pending reload fires, if one is scheduled.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the client has reached a terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, ClientState::Closed | ClientState::Reloaded)
    }

    /// The channel opened.
    pub fn on_open(&mut self) {
        if self.state == ClientState::Connecting {
            self.state = ClientState::Open;
            self.error_armed = false;
        }
    }

    /// A message arrived at `now`; restart the timer.
    pub fn on_message(&mut self, now: Instant) {
        if self.state == ClientState::Open {
            self.deadline = Some(now + self.window);
        }
    }

    /// The channel reported an error.
    pub fn on_error(&mut self) -> ErrorDisposition {
        if !self.error_armed {
            return ErrorDisposition::Ignored;
        }
        self.error_armed = false;
        self.state = ClientState::Closed;
        self.deadline = None;
        ErrorDisposition::Close
    }

    /// Check the timer at `now`.
    ///
    /// Returns `true` exactly once, when the deadline has passed. The client
    /// is then `Reloaded` and ignores everything else.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now && self.state == ClientState::Open => {
                self.deadline = None;
                self.state = ClientState::Reloaded;
                true
            }
            _ => false,
        }
    }
}
