//! Driving a [`ReloadClient`] with a live byte stream and the clock.

use std::fmt::Display;
use std::future::Future;
use std::pin::pin;

use tokio::time::{Duration, Instant};
use tokio_stream::{Stream, StreamExt};

use crate::client::ReloadClient;
use crate::decoder::SseDecoder;

/// Why a connection stopped being driven.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamEnd {
    /// The debounce timer fired.
    Reloaded,
    /// The stream ended or failed.
    Disconnected,
}

/// Feed one connection's stream to the client until it ends or the timer fires.
///
/// Only events that reach `onmessage` (unnamed or `event: message`) restart
/// the timer; comments and other event types do not.
pub async fn drive_stream<S, B, E>(
    client: &mut ReloadClient,
    decoder: &mut SseDecoder,
    stream: S,
) -> StreamEnd
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut stream = pin!(stream);

    loop {
        tokio::select! {
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    for event in decoder.feed(bytes.as_ref()) {
                        if event.is_message() {
                            tracing::debug!(data = %event.data, "Update event received");
                            client.on_message(Instant::now());
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Event stream failed");
                    decoder.reset_pending();
                    return StreamEnd::Disconnected;
                }
                None => {
                    tracing::debug!("Event stream ended");
                    decoder.reset_pending();
                    return StreamEnd::Disconnected;
                }
            },
            () = sleep_until_deadline(client.deadline()) => {
                if client.poll(Instant::now()) {
                    return StreamEnd::Reloaded;
                }
            }
        }
    }
}

/// Wait `delay` before reconnecting, unless the pending reload fires first.
///
/// Returns `true` if the client reloaded while waiting.
pub async fn wait_for_reconnect(client: &mut ReloadClient, delay: Duration) -> bool {
    let reconnect_at = Instant::now() + delay;
    loop {
        tokio::select! {
            () = tokio::time::sleep_until(reconnect_at) => return false,
            () = sleep_until_deadline(client.deadline()) => {
                if client.poll(Instant::now()) {
                    return true;
                }
            }
        }
    }
}

/// Await `attempt` unless the pending reload fires first.
///
/// Returns `None` when the client reloaded before the attempt finished; the
/// attempt is dropped.
pub async fn race_deadline<F: Future>(client: &mut ReloadClient, attempt: F) -> Option<F::Output> {
    let mut attempt = pin!(attempt);
    loop {
        tokio::select! {
            output = &mut attempt => return Some(output),
            () = sleep_until_deadline(client.deadline()) => {
                if client.poll(Instant::now()) {
                    return None;
                }
            }
        }
    }
}

/// Sleep until the client's deadline, or forever when none is set.
async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
