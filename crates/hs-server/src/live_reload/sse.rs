//! Server-sent events endpoint for live reload.
//!
//! Each connection subscribes to the manager's broadcast channel and gets
//! one unnamed event per catalog change, so a plain `onmessage` handler
//! sees it.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use uuid::Uuid;

use super::manager::ReloadEvent;
use crate::error::ServerError;
use crate::state::AppState;

/// Handle `GET /sse`.
///
/// The stream ends when the server begins shutting down.
pub(crate) async fn sse_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServerError> {
    let Some(ref live_reload) = state.live_reload else {
        return Err(ServerError::LiveReloadDisabled);
    };

    live_reload.ensure_watching();

    let connection = Uuid::new_v4();
    tracing::debug!(%connection, "Live reload client connected");

    let stream = BroadcastStream::new(live_reload.subscribe())
        .map(move |msg| {
            let event = match msg {
                Ok(event) => event,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(%connection, skipped, "Live reload client lagged");
                    ReloadEvent::resync()
                }
            };
            tracing::debug!(%connection, path = ?event.path(), "Sending update");
            Ok(to_sse_event(&event))
        })
        .take_until(state.shutdown_requested());

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Encode a reload event as an unnamed SSE event with JSON data.
fn to_sse_event(event: &ReloadEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "update".to_owned());
    Event::default().data(data)
}
