//! Live reload: catalog watcher, debouncer and the `/sse` endpoint.

mod debouncer;
mod manager;
mod sse;

pub(crate) use manager::LiveReloadManager;
pub use manager::ReloadEvent;
pub(crate) use sse::sse_handler;
