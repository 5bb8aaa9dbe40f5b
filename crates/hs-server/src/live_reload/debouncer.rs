//! Event debouncing for live reload.
//!
//! Editors emit several events per save (write temp file, rename, chmod);
//! the debouncer folds them into one change per catalog file.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::time::{Duration, Instant};

/// Kind of catalog file change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ChangeKind {
    Added,
    Changed,
    Removed,
}

/// A debounced catalog file change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CatalogChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Change waiting for its quiet period to run out.
struct Pending {
    kind: ChangeKind,
    deadline: Instant,
}

/// Per-path debouncer.
///
/// Every event for a path pushes its deadline out by the debounce window;
/// a path is emitted once its deadline passes.
pub(crate) struct EventDebouncer {
    pending: HashMap<PathBuf, Pending>,
    window: Duration,
}

impl EventDebouncer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            window,
        }
    }

    /// Record an event observed at `now`.
    pub(crate) fn record(&mut self, path: PathBuf, kind: ChangeKind, now: Instant) {
        use std::collections::hash_map::Entry;

        let deadline = now + self.window;

        match self.pending.entry(path) {
            Entry::Vacant(entry) => {
                entry.insert(Pending { kind, deadline });
            }
            Entry::Occupied(mut entry) => match Self::coalesce(entry.get().kind, kind) {
                Some(kind) => {
                    *entry.get_mut() = Pending { kind, deadline };
                }
                None => {
                    entry.remove();
                }
            },
        }
    }

    /// Fold a new event into a pending one.
    ///
    /// `None` drops the path entirely: a file added and removed within one
    /// window never reached the dashboard.
    #[allow(clippy::match_same_arms)]
    fn coalesce(existing: ChangeKind, new: ChangeKind) -> Option<ChangeKind> {
        use ChangeKind::{Added, Changed, Removed};

        match (existing, new) {
            (Added, Added) => Some(Added),
            (Added, Changed) => Some(Added),
            (Added, Removed) => None,

            (Changed, Added) => Some(Added),
            (Changed, Changed) => Some(Changed),
            (Changed, Removed) => Some(Removed),

            // Replaced via rename-over
            (Removed, Added) => Some(Changed),
            (Removed, Changed) => Some(Removed),
            (Removed, Removed) => Some(Removed),
        }
    }

    /// Take every change whose deadline is at or before `now`.
    pub(crate) fn drain_ready(&mut self, now: Instant) -> Vec<CatalogChange> {
        let mut ready = Vec::new();
        self.pending.retain(|path, change| {
            if change.deadline <= now {
                ready.push(CatalogChange {
                    path: path.clone(),
                    kind: change.kind,
                });
                false
            } else {
                true
            }
        });
        ready.sort_by(|a, b| a.path.cmp(&b.path));
        ready
    }

    /// Earliest pending deadline.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }
}
