//! Live reload manager.
//!
//! One `notify` watcher on the catalog directory feeds a debouncer; each
//! settled change is broadcast to every open event stream.
//!
//! Deleting the catalog directory drops the watch with it. The loss is
//! noted and the watch is re-armed on the next `/sse` connection, which is
//! the reconnect a reloaded page makes anyway.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Duration, Instant};

use super::debouncer::{CatalogChange, ChangeKind, EventDebouncer};

/// Event sent to connected clients when the catalog changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReloadEvent {
    /// Event type (always "update").
    #[serde(rename = "type")]
    event_type: &'static str,
    /// Catalog file that changed; absent when the client missed events.
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl ReloadEvent {
    /// Update for a single catalog file.
    #[must_use]
    pub fn update(path: impl Into<String>) -> Self {
        Self {
            event_type: "update",
            path: Some(path.into()),
        }
    }

    /// Update with no specific file, sent to subscribers that fell behind.
    #[must_use]
    pub fn resync() -> Self {
        Self {
            event_type: "update",
            path: None,
        }
    }

    /// Catalog file that changed.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

/// Default debounce duration in milliseconds.
const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Manages the catalog watcher and broadcasts reload events.
pub(crate) struct LiveReloadManager {
    services_dir: PathBuf,
    watch_patterns: Vec<glob::Pattern>,
    broadcaster: broadcast::Sender<ReloadEvent>,
    /// Dropping the watcher stops the event feed.
    watcher: Mutex<Option<RecommendedWatcher>>,
    /// Set when the watched directory itself went away.
    watch_lost: Arc<AtomicBool>,
    debounce_ms: u64,
}

impl LiveReloadManager {
    /// Create a new live reload manager.
    ///
    /// # Arguments
    ///
    /// * `services_dir` - Catalog directory to watch
    /// * `watch_patterns` - Glob patterns matched against file names (e.g. `["*.toml"]`)
    /// * `broadcaster` - Broadcast channel sender for reload events
    #[must_use]
    pub(crate) fn new(
        services_dir: PathBuf,
        watch_patterns: Vec<String>,
        broadcaster: broadcast::Sender<ReloadEvent>,
    ) -> Self {
        let watch_patterns = watch_patterns
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "Ignoring invalid watch pattern");
                    None
                }
            })
            .collect();

        Self {
            services_dir,
            watch_patterns,
            broadcaster,
            watcher: Mutex::new(None),
            watch_lost: Arc::new(AtomicBool::new(false)),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }

    /// Set the debounce duration in milliseconds.
    #[must_use]
    pub(crate) fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Start watching the catalog directory.
    ///
    /// The watcher lives as long as the manager; the spawned processing
    /// task ends when it is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file watcher cannot be created.
    pub(crate) fn start(&mut self) -> Result<(), notify::Error> {
        let (tx, rx) = mpsc::channel::<Event>(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                // Callback runs on the watcher's own thread
                Ok(event) => {
                    let _ = tx.blocking_send(event);
                }
                Err(e) => tracing::warn!(error = %e, "File watcher error"),
            }
        })?;

        watcher.watch(&self.services_dir, RecursiveMode::NonRecursive)?;
        *self.watcher.get_mut().unwrap_or_else(PoisonError::into_inner) = Some(watcher);

        tracing::info!(
            dir = %self.services_dir.display(),
            patterns = ?self.watch_patterns.iter().map(glob::Pattern::as_str).collect::<Vec<_>>(),
            debounce_ms = self.debounce_ms,
            "Watching service catalog"
        );

        tokio::spawn(process_events(
            rx,
            EventDebouncer::new(Duration::from_millis(self.debounce_ms)),
            self.watch_patterns.clone(),
            self.broadcaster.clone(),
            WatchedDir {
                path: std::path::absolute(&self.services_dir)
                    .unwrap_or_else(|_| self.services_dir.clone()),
                lost: Arc::clone(&self.watch_lost),
            },
        ));

        Ok(())
    }

    /// Re-arm the watch if the catalog directory was removed since.
    ///
    /// Recreates the directory first. Failures are logged; the stream still
    /// opens, it just sees no changes until a later attempt succeeds.
    pub(crate) fn ensure_watching(&self) {
        if !self.watch_lost.load(Ordering::Acquire) {
            return;
        }
        match self.rewatch() {
            Ok(()) => {
                self.watch_lost.store(false, Ordering::Release);
                tracing::info!(dir = %self.services_dir.display(), "Catalog watch re-armed");
            }
            Err(e) => {
                tracing::warn!(dir = %self.services_dir.display(), error = %e, "Failed to re-arm catalog watch");
            }
        }
    }

    fn rewatch(&self) -> Result<(), notify::Error> {
        std::fs::create_dir_all(&self.services_dir).map_err(notify::Error::io)?;
        let mut guard = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(watcher) = guard.as_mut() else {
            return Ok(());
        };
        // The kernel already dropped the old watch; this only clears notify's record of it
        let _ = watcher.unwatch(&self.services_dir);
        watcher.watch(&self.services_dir, RecursiveMode::NonRecursive)
    }

    /// Whether the watched directory has gone away and not been re-armed.
    #[cfg(test)]
    fn watch_lost(&self) -> bool {
        self.watch_lost.load(Ordering::Acquire)
    }

    /// Get a receiver for reload events.
    #[must_use]
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.broadcaster.subscribe()
    }
}

/// The watched catalog directory and the flag raised when it disappears.
struct WatchedDir {
    path: PathBuf,
    lost: Arc<AtomicBool>,
}

/// Record raw events and broadcast each change once its window has passed.
async fn process_events(
    mut rx: mpsc::Receiver<Event>,
    mut debouncer: EventDebouncer,
    watch_patterns: Vec<glob::Pattern>,
    broadcaster: broadcast::Sender<ReloadEvent>,
    watched: WatchedDir,
) {
    loop {
        let next_deadline = debouncer.next_deadline();
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else {
                    break;
                };
                if removes_dir(&event, &watched.path) {
                    tracing::warn!(dir = %watched.path.display(), "Catalog directory removed, watch lost");
                    watched.lost.store(true, Ordering::Release);
                    continue;
                }
                record_event(&event, &watch_patterns, &mut debouncer, Instant::now());
            }
            () = sleep_until(next_deadline) => {
                for change in debouncer.drain_ready(Instant::now()) {
                    broadcast_change(&change, &broadcaster);
                }
            }
        }
    }
    tracing::debug!("Catalog watcher stopped");
}

/// Sleep until `deadline`, or forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Map a raw event onto catalog changes and record the matching ones.
fn record_event(
    event: &Event,
    watch_patterns: &[glob::Pattern],
    debouncer: &mut EventDebouncer,
    now: Instant,
) {
    for (path, kind) in classify(event) {
        if !matches_patterns(path, watch_patterns) {
            continue;
        }
        debouncer.record(path.to_path_buf(), kind, now);
        tracing::debug!(path = %path.display(), ?kind, "Recorded catalog event");
    }
}

/// Whether `event` removes or moves away the watched directory itself.
fn removes_dir(event: &Event, dir: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From | RenameMode::Any))
    ) && event.paths.iter().any(|p| p == dir)
}

/// Change kind for each path of a raw event.
///
/// Renames count as a removal of the old name and an addition of the new
/// one. Access and metadata-only events are not changes.
fn classify(event: &Event) -> Vec<(&Path, ChangeKind)> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Added,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeKind::Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Added,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            return match event.paths.as_slice() {
                [from, to] => vec![
                    (from.as_path(), ChangeKind::Removed),
                    (to.as_path(), ChangeKind::Added),
                ],
                _ => Vec::new(),
            };
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
        EventKind::Modify(_) => ChangeKind::Changed,
        _ => return Vec::new(),
    };

    event.paths.iter().map(|p| (p.as_path(), kind)).collect()
}

/// Check if a catalog file name matches any watch pattern.
///
/// Hidden files (editor swap and lock files) never match.
fn matches_patterns(path: &Path, patterns: &[glob::Pattern]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') {
        return false;
    }
    patterns.iter().any(|pattern| pattern.matches(name))
}

/// Send one settled change to every subscriber.
fn broadcast_change(change: &CatalogChange, broadcaster: &broadcast::Sender<ReloadEvent>) {
    let name = change
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // No subscribers is not an error: nobody has the page open
    let receivers = broadcaster.send(ReloadEvent::update(name.clone())).unwrap_or(0);

    tracing::info!(
        path = %name,
        kind = ?change.kind,
        receivers,
        "Catalog change broadcast"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};
    use pretty_assertions::assert_eq;

    fn patterns(globs: &[&str]) -> Vec<glob::Pattern> {
        globs.iter().map(|g| glob::Pattern::new(g).unwrap()).collect()
    }

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
    }

    fn watched(lost: &Arc<AtomicBool>) -> WatchedDir {
        WatchedDir {
            path: PathBuf::from("/cfg"),
            lost: Arc::clone(lost),
        }
    }

    /// Wait up to `secs` seconds of real time for `check` to hold.
    async fn eventually(secs: u64, mut check: impl FnMut() -> bool) -> bool {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(secs);
        while std::time::Instant::now() < deadline {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        check()
    }

    #[test]
    fn test_reload_event_serialization() {
        let json = serde_json::to_value(ReloadEvent::update("grafana.toml")).unwrap();

        assert_eq!(json["type"], "update");
        assert_eq!(json["path"], "grafana.toml");
    }

    #[test]
    fn test_resync_event_has_no_path() {
        let json = serde_json::to_string(&ReloadEvent::resync()).unwrap();

        assert_eq!(json, r#"{"type":"update"}"#);
    }

    #[test]
    fn test_matches_patterns_by_file_name() {
        let globs = patterns(&["*.toml"]);

        assert!(matches_patterns(Path::new("/srv/cfg/nas.toml"), &globs));
        assert!(matches_patterns(Path::new("cfg/nas.toml"), &globs));
        assert!(!matches_patterns(Path::new("/srv/cfg/nas.toml.swp"), &globs));
        assert!(!matches_patterns(Path::new("/srv/cfg/.nas.toml"), &globs));
        assert!(!matches_patterns(Path::new("/srv/cfg/README"), &globs));
    }

    #[test]
    fn test_classify_rename_both() {
        let e = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/cfg/old.toml", "/cfg/new.toml"],
        );

        assert_eq!(
            classify(&e),
            vec![
                (Path::new("/cfg/old.toml"), ChangeKind::Removed),
                (Path::new("/cfg/new.toml"), ChangeKind::Added),
            ]
        );
    }

    #[test]
    fn test_classify_ignores_metadata_and_access() {
        let chmod = event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            &["/cfg/a.toml"],
        );
        let access = event(
            EventKind::Access(notify::event::AccessKind::Read),
            &["/cfg/a.toml"],
        );

        assert!(classify(&chmod).is_empty());
        assert!(classify(&access).is_empty());
    }

    #[test]
    fn test_removes_dir_only_for_the_watched_dir() {
        let dir = Path::new("/cfg");

        assert!(removes_dir(
            &event(EventKind::Remove(RemoveKind::Folder), &["/cfg"]),
            dir
        ));
        assert!(removes_dir(
            &event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/cfg"]),
            dir
        ));
        assert!(!removes_dir(
            &event(EventKind::Remove(RemoveKind::File), &["/cfg/nas.toml"]),
            dir
        ));
        assert!(!removes_dir(
            &event(EventKind::Create(CreateKind::Folder), &["/cfg"]),
            dir
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_events_flags_removed_dir() {
        let (tx, rx) = mpsc::channel(16);
        let (broadcaster, mut updates) = broadcast::channel(16);
        let lost = Arc::new(AtomicBool::new(false));
        tokio::spawn(process_events(
            rx,
            EventDebouncer::new(Duration::from_millis(100)),
            patterns(&["*"]),
            broadcaster,
            watched(&lost),
        ));

        tx.send(event(EventKind::Remove(RemoveKind::Folder), &["/cfg"]))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(lost.load(Ordering::Acquire));
        // The directory itself is not a catalog entry
        assert!(updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_watch_rearmed_after_dir_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("cfg");
        std::fs::create_dir_all(&dir).unwrap();
        let (broadcaster, mut updates) = broadcast::channel(16);
        let mut manager = LiveReloadManager::new(dir.clone(), vec!["*.toml".to_owned()], broadcaster)
            .with_debounce_ms(20);
        manager.start().unwrap();

        std::fs::remove_dir_all(&dir).unwrap();
        assert!(eventually(10, || manager.watch_lost()).await, "removal not noticed");

        manager.ensure_watching();
        assert!(!manager.watch_lost());
        assert!(dir.is_dir());

        // Drain anything broadcast before the re-arm
        while updates.try_recv().is_ok() {}
        std::fs::write(dir.join("nas.toml"), "name = \"NAS\"\n").unwrap();
        let update = tokio::time::timeout(std::time::Duration::from_secs(10), async {
            loop {
                match updates.recv().await {
                    Ok(update) if update.path() == Some("nas.toml") => return update,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => panic!("broadcaster closed"),
                }
            }
        })
        .await
        .expect("no update after re-arm");
        assert_eq!(update, ReloadEvent::update("nas.toml"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_events_broadcasts_once_per_burst() {
        let (tx, rx) = mpsc::channel(16);
        let (broadcaster, mut updates) = broadcast::channel(16);
        tokio::spawn(process_events(
            rx,
            EventDebouncer::new(Duration::from_millis(100)),
            patterns(&["*.toml"]),
            broadcaster,
            watched(&Arc::new(AtomicBool::new(false))),
        ));

        let start = Instant::now();
        tx.send(event(EventKind::Create(CreateKind::File), &["/cfg/nas.toml"]))
            .await
            .unwrap();
        tx.send(event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/cfg/nas.toml"],
        ))
        .await
        .unwrap();
        tx.send(event(EventKind::Create(CreateKind::File), &["/cfg/notes.txt"]))
            .await
            .unwrap();

        let update = updates.recv().await.unwrap();
        assert_eq!(update, ReloadEvent::update("nas.toml"));
        assert!(start.elapsed() >= Duration::from_millis(100));

        // Nothing else was pending
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(updates.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_events_drops_add_then_remove() {
        let (tx, rx) = mpsc::channel(16);
        let (broadcaster, mut updates) = broadcast::channel(16);
        tokio::spawn(process_events(
            rx,
            EventDebouncer::new(Duration::from_millis(100)),
            patterns(&["*.toml"]),
            broadcaster,
            watched(&Arc::new(AtomicBool::new(false))),
        ));

        tx.send(event(EventKind::Create(CreateKind::File), &["/cfg/tmp.toml"]))
            .await
            .unwrap();
        tx.send(event(EventKind::Remove(RemoveKind::File), &["/cfg/tmp.toml"]))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(updates.try_recv().is_err());
    }
}
