// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::errors::Result;

/// What happened to a path.
///
/// Informational only: reload routing depends solely on the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Write,
    Remove,
    Rename,
    Other,
}

/// A single filesystem change, as delivered to listeners.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Path relative to the watched root, with forward slashes.
    pub path: String,
    pub kind: ChangeKind,
}

pub type ChangeListener = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// Subscribes once to filesystem notifications for a root directory and
/// republishes them to registered listeners.
///
/// The root is watched recursively; glob patterns are evaluated against
/// root-relative paths. Every event is delivered to every listener as an
/// independent fire-and-forget task, so a slow listener cannot block the
/// dispatch loop or other listeners. Fan-out is unbounded and there is no
/// backpressure: a listener that never returns leaks one task per event.
pub struct ChangeSource {
    root: PathBuf,
    listeners: Arc<RwLock<Vec<ChangeListener>>>,
    state: Mutex<Option<WatchState>>,
}

struct WatchState {
    // Kept alive for as long as the watch runs; dropping it closes the
    // underlying OS watch and ends the dispatch loop.
    _watcher: RecommendedWatcher,
    dispatch: JoinHandle<()>,
}

impl ChangeSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            listeners: Arc::new(RwLock::new(Vec::new())),
            state: Mutex::new(None),
        }
    }

    /// Append a listener. Safe to call before or after [`ChangeSource::start`].
    pub fn register_listener(&self, listener: impl Fn(ChangeEvent) + Send + Sync + 'static) {
        let mut listeners = match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.push(Arc::new(listener));
    }

    /// Open the OS watch on the root and launch the dispatch loop.
    ///
    /// Idempotent: a second call while already started is a no-op success.
    /// Errors reported by the watch mechanism after startup are logged and
    /// do not terminate the loop.
    pub fn start(&self) -> Result<()> {
        let mut state = self.lock_state();
        if state.is_some() {
            return Ok(());
        }

        let root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());

        // Channel from the synchronous notify callback into the async world.
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(err) => {
                    // No tracing subscriber guarantees inside the notify
                    // callback thread; fall back to stderr.
                    eprintln!("procwatch: file watch error: {err}");
                }
            },
            Config::default(),
        )?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        info!(root = ?root, "file watcher started");

        let listeners = Arc::clone(&self.listeners);
        let dispatch = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let Some(kind) = convert_kind(&event.kind) else {
                    continue;
                };

                for path in &event.paths {
                    let Some(rel) = relative_str(&root, path) else {
                        trace!(path = ?path, "event outside watch root; ignoring");
                        continue;
                    };

                    let change = ChangeEvent { path: rel, kind };
                    trace!(path = %change.path, kind = ?change.kind, "change detected");

                    let snapshot: Vec<ChangeListener> = match listeners.read() {
                        Ok(guard) => guard.clone(),
                        Err(poisoned) => poisoned.into_inner().clone(),
                    };

                    for listener in snapshot {
                        let change = change.clone();
                        tokio::spawn(async move { listener(change) });
                    }
                }
            }

            debug!("file watcher dispatch loop ended");
        });

        *state = Some(WatchState {
            _watcher: watcher,
            dispatch,
        });

        Ok(())
    }

    /// Close the OS watch and terminate the dispatch loop.
    ///
    /// In-flight listener invocations are not awaited.
    pub fn stop(&self) -> Result<()> {
        if let Some(state) = self.lock_state().take() {
            state.dispatch.abort();
            debug!("file watcher stopped");
        }
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, Option<WatchState>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Map a raw notify event kind onto the wire-level [`ChangeKind`].
///
/// Access events (reads) are dropped: they can never justify a reload.
fn convert_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Access(_) => None,
        EventKind::Create(_) => Some(ChangeKind::Create),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Rename),
        EventKind::Modify(_) => Some(ChangeKind::Write),
        EventKind::Remove(_) => Some(ChangeKind::Remove),
        _ => Some(ChangeKind::Other),
    }
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if the path is not under `root`.
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}
