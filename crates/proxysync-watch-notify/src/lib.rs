// # Notify Change Source
//
// ChangeSource backed by the `notify` crate's recommended OS watcher.
//
// Modify and create events are forwarded for every path they name; removal
// and access events are dropped. Filtering by file name and debouncing are
// left to the consumer (`ChangeWatchDebouncer`).
//
// ## Lifecycle
//
// The watcher runs on notify's own thread for as long as the source lives.
// Dropping the source stops it, which ends the stream returned by `watch()`.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use proxysync_core::traits::ChangeSource;
use proxysync_core::{Error, FileChangeEvent, Result};
use std::path::Path;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Poll interval for the polling fallback backend
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// File-change source watching one or more directories
pub struct NotifyChangeSource {
    watcher: RecommendedWatcher,
    rx: Mutex<Option<mpsc::UnboundedReceiver<FileChangeEvent>>>,
}

impl std::fmt::Debug for NotifyChangeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyChangeSource").finish_non_exhaustive()
    }
}

impl NotifyChangeSource {
    /// Create a source watching nothing yet
    pub fn new() -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        return;
                    }
                    for path in event.paths {
                        let is_directory = path.is_dir();
                        tracing::trace!(path = %path.display(), "File change");
                        // Receiver gone means nobody is listening any more
                        let _ = tx.send(FileChangeEvent { path, is_directory });
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(POLL_INTERVAL),
        )
        .map_err(|e| Error::Other(format!("failed to create file watcher: {}", e)))?;

        Ok(Self {
            watcher,
            rx: Mutex::new(Some(rx)),
        })
    }

    /// Start watching a directory
    ///
    /// A directory that does not exist is skipped with a warning, so a
    /// missing proxy data volume does not keep the daemon from starting.
    pub fn watch_dir(&mut self, dir: &Path, recursive: bool) -> Result<bool> {
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "Directory not found, not watching it");
            return Ok(false);
        }

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        self.watcher
            .watch(dir, mode)
            .map_err(|e| Error::Other(format!("failed to watch {}: {}", dir.display(), e)))?;

        tracing::info!(dir = %dir.display(), recursive, "Watching for changes");
        Ok(true)
    }
}

impl ChangeSource for NotifyChangeSource {
    fn watch(&self) -> Pin<Box<dyn Stream<Item = FileChangeEvent> + Send + 'static>> {
        let rx = self.rx.lock().ok().and_then(|mut guard| guard.take());

        match rx {
            Some(rx) => Box::pin(UnboundedReceiverStream::new(rx)),
            None => {
                tracing::warn!("watch() called more than once; returning an empty stream");
                Box::pin(tokio_stream::empty())
            }
        }
    }
}
