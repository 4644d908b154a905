//! File-change debouncing
//!
//! Saving a proxy host in the UI rewrites its config file several times in
//! quick succession. The [`ChangeWatchDebouncer`] turns such a burst into a
//! single [`PassRequest`], issued one window after the first accepted event.
//!
//! An event is relevant if it names a file (not a directory) that is either
//! the static configuration file or a file the [`ConfigScanner`] would read. A relevant event arriving less than one window after
//! the last accepted one is ignored.

use std::ffi::OsString;
use std::future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info};

use crate::engine::PassRequest;
use crate::scanner::ConfigScanner;

/// A filesystem change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeEvent {
    /// Path the event refers to
    pub path: PathBuf,
    /// Whether the path is a directory
    pub is_directory: bool,
}

impl FileChangeEvent {
    /// Event for a regular file
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
        }
    }
}

/// Collapses bursts of change events into pass requests
#[derive(Debug)]
pub struct ChangeWatchDebouncer {
    window: Duration,
    config_file_name: OsString,
    scanner: ConfigScanner,
    last_accepted: Option<Instant>,
}

impl ChangeWatchDebouncer {
    /// Create a debouncer
    ///
    /// - `window`: minimum spacing between accepted events
    /// - `config_file_name`: file name of the static configuration (e.g. `dns_config.json`)
    /// - `scanner`: decides which proxy host files are relevant
    pub fn new(
        window: Duration,
        config_file_name: impl Into<OsString>,
        scanner: &ConfigScanner,
    ) -> Self {
        Self {
            window,
            config_file_name: config_file_name.into(),
            scanner: scanner.clone(),
            last_accepted: None,
        }
    }

    /// What kind of pass an event calls for, if any
    pub fn classify(&self, event: &FileChangeEvent) -> Option<PassRequest> {
        if event.is_directory {
            return None;
        }
        if event.path.file_name() == Some(self.config_file_name.as_os_str()) {
            return Some(PassRequest::ConfigChanged);
        }
        if self.scanner.is_config_path(&event.path) {
            return Some(PassRequest::FileChanged);
        }
        None
    }

    /// Accept or ignore an event observed at `now`
    pub fn accept(&mut self, event: &FileChangeEvent, now: Instant) -> Option<PassRequest> {
        let request = self.classify(event)?;

        if let Some(last) = self.last_accepted
            && now.saturating_duration_since(last) < self.window
        {
            debug!(path = %event.path.display(), "Change ignored (debounced)");
            return None;
        }

        self.last_accepted = Some(now);
        info!(path = %event.path.display(), ?request, "Configuration change detected");
        Some(request)
    }

    /// Consume `events` until the stream ends or `shutdown` fires
    ///
    /// Each accepted event schedules a request one window later. Requests
    /// are offered to `requests` without waiting: if a pass is already
    /// pending the new one is coalesced into it.
    pub async fn run(
        mut self,
        mut events: Pin<Box<dyn Stream<Item = FileChangeEvent> + Send + 'static>>,
        requests: mpsc::Sender<PassRequest>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut pending: Option<(Instant, PassRequest)> = None;

        loop {
            let deadline = pending.map(|(at, _)| at);

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = wait_until(deadline) => {
                    if let Some((_, request)) = pending.take() {
                        match requests.try_send(request) {
                            Ok(()) => debug!(?request, "Pass requested"),
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                debug!(?request, "Pass already pending, request coalesced")
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => break,
                        }
                    }
                }

                event = events.next() => match event {
                    Some(event) => {
                        let now = Instant::now();
                        if let Some(request) = self.accept(&event, now) {
                            pending = Some(match pending {
                                Some((at, queued)) => (at, queued.merge(request)),
                                None => (now + self.window, request),
                            });
                        }
                    }
                    None => {
                        debug!("Change source ended");
                        break;
                    }
                }
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => future::pending().await,
    }
}
