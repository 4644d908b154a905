//! Pass scheduling
//!
//! The [`Scheduler`] is the single consumer of pass triggers: a periodic
//! deadline and a channel of [`PassRequest`]s fed by the change watcher.
//! Requested passes do not move the periodic deadline. After a failed
//! scheduled pass the next one waits `error_backoff` instead of the interval.

use std::future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info};

use super::{PassRequest, ReconciliationResult, Reconciler};
use crate::config::ConfigSource;
use crate::error::Result;

/// Drives reconciliation passes
pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    interval: Duration,
    error_backoff: Duration,
    config_source: Option<ConfigSource>,
}

impl Scheduler {
    /// Create a scheduler running a pass every `interval`
    pub fn new(reconciler: Arc<Reconciler>, interval: Duration, error_backoff: Duration) -> Self {
        Self {
            reconciler,
            interval,
            error_backoff,
            config_source: None,
        }
    }

    /// Reload the domain list before every requested pass
    pub fn with_config_source(mut self, source: ConfigSource) -> Self {
        self.config_source = Some(source);
        self
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped)
    ///
    /// The first scheduled pass runs immediately. A pass in progress is
    /// finished before shutdown is honored; state is flushed on exit.
    pub async fn run(
        self,
        requests: mpsc::Receiver<PassRequest>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        info!(
            interval = ?self.interval,
            "Scheduler started"
        );

        let mut requests = Some(requests);
        let mut next_tick = Instant::now();

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received");
                        break;
                    }
                }

                _ = sleep_until(next_tick) => {
                    let delay = match self.reconciler.reconcile().await {
                        Ok(result) => {
                            log_result("Scheduled", &result);
                            self.interval
                        }
                        Err(e) => {
                            error!(
                                "Scheduled pass failed: {}. Retrying in {:?}",
                                e, self.error_backoff
                            );
                            self.error_backoff
                        }
                    };
                    next_tick = Instant::now() + delay;
                }

                request = next_request(&mut requests) => match request {
                    Some(request) => self.handle_request(request).await,
                    None => {
                        debug!("Pass request channel closed; continuing on schedule only");
                        requests = None;
                    }
                }
            }
        }

        self.reconciler.flush_state().await?;
        info!("State flushed, scheduler stopped");
        Ok(())
    }

    async fn handle_request(&self, request: PassRequest) {
        info!(?request, "Pass requested");

        if let Some(source) = &self.config_source {
            let reloaded = source
                .try_load()
                .await
                .and_then(|config| config.validate().map(|()| config));
            match reloaded {
                Ok(config) => {
                    self.reconciler.sync_domains(&config.domains).await;
                }
                Err(e) => error!("Configuration not reloaded, keeping current domains: {}", e),
            }
        }

        match self.reconciler.reconcile().await {
            Ok(result) => log_result("Requested", &result),
            Err(e) => error!("Requested pass failed: {}", e),
        }
    }
}

/// Next request, or never once the channel has closed
async fn next_request(requests: &mut Option<mpsc::Receiver<PassRequest>>) -> Option<PassRequest> {
    match requests {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}

fn log_result(kind: &str, result: &ReconciliationResult) {
    debug!(
        pass = result.pass,
        mutated_files = result.mutated_files,
        mismatches = result.mismatches.len(),
        restarted = result.restarted,
        "{} pass complete",
        kind
    );
}
