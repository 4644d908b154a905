//! Test doubles and common utilities for reconciliation contract tests
//!
//! Doubles share their counters through `Arc`s, so a clone can be handed to
//! the reconciler while the test keeps another to steer and inspect it.

#![allow(dead_code)]

use proxysync_core::error::{Error, Result};
use proxysync_core::traits::{ConfigMutator, Notifier, Resolver, RestartTrigger};
use proxysync_core::{
    DomainConfig, FileMutator, MutationOutcome, ReconciliationResult, Reconciler, SyncConfig,
    SyncEvent,
};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Parse an IPv4 literal
pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().expect("valid IPv4 literal")
}

/// A resolver answering from a mutable table
///
/// Hostnames missing from the table fail to resolve.
#[derive(Clone, Default)]
pub struct MockResolver {
    answers: Arc<Mutex<HashMap<String, Ipv4Addr>>>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that sleeps before answering
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Make `hostname` resolve to `addr`
    pub fn set(&self, hostname: &str, addr: &str) {
        self.answers
            .lock()
            .unwrap()
            .insert(hostname.to_string(), ip(addr));
    }

    /// Make `hostname` fail to resolve
    pub fn fail(&self, hostname: &str) {
        self.answers.lock().unwrap().remove(hostname);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent lookups observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Resolver for MockResolver {
    async fn resolve(&self, hostname: &str) -> Result<Ipv4Addr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let answer = self.answers.lock().unwrap().get(hostname).copied();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        answer.ok_or_else(|| Error::resolution(hostname, "NXDOMAIN"))
    }
}

/// A restart trigger that counts invocations
#[derive(Clone, Default)]
pub struct CountingRestartTrigger {
    count: Arc<AtomicUsize>,
    fail: bool,
}

impl CountingRestartTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger whose every invocation fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RestartTrigger for CountingRestartTrigger {
    async fn restart(&self) -> Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::restart("container not found"));
        }
        Ok(())
    }

    fn target(&self) -> &str {
        "test-proxy"
    }
}

/// A mutator that denies writes to chosen files and delegates the rest
#[derive(Clone, Default)]
pub struct DenyingMutator {
    denied: Arc<Mutex<HashSet<PathBuf>>>,
}

impl DenyingMutator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(&self, path: &Path) {
        self.denied.lock().unwrap().insert(path.to_path_buf());
    }

    pub fn allow(&self, path: &Path) {
        self.denied.lock().unwrap().remove(path);
    }
}

#[async_trait::async_trait]
impl ConfigMutator for DenyingMutator {
    async fn apply_replacement(
        &self,
        path: &Path,
        old_ip: Ipv4Addr,
        new_ip: Ipv4Addr,
    ) -> Result<MutationOutcome> {
        if self.denied.lock().unwrap().contains(path) {
            let io = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
            return Err(Error::mutation(path, &io));
        }
        FileMutator::new().apply_replacement(path, old_ip, new_ip).await
    }
}

/// A notifier that records every delivered result
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    results: Arc<Mutex<Vec<ReconciliationResult>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<ReconciliationResult> {
        self.results.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, result: &ReconciliationResult) -> Result<()> {
        self.results.lock().unwrap().push(result.clone());
        Ok(())
    }
}

/// A temporary proxy config directory
pub struct ProxyDir {
    dir: TempDir,
}

impl ProxyDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.file(name);
        std::fs::write(&path, content).expect("write config file");
        path
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.file(name)).expect("read config file")
    }
}

/// Configuration pointing at `dir` with the given explicit domains
pub fn config_for(dir: &Path, domains: &[&str]) -> SyncConfig {
    let mut config = SyncConfig::new();
    config.domains = domains
        .iter()
        .map(|hostname| DomainConfig::new(*hostname, "test"))
        .collect();
    config.engine.proxy_config_dir = dir.to_path_buf();
    config
}

/// Reconciler wired with a counting restart trigger
pub fn reconciler(
    resolver: &MockResolver,
    config: &SyncConfig,
    restart: &CountingRestartTrigger,
) -> (Reconciler, mpsc::Receiver<SyncEvent>) {
    let (reconciler, events) =
        Reconciler::new(Box::new(resolver.clone()), config).expect("reconciler construction");
    (
        reconciler.with_restart_trigger(Box::new(restart.clone())),
        events,
    )
}

/// Drain every event currently queued
pub fn drain(events: &mut mpsc::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
