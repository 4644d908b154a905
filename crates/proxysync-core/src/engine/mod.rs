//! Reconciliation engine
//!
//! The [`Reconciler`] runs one pass at a time:
//!
//! ```text
//! Idle -> Resolving -> Scanning -> Diffing -> Mutating -> Restarting -> Idle
//! ```
//!
//! 1. **Resolving**: every monitored hostname is looked up; failures keep
//!    their last known IP and sit out this pass
//! 2. **Scanning**: proxy config files are read fresh, `server_name`
//!    hostnames feed auto-discovery (new hostnames are resolved right away),
//!    public IP literals are collected
//! 3. **Diffing**: literals that are a hostname's previous address (or,
//!    under the heuristic policy, public and matching nothing resolved)
//!    become [`Mismatch`]es, deduplicated by (file, stale IP)
//! 4. **Mutating**: each mismatch is fixed, then every hostname whose
//!    address changed has its old address rewritten in every file
//! 5. **Restarting**: at most one restart per pass that changed a file
//!
//! ## Serialization
//!
//! The registry lock is held for the whole pass, so passes never overlap no
//! matter how many triggers fire. It is not a lock on the files: another
//! process may edit them mid-pass, which the mutator detects by re-reading
//! right before each write.

mod scheduler;

pub use scheduler::Scheduler;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use crate::config::{DomainConfig, DriftPolicy, SyncConfig};
use crate::error::{Error, Result};
use crate::mutator::{FileMutator, MutationOutcome};
use crate::registry::{DomainOrigin, DomainRecord, DomainRegistry, normalize_hostname};
use crate::scanner::{self, ConfigFile, ConfigScanner, ScanReport};
use crate::state::MemoryStateStore;
use crate::traits::{ConfigMutator, Notifier, Resolver, RestartTrigger, StateStore};

/// Why a pass was requested outside the periodic schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassRequest {
    /// A proxy config file changed
    FileChanged,
    /// The static configuration file changed
    ConfigChanged,
}

impl PassRequest {
    /// Combine two pending requests; a config change subsumes a file change
    pub fn merge(self, other: PassRequest) -> PassRequest {
        if self == PassRequest::ConfigChanged || other == PassRequest::ConfigChanged {
            PassRequest::ConfigChanged
        } else {
            PassRequest::FileChanged
        }
    }
}

/// A proposed correction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// File containing the stale literal
    pub file: PathBuf,
    /// Literal found in the file
    pub stale_ip: Ipv4Addr,
    /// Address it should be
    pub correct_ip: Ipv4Addr,
    /// Hostname the correction is attributed to
    pub hostname: String,
}

/// A hostname whose resolution moved since the previous pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpChange {
    /// Hostname
    pub hostname: String,
    /// Previously recorded address
    pub old_ip: Ipv4Addr,
    /// Freshly resolved address
    pub new_ip: Ipv4Addr,
}

/// Outcome of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    /// Pass number since the reconciler was created
    pub pass: u64,
    /// Distinct files rewritten
    pub mutated_files: usize,
    /// Whether a restart was warranted
    pub restart_needed: bool,
    /// Whether the restart action ran and succeeded
    pub restarted: bool,
    /// Corrections found by drift detection
    pub mismatches: Vec<Mismatch>,
    /// Address changes found by resolution
    pub ip_changes: Vec<IpChange>,
    /// Hostnames added by auto-discovery
    pub discovered: Vec<String>,
    /// Hostnames that failed to resolve
    pub unresolved: Vec<String>,
    /// Rewrites that failed
    pub failed_mutations: usize,
}

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Pass started
    PassStarted { pass: u64 },

    /// Hostname skipped for this pass
    ResolutionFailed { hostname: String, error: String },

    /// Hostname added from a `server_name` directive
    DomainDiscovered { hostname: String },

    /// Hostname no longer monitored
    DomainRemoved { hostname: String },

    /// Resolution moved since the previous pass
    IpChanged {
        hostname: String,
        old_ip: Ipv4Addr,
        new_ip: Ipv4Addr,
    },

    /// Stale literal found
    MismatchDetected(Mismatch),

    /// File rewritten
    FileUpdated {
        file: PathBuf,
        old_ip: Ipv4Addr,
        new_ip: Ipv4Addr,
    },

    /// File could not be rewritten
    MutationFailed {
        file: PathBuf,
        old_ip: Ipv4Addr,
        error: String,
    },

    /// Restart action succeeded
    RestartTriggered { target: String },

    /// Restart action failed
    RestartFailed { error: String },

    /// Pass finished
    PassCompleted { pass: u64, mutated_files: usize },

    /// Pass aborted before mutating anything
    PassAborted { pass: u64, error: String },
}

/// Reconciler tunables
#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    /// Stale-literal detection policy
    pub drift_policy: DriftPolicy,
    /// Whether to invoke the restart trigger after rewrites
    pub restart_enabled: bool,
    /// Upper bound on the restart action
    pub restart_timeout: Duration,
    /// Capacity of the event channel
    pub event_channel_capacity: usize,
}

impl ReconcilerOptions {
    /// Derive options from the static configuration
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            drift_policy: config.engine.drift_policy,
            restart_enabled: config.restart_nginx,
            restart_timeout: Duration::from_secs(config.engine.restart_timeout_secs),
            event_channel_capacity: config.engine.event_channel_capacity,
        }
    }
}

/// What one pass needs from a scanned file
struct ScannedFile<'a> {
    file: &'a ConfigFile,
    public_ips: BTreeSet<Ipv4Addr>,
    /// Normalized `server_name` hostnames declared in the file
    hostnames: BTreeSet<String>,
}

/// Per-pass bookkeeping for the mutation phase
#[derive(Default)]
struct MutationLedger {
    /// (file, stale IP) pairs already attempted
    attempted: HashSet<(PathBuf, Ipv4Addr)>,
    /// Files verified rewritten
    changed_files: BTreeSet<PathBuf>,
    /// Hostnames whose own old address could not be rewritten somewhere
    blocked: BTreeSet<String>,
    failures: usize,
}

/// Core reconciliation engine
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`], optionally swap seams with `with_*`
/// 2. Optionally [`Reconciler::restore_state()`] from the state store
/// 3. Share behind an `Arc` and call [`Reconciler::reconcile()`] from any trigger
pub struct Reconciler {
    resolver: Box<dyn Resolver>,
    scanner: ConfigScanner,
    mutator: Box<dyn ConfigMutator>,
    restart: Option<Box<dyn RestartTrigger>>,
    state_store: Box<dyn StateStore>,
    notifier: Option<Box<dyn Notifier>>,

    /// Monitored hostnames; the lock serializes passes
    registry: Mutex<DomainRegistry>,

    options: ReconcilerOptions,
    passes: AtomicU64,
    event_tx: mpsc::Sender<SyncEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// The registry is seeded with the configuration's explicit domains.
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields sync events
    pub fn new(
        resolver: Box<dyn Resolver>,
        config: &SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let options = ReconcilerOptions::from_config(config);
        let (tx, rx) = mpsc::channel(options.event_channel_capacity);

        let mut registry = DomainRegistry::new();
        for domain in &config.domains {
            registry.upsert(&domain.hostname, DomainOrigin::Explicit, domain.description.clone());
        }

        let reconciler = Self {
            resolver,
            scanner: ConfigScanner::new(
                config.engine.proxy_config_dir.clone(),
                config.engine.extension(),
            ),
            mutator: Box::new(FileMutator::new()),
            restart: None,
            state_store: Box::new(MemoryStateStore::new()),
            notifier: None,
            registry: Mutex::new(registry),
            options,
            passes: AtomicU64::new(0),
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Replace the config mutator
    pub fn with_mutator(mut self, mutator: Box<dyn ConfigMutator>) -> Self {
        self.mutator = mutator;
        self
    }

    /// Set the restart action
    pub fn with_restart_trigger(mut self, trigger: Box<dyn RestartTrigger>) -> Self {
        self.restart = Some(trigger);
        self
    }

    /// Replace the state store
    pub fn with_state_store(mut self, store: Box<dyn StateStore>) -> Self {
        self.state_store = store;
        self
    }

    /// Set the pass notifier
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Scanner over the monitored directory
    pub fn scanner(&self) -> &ConfigScanner {
        &self.scanner
    }

    /// Number of passes started so far
    pub fn pass_count(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    /// Consistent copy of the registry
    ///
    /// Waits for a running pass to finish.
    pub async fn snapshot(&self) -> Vec<DomainRecord> {
        self.registry.lock().await.snapshot()
    }

    /// Seed last known IPs from the state store
    ///
    /// Stored hostnames missing from the registry come back as
    /// auto-discovered; the next scan prunes them if no file mentions them.
    pub async fn restore_state(&self) -> Result<usize> {
        let records = self.state_store.list_records().await?;
        let mut registry = self.registry.lock().await;

        for (hostname, record) in &records {
            if !registry.contains(hostname) {
                registry.upsert(
                    hostname,
                    DomainOrigin::AutoDiscovered,
                    format!("Restored from state: {}", hostname),
                );
            }
            registry.set_last_known_ip(hostname, record.last_ip);
        }

        info!("Restored last known IPs for {} hostnames", records.len());
        Ok(records.len())
    }

    /// Flush pending state to durable storage
    pub async fn flush_state(&self) -> Result<()> {
        self.state_store.flush().await
    }

    /// Apply a reloaded static domain list
    ///
    /// Explicit hostnames are upserted, explicit hostnames no longer listed
    /// are removed. Auto-discovered hostnames are left to the next scan.
    ///
    /// # Returns
    ///
    /// (added, removed) hostnames
    pub async fn sync_domains(&self, domains: &[DomainConfig]) -> (Vec<String>, Vec<String>) {
        let mut registry = self.registry.lock().await;

        let wanted: BTreeSet<String> = domains
            .iter()
            .map(|d| normalize_hostname(&d.hostname))
            .collect();

        let mut added = Vec::new();
        for domain in domains {
            if registry.upsert(&domain.hostname, DomainOrigin::Explicit, domain.description.clone())
            {
                added.push(normalize_hostname(&domain.hostname));
            }
        }

        let mut removed = Vec::new();
        for hostname in registry.hostnames_with_origin(DomainOrigin::Explicit) {
            if !wanted.contains(&hostname) {
                registry.remove(&hostname);
                self.forget(&hostname).await;
                removed.push(hostname);
            }
        }

        if !added.is_empty() {
            info!("New domains detected: {}", added.join(", "));
        }
        if !removed.is_empty() {
            info!("Domains removed: {}", removed.join(", "));
        }
        if added.is_empty() && removed.is_empty() {
            info!("Configuration reloaded (no domain changes)");
        }

        (added, removed)
    }

    /// Run one reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(result)`: pass completed; per-hostname and per-file failures are
    ///   counted in the result, not returned
    /// - `Err(Error::Scan)`: the monitored directory could not be listed;
    ///   nothing was mutated, retry on the next trigger
    pub async fn reconcile(&self) -> Result<ReconciliationResult> {
        let mut registry = self.registry.lock().await;
        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;

        self.emit_event(SyncEvent::PassStarted { pass });
        debug!(pass, "Starting reconciliation pass");

        match self.run_pass(pass, &mut registry).await {
            Ok(result) => {
                self.emit_event(SyncEvent::PassCompleted {
                    pass,
                    mutated_files: result.mutated_files,
                });
                Ok(result)
            }
            Err(e) => {
                error!(pass, "Reconciliation pass aborted: {}", e);
                if let Some(hint) = e.remediation() {
                    error!("{}", hint);
                }
                self.emit_event(SyncEvent::PassAborted {
                    pass,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_pass(
        &self,
        pass: u64,
        registry: &mut DomainRegistry,
    ) -> Result<ReconciliationResult> {
        let mut result = ReconciliationResult {
            pass,
            ..Default::default()
        };

        // Resolving
        let previous: BTreeMap<String, Option<Ipv4Addr>> = registry
            .snapshot()
            .into_iter()
            .map(|record| (record.hostname, record.last_known_ip))
            .collect();

        let mut current_dns: BTreeMap<String, Ipv4Addr> = BTreeMap::new();
        self.resolve_all(previous.keys(), &mut current_dns, &mut result).await;

        // Scanning
        let ScanReport { files, unreadable } = self.scanner.scan().await?;
        let scanned: Vec<ScannedFile<'_>> = files
            .iter()
            .map(|file| ScannedFile {
                file,
                public_ips: ConfigScanner::extract_public_ips(file),
                hostnames: ConfigScanner::extract_hostnames(file)
                    .iter()
                    .map(|hostname| normalize_hostname(hostname))
                    .collect(),
            })
            .collect();
        self.discover(&scanned, registry, &mut result).await;

        // Newly discovered hostnames take part in this pass's diff
        let discovered = result.discovered.clone();
        self.resolve_all(discovered.iter(), &mut current_dns, &mut result).await;

        // Diffing
        result.mismatches =
            self.find_mismatches(&scanned, &previous, &current_dns, &result.unresolved);

        // Mutating: drift corrections first, then every file for each changed hostname
        let mut ledger = MutationLedger::default();
        for mismatch in &result.mismatches {
            let own_address = previous.get(&mismatch.hostname).copied().flatten()
                == Some(mismatch.stale_ip);
            self.mutate(
                &mut ledger,
                &mismatch.file,
                mismatch.stale_ip,
                mismatch.correct_ip,
                own_address.then_some(mismatch.hostname.as_str()),
            )
            .await;
        }

        for (hostname, &new_ip) in &current_dns {
            let Some(Some(old_ip)) = previous.get(hostname).copied() else {
                info!(hostname = %hostname, %new_ip, "Initial IP");
                continue;
            };
            if old_ip == new_ip {
                continue;
            }

            info!(hostname = %hostname, %old_ip, %new_ip, "IP change detected");
            self.emit_event(SyncEvent::IpChanged {
                hostname: hostname.clone(),
                old_ip,
                new_ip,
            });
            result.ip_changes.push(IpChange {
                hostname: hostname.clone(),
                old_ip,
                new_ip,
            });

            if !scanner::is_public(old_ip) {
                debug!(hostname = %hostname, %old_ip, "Previous IP is private, not rewritten");
                continue;
            }
            // Unreadable files may hold the old address; trying them again
            // either fixes them or blocks the hostname
            let paths = files.iter().map(|file| &file.path).chain(unreadable.iter());
            for path in paths {
                self.mutate(&mut ledger, path, old_ip, new_ip, Some(hostname.as_str()))
                    .await;
            }
        }

        // Record new addresses, except where the old one is still on disk
        for (hostname, &ip) in &current_dns {
            if previous.get(hostname).copied().flatten() == Some(ip) {
                continue;
            }
            if !registry.contains(hostname) {
                debug!(hostname = %hostname, "No longer monitored, not recorded");
                continue;
            }
            if ledger.blocked.contains(hostname) {
                warn!(
                    hostname = %hostname,
                    %ip,
                    "Keeping previous IP until every config file has been rewritten"
                );
                continue;
            }
            registry.set_last_known_ip(hostname, ip);
            if let Err(e) = self.state_store.set_last_ip(hostname, ip).await {
                warn!(hostname = %hostname, "Failed to persist last known IP: {}", e);
            }
        }

        result.mutated_files = ledger.changed_files.len();
        result.failed_mutations = ledger.failures;
        result.restart_needed = result.mutated_files > 0;

        // Restarting
        if result.restart_needed {
            info!(
                "Updated {} configuration files, {} failed",
                result.mutated_files, result.failed_mutations
            );
            result.restarted = self.restart_proxy().await;
            self.send_notification(&result).await;
        } else if result.mismatches.is_empty() && result.ip_changes.is_empty() {
            info!("All configuration files are synchronized with DNS resolution");
        } else if result.failed_mutations == 0 {
            info!("IP changes detected but no configuration files needed updating");
        }

        Ok(result)
    }

    /// Resolve `hostnames`, recording answers in `current_dns` and failures in `result`
    async fn resolve_all<'a>(
        &self,
        hostnames: impl Iterator<Item = &'a String>,
        current_dns: &mut BTreeMap<String, Ipv4Addr>,
        result: &mut ReconciliationResult,
    ) {
        for hostname in hostnames {
            match self.resolver.resolve(hostname).await {
                Ok(ip) => {
                    debug!(hostname = %hostname, %ip, "DNS resolution");
                    current_dns.insert(hostname.clone(), ip);
                }
                Err(e) => {
                    warn!(hostname = %hostname, "{}; keeping last known IP", e);
                    self.emit_event(SyncEvent::ResolutionFailed {
                        hostname: hostname.clone(),
                        error: e.to_string(),
                    });
                    result.unresolved.push(hostname.clone());
                }
            }
        }
    }

    /// Register hostnames found in config text; drop discovered ones that vanished
    async fn discover(
        &self,
        scanned: &[ScannedFile<'_>],
        registry: &mut DomainRegistry,
        result: &mut ReconciliationResult,
    ) {
        let found: BTreeSet<String> = scanned
            .iter()
            .flat_map(|file| file.hostnames.iter().cloned())
            .collect();

        for hostname in &found {
            let description = format!("Auto-discovered from proxy config: {}", hostname);
            if registry.upsert(hostname, DomainOrigin::AutoDiscovered, description) {
                info!(hostname = %hostname, "Auto-discovered domain added to monitoring");
                self.emit_event(SyncEvent::DomainDiscovered {
                    hostname: hostname.clone(),
                });
                result.discovered.push(hostname.clone());
            }
        }

        for hostname in registry.hostnames_with_origin(DomainOrigin::AutoDiscovered) {
            if !found.contains(&hostname) {
                info!(hostname = %hostname, "Auto-discovered domain no longer referenced");
                registry.remove(&hostname);
                self.forget(&hostname).await;
            }
        }
    }

    /// Compute deduplicated mismatches
    ///
    /// A literal is first matched against each hostname's own previous
    /// address. Only if none claims it does the heuristic policy treat a
    /// public literal that matches no resolved address as stale. It is then
    /// attributed to a hostname the file declares, or to the first hostname
    /// when the file declares none.
    ///
    /// The heuristic never touches files declaring a hostname that failed
    /// to resolve, nor previous addresses of such hostnames anywhere.
    fn find_mismatches(
        &self,
        scanned: &[ScannedFile<'_>],
        previous: &BTreeMap<String, Option<Ipv4Addr>>,
        current_dns: &BTreeMap<String, Ipv4Addr>,
        unresolved: &[String],
    ) -> Vec<Mismatch> {
        let resolved: BTreeSet<Ipv4Addr> = current_dns.values().copied().collect();
        let protected: BTreeSet<Ipv4Addr> = unresolved
            .iter()
            .filter_map(|hostname| previous.get(hostname).copied().flatten())
            .collect();

        let mut seen = HashSet::new();
        let mut mismatches = Vec::new();

        for ScannedFile {
            file,
            public_ips,
            hostnames,
        } in scanned
        {
            let heuristic = self.options.drift_policy == DriftPolicy::Heuristic
                && hostnames.iter().all(|h| current_dns.contains_key(h));

            for &literal in public_ips {
                let tracked = current_dns.iter().find(|&(hostname, &dns_ip)| {
                    literal != dns_ip && previous.get(hostname).copied().flatten() == Some(literal)
                });

                let candidate = tracked.or_else(|| {
                    if !heuristic || resolved.contains(&literal) || protected.contains(&literal) {
                        return None;
                    }
                    current_dns.iter().find(|&(hostname, &dns_ip)| {
                        literal != dns_ip && (hostnames.is_empty() || hostnames.contains(hostname))
                    })
                });

                let Some((hostname, &correct_ip)) = candidate else {
                    continue;
                };
                if !seen.insert((file.path.clone(), literal)) {
                    continue;
                }

                warn!(
                    file = %file.name(),
                    found = %literal,
                    hostname = %hostname,
                    resolves_to = %correct_ip,
                    "Mismatch"
                );
                let mismatch = Mismatch {
                    file: file.path.clone(),
                    stale_ip: literal,
                    correct_ip,
                    hostname: hostname.clone(),
                };
                self.emit_event(SyncEvent::MismatchDetected(mismatch.clone()));
                mismatches.push(mismatch);
            }
        }

        mismatches
    }

    /// Apply one (file, old, new) rewrite at most once per pass
    ///
    /// `owner` names the hostname whose own previous address is being
    /// replaced; a failure blocks that hostname's last known IP from moving.
    async fn mutate(
        &self,
        ledger: &mut MutationLedger,
        file: &PathBuf,
        old_ip: Ipv4Addr,
        new_ip: Ipv4Addr,
        owner: Option<&str>,
    ) {
        if !ledger.attempted.insert((file.clone(), old_ip)) {
            return;
        }

        match self.mutator.apply_replacement(file, old_ip, new_ip).await {
            Ok(MutationOutcome::Changed { .. }) => {
                ledger.changed_files.insert(file.clone());
                self.emit_event(SyncEvent::FileUpdated {
                    file: file.clone(),
                    old_ip,
                    new_ip,
                });
            }
            Ok(MutationOutcome::Unchanged) => {}
            Err(e) => {
                error!(file = %file.display(), %old_ip, %new_ip, "{}", e);
                if let Some(hint) = e.remediation() {
                    error!("SOLUTION: {}", hint);
                }
                ledger.failures += 1;
                if let Some(hostname) = owner {
                    ledger.blocked.insert(hostname.to_string());
                }
                self.emit_event(SyncEvent::MutationFailed {
                    file: file.clone(),
                    old_ip,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Invoke the restart action if enabled; returns whether it succeeded
    async fn restart_proxy(&self) -> bool {
        if !self.options.restart_enabled {
            info!("Automatic restart disabled; the proxy picks up changes on its next reload");
            return false;
        }
        let Some(trigger) = &self.restart else {
            warn!("No restart action configured; restart the proxy manually");
            return false;
        };

        info!(target = trigger.target(), "Restarting proxy to apply updated configuration");
        let outcome = tokio::time::timeout(self.options.restart_timeout, trigger.restart())
            .await
            .unwrap_or_else(|_| {
                Err(Error::restart(format!(
                    "timed out after {:?}",
                    self.options.restart_timeout
                )))
            });

        match outcome {
            Ok(()) => {
                info!(target = trigger.target(), "Proxy restarted, new configuration applied");
                self.emit_event(SyncEvent::RestartTriggered {
                    target: trigger.target().to_string(),
                });
                true
            }
            Err(e) => {
                warn!(
                    target = trigger.target(),
                    "{}. Configuration is already updated; manual restart may be required",
                    e
                );
                self.emit_event(SyncEvent::RestartFailed {
                    error: e.to_string(),
                });
                false
            }
        }
    }

    async fn send_notification(&self, result: &ReconciliationResult) {
        if let Some(notifier) = &self.notifier
            && let Err(e) = notifier.notify(result).await
        {
            warn!("Failed to send notification: {}", e);
        }
    }

    async fn forget(&self, hostname: &str) {
        if let Err(e) = self.state_store.delete_record(hostname).await {
            warn!(hostname, "Failed to remove state record: {}", e);
        }
        self.emit_event(SyncEvent::DomainRemoved {
            hostname: hostname.to_string(),
        });
    }

    /// Emit a sync event
    ///
    /// A full channel drops the event with a warning; a closed one (nobody
    /// listening) drops it silently.
    fn emit_event(&self, event: SyncEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!(
                "Event channel full, dropping event. Consider increasing event_channel_capacity."
            );
        }
    }
}
