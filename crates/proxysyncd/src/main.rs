// # proxysyncd - proxy config sync daemon
//
// Thin integration layer: all reconciliation logic lives in proxysync-core.
//
// The daemon is responsible for:
// 1. Reading the JSON configuration file and environment overrides
// 2. Initializing logging and the runtime
// 3. Wiring the restart action, change watcher, state store and notifier
// 4. Running the scheduler and debouncer until SIGTERM/SIGINT
//
// ## Configuration
//
// The JSON file (`DNS_CONFIG_PATH`, default `/app/config/dns_config.json`)
// is optional; every value can be overridden from the environment:
//
// - `DNS_DOMAINS`: comma-separated hostnames, replaces the file's domain list
// - `DNS_CHECK_INTERVAL`: seconds between scheduled passes
// - `DNS_NGINX_CONFIG_PATH`: proxy host config directory
// - `DNS_RESTART_NGINX`: restart the proxy after rewrites (true/false)
// - `DNS_NGINX_CONTAINER`: container to restart
// - `DNS_BACKUP_CONFIGS`, `DNS_MAX_BACKUPS`: carried, currently unused
// - `DNS_DRIFT_POLICY`: heuristic (default) or tracked_only
// - `DNS_STATE_PATH`: persist last known IPs to this JSON file
// - `DNS_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export DNS_DOMAINS=home.duckdns.org,nas.duckdns.org
// export DNS_NGINX_CONTAINER=npm-app-1
// export DNS_STATE_PATH=/app/config/state.json
//
// proxysyncd
// ```

use anyhow::{Context, Result};
use proxysync_core::{
    ChangeWatchDebouncer, ConfigSource, DriftPolicy, FileStateStore, Reconciler, Scheduler,
    SyncConfig, SystemResolver,
};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Default location of the JSON configuration file
const DEFAULT_CONFIG_PATH: &str = "/app/config/dns_config.json";

/// Upper bound on joining background tasks at shutdown
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(45);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum SyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon configuration: the JSON file plus environment overrides
struct DaemonConfig {
    source: ConfigSource,
    sync: SyncConfig,
    state_path: Option<PathBuf>,
    /// Why the file could not be used, logged once tracing is up
    load_warning: Option<String>,
}

impl DaemonConfig {
    /// Load configuration from the file and environment variables
    fn from_env() -> Result<Self> {
        let config_path = env::var("DNS_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let source = ConfigSource::new(&config_path, env::var("DNS_DOMAINS").ok());

        let (mut sync, load_warning) = match source.try_load_blocking() {
            Ok(config) => (config, None),
            Err(e) => (
                SyncConfig::new(),
                Some(format!("{}. Continuing with an empty domain list.", e)),
            ),
        };

        if let Ok(dir) = env::var("DNS_NGINX_CONFIG_PATH") {
            sync.engine.proxy_config_dir = PathBuf::from(dir);
        }
        if let Some(secs) = parse_env::<u64>("DNS_CHECK_INTERVAL")? {
            sync.check_interval = secs;
        }
        if let Some(restart) = parse_bool_env("DNS_RESTART_NGINX")? {
            sync.restart_nginx = restart;
        }
        if let Ok(container) = env::var("DNS_NGINX_CONTAINER") {
            sync.nginx_container_name = container;
        }
        if let Some(backup) = parse_bool_env("DNS_BACKUP_CONFIGS")? {
            sync.backup_configs = backup;
        }
        if let Some(max) = parse_env::<u32>("DNS_MAX_BACKUPS")? {
            sync.settings.max_backups = max;
        }
        if let Some(policy) = parse_env::<DriftPolicy>("DNS_DRIFT_POLICY")? {
            sync.engine.drift_policy = policy;
        }
        if let Ok(level) = env::var("DNS_LOG_LEVEL") {
            sync.settings.log_level = level;
        }

        Ok(Self {
            source,
            sync,
            state_path: env::var("DNS_STATE_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            load_warning,
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.sync.validate()?;
        log_level(&self.sync.settings.log_level)?;

        if let Some(path) = &self.state_path
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "DNS_STATE_PATH parent directory does not exist: {}. \
                Create it first: mkdir -p {}",
                parent.display(),
                parent.display()
            );
        }

        Ok(())
    }
}

/// Parse an optional environment variable
fn parse_env<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        Err(_) => Ok(None),
    }
}

/// Parse an optional boolean environment variable (true/false, 1/0, yes/no)
fn parse_bool_env(name: &str) -> Result<Option<bool>> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => anyhow::bail!("{} must be true or false. Got: {}", name, raw),
        },
        Err(_) => Ok(None),
    }
}

/// Map a level name to a tracing level
fn log_level(name: &str) -> Result<Level> {
    match name.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" | "critical" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            name
        ),
    }
}

fn main() -> ExitCode {
    // Load configuration from file and environment
    let config = match DaemonConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    // Initialize tracing
    let level = log_level(&config.sync.settings.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    if let Some(warning) = &config.load_warning {
        warn!("{}", warning);
    }

    info!("Starting proxysyncd");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            SyncExitCode::RuntimeError
        } else {
            SyncExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: DaemonConfig) -> Result<()> {
    let sync = &config.sync;

    info!("Monitoring {} domain(s)", sync.domains.len());
    for domain in &sync.domains {
        info!("  - {} ({})", domain.hostname, domain.description);
    }
    info!("Check interval: {}s", sync.check_interval);
    info!("Proxy config directory: {}", sync.engine.proxy_config_dir.display());
    info!("Drift policy: {:?}", sync.engine.drift_policy);
    info!(
        "Auto restart: {}",
        if sync.restart_nginx { "enabled" } else { "disabled" }
    );

    let resolver = SystemResolver::new(Duration::from_secs(sync.engine.resolve_timeout_secs));
    let (mut reconciler, mut events) = Reconciler::new(Box::new(resolver), sync)?;

    #[cfg(feature = "docker")]
    if sync.restart_nginx {
        info!("Restart target: container {}", sync.nginx_container_name);
        reconciler = reconciler.with_restart_trigger(Box::new(
            proxysync_restart_docker::DockerRestart::new(
                sync.nginx_container_name.clone(),
                Duration::from_secs(sync.engine.restart_timeout_secs),
            ),
        ));
    }

    #[cfg(feature = "webhook")]
    if let Some(notifier) =
        proxysync_notify_webhook::WebhookNotifier::from_config(&sync.settings.notification)?
    {
        info!("Webhook notifications enabled");
        reconciler = reconciler.with_notifier(Box::new(notifier));
    }

    if let Some(path) = &config.state_path {
        let store = FileStateStore::new(path)
            .await
            .with_context(|| format!("opening state file {}", path.display()))?;
        info!("Persisting last known IPs to {}", path.display());
        reconciler = reconciler.with_state_store(Box::new(store));
    }

    let reconciler = Arc::new(reconciler);
    if let Err(e) = reconciler.restore_state().await {
        warn!("Could not restore last known IPs: {}", e);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (request_tx, request_rx) = mpsc::channel(1);

    // Change watcher -> debouncer -> pass requests
    //
    // A pass that rewrites files triggers the watcher itself, so every
    // change is followed by one more pass. That pass finds nothing to do.
    #[cfg(feature = "watch")]
    let (_change_source, debounce_task) = {
        use proxysync_core::traits::ChangeSource;

        let mut source = proxysync_watch_notify::NotifyChangeSource::new()?;
        source.watch_dir(reconciler.scanner().dir(), false)?;
        if let Some(dir) = config.source.path().parent() {
            source.watch_dir(dir, false)?;
        }

        let config_file_name = config
            .source
            .path()
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        let debouncer = ChangeWatchDebouncer::new(
            Duration::from_secs(sync.engine.debounce_secs),
            config_file_name,
            reconciler.scanner(),
        );
        let task = tokio::spawn(debouncer.run(source.watch(), request_tx, shutdown_rx.clone()));
        (source, task)
    };

    #[cfg(not(feature = "watch"))]
    {
        warn!("Built without file watching; passes run on schedule only");
        drop(request_tx);
    }

    let scheduler = Scheduler::new(
        Arc::clone(&reconciler),
        sync.check_interval(),
        Duration::from_secs(sync.engine.error_backoff_secs),
    )
    .with_config_source(config.source.clone());
    let scheduler_task = tokio::spawn(scheduler.run(request_rx, shutdown_rx));

    // Sync events are logged for observers that only have the log stream
    let event_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(?event, "Sync event");
        }
    });

    info!("proxysyncd running");

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);
    info!("Shutting down daemon");

    // Receivers may already be gone if a task ended early
    let _ = shutdown_tx.send(true);

    let joined = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        #[cfg(feature = "watch")]
        if let Err(e) = debounce_task.await {
            error!("Debouncer task failed: {}", e);
        }
        scheduler_task.await
    })
    .await;
    event_task.abort();

    match joined {
        Ok(Ok(Ok(()))) => {
            info!("Shutdown complete");
            Ok(())
        }
        Ok(Ok(Err(e))) => Err(e.into()),
        Ok(Err(e)) => Err(anyhow::anyhow!("scheduler task failed: {}", e)),
        Err(_) => Err(anyhow::anyhow!(
            "Shutdown timeout after {:?}",
            SHUTDOWN_TIMEOUT
        )),
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
