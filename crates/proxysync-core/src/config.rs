//! Configuration types for the proxysync system
//!
//! The static configuration is a JSON document (`dns_config.json`):
//!
//! ```json
//! {
//!   "domains": [{ "hostname": "home.duckdns.org", "description": "NAS" }],
//!   "check_interval": 300,
//!   "backup_configs": true,
//!   "restart_nginx": true,
//!   "nginx_container_name": "nginx-proxy",
//!   "settings": {
//!     "log_level": "INFO",
//!     "max_backups": 10,
//!     "notification": { "enabled": false, "webhook_url": "", "email": "" }
//!   }
//! }
//! ```
//!
//! Every field is optional; the `engine` block carries reconciler tunables.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main proxysync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Explicitly monitored hostnames
    #[serde(default)]
    pub domains: Vec<DomainConfig>,

    /// Seconds between scheduled reconciliation passes
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,

    /// Carried for the persistence layer, unused by the reconciler
    #[serde(default = "default_true")]
    pub backup_configs: bool,

    /// Whether to restart the proxy after files are rewritten
    #[serde(default = "default_true")]
    pub restart_nginx: bool,

    /// Container (or service) restarted by the restart action
    #[serde(default = "default_container_name")]
    pub nginx_container_name: String,

    /// Miscellaneous settings
    #[serde(default)]
    pub settings: Settings,

    /// Reconciler tunables
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            domains: Vec::new(),
            check_interval: default_check_interval(),
            backup_configs: true,
            restart_nginx: true,
            nginx_container_name: default_container_name(),
            settings: Settings::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Load configuration from a JSON file, blocking the calling thread
    ///
    /// For startup, before the runtime exists; use [`SyncConfig::load_async`]
    /// from async code.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config_load(path, e.to_string()))?;
        Self::parse(path, &content)
    }

    /// Load configuration from a JSON file
    pub async fn load_async(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::config_load(path, e.to_string()))?;
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        let config: SyncConfig = serde_json::from_str(content)
            .map_err(|e| Error::config_load(path, format!("invalid JSON: {}", e)))?;

        tracing::info!(
            path = %path.display(),
            domains = config.domains.len(),
            "Loaded DNS configuration"
        );
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.check_interval == 0 {
            return Err(Error::config("check_interval must be > 0"));
        }

        for domain in &self.domains {
            validate_hostname(&domain.hostname)?;
        }

        if self.restart_nginx && self.nginx_container_name.trim().is_empty() {
            return Err(Error::config(
                "nginx_container_name cannot be empty when restart_nginx is enabled",
            ));
        }

        self.engine.validate()
    }

    /// Scheduled pass interval
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }

    /// Replace the domain list with hostnames from a comma-separated string
    pub fn with_domain_list(mut self, list: &str) -> Self {
        self.domains = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|hostname| DomainConfig {
                hostname: hostname.to_string(),
                description: format!("Domain configured via environment: {}", hostname),
            })
            .collect();
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the static configuration is (re)loaded from
///
/// A domain list override (from `DNS_DOMAINS`) replaces the file's domains
/// on every load, so a reload never brings back domains the environment
/// has overridden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    path: PathBuf,
    domain_override: Option<String>,
}

impl ConfigSource {
    /// Load from `path`, optionally overriding its domain list
    pub fn new(path: impl Into<PathBuf>, domain_override: Option<String>) -> Self {
        Self {
            path: path.into(),
            domain_override: domain_override.filter(|list| !list.trim().is_empty()),
        }
    }

    /// Configuration file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, failing if the file is missing or corrupt
    ///
    /// With a domain override in place the file is optional.
    pub async fn try_load(&self) -> Result<SyncConfig> {
        self.apply_override(SyncConfig::load_async(&self.path).await)
    }

    /// [`ConfigSource::try_load`] for callers outside the runtime
    pub fn try_load_blocking(&self) -> Result<SyncConfig> {
        self.apply_override(SyncConfig::load(&self.path))
    }

    fn apply_override(&self, loaded: Result<SyncConfig>) -> Result<SyncConfig> {
        match &self.domain_override {
            Some(list) => Ok(loaded.unwrap_or_default().with_domain_list(list)),
            None => loaded,
        }
    }
}

/// A monitored hostname
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// DNS name (e.g., "home.duckdns.org")
    pub hostname: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,
}

impl DomainConfig {
    /// Create a new domain entry
    pub fn new(hostname: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            description: description.into(),
        }
    }
}

/// Miscellaneous settings block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level name
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Carried for the persistence layer, unused by the reconciler
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,

    /// Notification sink
    #[serde(default)]
    pub notification: NotificationConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_backups: default_max_backups(),
            notification: NotificationConfig::default(),
        }
    }
}

/// Notification sub-block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Whether notifications are sent at all
    #[serde(default)]
    pub enabled: bool,

    /// Webhook receiving a JSON summary of passes that rewrote files
    #[serde(default)]
    pub webhook_url: String,

    /// Accepted for compatibility, not delivered
    #[serde(default)]
    pub email: String,
}

/// How aggressively config literals are treated as stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftPolicy {
    /// A literal is stale if it was a monitored hostname's last known address,
    /// or if it is public and matches no currently resolved address
    #[default]
    Heuristic,

    /// A literal is stale only if it was a monitored hostname's last known address
    TrackedOnly,
}

impl std::str::FromStr for DriftPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "heuristic" => Ok(Self::Heuristic),
            "tracked_only" | "tracked-only" => Ok(Self::TrackedOnly),
            other => Err(Error::config(format!(
                "unknown drift policy '{}'. Valid: heuristic, tracked_only",
                other
            ))),
        }
    }
}

/// Reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding the proxy's generated config files
    #[serde(default = "default_proxy_config_dir")]
    pub proxy_config_dir: PathBuf,

    /// Extension (without the dot) of proxy config files
    #[serde(default = "default_config_extension")]
    pub config_extension: String,

    /// Stale-literal detection policy
    #[serde(default)]
    pub drift_policy: DriftPolicy,

    /// Upper bound on a single DNS lookup
    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,

    /// Upper bound on the restart command
    #[serde(default = "default_restart_timeout_secs")]
    pub restart_timeout_secs: u64,

    /// Minimum spacing between accepted file-change notifications
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,

    /// Delay before the next scheduled pass after a failed one
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// Capacity of the internal event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<()> {
        if self.config_extension.trim_start_matches('.').is_empty() {
            return Err(Error::config("config_extension cannot be empty"));
        }
        if self.resolve_timeout_secs == 0 {
            return Err(Error::config("resolve_timeout_secs must be > 0"));
        }
        if self.restart_timeout_secs == 0 {
            return Err(Error::config("restart_timeout_secs must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("event_channel_capacity must be > 0"));
        }
        Ok(())
    }

    /// Extension without a leading dot
    pub fn extension(&self) -> &str {
        self.config_extension.trim_start_matches('.')
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proxy_config_dir: default_proxy_config_dir(),
            config_extension: default_config_extension(),
            drift_policy: DriftPolicy::default(),
            resolve_timeout_secs: default_resolve_timeout_secs(),
            restart_timeout_secs: default_restart_timeout_secs(),
            debounce_secs: default_debounce_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Validate that a string is a valid DNS hostname
///
/// Basic RFC 1035 checks: total length, label length, alphanumeric and
/// hyphen characters, no leading or trailing hyphen.
pub fn validate_hostname(hostname: &str) -> Result<()> {
    if hostname.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    if hostname.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            hostname.len(),
            hostname
        )));
    }

    for label in hostname.split('.') {
        if label.is_empty() {
            return Err(Error::config(format!(
                "Domain name has empty label: '{}'",
                hostname
            )));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return Err(Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

fn default_true() -> bool {
    true
}

fn default_check_interval() -> u64 {
    300
}

fn default_container_name() -> String {
    "nginx-proxy".to_string()
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_max_backups() -> u32 {
    10
}

fn default_proxy_config_dir() -> PathBuf {
    PathBuf::from("/data/nginx/proxy_host")
}

fn default_config_extension() -> String {
    "conf".to_string()
}

fn default_resolve_timeout_secs() -> u64 {
    5
}

fn default_restart_timeout_secs() -> u64 {
    30
}

fn default_debounce_secs() -> u64 {
    2
}

fn default_error_backoff_secs() -> u64 {
    60
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn original_config_file_parses_with_defaults() {
        let json = r#"{
            "domains": [
                {"hostname": "ciccio.duckdns.org", "description": "Example DuckDNS domain"}
            ],
            "check_interval": 120,
            "backup_configs": true,
            "restart_nginx": false,
            "nginx_container_name": "nginx-proxy",
            "settings": {
                "log_level": "DEBUG",
                "max_backups": 5,
                "notification": {"enabled": false, "webhook_url": "", "email": ""}
            }
        }"#;

        let config: SyncConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.domains.len(), 1);
        assert_eq!(config.check_interval(), Duration::from_secs(120));
        assert!(!config.restart_nginx);
        assert_eq!(config.settings.max_backups, 5);
        assert_eq!(config.engine.config_extension, "conf");
        assert_eq!(config.engine.drift_policy, DriftPolicy::Heuristic);
        config.validate().unwrap();
    }

    #[test]
    fn empty_object_is_a_valid_config() {
        let config: SyncConfig = serde_json::from_str("{}").unwrap();
        assert!(config.domains.is_empty());
        assert_eq!(config.check_interval, 300);
        assert!(config.restart_nginx);
        assert_eq!(config.engine.error_backoff_secs, 60);
        assert_eq!(config.engine.debounce_secs, 2);
    }

    #[tokio::test]
    async fn missing_or_corrupt_file_is_a_load_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dns_config.json");

        assert!(matches!(
            SyncConfig::load(&path),
            Err(Error::ConfigLoad { .. })
        ));
        assert!(matches!(
            SyncConfig::load_async(&path).await,
            Err(Error::ConfigLoad { .. })
        ));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(SyncConfig::load(&path).is_err());
        assert!(SyncConfig::load_async(&path).await.is_err());
    }

    #[test]
    fn domain_list_from_environment_string() {
        let config = SyncConfig::new().with_domain_list(" a.example.org, ,b.example.org ");
        let names: Vec<_> = config.domains.iter().map(|d| d.hostname.as_str()).collect();
        assert_eq!(names, vec!["a.example.org", "b.example.org"]);
    }

    #[test]
    fn config_source_applies_domain_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dns_config.json");
        std::fs::write(
            &path,
            r#"{"domains": [{"hostname": "file.example.org"}], "check_interval": 60}"#,
        )
        .unwrap();

        let plain = ConfigSource::new(&path, None).try_load_blocking().unwrap();
        assert_eq!(plain.domains[0].hostname, "file.example.org");

        let overridden = ConfigSource::new(&path, Some("env.example.org".to_string()))
            .try_load_blocking()
            .unwrap();
        assert_eq!(overridden.domains.len(), 1);
        assert_eq!(overridden.domains[0].hostname, "env.example.org");
        assert_eq!(overridden.check_interval, 60);

        let blank = ConfigSource::new(&path, Some("  ".to_string()))
            .try_load_blocking()
            .unwrap();
        assert_eq!(blank.domains[0].hostname, "file.example.org");
    }

    #[tokio::test]
    async fn try_load_reports_corrupt_file_unless_overridden() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dns_config.json");
        std::fs::write(&path, "{ \"domains\": [").unwrap();

        assert!(ConfigSource::new(&path, None).try_load().await.is_err());
        assert!(ConfigSource::new(&path, None).try_load_blocking().is_err());

        let overridden = ConfigSource::new(&path, Some("env.example.org".to_string()))
            .try_load()
            .await
            .unwrap();
        assert_eq!(overridden.domains[0].hostname, "env.example.org");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = SyncConfig::new();
        config.check_interval = 0;
        assert!(config.validate().is_err());

        let mut config = SyncConfig::new();
        config.domains.push(DomainConfig::new("bad_name.example.org", ""));
        assert!(config.validate().is_err());

        let mut config = SyncConfig::new();
        config.nginx_container_name = "  ".to_string();
        assert!(config.validate().is_err());
        config.restart_nginx = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn hostname_validation() {
        assert!(validate_hostname("home.duckdns.org").is_ok());
        assert!(validate_hostname("localhost").is_ok());
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("a..b").is_err());
        assert!(validate_hostname("-a.example.org").is_err());
        assert!(validate_hostname("*.example.org").is_err());
        assert!(validate_hostname(&"a".repeat(64)).is_err());
    }

    #[test]
    fn drift_policy_parses() {
        assert_eq!("heuristic".parse::<DriftPolicy>().unwrap(), DriftPolicy::Heuristic);
        assert_eq!(
            "tracked-only".parse::<DriftPolicy>().unwrap(),
            DriftPolicy::TrackedOnly
        );
        assert!("aggressive".parse::<DriftPolicy>().is_err());
    }
}
