//! Error types for the proxysync system
//!
//! Every failure is contained at the smallest scope that can absorb it:
//! per hostname ([`Error::Resolution`]), per file ([`Error::Mutation`]),
//! per pass ([`Error::Scan`]). None of them terminate the daemon.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for proxysync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a file could not be rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationErrorKind {
    /// The process lacks write (or read) permission on the file
    PermissionDenied,
    /// Any other I/O failure
    Other,
}

impl MutationErrorKind {
    /// Classify an I/O error
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Other,
        }
    }
}

/// Core error type for the proxysync system
#[derive(Error, Debug)]
pub enum Error {
    /// DNS lookup failed or timed out
    #[error("Resolution failed for {hostname}: {message}")]
    Resolution {
        /// Hostname that failed to resolve
        hostname: String,
        /// Underlying cause
        message: String,
    },

    /// Monitored directory could not be listed
    #[error("Scan failed for {}: {message}", path.display())]
    Scan {
        /// Directory being scanned
        path: PathBuf,
        /// Underlying cause
        message: String,
    },

    /// A configuration file could not be read or rewritten
    #[error("Mutation failed for {}: {message}", path.display())]
    Mutation {
        /// File being rewritten
        path: PathBuf,
        /// Failure classification
        kind: MutationErrorKind,
        /// Underlying cause
        message: String,
    },

    /// External restart action failed or is unavailable
    #[error("Restart failed: {0}")]
    Restart(String),

    /// Static configuration missing or corrupt
    #[error("Failed to load configuration from {}: {message}", path.display())]
    ConfigLoad {
        /// Configuration file path
        path: PathBuf,
        /// Underlying cause
        message: String,
    },

    /// Configuration validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a resolution error
    pub fn resolution(hostname: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Resolution {
            hostname: hostname.into(),
            message: msg.into(),
        }
    }

    /// Create a scan error
    pub fn scan(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Scan {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a mutation error from an I/O failure
    pub fn mutation(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Mutation {
            path: path.into(),
            kind: MutationErrorKind::from_io(err),
            message: err.to_string(),
        }
    }

    /// Create a restart error
    pub fn restart(msg: impl Into<String>) -> Self {
        Self::Restart(msg.into())
    }

    /// Create a configuration load error
    pub fn config_load(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a notification error
    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }

    /// Operator guidance for errors that need manual intervention
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            Error::Mutation {
                kind: MutationErrorKind::PermissionDenied,
                ..
            } => Some(
                "grant the monitor write access to the proxy config directory: \
                 run the container as root (user: \"0:0\"), chown the data directory \
                 to the monitor's uid, or mount the volume read-write",
            ),
            Error::Mutation { .. } => Some(
                "check that the proxy config volume is mounted, not full, and not read-only",
            ),
            Error::Scan { .. } => Some(
                "check DNS_NGINX_CONFIG_PATH points at a readable directory",
            ),
            _ => None,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
