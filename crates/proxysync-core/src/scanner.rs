//! Proxy configuration scanner
//!
//! Finds candidate configuration files and pulls two things out of their
//! text, without modelling the proxy's grammar:
//!
//! - hostnames declared by `server_name` directives (auto-discovery)
//! - IPv4 literals, classified as public or private/reserved
//!
//! Several overlapping patterns are applied for literals. Over-matching is
//! harmless: private addresses are filtered out here and every rewrite is
//! re-verified by the mutator.
//!
//! Files are read as bytes. Text that is not valid UTF-8 (a Latin-1 comment)
//! is decoded lossily for scanning; hostnames and addresses are ASCII and
//! unaffected.

use regex::Regex;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{Error, Result};

const DOTTED_QUAD: &str = r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}";

static SERVER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"server_name\s+([^;]+);").expect("valid server_name pattern"));

/// Directive-aware literal patterns; capture group 1 is the address
static LITERAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // allow 1.2.3.4;
        format!(r"allow\s+({DOTTED_QUAD})\s*;"),
        // proxy_pass http://1.2.3.4:8080
        format!(r"proxy_pass\s+https?://({DOTTED_QUAD})(?::\d+)?"),
        // server 1.2.3.4:8080;
        format!(r"server\s+({DOTTED_QUAD})(?::\d+)?"),
        // upstream backend { server 1.2.3.4; }
        format!(r"(?s)upstream[^{{]*?\{{\s*server\s+({DOTTED_QUAD})(?::\d+)?"),
        // any bare occurrence
        format!(r"\b({DOTTED_QUAD})\b"),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid literal pattern"))
    .collect()
});

/// Placeholder used for catch-all server blocks
const DEFAULT_SERVER_NAME: &str = "_";

/// A proxy configuration file read fresh for one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    /// Location on disk
    pub path: PathBuf,
    /// Full text at scan time
    pub content: String,
}

impl ConfigFile {
    /// File name for log lines
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Address classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AddressScope {
    /// Routable address, may be a DNS resolution target
    Public,
    /// RFC 1918, loopback or link-local
    PrivateOrReserved,
}

/// An IPv4 literal found in configuration text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IpLiteral {
    /// The address
    pub addr: Ipv4Addr,
    /// Its classification
    pub scope: AddressScope,
}

impl IpLiteral {
    /// Classify an address
    pub fn new(addr: Ipv4Addr) -> Self {
        Self {
            addr,
            scope: classify(addr),
        }
    }

    /// Whether the literal takes part in drift detection
    pub fn is_public(&self) -> bool {
        self.scope == AddressScope::Public
    }
}

/// Classify an address as public or private/reserved
///
/// Private/reserved: 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16,
/// 127.0.0.0/8, 169.254.0.0/16. Everything else is public.
pub fn classify(addr: Ipv4Addr) -> AddressScope {
    match addr.octets() {
        [10, ..] => AddressScope::PrivateOrReserved,
        [172, b, ..] if (16..=31).contains(&b) => AddressScope::PrivateOrReserved,
        [192, 168, ..] => AddressScope::PrivateOrReserved,
        [127, ..] => AddressScope::PrivateOrReserved,
        [169, 254, ..] => AddressScope::PrivateOrReserved,
        _ => AddressScope::Public,
    }
}

/// Whether an address is public
pub fn is_public(addr: Ipv4Addr) -> bool {
    classify(addr) == AddressScope::Public
}

/// True when the bytes right after a match are a CIDR suffix (`/<digits>`)
pub(crate) fn followed_by_cidr(rest: &[u8]) -> bool {
    matches!(rest, [b'/', d, ..] if d.is_ascii_digit())
}

/// True when a match is a slice of a longer dotted number (`1.2.3.4.5`)
pub(crate) fn part_of_longer_number(before: &[u8], after: &[u8]) -> bool {
    matches!(before, [.., d, b'.'] if d.is_ascii_digit())
        || matches!(after, [b'.', d, ..] if d.is_ascii_digit())
}

/// Outcome of listing the monitored directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Configuration files read for this pass, sorted by path
    pub files: Vec<ConfigFile>,
    /// Configuration files that were listed but could not be read
    pub unreadable: Vec<PathBuf>,
}

/// Scanner over one monitored directory
#[derive(Debug, Clone)]
pub struct ConfigScanner {
    dir: PathBuf,
    extension: String,
}

impl ConfigScanner {
    /// Create a scanner for `dir`, matching files ending in `.<extension>`
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            dir: dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Monitored directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a path names a configuration file directly inside the monitored directory
    pub fn is_config_path(&self, path: &Path) -> bool {
        path.parent() == Some(self.dir.as_path())
            && path.extension().is_some_and(|ext| ext == self.extension.as_str())
    }

    /// List and read configuration files (non-recursive)
    ///
    /// A missing directory yields an empty report. A directory that cannot be
    /// inspected or listed is an [`Error::Scan`] that aborts the pass. A
    /// single unreadable file is logged and reported in
    /// [`ScanReport::unreadable`].
    pub async fn scan(&self) -> Result<ScanReport> {
        match fs::try_exists(&self.dir).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(dir = %self.dir.display(), "Proxy config directory not found");
                return Ok(ScanReport::default());
            }
            Err(e) => return Err(Error::scan(&self.dir, e.to_string())),
        }

        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| Error::scan(&self.dir, e.to_string()))?;

        let mut report = ScanReport::default();
        let mut paths = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => return Err(Error::scan(&self.dir, e.to_string())),
            };

            let path = entry.path();
            if !self.is_config_path(&path) {
                continue;
            }
            match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => {
                    warn!(file = %path.display(), "Cannot stat config file: {}", e);
                    report.unreadable.push(path);
                }
            }
        }
        paths.sort();

        for path in paths {
            match fs::read(&path).await {
                Ok(bytes) => {
                    let content = String::from_utf8_lossy(&bytes).into_owned();
                    report.files.push(ConfigFile { path, content });
                }
                Err(e) => {
                    warn!(file = %path.display(), "Error reading config file: {}", e);
                    report.unreadable.push(path);
                }
            }
        }
        report.unreadable.sort();

        debug!(
            dir = %self.dir.display(),
            unreadable = report.unreadable.len(),
            "Found {} proxy config files",
            report.files.len()
        );
        Ok(report)
    }

    /// Hostnames declared by `server_name` directives
    ///
    /// Drops the `_` placeholder, wildcard names (`*.example.org`) and regex
    /// names (`~^www\d+`). Names are lowercased.
    pub fn extract_hostnames(file: &ConfigFile) -> BTreeSet<String> {
        let mut hostnames = BTreeSet::new();

        for captures in SERVER_NAME.captures_iter(&file.content) {
            for name in captures[1].split_whitespace() {
                if name == DEFAULT_SERVER_NAME || name.starts_with('*') || name.starts_with('~') {
                    continue;
                }
                debug!(file = %file.name(), hostname = name, "Found server name");
                hostnames.insert(name.to_ascii_lowercase());
            }
        }

        hostnames
    }

    /// Every syntactically valid IPv4 literal, classified
    ///
    /// Literals carrying a CIDR suffix are subnets, not host targets, and are
    /// skipped, as are slices of longer dotted numbers such as versions.
    pub fn extract_ip_literals(file: &ConfigFile) -> BTreeSet<IpLiteral> {
        let content = file.content.as_str();
        let bytes = content.as_bytes();
        let mut literals = BTreeSet::new();

        for pattern in LITERAL_PATTERNS.iter() {
            for captures in pattern.captures_iter(content) {
                let Some(m) = captures.get(1) else { continue };
                if followed_by_cidr(&bytes[m.end()..])
                    || part_of_longer_number(&bytes[..m.start()], &bytes[m.end()..])
                {
                    continue;
                }
                // Rejects octets > 255 and leading zeros
                if let Ok(addr) = m.as_str().parse::<Ipv4Addr>() {
                    literals.insert(IpLiteral::new(addr));
                }
            }
        }

        literals
    }

    /// Public IPv4 literals only
    pub fn extract_public_ips(file: &ConfigFile) -> BTreeSet<Ipv4Addr> {
        let literals = Self::extract_ip_literals(file);
        let public: BTreeSet<Ipv4Addr> = literals
            .iter()
            .filter(|literal| literal.is_public())
            .map(|literal| literal.addr)
            .collect();

        debug!(
            file = %file.name(),
            public = public.len(),
            ignored = literals.len() - public.len(),
            "Classified IP literals"
        );
        public
    }
}
