//! Verified IP substitution in proxy config files
//!
//! `old_ip` is matched as a whole token that is not followed by a CIDR
//! suffix, so `10.0.0.5/32` survives a host change of `10.0.0.5`. The file
//! is re-read immediately before deciding, and written only if the new text
//! differs from what was read.
//!
//! Matching works on bytes, so a file that is not valid UTF-8 is rewritten
//! without touching anything but the replaced addresses.

use async_trait::async_trait;
use regex::bytes::Regex;
use std::net::Ipv4Addr;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::scanner::{followed_by_cidr, part_of_longer_number};
use crate::traits::ConfigMutator;

/// Result of one replacement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// File rewritten; content verified different
    Changed {
        /// Number of occurrences replaced
        replacements: usize,
    },
    /// Nothing replaceable found, file untouched
    Unchanged,
}

/// Replace whole-token, non-CIDR occurrences of `old_ip` in `content`
///
/// Returns the new content and the number of replacements.
pub fn replace_ip(content: &[u8], old_ip: Ipv4Addr, new_ip: Ipv4Addr) -> (Vec<u8>, usize) {
    let escaped = regex::escape(&old_ip.to_string());
    let pattern = Regex::new(&format!(r"(?-u:\b){}(?-u:\b)", escaped))
        .expect("escaped IPv4 literal is a valid pattern");
    let replacement = new_ip.to_string();

    let mut output = Vec::with_capacity(content.len());
    let mut last = 0;
    let mut count = 0;

    for m in pattern.find_iter(content) {
        if followed_by_cidr(&content[m.end()..])
            || part_of_longer_number(&content[..m.start()], &content[m.end()..])
        {
            continue;
        }
        output.extend_from_slice(&content[last..m.start()]);
        output.extend_from_slice(replacement.as_bytes());
        last = m.end();
        count += 1;
    }
    output.extend_from_slice(&content[last..]);

    (output, count)
}

/// Filesystem-backed [`ConfigMutator`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMutator;

impl FileMutator {
    /// Create a new file mutator
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConfigMutator for FileMutator {
    async fn apply_replacement(
        &self,
        path: &Path,
        old_ip: Ipv4Addr,
        new_ip: Ipv4Addr,
    ) -> Result<MutationOutcome> {
        let original = fs::read(path)
            .await
            .map_err(|e| Error::mutation(path, &e))?;

        let (updated, replacements) = replace_ip(&original, old_ip, new_ip);
        if replacements == 0 {
            debug!(file = %path.display(), %old_ip, "IP not found");
            return Ok(MutationOutcome::Unchanged);
        }

        if updated == original {
            warn!(
                file = %path.display(),
                %old_ip,
                %new_ip,
                "No changes made despite finding {} matches",
                replacements
            );
            return Ok(MutationOutcome::Unchanged);
        }

        fs::write(path, &updated)
            .await
            .map_err(|e| Error::mutation(path, &e))?;

        let (before_text, after_text) = (
            String::from_utf8_lossy(&original),
            String::from_utf8_lossy(&updated),
        );
        for (number, (before, after)) in before_text.lines().zip(after_text.lines()).enumerate() {
            if before != after {
                debug!(
                    file = %path.display(),
                    "Line {}: {} -> {}",
                    number + 1,
                    before.trim(),
                    after.trim()
                );
            }
        }

        info!(
            file = %path.display(),
            %old_ip,
            %new_ip,
            replacements,
            "Updated config file"
        );
        Ok(MutationOutcome::Changed { replacements })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MutationErrorKind;
    use tempfile::tempdir;

    const OLD: Ipv4Addr = Ipv4Addr::new(1, 2, 3, 4);
    const NEW: Ipv4Addr = Ipv4Addr::new(5, 6, 7, 8);

    fn replace_text(content: &str, old_ip: Ipv4Addr, new_ip: Ipv4Addr) -> (String, usize) {
        let (bytes, count) = replace_ip(content.as_bytes(), old_ip, new_ip);
        (String::from_utf8(bytes).unwrap(), count)
    }

    #[test]
    fn replaces_whole_tokens_only() {
        let (text, count) = replace_text(
            "proxy_pass http://1.2.3.4:8080;\nallow 11.2.3.4;\nallow 1.2.3.45;\nset $a 1.2.3.4;",
            OLD,
            NEW,
        );
        assert_eq!(count, 2);
        assert_eq!(
            text,
            "proxy_pass http://5.6.7.8:8080;\nallow 11.2.3.4;\nallow 1.2.3.45;\nset $a 5.6.7.8;"
        );
    }

    #[test]
    fn cidr_literals_are_left_alone() {
        let (text, count) = replace_text("allow 1.2.3.4/32;\nallow 1.2.3.4;", OLD, NEW);
        assert_eq!(count, 1);
        assert_eq!(text, "allow 1.2.3.4/32;\nallow 5.6.7.8;");
    }

    #[test]
    fn longer_dotted_numbers_are_left_alone() {
        let (text, count) = replace_text("version 1.2.3.4.5;\nallow 1.2.3.4.;", OLD, NEW);
        assert_eq!(count, 1);
        assert!(text.contains("version 1.2.3.4.5;"));
    }

    #[test]
    fn dots_are_not_wildcards() {
        let (_, count) = replace_text("server 1x2x3x4;", OLD, NEW);
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn rewrites_file_and_reports_change() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1.conf");
        std::fs::write(&path, "proxy_pass http://1.2.3.4:8080;\n").unwrap();

        let outcome = FileMutator::new().apply_replacement(&path, OLD, NEW).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Changed { replacements: 1 });
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "proxy_pass http://5.6.7.8:8080;\n"
        );

        // Second application finds nothing
        let outcome = FileMutator::new().apply_replacement(&path, OLD, NEW).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Unchanged);
    }

    #[tokio::test]
    async fn non_utf8_bytes_survive_a_rewrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1.conf");
        std::fs::write(&path, b"# caf\xe9\nproxy_pass http://1.2.3.4:8080;\n").unwrap();

        let outcome = FileMutator::new().apply_replacement(&path, OLD, NEW).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Changed { replacements: 1 });
        assert_eq!(
            std::fs::read(&path).unwrap(),
            b"# caf\xe9\nproxy_pass http://5.6.7.8:8080;\n"
        );
    }

    #[tokio::test]
    async fn same_old_and_new_is_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1.conf");
        std::fs::write(&path, "allow 1.2.3.4;\n").unwrap();

        let outcome = FileMutator::new().apply_replacement(&path, OLD, OLD).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Unchanged);
    }

    #[tokio::test]
    async fn missing_file_is_an_other_error() {
        let dir = tempdir().unwrap();
        let err = FileMutator::new()
            .apply_replacement(&dir.path().join("gone.conf"), OLD, NEW)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Mutation {
                kind: MutationErrorKind::Other,
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn read_only_file_is_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("1.conf");
        std::fs::write(&path, "allow 1.2.3.4;\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o444)).unwrap();

        // Root ignores permission bits; nothing to assert there
        if std::fs::OpenOptions::new().write(true).open(&path).is_ok() {
            return;
        }

        let err = FileMutator::new().apply_replacement(&path, OLD, NEW).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Mutation {
                kind: MutationErrorKind::PermissionDenied,
                ..
            }
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "allow 1.2.3.4;\n");
    }
}
