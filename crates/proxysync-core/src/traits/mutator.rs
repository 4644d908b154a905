// # Config Mutator Trait
//
// Exact, verifiable replacement of one IPv4 literal in one file.

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::path::Path;

use crate::error::Result;
use crate::mutator::MutationOutcome;

/// Trait for config file mutation
///
/// The default implementation is [`FileMutator`](crate::FileMutator).
#[async_trait]
pub trait ConfigMutator: Send + Sync {
    /// Replace whole-token, non-CIDR occurrences of `old_ip` with `new_ip`
    ///
    /// # Returns
    ///
    /// - `Ok(MutationOutcome::Changed { .. })`: file rewritten, content verified different
    /// - `Ok(MutationOutcome::Unchanged)`: nothing to replace
    /// - `Err(Error::Mutation { .. })`: read or write failed; the file is untouched
    async fn apply_replacement(
        &self,
        path: &Path,
        old_ip: Ipv4Addr,
        new_ip: Ipv4Addr,
    ) -> Result<MutationOutcome>;
}
