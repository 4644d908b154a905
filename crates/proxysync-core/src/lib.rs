// # proxysync-core
//
// Core library for keeping reverse-proxy configuration files in sync with
// the current addresses of dynamic-DNS hostnames.
//
// ## Architecture Overview
//
// - **Resolver**: hostname -> IPv4 lookup, failures skip the hostname for one pass
// - **ConfigScanner**: lists proxy config files, extracts hostnames and public IP literals
// - **ConfigMutator**: exact, CIDR-aware, content-verified IP substitution in one file
// - **DomainRegistry**: monitored hostnames and their last observed address
// - **Reconciler**: one serialized pass of resolve -> scan -> diff -> mutate -> restart
// - **ChangeWatchDebouncer**: collapses bursts of file-change notifications into pass requests
// - **Scheduler**: periodic passes plus requested passes, never overlapping
//
// ## Design Principles
//
// 1. **Idempotency**: a second pass with no DNS or file change mutates nothing
// 2. **Containment**: per-hostname and per-file failures never abort a pass
// 3. **Serialization**: one pass at a time, guarded by the registry lock
// 4. **Conservative text edits**: configuration text is never parsed, only matched
//    as whole tokens and verified by content diff before a change is counted

pub mod config;
pub mod engine;
pub mod error;
pub mod mutator;
pub mod registry;
pub mod resolver;
pub mod scanner;
pub mod state;
pub mod traits;
pub mod watch;

// Re-export core types for convenience
pub use config::{
    ConfigSource, DomainConfig, DriftPolicy, EngineConfig, NotificationConfig, SyncConfig,
};
pub use engine::{
    IpChange, Mismatch, PassRequest, ReconciliationResult, Reconciler, ReconcilerOptions,
    Scheduler, SyncEvent,
};
pub use error::{Error, MutationErrorKind, Result};
pub use mutator::{FileMutator, MutationOutcome};
pub use registry::{DomainOrigin, DomainRecord, DomainRegistry};
pub use resolver::SystemResolver;
pub use scanner::{AddressScope, ConfigFile, ConfigScanner, IpLiteral, ScanReport};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{ChangeSource, ConfigMutator, Notifier, Resolver, RestartTrigger, StateStore};
pub use watch::{ChangeWatchDebouncer, FileChangeEvent};
