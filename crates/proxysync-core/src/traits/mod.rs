//! Core traits for the proxysync system
//!
//! These are the seams the [`Reconciler`](crate::Reconciler) is built on:
//!
//! - [`Resolver`]: hostname -> IPv4 lookup
//! - [`ConfigMutator`]: verified IP substitution inside one config file
//! - [`RestartTrigger`]: opaque external restart of the proxy
//! - [`StateStore`]: last known IP per hostname, across daemon restarts
//! - [`Notifier`]: outbound summary of passes that rewrote files
//! - [`ChangeSource`]: stream of file-change notifications

pub mod change_source;
pub mod mutator;
pub mod notifier;
pub mod resolver;
pub mod restart;
pub mod state_store;

pub use change_source::ChangeSource;
pub use mutator::ConfigMutator;
pub use notifier::Notifier;
pub use resolver::Resolver;
pub use restart::RestartTrigger;
pub use state_store::{StateRecord, StateStore};
