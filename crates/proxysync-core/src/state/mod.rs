// # State Store Implementations
//
// Persistence strategies for last known IPs.

pub mod file;
pub mod memory;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;
