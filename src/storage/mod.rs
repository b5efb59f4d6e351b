pub mod json_backend;
pub mod memory;

use crate::errors::Result;
use crate::ledger::LedgerState;

/// Abstraction over persistence backends for the single active ledger.
///
/// `commit` must be all-or-nothing: after a failed commit a subsequent
/// `load` returns the previously committed state, never a torn write.
pub trait StorageBackend: Send + Sync {
    /// Restores the last committed state, or `None` on first launch.
    fn load(&self) -> Result<Option<LedgerState>>;

    /// Atomically replaces the persisted state.
    fn commit(&self, state: &LedgerState) -> Result<()>;
}

pub use json_backend::JsonStorage;
pub use memory::MemoryStorage;
