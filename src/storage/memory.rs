use std::sync::Mutex;

use crate::errors::Result;
use crate::ledger::LedgerState;

use super::StorageBackend;

/// Volatile backend for tests and ephemeral embedding.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<Option<LedgerState>>,
}

impl StorageBackend for MemoryStorage {
    fn load(&self) -> Result<Option<LedgerState>> {
        Ok(self.state.lock().expect("storage lock poisoned").clone())
    }

    fn commit(&self, state: &LedgerState) -> Result<()> {
        *self.state.lock().expect("storage lock poisoned") = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn commit_then_load_round_trips() {
        let storage = MemoryStorage::default();
        assert!(storage.load().unwrap().is_none());
        let state = LedgerState {
            budget: dec!(750),
            ..LedgerState::default()
        };
        storage.commit(&state).unwrap();
        assert_eq!(storage.load().unwrap(), Some(state));
    }
}
