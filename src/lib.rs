#![doc(test(attr(deny(warnings))))]

//! Daybudget Core owns the financial state of a daily-budgeting app: the
//! period budget, committed spend, and the per-day allowance that is
//! redistributed as money is spent and as days pass without full usage.
//! Screens and widgets are external collaborators that issue commands and
//! observe snapshots; nothing in this crate renders anything.

pub mod clock;
pub mod currency;
pub mod errors;
pub mod ledger;
pub mod rollover;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{LedgerError, Result};
pub use ledger::{
    BudgetLedger, DayCheckOutcome, LedgerSnapshot, LedgerStage, LedgerState,
    RestedBudgetDistributionMethod, SpendDraft, Transaction, TransactionKind, TransactionLog,
};
pub use rollover::DayWatcher;
pub use storage::{JsonStorage, MemoryStorage, StorageBackend};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::from_default_env().add_directive("daybudget_core=info".parse().unwrap());
        fmt().with_env_filter(filter).init();
        tracing::info!("Daybudget Core tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
    }
}
