//! Ledger domain: persisted state, the transaction log, redistribution
//! policies, and the command surface the UI drives.

pub mod dates;
#[allow(clippy::module_inception)]
pub mod ledger;
pub mod observe;
pub mod policy;
pub mod state;
pub mod transaction;

pub use ledger::{BudgetLedger, DayCheckOutcome};
pub use observe::{LedgerSnapshot, SubscriptionId};
pub use policy::RestedBudgetDistributionMethod;
pub use state::{LedgerStage, LedgerState};
pub use transaction::{SpendDraft, Transaction, TransactionKind, TransactionLog};
