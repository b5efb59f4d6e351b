use serde::{Deserialize, Serialize};

/// How unspent daily budget carries forward when a day boundary is crossed.
///
/// The source app also sketched an `AddSavings` variant; it was never wired
/// up end to end and is deliberately not offered here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RestedBudgetDistributionMethod {
    /// Surface a user decision before redistributing anything.
    #[default]
    Ask,
    /// Spread the leftover evenly across the remaining days.
    Rest,
    /// Dump the whole leftover onto today's fresh allowance.
    AddToday,
}

impl RestedBudgetDistributionMethod {
    /// True for the variants the ledger can apply without user input.
    pub fn is_automatic(&self) -> bool {
        !matches!(self, RestedBudgetDistributionMethod::Ask)
    }
}
