//! Observable snapshot of the ledger, replacing the reactive field-per-value
//! streams a UI layer would otherwise bind to.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::currency::CurrencyCode;

use super::policy::RestedBudgetDistributionMethod;
use super::state::{LedgerStage, LedgerState};

/// Handle returned by [`SnapshotHub::subscribe`]; pass it back to
/// unsubscribe.
pub type SubscriptionId = u64;

/// Point-in-time view of the ledger with the derived flags a UI binds to.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    pub budget: Decimal,
    pub spent: Decimal,
    pub daily_budget: Decimal,
    pub spent_from_daily_budget: Decimal,
    pub start_date: Option<DateTime<Utc>>,
    pub finish_date: Option<DateTime<Utc>>,
    pub last_change_daily_budget_date: Option<DateTime<Utc>>,
    pub currency: CurrencyCode,
    pub rested_budget_distribution_method: RestedBudgetDistributionMethod,
    pub hide_overspending_warn: bool,
    pub stage: LedgerStage,
    /// No budget was ever set; the UI must run initial setup.
    pub require_set_budget: bool,
    pub period_finished: bool,
    /// A day rolled over under the `Ask` policy and the user must pick how
    /// to distribute the leftover.
    pub require_distribution: bool,
    pub is_overspending: bool,
}

impl LedgerSnapshot {
    pub(crate) fn capture(
        state: &LedgerState,
        now: DateTime<Utc>,
        require_distribution: bool,
    ) -> Self {
        let stage = state.stage(now);
        Self {
            budget: state.budget,
            spent: state.spent,
            daily_budget: state.daily_budget,
            spent_from_daily_budget: state.spent_from_daily_budget,
            start_date: state.start_date,
            finish_date: state.finish_date,
            last_change_daily_budget_date: state.last_change_daily_budget_date,
            currency: state.currency.clone(),
            rested_budget_distribution_method: state.rested_budget_distribution_method,
            hide_overspending_warn: state.hide_overspending_warn,
            stage,
            require_set_budget: stage == LedgerStage::NeedsBudget,
            period_finished: stage == LedgerStage::PeriodFinished,
            require_distribution,
            is_overspending: state.is_overspending(),
        }
    }

    /// Allowance still available today.
    pub fn rested_today(&self) -> Decimal {
        self.daily_budget - self.spent_from_daily_budget
    }
}

type Callback = Arc<dyn Fn(&LedgerSnapshot) + Send + Sync>;

/// Subscriber registry with synchronous dispatch. Callbacks run one after
/// another on the thread that committed the mutation; the subscriber list
/// is not locked during dispatch, so a callback may subscribe or
/// unsubscribe freely.
#[derive(Default)]
pub(crate) struct SnapshotHub {
    subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
    next_id: AtomicU64,
}

impl SnapshotHub {
    pub(crate) fn subscribe(
        &self,
        callback: impl Fn(&LedgerSnapshot) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut subscribers = self.subscribers.lock().expect("subscriber lock poisoned");
        subscribers.push((id, Arc::new(callback)));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscribers = self.subscribers.lock().expect("subscriber lock poisoned");
        subscribers.retain(|(existing, _)| *existing != id);
    }

    pub(crate) fn publish(&self, snapshot: &LedgerSnapshot) {
        let subscribers: Vec<Callback> = {
            let guard = self.subscribers.lock().expect("subscriber lock poisoned");
            guard.iter().map(|(_, callback)| callback.clone()).collect()
        };
        for callback in subscribers {
            callback(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn empty_snapshot() -> LedgerSnapshot {
        LedgerSnapshot::capture(&LedgerState::default(), Utc::now(), false)
    }

    #[test]
    fn subscribers_receive_published_snapshots() {
        let hub = SnapshotHub::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let id = hub.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        hub.publish(&empty_snapshot());
        hub.unsubscribe(id);
        hub.publish(&empty_snapshot());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callbacks_may_unsubscribe_during_dispatch() {
        let hub = Arc::new(SnapshotHub::default());
        let own_id = Arc::new(Mutex::new(0));
        let seen = Arc::new(AtomicUsize::new(0));

        let dispatch_hub = hub.clone();
        let dispatch_id = own_id.clone();
        let counter = seen.clone();
        let id = hub.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            dispatch_hub.unsubscribe(*dispatch_id.lock().unwrap());
        });
        *own_id.lock().unwrap() = id;

        hub.publish(&empty_snapshot());
        hub.publish(&empty_snapshot());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn snapshot_derives_setup_flag() {
        let snapshot = empty_snapshot();
        assert!(snapshot.require_set_budget);
        assert!(!snapshot.period_finished);
    }
}
