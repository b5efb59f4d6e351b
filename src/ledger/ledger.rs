use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::clock::Clock;
use crate::currency::CurrencyCode;
use crate::errors::{LedgerError, Result};
use crate::storage::StorageBackend;

use super::dates::{count_days, day_end, day_start, same_day};
use super::observe::{LedgerSnapshot, SnapshotHub, SubscriptionId};
use super::policy::RestedBudgetDistributionMethod;
use super::state::LedgerState;
use super::transaction::{SpendDraft, Transaction, TransactionKind};

/// Result of one day-rollover check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCheckOutcome {
    /// A previous check was still in flight; this one was coalesced away.
    Skipped,
    /// No budget has ever been set.
    NeedsBudget,
    /// The finish date has passed.
    PeriodFinished,
    /// The allowance was already current for today.
    Unchanged,
    /// Leftover exists and the `Ask` policy wants a user decision.
    DistributionRequested,
    /// A fresh daily allowance was computed and committed.
    Recalculated,
}

#[derive(Clone, PartialEq)]
struct Inner {
    state: LedgerState,
    /// Pending `Ask` decision. In-memory only; a restart simply re-raises it
    /// on the next day check.
    require_distribution: bool,
}

/// The budget ledger: single owner of the financial state of the active
/// period. Every command is an atomic read-modify-write against the storage
/// backend; on a persistence failure the in-memory state is left exactly as
/// it was before the command.
pub struct BudgetLedger {
    storage: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
    hub: SnapshotHub,
    /// Serializes snapshot dispatch so subscribers see commits in order.
    /// Lock order is always `inner` then `publish_order`.
    publish_order: Mutex<()>,
    day_check_in_flight: AtomicBool,
}

impl BudgetLedger {
    /// Opens the ledger, restoring persisted state when present.
    pub fn open(storage: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>) -> Result<Self> {
        let state = storage.load()?.unwrap_or_default();
        Ok(Self {
            storage,
            clock,
            inner: Mutex::new(Inner {
                state,
                require_distribution: false,
            }),
            hub: SnapshotHub::default(),
            publish_order: Mutex::new(()),
            day_check_in_flight: AtomicBool::new(false),
        })
    }

    /// Starts a new period: stores the budget, resets all derived state,
    /// purges the transaction log, and installs the first daily allowance.
    pub fn set_budget(&self, new_budget: Decimal, new_finish_date: DateTime<Utc>) -> Result<()> {
        if new_budget.is_sign_negative() {
            return Err(LedgerError::Validation(
                "budget must not be negative".into(),
            ));
        }
        self.mutate(|inner, now| {
            let finish = day_end(new_finish_date);
            if finish < now {
                return Err(LedgerError::InvalidPeriod(format!(
                    "finish date {} is before today",
                    new_finish_date.date_naive()
                )));
            }
            let start = day_start(now);
            let state = &mut inner.state;
            state.budget = new_budget;
            state.spent = Decimal::ZERO;
            state.daily_budget = Decimal::ZERO;
            state.spent_from_daily_budget = Decimal::ZERO;
            state.start_date = Some(start);
            state.finish_date = Some(finish);
            state.last_change_daily_budget_date = Some(start);
            state.hide_overspending_warn = false;
            state.log.clear();
            let first_daily = state.what_budget_for_day(false, Decimal::ZERO, now)?;
            state.apply_daily_budget(first_daily, now);
            inner.require_distribution = false;
            tracing::info!(budget = %new_budget, finish = %finish, "period started");
            Ok(())
        })
    }

    /// Alias for [`set_budget`](Self::set_budget), matching the command the
    /// UI exposes mid-period.
    pub fn change_budget(&self, new_budget: Decimal, new_finish_date: DateTime<Utc>) -> Result<()> {
        self.set_budget(new_budget, new_finish_date)
    }

    /// Commits today's leftover into `spent` and installs `new_daily` as the
    /// current allowance.
    pub fn set_daily_budget(&self, new_daily: Decimal) -> Result<()> {
        self.mutate(|inner, now| {
            inner.state.require_active_period(now)?;
            inner.state.apply_daily_budget(new_daily, now);
            inner.require_distribution = false;
            tracing::debug!(daily = %new_daily, "daily budget set");
            Ok(())
        })
    }

    /// Records a spend. A same-day spend consumes today's allowance; a spend
    /// dated on another day inside the period is amortized over the days
    /// between its date and the finish date so it does not distort today.
    pub fn add_spent(&self, draft: SpendDraft) -> Result<Transaction> {
        if draft.value.is_sign_negative() {
            return Err(LedgerError::Validation(
                "spend value must not be negative".into(),
            ));
        }
        self.mutate(|inner, now| {
            let state = &mut inner.state;
            let finish = state.require_active_period(now)?;
            let start = state.start_date.ok_or(LedgerError::MissingPeriod)?;
            if draft.date < start || draft.date > finish {
                return Err(LedgerError::Validation(format!(
                    "spend date {} is outside the active period",
                    draft.date.date_naive()
                )));
            }
            if same_day(draft.date, now) {
                state.spent_from_daily_budget += draft.value;
                if state.is_overspending() {
                    tracing::debug!(rest = %state.rested_today(), "daily budget overspent");
                }
            } else {
                let spread_days = count_days(finish, draft.date);
                let spread_delta = draft.value / Decimal::from(spread_days);
                state.daily_budget -= spread_delta;
                state.spent += draft.value;
            }
            Ok(state
                .log
                .insert(TransactionKind::Spent, draft.value, draft.date, draft.comment))
        })
    }

    /// Undoes a recorded spend, mirroring the arithmetic of
    /// [`add_spent`](Self::add_spent). Removing an unknown id is an explicit
    /// error rather than a silent no-op, so a double removal can never be
    /// applied twice.
    pub fn remove_spent(&self, id: i64) -> Result<Transaction> {
        self.mutate(|inner, now| {
            let state = &mut inner.state;
            let entry = state
                .log
                .get(id)
                .cloned()
                .ok_or(LedgerError::TransactionNotFound(id))?;
            if entry.kind != TransactionKind::Spent {
                return Err(LedgerError::Validation(
                    "only spend entries can be removed".into(),
                ));
            }
            let finish = state.require_active_period(now)?;
            if same_day(entry.date, now) {
                state.spent_from_daily_budget -= entry.value;
            } else {
                let spread_days = count_days(finish, entry.date);
                let spread_delta = entry.value / Decimal::from(spread_days);
                state.daily_budget += spread_delta;
                state.spent -= entry.value;
            }
            state.log.remove(id);
            Ok(entry)
        })
    }

    /// Raises the period budget mid-flight and refreshes today's allowance
    /// without committing today's spend or stamping a recalculation.
    pub fn add_income(&self, value: Decimal, comment: Option<String>) -> Result<Transaction> {
        if value.is_sign_negative() {
            return Err(LedgerError::Validation(
                "income value must not be negative".into(),
            ));
        }
        self.mutate(|inner, now| {
            let state = &mut inner.state;
            state.require_active_period(now)?;
            state.budget += value;
            let refreshed = state.what_budget_for_day(false, Decimal::ZERO, now)?;
            state.daily_budget = refreshed + state.spent_from_daily_budget;
            Ok(state
                .log
                .insert(TransactionKind::Income, value, now, comment))
        })
    }

    /// Day-rollover check. Triggered periodically while the app is in the
    /// foreground and once on every resume; re-entrant calls coalesce.
    pub fn check_day(&self) -> Result<DayCheckOutcome> {
        if self
            .day_check_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(DayCheckOutcome::Skipped);
        }
        let outcome = self.check_day_locked();
        self.day_check_in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    fn check_day_locked(&self) -> Result<DayCheckOutcome> {
        self.mutate(|inner, now| {
            let state = &mut inner.state;
            let finish = match state.finish_date {
                Some(finish) => finish,
                None => return Ok(DayCheckOutcome::NeedsBudget),
            };
            if finish <= now {
                return Ok(DayCheckOutcome::PeriodFinished);
            }
            if state.recalculated_today(now) {
                return Ok(DayCheckOutcome::Unchanged);
            }
            let leftover = state.rested_today();
            if leftover > Decimal::ZERO {
                match state.rested_budget_distribution_method {
                    RestedBudgetDistributionMethod::Ask => {
                        inner.require_distribution = true;
                        tracing::info!(%leftover, "rested budget needs a distribution choice");
                        return Ok(DayCheckOutcome::DistributionRequested);
                    }
                    method => Self::distribute_rested(state, method, now)?,
                }
            } else {
                let next = state.what_budget_for_day(false, Decimal::ZERO, now)?;
                state.apply_daily_budget(next, now);
            }
            tracing::info!(daily = %inner.state.daily_budget, "daily budget recalculated");
            Ok(DayCheckOutcome::Recalculated)
        })
    }

    /// Resolves a pending `Ask` rollover with the method the user picked.
    pub fn apply_rested_distribution(
        &self,
        method: RestedBudgetDistributionMethod,
    ) -> Result<()> {
        if !method.is_automatic() {
            return Err(LedgerError::Validation(
                "a concrete distribution method is required".into(),
            ));
        }
        self.mutate(|inner, now| {
            inner.state.require_active_period(now)?;
            Self::distribute_rested(&mut inner.state, method, now)?;
            inner.require_distribution = false;
            Ok(())
        })
    }

    fn distribute_rested(
        state: &mut LedgerState,
        method: RestedBudgetDistributionMethod,
        now: DateTime<Utc>,
    ) -> Result<()> {
        match method {
            RestedBudgetDistributionMethod::Rest => {
                let next = state.what_budget_for_day(false, Decimal::ZERO, now)?;
                state.apply_daily_budget(next, now);
            }
            RestedBudgetDistributionMethod::AddToday => {
                let rested = state.how_much_not_spent(now)?;
                let base = state.what_budget_for_day(false, rested, now)?;
                state.apply_daily_budget(base + rested, now);
            }
            RestedBudgetDistributionMethod::Ask => unreachable!("guarded by is_automatic"),
        }
        Ok(())
    }

    pub fn change_rested_budget_distribution_method(
        &self,
        method: RestedBudgetDistributionMethod,
    ) -> Result<()> {
        self.mutate(|inner, _| {
            inner.state.rested_budget_distribution_method = method;
            Ok(())
        })
    }

    /// Suppresses or re-enables the overspending warning for the rest of the
    /// period. Reset by the next `set_budget`.
    pub fn hide_overspending_warn(&self, hide: bool) -> Result<()> {
        self.mutate(|inner, _| {
            inner.state.hide_overspending_warn = hide;
            Ok(())
        })
    }

    pub fn set_currency(&self, currency: CurrencyCode) -> Result<()> {
        self.mutate(|inner, _| {
            inner.state.currency = currency.clone();
            Ok(())
        })
    }

    /// Tomorrow-or-today allowance arithmetic; see
    /// [`LedgerState::what_budget_for_day`].
    pub fn what_budget_for_day(
        &self,
        exclude_current_day: bool,
        not_committed_spent: Decimal,
    ) -> Result<Decimal> {
        let now = self.clock.now();
        self.lock_inner()
            .state
            .what_budget_for_day(exclude_current_day, not_committed_spent, now)
    }

    pub fn how_much_not_spent(&self) -> Result<Decimal> {
        let now = self.clock.now();
        self.lock_inner().state.how_much_not_spent(now)
    }

    pub fn how_much_budget_rest(&self) -> Decimal {
        self.lock_inner().state.how_much_budget_rest()
    }

    /// Current state with derived flags, as the UI observes it.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let now = self.clock.now();
        let inner = self.lock_inner();
        LedgerSnapshot::capture(&inner.state, now, inner.require_distribution)
    }

    /// All log entries, ordered by date.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock_inner().state.log.all().to_vec()
    }

    pub fn transactions_of(&self, kind: TransactionKind) -> Vec<Transaction> {
        self.lock_inner()
            .state
            .log
            .of_kind(kind)
            .cloned()
            .collect()
    }

    /// Registers a callback invoked after every committed mutation.
    /// Callbacks run sequentially on the mutating thread and observe
    /// snapshots in commit order; they may subscribe or unsubscribe but must
    /// not issue ledger commands.
    pub fn subscribe(
        &self,
        callback: impl Fn(&LedgerSnapshot) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.hub.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.hub.unsubscribe(id);
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("ledger lock poisoned")
    }

    /// Applies `apply` to a copy of the state, persists the copy, and only
    /// then swaps it in and notifies subscribers. Nothing is published or
    /// retained when validation or persistence fails.
    ///
    /// The publish lock is taken before the state lock is released, so a
    /// concurrent writer committing next cannot get its snapshot out ahead
    /// of this one.
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut Inner, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        let now = self.clock.now();
        let mut guard = self.lock_inner();
        let mut candidate = guard.clone();
        let out = apply(&mut candidate, now)?;
        if candidate == *guard {
            return Ok(out);
        }
        if candidate.state != guard.state {
            self.storage.commit(&candidate.state)?;
        }
        *guard = candidate;
        let snapshot = LedgerSnapshot::capture(&guard.state, now, guard.require_distribution);
        let _order = self.publish_order.lock().expect("publish lock poisoned");
        drop(guard);
        self.hub.publish(&snapshot);
        Ok(out)
    }
}
