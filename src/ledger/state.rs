use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::currency::CurrencyCode;
use crate::errors::{LedgerError, Result};

use super::dates::{count_days, day_start, days_between, same_day};
use super::policy::RestedBudgetDistributionMethod;
use super::transaction::{TransactionKind, TransactionLog};

/// Scale used for intermediate catch-up division; final daily allowances
/// are floored to whole currency units.
const CATCH_UP_SCALE: u32 = 5;

/// Lifecycle of the active budgeting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerStage {
    /// No budget has ever been set.
    NeedsBudget,
    /// A period is running.
    Active,
    /// The finish date has passed; a new budget is required to continue.
    PeriodFinished,
}

/// The persisted financial state of one budgeting period: scalar fields plus
/// the append-only transaction log. All mutation goes through
/// [`BudgetLedger`](super::BudgetLedger); the methods here are the pure
/// arithmetic the commands are built from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LedgerState {
    pub budget: Decimal,
    /// Cumulative spend committed against `budget`. Excludes today's
    /// still-fluid `spent_from_daily_budget`.
    pub spent: Decimal,
    /// Allowance for the current accounting day.
    pub daily_budget: Decimal,
    /// Portion of `daily_budget` already consumed today.
    pub spent_from_daily_budget: Decimal,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive end of the period, normalized to the day's last second.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub finish_date: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_change_daily_budget_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub rested_budget_distribution_method: RestedBudgetDistributionMethod,
    #[serde(default)]
    pub hide_overspending_warn: bool,
    #[serde(default)]
    pub log: TransactionLog,
}

impl LedgerState {
    pub fn stage(&self, now: DateTime<Utc>) -> LedgerStage {
        match self.finish_date {
            None => LedgerStage::NeedsBudget,
            Some(finish) if finish <= now => LedgerStage::PeriodFinished,
            Some(_) => LedgerStage::Active,
        }
    }

    /// Finish date of the active period, or `MissingPeriod` when no budget
    /// was ever set.
    pub fn require_finish_date(&self) -> Result<DateTime<Utc>> {
        self.finish_date.ok_or(LedgerError::MissingPeriod)
    }

    /// Finish date of a period that is still running. A finished period is
    /// terminal: only a new `set_budget` may follow, so every mutating
    /// command goes through this gate.
    pub fn require_active_period(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let finish = self.require_finish_date()?;
        if finish <= now {
            return Err(LedgerError::InvalidPeriod(
                "period already finished".into(),
            ));
        }
        Ok(finish)
    }

    /// What is still available for spending today.
    pub fn rested_today(&self) -> Decimal {
        self.daily_budget - self.spent_from_daily_budget
    }

    /// True when today's spending exceeded the allowance.
    pub fn is_overspending(&self) -> bool {
        self.rested_today() < Decimal::ZERO
    }

    /// Evenly splits the uncommitted remainder of the budget across the
    /// remaining days, flooring to whole units so the allowance never
    /// promises more than is mathematically available.
    ///
    /// With `exclude_current_day` the split is the one tomorrow would get,
    /// ignoring whatever is left of today's allowance. `not_committed_spent`
    /// accounts for a spend that is not yet reflected in `spent`.
    pub fn what_budget_for_day(
        &self,
        exclude_current_day: bool,
        not_committed_spent: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Decimal> {
        let finish = self.require_finish_date()?;
        let mut rest_days = count_days(finish, now);
        if exclude_current_day {
            rest_days = (rest_days - 1).max(1);
        }
        let mut rest_budget = self.budget - self.spent;
        if !exclude_current_day {
            rest_budget -= not_committed_spent;
        }
        rest_budget -= if exclude_current_day {
            self.daily_budget
        } else {
            self.spent_from_daily_budget
        };
        Ok((rest_budget / Decimal::from(rest_days)).floor())
    }

    /// Catch-up arithmetic for skipped days: how much would be sitting
    /// unspent right now if the allowance had been recalculated every day
    /// since `last_change_daily_budget_date`, including today's untouched
    /// allowance.
    pub fn how_much_not_spent(&self, now: DateTime<Utc>) -> Result<Decimal> {
        let finish = self.require_finish_date()?;
        let last_change = self
            .last_change_daily_budget_date
            .ok_or(LedgerError::MissingPeriod)?;
        let rest_days = count_days(finish, now);
        let skipped_days = days_between(last_change, now).abs();
        let rest_budget = self.budget - self.spent - self.daily_budget;
        let divisor = (rest_days + skipped_days - 1).max(1);
        let per_skipped_day = (rest_budget / Decimal::from(divisor))
            .round_dp_with_strategy(CATCH_UP_SCALE, RoundingStrategy::MidpointNearestEven);
        Ok(per_skipped_day * Decimal::from((skipped_days - 1).max(0)) + self.rested_today())
    }

    /// Total remaining money, irrespective of day boundaries.
    pub fn how_much_budget_rest(&self) -> Decimal {
        self.budget - self.spent - self.spent_from_daily_budget
    }

    /// Commits today's leftover and installs a fresh allowance. Records a
    /// `SetDailyBudget` log entry.
    pub(crate) fn apply_daily_budget(&mut self, new_daily: Decimal, now: DateTime<Utc>) {
        self.spent += self.spent_from_daily_budget;
        self.daily_budget = new_daily;
        self.spent_from_daily_budget = Decimal::ZERO;
        self.last_change_daily_budget_date = Some(day_start(now));
        self.log
            .insert(TransactionKind::SetDailyBudget, new_daily, now, None);
    }

    /// True when the allowance was already recomputed today.
    pub(crate) fn recalculated_today(&self, now: DateTime<Utc>) -> bool {
        self.last_change_daily_budget_date
            .map(|last| same_day(last, now))
            .unwrap_or(false)
    }
}
