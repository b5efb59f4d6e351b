use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of event recorded in the transaction log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionKind {
    SetDailyBudget,
    Income,
    Spent,
}

/// Immutable log entry. Created by ledger commands, never edited in place;
/// an edit is modeled as remove + add.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub kind: TransactionKind,
    pub value: Decimal,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A spend as entered by the user, before the log assigns it an id.
#[derive(Debug, Clone)]
pub struct SpendDraft {
    pub value: Decimal,
    pub date: DateTime<Utc>,
    pub comment: Option<String>,
}

impl SpendDraft {
    pub fn new(value: Decimal, date: DateTime<Utc>) -> Self {
        Self {
            value,
            date,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Append-only store of transactions, keyed by auto-increment id and kept
/// ordered by date.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransactionLog {
    entries: Vec<Transaction>,
    next_id: i64,
}

impl TransactionLog {
    pub fn insert(
        &mut self,
        kind: TransactionKind,
        value: Decimal,
        date: DateTime<Utc>,
        comment: Option<String>,
    ) -> Transaction {
        self.next_id += 1;
        let entry = Transaction {
            id: self.next_id,
            kind,
            value,
            date,
            comment,
        };
        let position = self
            .entries
            .partition_point(|existing| existing.date <= entry.date);
        self.entries.insert(position, entry.clone());
        entry
    }

    pub fn remove(&mut self, id: i64) -> Option<Transaction> {
        let position = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(position))
    }

    pub fn get(&self, id: i64) -> Option<&Transaction> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// All entries, ordered by date.
    pub fn all(&self) -> &[Transaction] {
        &self.entries
    }

    pub fn of_kind(&self, kind: TransactionKind) -> impl Iterator<Item = &Transaction> {
        self.entries.iter().filter(move |entry| entry.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry. Ids keep incrementing across the reset so a stale
    /// reference can never alias a new entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn on(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, 10, 0, 0).unwrap()
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let mut log = TransactionLog::default();
        let first = log.insert(TransactionKind::Spent, dec!(10), on(3), None);
        let second = log.insert(TransactionKind::Spent, dec!(20), on(4), None);
        assert!(second.id > first.id);
    }

    #[test]
    fn entries_stay_ordered_by_date() {
        let mut log = TransactionLog::default();
        log.insert(TransactionKind::Spent, dec!(10), on(5), None);
        log.insert(TransactionKind::Spent, dec!(20), on(2), None);
        log.insert(TransactionKind::Income, dec!(30), on(4), None);
        let dates: Vec<_> = log.all().iter().map(|entry| entry.date).collect();
        assert_eq!(dates, vec![on(2), on(4), on(5)]);
    }

    #[test]
    fn remove_is_by_id() {
        let mut log = TransactionLog::default();
        let kept = log.insert(TransactionKind::Spent, dec!(10), on(1), None);
        let removed = log.insert(TransactionKind::Spent, dec!(20), on(2), None);
        assert!(log.remove(removed.id).is_some());
        assert!(log.remove(removed.id).is_none());
        assert!(log.get(kept.id).is_some());
    }

    #[test]
    fn clear_preserves_id_sequence() {
        let mut log = TransactionLog::default();
        let before = log.insert(TransactionKind::Spent, dec!(10), on(1), None);
        log.clear();
        let after = log.insert(TransactionKind::Spent, dec!(10), on(1), None);
        assert!(after.id > before.id);
    }

    #[test]
    fn of_kind_filters() {
        let mut log = TransactionLog::default();
        log.insert(TransactionKind::Spent, dec!(10), on(1), None);
        log.insert(TransactionKind::SetDailyBudget, dec!(200), on(1), None);
        log.insert(TransactionKind::Spent, dec!(5), on(2), Some("coffee".into()));
        assert_eq!(log.of_kind(TransactionKind::Spent).count(), 2);
        assert_eq!(log.of_kind(TransactionKind::Income).count(), 0);
    }
}
