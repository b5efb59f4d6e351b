use thiserror::Error;

/// Unified error type for ledger and storage layers.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),
    #[error("No active period; a budget must be set first")]
    MissingPeriod,
    #[error("Transaction not found: {0}")]
    TransactionNotFound(i64),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("Background task error: {0}")]
    Background(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_concern() {
        assert_eq!(
            LedgerError::TransactionNotFound(7).to_string(),
            "Transaction not found: 7"
        );
        assert_eq!(
            LedgerError::Background("spawn failed".into()).to_string(),
            "Background task error: spawn failed"
        );
        assert_eq!(
            LedgerError::Storage("disk full".into()).to_string(),
            "Persistence error: disk full"
        );
    }
}
