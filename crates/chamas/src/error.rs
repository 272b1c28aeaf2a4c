//! Error taxonomy for the chama service layer.

use cycle_ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChamaError {
    /// Bad input from the caller, e.g. a non-positive amount.
    #[error("{0}")]
    Validation(String),

    /// The referenced chama/cycle/member/invite does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Caller is not a member, or the caller's role is insufficient.
    #[error("{0}")]
    Permission(String),

    /// A business rule rejected the operation: duplicate contribution,
    /// inactive cycle, payout already executed, expired invite, and so on.
    #[error("{0}")]
    Business(String),

    /// The external ledger rejected or failed the money movement.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ChamaError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    pub fn business(msg: impl Into<String>) -> Self {
        Self::Business(msg.into())
    }
}

pub type ChamaResult<T> = Result<T, ChamaError>;

/// Whether a sqlx error is a SQLite uniqueness violation. Used to map
/// constraint backstops (duplicate contribution, second active cycle) onto
/// business errors.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed")
    )
}
