//! Cycle Ledger Crate
//!
//! Collaborator contracts for money movement and notifications. The service
//! layer only ever talks to the [`Ledger`] and [`Notifier`] traits; the
//! bundled [`InMemoryLedger`] is the reference implementation standing in
//! for the external wallet service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;
pub mod notify;

pub use memory::InMemoryLedger;
pub use notify::{LogNotifier, Notifier, NotifyError, RecordingNotifier};

/// Platform fee charged on every contribution, as a fraction of the amount.
pub const PLATFORM_FEE_RATE: f64 = 0.045;

/// Fee owed on a contribution of `amount`.
pub fn platform_fee(amount: f64) -> f64 {
    amount * PLATFORM_FEE_RATE
}

/// Receipt for a completed ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: String,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Wallet already exists: {0}")]
    WalletExists(String),

    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Insufficient funds in {wallet}: required {required}, available {available}")]
    InsufficientFunds {
        wallet: String,
        required: f64,
        available: f64,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// The external wallet/transaction-ledger collaborator.
///
/// Every call either fully succeeds, returning a transaction identifier, or
/// fails with a [`LedgerError`]; no partial-success semantics are exposed.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Provision a wallet for a newly registered user.
    async fn create_user_wallet(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<LedgerTransaction, LedgerError>;

    /// Provision the pooled wallet for a chama.
    async fn create_chama_wallet(
        &self,
        chama_id: i64,
        name: &str,
    ) -> Result<LedgerTransaction, LedgerError>;

    /// Move a contribution from a member wallet into the chama wallet.
    ///
    /// The member is debited `amount` plus the platform fee; the chama
    /// wallet is credited the full `amount` so a whole-pool payout is
    /// always funded.
    async fn process_contribution(
        &self,
        user_id: i64,
        chama_id: i64,
        amount: f64,
        description: &str,
    ) -> Result<LedgerTransaction, LedgerError>;

    /// Move a payout from the chama wallet to the recipient's wallet.
    async fn process_payout(
        &self,
        chama_id: i64,
        recipient_user_id: i64,
        amount: f64,
        description: &str,
    ) -> Result<LedgerTransaction, LedgerError>;
}
