//! In-memory reference ledger.
//!
//! Keeps wallet balances behind a tokio mutex, mirroring the behaviour the
//! service layer expects from the external wallet service: wallets must be
//! provisioned before use, overdrafts are rejected, and every successful
//! call yields a transaction id.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::{platform_fee, Ledger, LedgerError, LedgerTransaction};

#[derive(Debug, Default)]
struct LedgerBook {
    user_wallets: HashMap<i64, f64>,
    chama_wallets: HashMap<i64, f64>,
    platform_fees: f64,
    sequence: u64,
}

impl LedgerBook {
    fn next_transaction(&mut self) -> LedgerTransaction {
        self.sequence += 1;
        LedgerTransaction {
            id: format!("txn-{:08}", self.sequence),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<Mutex<LedgerBook>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit a user wallet out of band. Test and seed helper.
    pub async fn deposit_user(&self, user_id: i64, amount: f64) -> Result<(), LedgerError> {
        let mut book = self.inner.lock().await;
        let balance = book
            .user_wallets
            .get_mut(&user_id)
            .ok_or_else(|| LedgerError::WalletNotFound(format!("user:{user_id}")))?;
        *balance += amount;
        Ok(())
    }

    pub async fn user_balance(&self, user_id: i64) -> Option<f64> {
        self.inner.lock().await.user_wallets.get(&user_id).copied()
    }

    pub async fn chama_balance(&self, chama_id: i64) -> Option<f64> {
        self.inner
            .lock()
            .await
            .chama_wallets
            .get(&chama_id)
            .copied()
    }

    pub async fn collected_fees(&self) -> f64 {
        self.inner.lock().await.platform_fees
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn create_user_wallet(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<LedgerTransaction, LedgerError> {
        let mut book = self.inner.lock().await;
        if book.user_wallets.contains_key(&user_id) {
            return Err(LedgerError::WalletExists(format!("user:{user_id}")));
        }
        book.user_wallets.insert(user_id, 0.0);
        let txn = book.next_transaction();
        info!(user_id, name, txn = %txn.id, "created user wallet");
        Ok(txn)
    }

    async fn create_chama_wallet(
        &self,
        chama_id: i64,
        name: &str,
    ) -> Result<LedgerTransaction, LedgerError> {
        let mut book = self.inner.lock().await;
        if book.chama_wallets.contains_key(&chama_id) {
            return Err(LedgerError::WalletExists(format!("chama:{chama_id}")));
        }
        book.chama_wallets.insert(chama_id, 0.0);
        let txn = book.next_transaction();
        info!(chama_id, name, txn = %txn.id, "created chama wallet");
        Ok(txn)
    }

    async fn process_contribution(
        &self,
        user_id: i64,
        chama_id: i64,
        amount: f64,
        description: &str,
    ) -> Result<LedgerTransaction, LedgerError> {
        if amount <= 0.0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let fee = platform_fee(amount);
        let mut book = self.inner.lock().await;

        let user_balance = book
            .user_wallets
            .get(&user_id)
            .copied()
            .ok_or_else(|| LedgerError::WalletNotFound(format!("user:{user_id}")))?;
        if !book.chama_wallets.contains_key(&chama_id) {
            return Err(LedgerError::WalletNotFound(format!("chama:{chama_id}")));
        }

        let required = amount + fee;
        if user_balance < required {
            return Err(LedgerError::InsufficientFunds {
                wallet: format!("user:{user_id}"),
                required,
                available: user_balance,
            });
        }

        *book.user_wallets.get_mut(&user_id).unwrap() -= required;
        *book.chama_wallets.get_mut(&chama_id).unwrap() += amount;
        book.platform_fees += fee;

        let txn = book.next_transaction();
        info!(user_id, chama_id, amount, fee, description, txn = %txn.id, "processed contribution");
        Ok(txn)
    }

    async fn process_payout(
        &self,
        chama_id: i64,
        recipient_user_id: i64,
        amount: f64,
        description: &str,
    ) -> Result<LedgerTransaction, LedgerError> {
        if amount <= 0.0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let mut book = self.inner.lock().await;

        let chama_balance = book
            .chama_wallets
            .get(&chama_id)
            .copied()
            .ok_or_else(|| LedgerError::WalletNotFound(format!("chama:{chama_id}")))?;
        if !book.user_wallets.contains_key(&recipient_user_id) {
            return Err(LedgerError::WalletNotFound(format!(
                "user:{recipient_user_id}"
            )));
        }

        if chama_balance < amount {
            return Err(LedgerError::InsufficientFunds {
                wallet: format!("chama:{chama_id}"),
                required: amount,
                available: chama_balance,
            });
        }

        *book.chama_wallets.get_mut(&chama_id).unwrap() -= amount;
        *book.user_wallets.get_mut(&recipient_user_id).unwrap() += amount;

        let txn = book.next_transaction();
        info!(chama_id, recipient_user_id, amount, description, txn = %txn.id, "processed payout");
        Ok(txn)
    }
}
