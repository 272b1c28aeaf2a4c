//! Payout entity definitions

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A recorded cycle payout. Exactly one per completed cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Payout {
    pub id: i64,
    pub chama_id: i64,
    pub cycle_id: i64,
    pub recipient_member_id: i64,
    pub recipient_user_id: i64,
    /// Transaction reference issued by the external ledger.
    pub transaction_id: String,
    pub amount: f64,
    pub status: String,
    pub scheduled_at: Option<String>,
    pub executed_at: Option<String>,
    pub created_at: String,
}
