//! Contribution entity definitions

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A recorded member contribution. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Contribution {
    pub id: i64,
    pub chama_id: i64,
    pub cycle_id: i64,
    pub member_id: i64,
    pub user_id: i64,
    /// Transaction reference issued by the external ledger.
    pub transaction_id: String,
    pub amount: f64,
    pub fee_amount: f64,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributeRequest {
    pub amount: f64,
    pub notes: Option<String>,
}
