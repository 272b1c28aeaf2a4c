//! Contribution cycle entity definitions

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ContributionCycle {
    pub id: i64,
    pub chama_id: i64,
    /// Monotonic per chama, assigned as max(existing) + 1.
    pub cycle_number: i64,
    pub expected_amount: f64,
    pub start_date: String,
    pub due_date: Option<String>,
    /// Explicit recipient override; rotation selection applies when unset.
    pub payout_recipient_id: Option<i64>,
    pub collected_amount: f64,
    pub fees_collected: f64,
    pub status: CycleStatus,
    pub payout_amount: Option<f64>,
    pub payout_executed_at: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    Active,
    Completed,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Active => "active",
            CycleStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCycleRequest {
    /// Defaults to the chama's contribution_amount when unset.
    pub expected_amount: Option<f64>,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub payout_recipient_id: Option<i64>,
}
