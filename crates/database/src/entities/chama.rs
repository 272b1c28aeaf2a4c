//! Chama entity definitions

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Chama {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub admin_user_id: i64,
    pub contribution_amount: f64,
    pub contribution_frequency: String,
    pub target_amount: Option<f64>,
    pub max_members: i64,
    /// Opaque JSON blob of chama-level settings.
    pub settings: Option<String>,
    pub status: ChamaStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChamaRequest {
    pub name: String,
    pub description: Option<String>,
    pub contribution_amount: f64,
    pub contribution_frequency: String,
    pub target_amount: Option<f64>,
    pub max_members: i64,
    pub settings: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChamaStatus {
    Active,
    Closed,
}

impl ChamaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChamaStatus::Active => "active",
            ChamaStatus::Closed => "closed",
        }
    }
}

impl From<&str> for ChamaStatus {
    fn from(s: &str) -> Self {
        match s {
            "closed" => ChamaStatus::Closed,
            _ => ChamaStatus::Active,
        }
    }
}
