//! Chama invite entity definitions

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ChamaInvite {
    pub id: i64,
    pub chama_id: i64,
    pub invited_by: i64,
    pub invitee_user_id: i64,
    pub invitee_phone: Option<String>,
    pub status: InviteStatus,
    pub expires_at: String,
    pub created_at: String,
    pub responded_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Declined => "declined",
            InviteStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteMemberRequest {
    pub user_id: i64,
    /// Overrides the configured invite expiry when set.
    pub expires_in_hours: Option<i64>,
}
