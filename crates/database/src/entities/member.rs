//! Chama member entity definitions

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ChamaMember {
    pub id: i64,
    pub chama_id: i64,
    pub user_id: i64,
    pub role: MemberRole,
    pub status: MemberStatus,
    /// Fixed place in the rotation order, assigned at join time and never
    /// reused after a member leaves.
    pub payout_position: i64,
    pub total_contributed: f64,
    pub total_received: f64,
    pub last_contribution_at: Option<String>,
    pub joined_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Admin,
    Treasurer,
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Admin => "admin",
            MemberRole::Treasurer => "treasurer",
            MemberRole::Member => "member",
        }
    }

    /// Roles allowed to manage cycles, invites, and payouts.
    pub fn is_officer(&self) -> bool {
        matches!(self, MemberRole::Admin | MemberRole::Treasurer)
    }
}

impl From<&str> for MemberRole {
    fn from(s: &str) -> Self {
        match s {
            "admin" => MemberRole::Admin,
            "treasurer" => MemberRole::Treasurer,
            _ => MemberRole::Member,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Left,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Left => "left",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: String,
}
