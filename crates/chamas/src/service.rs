//! Service construction and shared lookups.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::warn;

use cycle_config::InviteConfig;
use cycle_database::{Chama, ChamaMember, ChamaStatus, MemberStatus, User};
use cycle_ledger::{Ledger, Notifier};

use crate::error::{ChamaError, ChamaResult};

/// The chama service: all business operations over the pool plus the
/// ledger and notification collaborators.
#[derive(Clone)]
pub struct ChamaService {
    pool: SqlitePool,
    ledger: Arc<dyn Ledger>,
    notifier: Arc<dyn Notifier>,
    invite_expiry_hours: i64,
}

impl ChamaService {
    pub fn new(
        pool: SqlitePool,
        ledger: Arc<dyn Ledger>,
        notifier: Arc<dyn Notifier>,
        invites: &InviteConfig,
    ) -> Self {
        Self {
            pool,
            ledger,
            notifier,
            invite_expiry_hours: invites.expiry_hours,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    pub(crate) fn invite_expiry_hours(&self) -> i64 {
        self.invite_expiry_hours
    }

    /// RFC 3339 timestamp for "now", the storage format throughout.
    pub(crate) fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    /// Fetch a chama or fail with not-found.
    pub async fn get_chama(&self, chama_id: i64) -> ChamaResult<Chama> {
        sqlx::query_as::<_, Chama>("SELECT * FROM chamas WHERE id = ?")
            .bind(chama_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ChamaError::not_found("Chama not found"))
    }

    /// Fetch a chama and reject operations against closed ones.
    pub(crate) async fn get_open_chama(&self, chama_id: i64) -> ChamaResult<Chama> {
        let chama = self.get_chama(chama_id).await?;
        if chama.status != ChamaStatus::Active {
            return Err(ChamaError::business("Chama is closed"));
        }
        Ok(chama)
    }

    pub(crate) async fn member_record(
        &self,
        chama_id: i64,
        user_id: i64,
    ) -> ChamaResult<Option<ChamaMember>> {
        let member = sqlx::query_as::<_, ChamaMember>(
            "SELECT * FROM chama_members WHERE chama_id = ? AND user_id = ?",
        )
        .bind(chama_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    /// Resolve the caller's active membership row or fail with a
    /// permission error.
    pub(crate) async fn require_active_member(
        &self,
        chama_id: i64,
        user_id: i64,
    ) -> ChamaResult<ChamaMember> {
        match self.member_record(chama_id, user_id).await? {
            Some(member) if member.status == MemberStatus::Active => Ok(member),
            _ => Err(ChamaError::permission("Not an active member of this chama")),
        }
    }

    /// Like [`Self::require_active_member`] but also requires an
    /// admin or treasurer role.
    pub(crate) async fn require_officer(
        &self,
        chama_id: i64,
        user_id: i64,
    ) -> ChamaResult<ChamaMember> {
        let member = self.require_active_member(chama_id, user_id).await?;
        if !member.role.is_officer() {
            return Err(ChamaError::permission(
                "Only admins and treasurers may perform this action",
            ));
        }
        Ok(member)
    }

    pub(crate) async fn get_user(&self, user_id: i64) -> ChamaResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ChamaError::not_found("User not found"))
    }

    /// Send an SMS to a user, best-effort. Delivery failures are logged
    /// and never propagated to the caller.
    pub(crate) async fn notify_user(&self, user_id: i64, message: &str) {
        let phone: Option<String> =
            match sqlx::query_scalar("SELECT phone_number FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
            {
                Ok(phone) => phone,
                Err(err) => {
                    warn!(user_id, error = %err, "failed to look up phone number for sms");
                    return;
                }
            };

        let Some(phone) = phone else {
            return;
        };

        if let Err(err) = self.notifier.send_sms_receipt(&phone, message).await {
            warn!(user_id, error = %err, "sms delivery failed");
        }
    }
}
