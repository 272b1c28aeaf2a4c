//! Contribution cycle lifecycle.

use tracing::info;

use cycle_database::{ContributionCycle, CreateCycleRequest, MemberStatus};

use crate::error::{is_unique_violation, ChamaError, ChamaResult};
use crate::service::ChamaService;

impl ChamaService {
    /// Open a new contribution cycle. Admin/treasurer only; at most one
    /// active cycle per chama, enforced by a partial unique index so two
    /// racing creators cannot both succeed.
    pub async fn create_contribution_cycle(
        &self,
        user_id: i64,
        chama_id: i64,
        request: CreateCycleRequest,
    ) -> ChamaResult<ContributionCycle> {
        let chama = self.get_open_chama(chama_id).await?;
        self.require_officer(chama_id, user_id).await?;

        let expected_amount = request.expected_amount.unwrap_or(chama.contribution_amount);
        if expected_amount <= 0.0 {
            return Err(ChamaError::validation(
                "Expected amount must be greater than zero",
            ));
        }

        if let Some(recipient_id) = request.payout_recipient_id {
            let recipient = self
                .member_record(chama_id, recipient_id)
                .await?
                .filter(|m| m.status == MemberStatus::Active);
            if recipient.is_none() {
                return Err(ChamaError::validation(
                    "Payout recipient is not an active member",
                ));
            }
        }

        let now = Self::now();
        let start_date = request.start_date.unwrap_or_else(|| now.clone());

        let result = sqlx::query(
            "INSERT INTO contribution_cycles
                 (chama_id, cycle_number, expected_amount, start_date, due_date,
                  payout_recipient_id, collected_amount, fees_collected, status,
                  created_at)
             SELECT ?, COALESCE(MAX(cycle_number), 0) + 1, ?, ?, ?, ?, 0, 0, 'active', ?
             FROM contribution_cycles WHERE chama_id = ?",
        )
        .bind(chama_id)
        .bind(expected_amount)
        .bind(&start_date)
        .bind(&request.due_date)
        .bind(request.payout_recipient_id)
        .bind(&now)
        .bind(chama_id)
        .execute(self.pool())
        .await;

        let cycle_id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(err) if is_unique_violation(&err) => {
                return Err(ChamaError::business("Chama already has an active cycle"));
            }
            Err(err) => return Err(err.into()),
        };

        info!(chama_id, cycle_id, expected_amount, "opened contribution cycle");

        self.get_cycle(cycle_id).await
    }

    /// The chama's currently active cycle, if any. Any member may read;
    /// no active cycle is an ordinary `None`, not an error.
    pub async fn get_active_cycle(
        &self,
        user_id: i64,
        chama_id: i64,
    ) -> ChamaResult<Option<ContributionCycle>> {
        self.get_chama(chama_id).await?;
        self.require_active_member(chama_id, user_id).await?;

        let cycle = sqlx::query_as::<_, ContributionCycle>(
            "SELECT * FROM contribution_cycles WHERE chama_id = ? AND status = 'active'",
        )
        .bind(chama_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(cycle)
    }

    /// All cycles for a chama, newest first. Any member may read.
    pub async fn list_cycles(
        &self,
        user_id: i64,
        chama_id: i64,
    ) -> ChamaResult<Vec<ContributionCycle>> {
        self.get_chama(chama_id).await?;
        self.require_active_member(chama_id, user_id).await?;

        let cycles = sqlx::query_as::<_, ContributionCycle>(
            "SELECT * FROM contribution_cycles WHERE chama_id = ? ORDER BY cycle_number DESC",
        )
        .bind(chama_id)
        .fetch_all(self.pool())
        .await?;
        Ok(cycles)
    }

    pub(crate) async fn get_cycle(&self, cycle_id: i64) -> ChamaResult<ContributionCycle> {
        sqlx::query_as::<_, ContributionCycle>(
            "SELECT * FROM contribution_cycles WHERE id = ?",
        )
        .bind(cycle_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| ChamaError::not_found("Cycle not found"))
    }
}
