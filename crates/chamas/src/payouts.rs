//! Rotating payout execution.

use tracing::{info, warn};

use cycle_database::{CycleStatus, MemberStatus, Payout};

use crate::error::{ChamaError, ChamaResult};
use crate::rotation::next_payout_recipient;
use crate::service::ChamaService;

impl ChamaService {
    /// Pay the cycle's pool out to its recipient and complete the cycle.
    ///
    /// Exactly one payout per cycle. The executor claims the cycle with a
    /// conditional update before touching the ledger, so two concurrent
    /// calls cannot both pay; the loser gets a business error. The claim
    /// also completes the cycle, which stops contributions from landing
    /// after the pool amount has been snapshotted. If the ledger then
    /// declines, the claim is released (cycle back to active) so the
    /// payout can be retried.
    pub async fn execute_payout_cycle(
        &self,
        user_id: i64,
        chama_id: i64,
        cycle_id: i64,
    ) -> ChamaResult<Payout> {
        let chama = self.get_open_chama(chama_id).await?;
        self.require_officer(chama_id, user_id).await?;

        let cycle = self.get_cycle(cycle_id).await?;
        if cycle.chama_id != chama_id {
            return Err(ChamaError::not_found("Cycle not found"));
        }
        if cycle.status != CycleStatus::Active || cycle.payout_executed_at.is_some() {
            return Err(ChamaError::business("Cycle payout has already been executed"));
        }

        let recipient = match cycle.payout_recipient_id {
            Some(recipient_user_id) => self
                .member_record(chama_id, recipient_user_id)
                .await?
                .filter(|m| m.status == MemberStatus::Active)
                .ok_or_else(|| {
                    ChamaError::business("Designated recipient is no longer an active member")
                })?,
            None => next_payout_recipient(self.pool(), chama_id)
                .await?
                .ok_or_else(|| ChamaError::business("Chama has no active members"))?,
        };

        let amount = cycle.collected_amount;
        if amount <= 0.0 {
            return Err(ChamaError::business("Cycle has no collected funds to pay out"));
        }

        let now = Self::now();

        // Claim the cycle and close it to further contributions.
        // rows_affected == 0 means another executor won.
        let claimed = sqlx::query(
            "UPDATE contribution_cycles
             SET status = 'completed', payout_executed_at = ?
             WHERE id = ? AND status = 'active' AND payout_executed_at IS NULL",
        )
        .bind(&now)
        .bind(cycle_id)
        .execute(self.pool())
        .await?;
        if claimed.rows_affected() != 1 {
            return Err(ChamaError::business("Cycle payout has already been executed"));
        }

        let txn = match self
            .ledger()
            .process_payout(
                chama_id,
                recipient.user_id,
                amount,
                &format!("Payout for {} cycle {}", chama.name, cycle.cycle_number),
            )
            .await
        {
            Ok(txn) => txn,
            Err(err) => {
                // Release the claim so the payout can be retried.
                if let Err(release_err) = sqlx::query(
                    "UPDATE contribution_cycles
                     SET status = 'active', payout_executed_at = NULL
                     WHERE id = ?",
                )
                .bind(cycle_id)
                .execute(self.pool())
                .await
                {
                    warn!(cycle_id, error = %release_err, "failed to release payout claim");
                }
                return Err(err.into());
            }
        };

        let mut tx = self.pool().begin().await?;

        let payout_id = sqlx::query(
            "INSERT INTO payouts
                 (chama_id, cycle_id, recipient_member_id, recipient_user_id,
                  transaction_id, amount, status, executed_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 'completed', ?, ?)",
        )
        .bind(chama_id)
        .bind(cycle_id)
        .bind(recipient.id)
        .bind(recipient.user_id)
        .bind(&txn.id)
        .bind(amount)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query(
            "UPDATE contribution_cycles
             SET status = 'completed', payout_amount = ?, completed_at = ?
             WHERE id = ?",
        )
        .bind(amount)
        .bind(&now)
        .bind(cycle_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE chama_members SET total_received = total_received + ? WHERE id = ?")
            .bind(amount)
            .bind(recipient.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            chama_id,
            cycle_id,
            recipient_user_id = recipient.user_id,
            amount,
            transaction_id = %txn.id,
            "executed cycle payout"
        );

        self.notify_user(
            recipient.user_id,
            &format!(
                "Payout of {:.2} from {} sent to your wallet. Ref {}",
                amount, chama.name, txn.id
            ),
        )
        .await;

        let payout = sqlx::query_as::<_, Payout>("SELECT * FROM payouts WHERE id = ?")
            .bind(payout_id)
            .fetch_one(self.pool())
            .await?;
        Ok(payout)
    }

    /// Payout history for a chama, newest first. Any member may read.
    pub async fn list_payouts(&self, user_id: i64, chama_id: i64) -> ChamaResult<Vec<Payout>> {
        self.get_chama(chama_id).await?;
        self.require_active_member(chama_id, user_id).await?;

        let payouts = sqlx::query_as::<_, Payout>(
            "SELECT * FROM payouts WHERE chama_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(chama_id)
        .fetch_all(self.pool())
        .await?;
        Ok(payouts)
    }
}
