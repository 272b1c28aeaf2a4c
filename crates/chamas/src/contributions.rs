//! Recording member contributions against a cycle.

use tracing::{error, info};

use cycle_database::{ContributeRequest, Contribution, CycleStatus};
use cycle_ledger::platform_fee;

use crate::error::{is_unique_violation, ChamaError, ChamaResult};
use crate::service::ChamaService;

impl ChamaService {
    /// Record a contribution: move the money through the ledger, then
    /// book it locally in one transaction.
    ///
    /// The member is debited amount plus the platform fee; the chama pool
    /// is credited the full amount. One completed contribution per member
    /// per cycle, enforced by a partial unique index as the backstop for
    /// the duplicate pre-check.
    pub async fn contribute_to_chama(
        &self,
        user_id: i64,
        chama_id: i64,
        cycle_id: i64,
        request: ContributeRequest,
    ) -> ChamaResult<Contribution> {
        let chama = self.get_open_chama(chama_id).await?;
        let member = self.require_active_member(chama_id, user_id).await?;

        let cycle = self.get_cycle(cycle_id).await?;
        if cycle.chama_id != chama_id {
            return Err(ChamaError::not_found("Cycle not found"));
        }
        if cycle.status != CycleStatus::Active {
            return Err(ChamaError::business("Cycle is not accepting contributions"));
        }

        if request.amount <= 0.0 {
            return Err(ChamaError::validation("Amount must be greater than zero"));
        }

        let already: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM contributions
             WHERE cycle_id = ? AND member_id = ? AND status = 'completed'",
        )
        .bind(cycle_id)
        .bind(member.id)
        .fetch_optional(self.pool())
        .await?;
        if already.is_some() {
            return Err(ChamaError::business(
                "Member has already contributed to this cycle",
            ));
        }

        let fee = platform_fee(request.amount);
        let txn = self
            .ledger()
            .process_contribution(
                user_id,
                chama_id,
                request.amount,
                &format!("Contribution to {} cycle {}", chama.name, cycle.cycle_number),
            )
            .await?;

        let now = Self::now();
        let mut tx = self.pool().begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO contributions
                 (chama_id, cycle_id, member_id, user_id, transaction_id,
                  amount, fee_amount, status, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 'completed', ?, ?)",
        )
        .bind(chama_id)
        .bind(cycle_id)
        .bind(member.id)
        .bind(user_id)
        .bind(&txn.id)
        .bind(request.amount)
        .bind(fee)
        .bind(&request.notes)
        .bind(&now)
        .execute(&mut *tx)
        .await;

        let contribution_id = match inserted {
            Ok(done) => done.last_insert_rowid(),
            Err(err) if is_unique_violation(&err) => {
                // The money already moved; flag the orphaned ledger
                // transaction for reconciliation.
                error!(
                    transaction_id = %txn.id,
                    cycle_id,
                    member_id = member.id,
                    "duplicate contribution detected after ledger transfer, needs reconciliation"
                );
                return Err(ChamaError::business(
                    "Member has already contributed to this cycle",
                ));
            }
            Err(err) => return Err(err.into()),
        };

        sqlx::query(
            "UPDATE contribution_cycles
             SET collected_amount = collected_amount + ?,
                 fees_collected = fees_collected + ?
             WHERE id = ?",
        )
        .bind(request.amount)
        .bind(fee)
        .bind(cycle_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE chama_members
             SET total_contributed = total_contributed + ?, last_contribution_at = ?
             WHERE id = ?",
        )
        .bind(request.amount)
        .bind(&now)
        .bind(member.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            chama_id,
            cycle_id,
            user_id,
            amount = request.amount,
            fee,
            transaction_id = %txn.id,
            "recorded contribution"
        );

        self.notify_user(
            user_id,
            &format!(
                "Contribution of {:.2} to {} received. Ref {}",
                request.amount, chama.name, txn.id
            ),
        )
        .await;

        let contribution =
            sqlx::query_as::<_, Contribution>("SELECT * FROM contributions WHERE id = ?")
                .bind(contribution_id)
                .fetch_one(self.pool())
                .await?;
        Ok(contribution)
    }
}
