//! Balance and participation views derived from the booked records.

use serde::{Deserialize, Serialize};

use crate::error::ChamaResult;
use crate::service::ChamaService;

/// Snapshot of a chama's pooled funds, derived entirely from completed
/// contributions and payouts rather than the external ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChamaBalance {
    pub chama_id: i64,
    pub balance: f64,
    pub total_contributions: f64,
    pub total_payouts: f64,
    pub total_fees: f64,
    pub active_members: i64,
}

impl ChamaService {
    /// The chama's current balance view. Any member may read.
    pub async fn get_chama_balance(
        &self,
        user_id: i64,
        chama_id: i64,
    ) -> ChamaResult<ChamaBalance> {
        self.get_chama(chama_id).await?;
        self.require_active_member(chama_id, user_id).await?;

        let (total_contributions, total_fees): (f64, f64) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0.0), COALESCE(SUM(fee_amount), 0.0)
             FROM contributions WHERE chama_id = ? AND status = 'completed'",
        )
        .bind(chama_id)
        .fetch_one(self.pool())
        .await?;

        let total_payouts: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0.0)
             FROM payouts WHERE chama_id = ? AND status = 'completed'",
        )
        .bind(chama_id)
        .fetch_one(self.pool())
        .await?;

        let active_members = self.count_active_members(chama_id).await?;

        Ok(ChamaBalance {
            chama_id,
            balance: total_contributions - total_payouts,
            total_contributions,
            total_payouts,
            total_fees,
            active_members,
        })
    }

    /// Completed contributions minus completed payouts.
    pub(crate) async fn compute_balance(&self, chama_id: i64) -> ChamaResult<f64> {
        let balance: f64 = sqlx::query_scalar(
            "SELECT COALESCE((SELECT SUM(amount) FROM contributions
                              WHERE chama_id = ? AND status = 'completed'), 0.0)
                  - COALESCE((SELECT SUM(amount) FROM payouts
                              WHERE chama_id = ? AND status = 'completed'), 0.0)",
        )
        .bind(chama_id)
        .bind(chama_id)
        .fetch_one(self.pool())
        .await?;
        Ok(balance)
    }

    /// Fraction of cycles a member has contributed to, counted over the
    /// cycles opened since they joined. Zero when no such cycle exists.
    pub async fn calculate_contribution_rate(
        &self,
        chama_id: i64,
        user_id: i64,
    ) -> ChamaResult<f64> {
        let member = self.require_active_member(chama_id, user_id).await?;

        let eligible_cycles: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contribution_cycles
             WHERE chama_id = ? AND created_at >= ?",
        )
        .bind(chama_id)
        .bind(&member.joined_at)
        .fetch_one(self.pool())
        .await?;
        if eligible_cycles == 0 {
            return Ok(0.0);
        }

        let contributed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contributions
             WHERE chama_id = ? AND member_id = ? AND status = 'completed'",
        )
        .bind(chama_id)
        .bind(member.id)
        .fetch_one(self.pool())
        .await?;

        Ok(contributed as f64 / eligible_cycles as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChamaError;
    use crate::test_support::test_service;

    #[tokio::test]
    async fn balance_reflects_contributions_and_payouts() {
        let ctx = test_service().await;
        let admin = ctx.register_user("+254755000001").await;
        let member = ctx.register_user("+254755000002").await;
        let chama = ctx.setup_chama(&admin, &[&member], 1000.0, 5).await;
        let cycle = ctx.create_cycle(&admin, chama.id).await;

        let empty = ctx.service.get_chama_balance(admin.id, chama.id).await.unwrap();
        assert_eq!(empty.balance, 0.0);
        assert_eq!(empty.active_members, 2);

        ctx.fund_user(admin.id, 1045.0).await;
        ctx.fund_user(member.id, 1045.0).await;
        ctx.contribute(&admin, chama.id, cycle.id, 1000.0).await;
        ctx.contribute(&member, chama.id, cycle.id, 1000.0).await;

        let funded = ctx.service.get_chama_balance(admin.id, chama.id).await.unwrap();
        assert_eq!(funded.balance, 2000.0);
        assert_eq!(funded.total_contributions, 2000.0);
        assert_eq!(funded.total_fees, 90.0);

        ctx.service
            .execute_payout_cycle(admin.id, chama.id, cycle.id)
            .await
            .unwrap();

        let drained = ctx.service.get_chama_balance(admin.id, chama.id).await.unwrap();
        assert_eq!(drained.balance, 0.0);
        assert_eq!(drained.total_payouts, 2000.0);
    }

    #[tokio::test]
    async fn repeated_reads_return_identical_results() {
        let ctx = test_service().await;
        let admin = ctx.register_user("+254755000005").await;
        let member = ctx.register_user("+254755000006").await;
        let chama = ctx.setup_chama(&admin, &[&member], 1000.0, 5).await;
        let cycle = ctx.create_cycle(&admin, chama.id).await;

        ctx.fund_user(member.id, 1045.0).await;
        ctx.contribute(&member, chama.id, cycle.id, 1000.0).await;

        let first = ctx.service.get_chama_balance(admin.id, chama.id).await.unwrap();
        let second = ctx.service.get_chama_balance(admin.id, chama.id).await.unwrap();
        assert_eq!(first, second);

        let active_a = ctx.service.get_active_cycle(admin.id, chama.id).await.unwrap();
        let active_b = ctx.service.get_active_cycle(admin.id, chama.id).await.unwrap();
        assert_eq!(active_a, active_b);
        assert_eq!(active_a.as_ref().map(|c| c.id), Some(cycle.id));
    }

    #[tokio::test]
    async fn balance_requires_membership() {
        let ctx = test_service().await;
        let admin = ctx.register_user("+254755000010").await;
        let outsider = ctx.register_user("+254755000011").await;
        let chama = ctx.setup_chama(&admin, &[], 1000.0, 5).await;

        let err = ctx
            .service
            .get_chama_balance(outsider.id, chama.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ChamaError::Permission(_)));
    }

    #[tokio::test]
    async fn contribution_rate_counts_cycles_since_join() {
        let ctx = test_service().await;
        let admin = ctx.register_user("+254755000020").await;
        let member = ctx.register_user("+254755000021").await;
        let chama = ctx.setup_chama(&admin, &[&member], 1000.0, 5).await;

        let rate = ctx
            .service
            .calculate_contribution_rate(chama.id, member.id)
            .await
            .unwrap();
        assert_eq!(rate, 0.0, "no cycles yet");

        ctx.fund_user(admin.id, 10_000.0).await;
        ctx.fund_user(member.id, 10_000.0).await;

        let first = ctx.create_cycle(&admin, chama.id).await;
        ctx.contribute(&admin, chama.id, first.id, 1000.0).await;
        ctx.contribute(&member, chama.id, first.id, 1000.0).await;
        ctx.service
            .execute_payout_cycle(admin.id, chama.id, first.id)
            .await
            .unwrap();

        let second = ctx.create_cycle(&admin, chama.id).await;
        ctx.contribute(&admin, chama.id, second.id, 1000.0).await;

        let rate = ctx
            .service
            .calculate_contribution_rate(chama.id, member.id)
            .await
            .unwrap();
        assert_eq!(rate, 0.5, "contributed to one of two cycles");

        let rate = ctx
            .service
            .calculate_contribution_rate(chama.id, admin.id)
            .await
            .unwrap();
        assert_eq!(rate, 1.0);
    }
}
