//! Rotation order: who receives the next payout.

use sqlx::SqlitePool;

use cycle_database::ChamaMember;

use crate::error::ChamaResult;

/// Select the next payout recipient for a chama.
///
/// The recipient is the active member who has received the least money so
/// far; ties break on the lowest payout position, so a fresh chama pays out
/// strictly in join order. Returns `None` when the chama has no active
/// members.
pub async fn next_payout_recipient(
    pool: &SqlitePool,
    chama_id: i64,
) -> ChamaResult<Option<ChamaMember>> {
    let member = sqlx::query_as::<_, ChamaMember>(
        "SELECT * FROM chama_members
         WHERE chama_id = ? AND status = 'active'
         ORDER BY total_received ASC, payout_position ASC
         LIMIT 1",
    )
    .bind(chama_id)
    .fetch_optional(pool)
    .await?;
    Ok(member)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_service;

    #[tokio::test]
    async fn fresh_chama_pays_out_in_join_order() {
        let ctx = test_service().await;
        let admin = ctx.register_user("+254711000001").await;
        let second = ctx.register_user("+254711000002").await;
        let third = ctx.register_user("+254711000003").await;
        let chama = ctx.setup_chama(&admin, &[&second, &third], 1000.0, 5).await;

        let recipient = next_payout_recipient(ctx.service.pool(), chama.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(recipient.user_id, admin.id);
        assert_eq!(recipient.payout_position, 1);
    }

    #[tokio::test]
    async fn least_received_member_goes_next() {
        let ctx = test_service().await;
        let admin = ctx.register_user("+254711000010").await;
        let second = ctx.register_user("+254711000011").await;
        let chama = ctx.setup_chama(&admin, &[&second], 1000.0, 5).await;

        sqlx::query(
            "UPDATE chama_members SET total_received = 1000.0
             WHERE chama_id = ? AND user_id = ?",
        )
        .bind(chama.id)
        .bind(admin.id)
        .execute(ctx.service.pool())
        .await
        .unwrap();

        let recipient = next_payout_recipient(ctx.service.pool(), chama.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(recipient.user_id, second.id);
    }

    #[tokio::test]
    async fn departed_members_are_skipped() {
        let ctx = test_service().await;
        let admin = ctx.register_user("+254711000020").await;
        let second = ctx.register_user("+254711000021").await;
        let chama = ctx.setup_chama(&admin, &[&second], 1000.0, 5).await;

        sqlx::query(
            "UPDATE chama_members SET total_received = 1000.0
             WHERE chama_id = ? AND user_id = ?",
        )
        .bind(chama.id)
        .bind(admin.id)
        .execute(ctx.service.pool())
        .await
        .unwrap();
        ctx.service
            .remove_member(admin.id, chama.id, second.id)
            .await
            .unwrap();

        let recipient = next_payout_recipient(ctx.service.pool(), chama.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(recipient.user_id, admin.id, "only active members are eligible");
    }

    #[tokio::test]
    async fn empty_chama_has_no_recipient() {
        let ctx = test_service().await;
        let recipient = next_payout_recipient(ctx.service.pool(), 999).await.unwrap();
        assert!(recipient.is_none());
    }
}
