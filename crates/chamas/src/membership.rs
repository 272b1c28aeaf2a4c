//! Membership registry: users, chama creation, invites, roles.

use rand::{distributions::Alphanumeric, Rng};
use tracing::{info, warn};

use cycle_database::{
    Chama, ChamaInvite, ChamaMember, CreateChamaRequest, InviteMemberRequest, InviteStatus,
    MemberRole, MemberStatus, RegisterUserRequest, UpdateMemberRoleRequest, User,
};

use crate::error::{is_unique_violation, ChamaError, ChamaResult};
use crate::service::ChamaService;

impl ChamaService {
    /// Register a user and issue an API token.
    ///
    /// Wallet provisioning is fire-and-forget here: a ledger outage must
    /// not block registration, so failures are logged and swallowed.
    pub async fn register_user(&self, request: RegisterUserRequest) -> ChamaResult<User> {
        let phone = request.phone_number.trim();
        if phone.is_empty() {
            return Err(ChamaError::validation("Phone number must not be empty"));
        }

        let token = generate_api_token();
        let now = Self::now();

        let result = sqlx::query(
            "INSERT INTO users (phone_number, display_name, api_token, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(phone)
        .bind(&request.display_name)
        .bind(&token)
        .bind(&now)
        .execute(self.pool())
        .await;

        let user_id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(err) if is_unique_violation(&err) => {
                return Err(ChamaError::business("Phone number already registered"));
            }
            Err(err) => return Err(err.into()),
        };

        let wallet_name = request
            .display_name
            .clone()
            .unwrap_or_else(|| phone.to_string());
        if let Err(err) = self.ledger().create_user_wallet(user_id, &wallet_name).await {
            warn!(user_id, error = %err, "user wallet provisioning failed, continuing");
        }

        info!(user_id, phone_number = phone, "registered user");

        self.get_user(user_id).await
    }

    /// Create a chama with the caller as its admin member.
    ///
    /// Chama row, admin membership, and chama wallet provisioning stand or
    /// fall together: a ledger failure rolls the local writes back so no
    /// chama exists without a wallet.
    pub async fn create_chama(
        &self,
        admin_user_id: i64,
        request: CreateChamaRequest,
    ) -> ChamaResult<Chama> {
        if request.contribution_amount <= 0.0 {
            return Err(ChamaError::validation(
                "Contribution amount must be greater than zero",
            ));
        }
        if request.max_members < 1 {
            return Err(ChamaError::validation("Max members must be at least 1"));
        }

        self.get_user(admin_user_id).await?;

        let now = Self::now();
        let mut tx = self.pool().begin().await?;

        let chama_id = sqlx::query(
            "INSERT INTO chamas
                 (name, description, admin_user_id, contribution_amount,
                  contribution_frequency, target_amount, max_members, settings,
                  status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'active', ?, ?)",
        )
        .bind(&request.name)
        .bind(&request.description)
        .bind(admin_user_id)
        .bind(request.contribution_amount)
        .bind(&request.contribution_frequency)
        .bind(request.target_amount)
        .bind(request.max_members)
        .bind(&request.settings)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO chama_members
                 (chama_id, user_id, role, status, payout_position, joined_at)
             VALUES (?, ?, 'admin', 'active', 1, ?)",
        )
        .bind(chama_id)
        .bind(admin_user_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        // Wallet creation failure aborts the whole operation.
        self.ledger().create_chama_wallet(chama_id, &request.name).await?;

        tx.commit().await?;

        info!(chama_id, admin_user_id, "created chama");

        self.get_chama(chama_id).await
    }

    /// Invite a registered user into a chama. Admin/treasurer only.
    pub async fn invite_member(
        &self,
        user_id: i64,
        chama_id: i64,
        request: InviteMemberRequest,
    ) -> ChamaResult<ChamaInvite> {
        let chama = self.get_open_chama(chama_id).await?;
        self.require_officer(chama_id, user_id).await?;

        let invitee = self.get_user(request.user_id).await?;

        if let Some(existing) = self.member_record(chama_id, invitee.id).await? {
            if existing.status == MemberStatus::Active {
                return Err(ChamaError::business("User is already a member"));
            }
        }

        let active_members = self.count_active_members(chama_id).await?;
        if active_members >= chama.max_members {
            return Err(ChamaError::business("Chama is full"));
        }

        let hours = request
            .expires_in_hours
            .unwrap_or_else(|| self.invite_expiry_hours());
        if hours <= 0 {
            return Err(ChamaError::validation(
                "Invite expiry must be a positive number of hours",
            ));
        }
        let expires_at = (chrono::Utc::now() + chrono::Duration::hours(hours)).to_rfc3339();
        let now = Self::now();

        let invite_id = sqlx::query(
            "INSERT INTO chama_invites
                 (chama_id, invited_by, invitee_user_id, invitee_phone, status,
                  expires_at, created_at)
             VALUES (?, ?, ?, ?, 'pending', ?, ?)",
        )
        .bind(chama_id)
        .bind(user_id)
        .bind(invitee.id)
        .bind(&invitee.phone_number)
        .bind(&expires_at)
        .bind(&now)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        info!(invite_id, chama_id, invitee_user_id = invitee.id, "created chama invite");

        self.notify_user(
            invitee.id,
            &format!("You have been invited to join the chama '{}'", chama.name),
        )
        .await;

        self.get_invite(invite_id).await
    }

    /// Accept a pending invite. Creates the membership row with the next
    /// payout position; positions are never reused after a member leaves.
    pub async fn accept_invite(&self, user_id: i64, invite_id: i64) -> ChamaResult<ChamaMember> {
        let invite = self.get_invite(invite_id).await?;

        if invite.invitee_user_id != user_id {
            return Err(ChamaError::permission("Invite is not addressed to this user"));
        }
        if invite.status != InviteStatus::Pending {
            return Err(ChamaError::business("Invite has already been used"));
        }

        let expiry = chrono::DateTime::parse_from_rfc3339(&invite.expires_at)
            .map_err(|e| ChamaError::business(format!("Invalid invite expiry: {e}")))?;
        if expiry < chrono::Utc::now() {
            return Err(ChamaError::business("Invite has expired"));
        }

        let chama = self.get_open_chama(invite.chama_id).await?;

        // Capacity is re-checked at accept time: outstanding invites may
        // outnumber the remaining seats.
        let active_members = self.count_active_members(chama.id).await?;
        if active_members >= chama.max_members {
            return Err(ChamaError::business("Chama is full"));
        }

        let existing = self.member_record(chama.id, user_id).await?;
        if matches!(&existing, Some(m) if m.status == MemberStatus::Active) {
            return Err(ChamaError::business("User is already a member"));
        }

        let now = Self::now();
        let mut tx = self.pool().begin().await?;

        let next_position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(payout_position), 0) + 1 FROM chama_members WHERE chama_id = ?",
        )
        .bind(chama.id)
        .fetch_one(&mut *tx)
        .await?;

        match existing {
            // A member who previously left rejoins with a fresh position at
            // the end of the rotation.
            Some(previous) => {
                sqlx::query(
                    "UPDATE chama_members
                     SET status = 'active', role = 'member', payout_position = ?, joined_at = ?
                     WHERE id = ?",
                )
                .bind(next_position)
                .bind(&now)
                .bind(previous.id)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO chama_members
                         (chama_id, user_id, role, status, payout_position, joined_at)
                     VALUES (?, ?, 'member', 'active', ?, ?)",
                )
                .bind(chama.id)
                .bind(user_id)
                .bind(next_position)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query("UPDATE chama_invites SET status = 'accepted', responded_at = ? WHERE id = ?")
            .bind(&now)
            .bind(invite_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            invite_id,
            chama_id = chama.id,
            user_id,
            payout_position = next_position,
            "accepted chama invite"
        );

        self.require_active_member(chama.id, user_id).await
    }

    /// Change a member's role. Admin only; roles are limited to
    /// admin/treasurer/member and the chama admin cannot be reassigned.
    pub async fn update_member_role(
        &self,
        caller_id: i64,
        chama_id: i64,
        target_user_id: i64,
        request: UpdateMemberRoleRequest,
    ) -> ChamaResult<ChamaMember> {
        let chama = self.get_open_chama(chama_id).await?;
        let caller = self.require_active_member(chama_id, caller_id).await?;
        if caller.role != MemberRole::Admin {
            return Err(ChamaError::permission("Only the admin may change roles"));
        }

        if !matches!(request.role.as_str(), "admin" | "treasurer" | "member") {
            return Err(ChamaError::validation("Invalid role"));
        }

        let target = self
            .member_record(chama_id, target_user_id)
            .await?
            .filter(|m| m.status == MemberStatus::Active)
            .ok_or_else(|| ChamaError::not_found("Member not found"))?;

        if target.user_id == chama.admin_user_id {
            return Err(ChamaError::business("Cannot change the chama admin's role"));
        }

        sqlx::query("UPDATE chama_members SET role = ? WHERE id = ?")
            .bind(&request.role)
            .bind(target.id)
            .execute(self.pool())
            .await?;

        info!(chama_id, target_user_id, role = %request.role, "updated member role");

        self.require_active_member(chama_id, target_user_id).await
    }

    /// Soft-remove a member (status flips to "left"; the row and its payout
    /// position are retained). Admin only; the chama admin cannot be removed.
    pub async fn remove_member(
        &self,
        caller_id: i64,
        chama_id: i64,
        target_user_id: i64,
    ) -> ChamaResult<()> {
        let chama = self.get_open_chama(chama_id).await?;
        let caller = self.require_active_member(chama_id, caller_id).await?;
        if caller.role != MemberRole::Admin {
            return Err(ChamaError::permission("Only the admin may remove members"));
        }

        let target = self
            .member_record(chama_id, target_user_id)
            .await?
            .filter(|m| m.status == MemberStatus::Active)
            .ok_or_else(|| ChamaError::not_found("Member not found"))?;

        if target.user_id == chama.admin_user_id {
            return Err(ChamaError::business("Cannot remove the chama admin"));
        }

        sqlx::query("UPDATE chama_members SET status = 'left' WHERE id = ?")
            .bind(target.id)
            .execute(self.pool())
            .await?;

        info!(chama_id, target_user_id, removed_by = caller_id, "removed member");
        Ok(())
    }

    /// List a chama's members in rotation order. Any member may read.
    pub async fn list_members(&self, user_id: i64, chama_id: i64) -> ChamaResult<Vec<ChamaMember>> {
        self.require_active_member(chama_id, user_id).await?;

        let members = sqlx::query_as::<_, ChamaMember>(
            "SELECT * FROM chama_members WHERE chama_id = ? ORDER BY payout_position ASC",
        )
        .bind(chama_id)
        .fetch_all(self.pool())
        .await?;
        Ok(members)
    }

    /// Close a chama. Admin only, and the computed balance must be exactly
    /// zero so no pooled funds are stranded.
    pub async fn close_chama(&self, caller_id: i64, chama_id: i64) -> ChamaResult<Chama> {
        let chama = self.get_open_chama(chama_id).await?;
        if chama.admin_user_id != caller_id {
            return Err(ChamaError::permission("Only the admin may close the chama"));
        }

        let balance = self.compute_balance(chama_id).await?;
        if balance != 0.0 {
            return Err(ChamaError::business(
                "Chama balance must be zero before closing",
            ));
        }

        sqlx::query("UPDATE chamas SET status = 'closed', updated_at = ? WHERE id = ?")
            .bind(Self::now())
            .bind(chama_id)
            .execute(self.pool())
            .await?;

        info!(chama_id, closed_by = caller_id, "closed chama");

        self.get_chama(chama_id).await
    }

    pub(crate) async fn get_invite(&self, invite_id: i64) -> ChamaResult<ChamaInvite> {
        sqlx::query_as::<_, ChamaInvite>("SELECT * FROM chama_invites WHERE id = ?")
            .bind(invite_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| ChamaError::not_found("Invite not found"))
    }

    pub(crate) async fn count_active_members(&self, chama_id: i64) -> ChamaResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chama_members WHERE chama_id = ? AND status = 'active'",
        )
        .bind(chama_id)
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }
}

fn generate_api_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(40)
        .map(char::from)
        .collect()
}
