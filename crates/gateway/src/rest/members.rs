//! Membership and invite REST endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use cycle_database::{ChamaInvite, ChamaMember, InviteMemberRequest, UpdateMemberRoleRequest};

use crate::error::GatewayResult;
use crate::middleware::AuthenticatedUser;
use crate::state::GatewayState;

#[derive(Debug, Serialize, ToSchema)]
pub struct MemberResponse {
    pub id: i64,
    pub chama_id: i64,
    pub user_id: i64,
    pub role: String,
    pub status: String,
    pub payout_position: i64,
    pub total_contributed: f64,
    pub total_received: f64,
    pub joined_at: String,
}

impl From<ChamaMember> for MemberResponse {
    fn from(member: ChamaMember) -> Self {
        Self {
            id: member.id,
            chama_id: member.chama_id,
            user_id: member.user_id,
            role: member.role.as_str().to_string(),
            status: member.status.as_str().to_string(),
            payout_position: member.payout_position,
            total_contributed: member.total_contributed,
            total_received: member.total_received,
            joined_at: member.joined_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InviteResponse {
    pub id: i64,
    pub chama_id: i64,
    pub invited_by: i64,
    pub invitee_user_id: i64,
    pub status: String,
    pub expires_at: String,
    pub created_at: String,
}

impl From<ChamaInvite> for InviteResponse {
    fn from(invite: ChamaInvite) -> Self {
        Self {
            id: invite.id,
            chama_id: invite.chama_id,
            invited_by: invite.invited_by,
            invitee_user_id: invite.invitee_user_id,
            status: invite.status.as_str().to_string(),
            expires_at: invite.expires_at,
            created_at: invite.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InviteBody {
    pub user_id: i64,
    pub expires_in_hours: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleBody {
    pub role: String,
}

pub fn create_member_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/chama/:chama_id/invite", post(invite_member))
        .route("/chama/invite/:invite_id/accept", post(accept_invite))
        .route("/chama/:chama_id/members", get(list_members))
        .route(
            "/chama/:chama_id/members/:user_id/role",
            put(update_member_role),
        )
        .route("/chama/:chama_id/members/:user_id", delete(remove_member))
}

#[utoipa::path(
    post,
    path = "/chama/{chama_id}/invite",
    tag = "members",
    params(("chama_id" = i64, Path, description = "Chama id")),
    request_body = InviteBody,
    responses(
        (status = 200, description = "Invite created", body = InviteResponse),
        (status = 403, description = "Caller is not an officer"),
        (status = 404, description = "Chama or user not found"),
        (status = 409, description = "Already a member or chama full")
    )
)]
pub async fn invite_member(
    Path(chama_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(body): Json<InviteBody>,
) -> GatewayResult<Json<InviteResponse>> {
    let invite = state
        .chama_service()
        .invite_member(
            user_id,
            chama_id,
            InviteMemberRequest {
                user_id: body.user_id,
                expires_in_hours: body.expires_in_hours,
            },
        )
        .await?;
    Ok(Json(invite.into()))
}

#[utoipa::path(
    post,
    path = "/chama/invite/{invite_id}/accept",
    tag = "members",
    params(("invite_id" = i64, Path, description = "Invite id")),
    responses(
        (status = 200, description = "Invite accepted", body = MemberResponse),
        (status = 403, description = "Invite addressed to another user"),
        (status = 404, description = "Invite not found"),
        (status = 409, description = "Invite expired, used, or chama full")
    )
)]
pub async fn accept_invite(
    Path(invite_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<MemberResponse>> {
    let member = state.chama_service().accept_invite(user_id, invite_id).await?;
    Ok(Json(member.into()))
}

#[utoipa::path(
    get,
    path = "/chama/{chama_id}/members",
    tag = "members",
    params(("chama_id" = i64, Path, description = "Chama id")),
    responses(
        (status = 200, description = "Members in rotation order", body = Vec<MemberResponse>),
        (status = 403, description = "Caller is not a member")
    )
)]
pub async fn list_members(
    Path(chama_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<Vec<MemberResponse>>> {
    let members = state.chama_service().list_members(user_id, chama_id).await?;
    Ok(Json(members.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    put,
    path = "/chama/{chama_id}/members/{user_id}/role",
    tag = "members",
    params(
        ("chama_id" = i64, Path, description = "Chama id"),
        ("user_id" = i64, Path, description = "Target user id")
    ),
    request_body = RoleBody,
    responses(
        (status = 200, description = "Role updated", body = MemberResponse),
        (status = 400, description = "Invalid role"),
        (status = 403, description = "Caller is not the admin"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn update_member_role(
    Path((chama_id, target_user_id)): Path<(i64, i64)>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(body): Json<RoleBody>,
) -> GatewayResult<Json<MemberResponse>> {
    let member = state
        .chama_service()
        .update_member_role(
            user_id,
            chama_id,
            target_user_id,
            UpdateMemberRoleRequest { role: body.role },
        )
        .await?;
    Ok(Json(member.into()))
}

#[utoipa::path(
    delete,
    path = "/chama/{chama_id}/members/{user_id}",
    tag = "members",
    params(
        ("chama_id" = i64, Path, description = "Chama id"),
        ("user_id" = i64, Path, description = "Target user id")
    ),
    responses(
        (status = 200, description = "Member removed"),
        (status = 403, description = "Caller is not the admin"),
        (status = 404, description = "Member not found"),
        (status = 409, description = "Cannot remove the chama admin")
    )
)]
pub async fn remove_member(
    Path((chama_id, target_user_id)): Path<(i64, i64)>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<serde_json::Value>> {
    state
        .chama_service()
        .remove_member(user_id, chama_id, target_user_id)
        .await?;
    Ok(Json(serde_json::json!({ "removed": true })))
}
