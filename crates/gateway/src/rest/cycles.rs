//! Contribution cycle, contribution, and payout REST endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use cycle_database::{
    ContributeRequest, Contribution, ContributionCycle, CreateCycleRequest, Payout,
};

use crate::error::GatewayResult;
use crate::middleware::AuthenticatedUser;
use crate::state::GatewayState;

#[derive(Debug, Serialize, ToSchema)]
pub struct CycleResponse {
    pub id: i64,
    pub chama_id: i64,
    pub cycle_number: i64,
    pub expected_amount: f64,
    pub start_date: String,
    pub due_date: Option<String>,
    pub payout_recipient_id: Option<i64>,
    pub collected_amount: f64,
    pub fees_collected: f64,
    pub status: String,
    pub payout_amount: Option<f64>,
    pub completed_at: Option<String>,
}

impl From<ContributionCycle> for CycleResponse {
    fn from(cycle: ContributionCycle) -> Self {
        Self {
            id: cycle.id,
            chama_id: cycle.chama_id,
            cycle_number: cycle.cycle_number,
            expected_amount: cycle.expected_amount,
            start_date: cycle.start_date,
            due_date: cycle.due_date,
            payout_recipient_id: cycle.payout_recipient_id,
            collected_amount: cycle.collected_amount,
            fees_collected: cycle.fees_collected,
            status: cycle.status.as_str().to_string(),
            payout_amount: cycle.payout_amount,
            completed_at: cycle.completed_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContributionResponse {
    pub id: i64,
    pub chama_id: i64,
    pub cycle_id: i64,
    pub user_id: i64,
    pub transaction_id: String,
    pub amount: f64,
    pub fee_amount: f64,
    pub status: String,
    pub created_at: String,
}

impl From<Contribution> for ContributionResponse {
    fn from(contribution: Contribution) -> Self {
        Self {
            id: contribution.id,
            chama_id: contribution.chama_id,
            cycle_id: contribution.cycle_id,
            user_id: contribution.user_id,
            transaction_id: contribution.transaction_id,
            amount: contribution.amount,
            fee_amount: contribution.fee_amount,
            status: contribution.status,
            created_at: contribution.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PayoutResponse {
    pub id: i64,
    pub chama_id: i64,
    pub cycle_id: i64,
    pub recipient_user_id: i64,
    pub transaction_id: String,
    pub amount: f64,
    pub status: String,
    pub executed_at: Option<String>,
    pub created_at: String,
}

impl From<Payout> for PayoutResponse {
    fn from(payout: Payout) -> Self {
        Self {
            id: payout.id,
            chama_id: payout.chama_id,
            cycle_id: payout.cycle_id,
            recipient_user_id: payout.recipient_user_id,
            transaction_id: payout.transaction_id,
            amount: payout.amount,
            status: payout.status,
            executed_at: payout.executed_at,
            created_at: payout.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCycleBody {
    pub expected_amount: Option<f64>,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub payout_recipient_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ContributeBody {
    pub amount: f64,
    pub notes: Option<String>,
}

pub fn create_cycle_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route(
            "/chama/:chama_id/cycles",
            post(create_cycle).get(list_cycles),
        )
        .route("/chama/:chama_id/cycles/active", get(get_active_cycle))
        .route(
            "/chama/:chama_id/cycles/:cycle_id/contribute",
            post(contribute),
        )
        .route(
            "/chama/:chama_id/cycles/:cycle_id/payout",
            post(execute_payout),
        )
        .route("/chama/:chama_id/payouts", get(list_payouts))
}

#[utoipa::path(
    post,
    path = "/chama/{chama_id}/cycles",
    tag = "cycles",
    params(("chama_id" = i64, Path, description = "Chama id")),
    request_body = CreateCycleBody,
    responses(
        (status = 200, description = "Cycle opened", body = CycleResponse),
        (status = 403, description = "Caller is not an officer"),
        (status = 409, description = "An active cycle already exists")
    )
)]
pub async fn create_cycle(
    Path(chama_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(body): Json<CreateCycleBody>,
) -> GatewayResult<Json<CycleResponse>> {
    let cycle = state
        .chama_service()
        .create_contribution_cycle(
            user_id,
            chama_id,
            CreateCycleRequest {
                expected_amount: body.expected_amount,
                start_date: body.start_date,
                due_date: body.due_date,
                payout_recipient_id: body.payout_recipient_id,
            },
        )
        .await?;
    Ok(Json(cycle.into()))
}

#[utoipa::path(
    get,
    path = "/chama/{chama_id}/cycles",
    tag = "cycles",
    params(("chama_id" = i64, Path, description = "Chama id")),
    responses(
        (status = 200, description = "All cycles, newest first", body = Vec<CycleResponse>),
        (status = 403, description = "Caller is not a member")
    )
)]
pub async fn list_cycles(
    Path(chama_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<Vec<CycleResponse>>> {
    let cycles = state.chama_service().list_cycles(user_id, chama_id).await?;
    Ok(Json(cycles.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/chama/{chama_id}/cycles/active",
    tag = "cycles",
    params(("chama_id" = i64, Path, description = "Chama id")),
    responses(
        (status = 200, description = "The active cycle, or null when none", body = Option<CycleResponse>),
        (status = 403, description = "Caller is not a member")
    )
)]
pub async fn get_active_cycle(
    Path(chama_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<Option<CycleResponse>>> {
    let cycle = state
        .chama_service()
        .get_active_cycle(user_id, chama_id)
        .await?;
    Ok(Json(cycle.map(Into::into)))
}

#[utoipa::path(
    post,
    path = "/chama/{chama_id}/cycles/{cycle_id}/contribute",
    tag = "cycles",
    params(
        ("chama_id" = i64, Path, description = "Chama id"),
        ("cycle_id" = i64, Path, description = "Cycle id")
    ),
    request_body = ContributeBody,
    responses(
        (status = 200, description = "Contribution recorded", body = ContributionResponse),
        (status = 400, description = "Invalid amount"),
        (status = 403, description = "Caller is not a member"),
        (status = 409, description = "Already contributed or cycle not active"),
        (status = 502, description = "Ledger declined the transfer")
    )
)]
pub async fn contribute(
    Path((chama_id, cycle_id)): Path<(i64, i64)>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(body): Json<ContributeBody>,
) -> GatewayResult<Json<ContributionResponse>> {
    let contribution = state
        .chama_service()
        .contribute_to_chama(
            user_id,
            chama_id,
            cycle_id,
            ContributeRequest {
                amount: body.amount,
                notes: body.notes,
            },
        )
        .await?;
    Ok(Json(contribution.into()))
}

#[utoipa::path(
    post,
    path = "/chama/{chama_id}/cycles/{cycle_id}/payout",
    tag = "cycles",
    params(
        ("chama_id" = i64, Path, description = "Chama id"),
        ("cycle_id" = i64, Path, description = "Cycle id")
    ),
    responses(
        (status = 200, description = "Payout executed", body = PayoutResponse),
        (status = 403, description = "Caller is not an officer"),
        (status = 409, description = "Payout already executed or pool empty"),
        (status = 502, description = "Ledger declined the transfer")
    )
)]
pub async fn execute_payout(
    Path((chama_id, cycle_id)): Path<(i64, i64)>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<PayoutResponse>> {
    let payout = state
        .chama_service()
        .execute_payout_cycle(user_id, chama_id, cycle_id)
        .await?;
    Ok(Json(payout.into()))
}

#[utoipa::path(
    get,
    path = "/chama/{chama_id}/payouts",
    tag = "cycles",
    params(("chama_id" = i64, Path, description = "Chama id")),
    responses(
        (status = 200, description = "Payout history, newest first", body = Vec<PayoutResponse>),
        (status = 403, description = "Caller is not a member")
    )
)]
pub async fn list_payouts(
    Path(chama_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<Vec<PayoutResponse>>> {
    let payouts = state.chama_service().list_payouts(user_id, chama_id).await?;
    Ok(Json(payouts.into_iter().map(Into::into).collect()))
}
