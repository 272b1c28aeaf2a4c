//! Chama REST endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use cycle_chamas::ChamaBalance;
use cycle_database::{Chama, CreateChamaRequest};

use crate::error::GatewayResult;
use crate::middleware::AuthenticatedUser;
use crate::state::GatewayState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ChamaResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub admin_user_id: i64,
    pub contribution_amount: f64,
    pub contribution_frequency: String,
    pub target_amount: Option<f64>,
    pub max_members: i64,
    pub status: String,
    pub created_at: String,
}

impl From<Chama> for ChamaResponse {
    fn from(chama: Chama) -> Self {
        Self {
            id: chama.id,
            name: chama.name,
            description: chama.description,
            admin_user_id: chama.admin_user_id,
            contribution_amount: chama.contribution_amount,
            contribution_frequency: chama.contribution_frequency,
            target_amount: chama.target_amount,
            max_members: chama.max_members,
            status: chama.status.as_str().to_string(),
            created_at: chama.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateChamaBody {
    pub name: String,
    pub description: Option<String>,
    pub contribution_amount: f64,
    pub contribution_frequency: Option<String>,
    pub target_amount: Option<f64>,
    pub max_members: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub chama_id: i64,
    pub balance: f64,
    pub total_contributions: f64,
    pub total_payouts: f64,
    pub total_fees: f64,
    pub active_members: i64,
}

impl From<ChamaBalance> for BalanceResponse {
    fn from(balance: ChamaBalance) -> Self {
        Self {
            chama_id: balance.chama_id,
            balance: balance.balance,
            total_contributions: balance.total_contributions,
            total_payouts: balance.total_payouts,
            total_fees: balance.total_fees,
            active_members: balance.active_members,
        }
    }
}

pub fn create_chama_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/chama", post(create_chama))
        .route("/chama/:chama_id", get(get_chama))
        .route("/chama/:chama_id/close", post(close_chama))
        .route("/chama/:chama_id/balance", get(get_balance))
}

#[utoipa::path(
    post,
    path = "/chama",
    tag = "chamas",
    request_body = CreateChamaBody,
    responses(
        (status = 200, description = "Chama created", body = ChamaResponse),
        (status = 400, description = "Invalid parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Wallet provisioning failed")
    )
)]
pub async fn create_chama(
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(body): Json<CreateChamaBody>,
) -> GatewayResult<Json<ChamaResponse>> {
    let chama = state
        .chama_service()
        .create_chama(
            user_id,
            CreateChamaRequest {
                name: body.name,
                description: body.description,
                contribution_amount: body.contribution_amount,
                contribution_frequency: body
                    .contribution_frequency
                    .unwrap_or_else(|| "monthly".to_string()),
                target_amount: body.target_amount,
                max_members: body.max_members,
                settings: None,
            },
        )
        .await?;

    Ok(Json(chama.into()))
}

#[utoipa::path(
    get,
    path = "/chama/{chama_id}",
    tag = "chamas",
    params(("chama_id" = i64, Path, description = "Chama id")),
    responses(
        (status = 200, description = "Chama details", body = ChamaResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Chama not found")
    )
)]
pub async fn get_chama(
    Path(chama_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(_user_id)): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<ChamaResponse>> {
    let chama = state.chama_service().get_chama(chama_id).await?;
    Ok(Json(chama.into()))
}

#[utoipa::path(
    post,
    path = "/chama/{chama_id}/close",
    tag = "chamas",
    params(("chama_id" = i64, Path, description = "Chama id")),
    responses(
        (status = 200, description = "Chama closed", body = ChamaResponse),
        (status = 403, description = "Caller is not the admin"),
        (status = 409, description = "Balance is not zero")
    )
)]
pub async fn close_chama(
    Path(chama_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<ChamaResponse>> {
    let chama = state.chama_service().close_chama(user_id, chama_id).await?;
    Ok(Json(chama.into()))
}

#[utoipa::path(
    get,
    path = "/chama/{chama_id}/balance",
    tag = "chamas",
    params(("chama_id" = i64, Path, description = "Chama id")),
    responses(
        (status = 200, description = "Current balance view", body = BalanceResponse),
        (status = 403, description = "Caller is not a member"),
        (status = 404, description = "Chama not found")
    )
)]
pub async fn get_balance(
    Path(chama_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<BalanceResponse>> {
    let balance = state
        .chama_service()
        .get_chama_balance(user_id, chama_id)
        .await?;
    Ok(Json(balance.into()))
}
