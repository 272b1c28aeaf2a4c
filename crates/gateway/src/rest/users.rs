//! User registration endpoint

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use cycle_database::RegisterUserRequest;

use crate::error::GatewayResult;
use crate::state::GatewayState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub phone_number: String,
    pub display_name: Option<String>,
}

/// The API token is returned exactly once, at registration.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub id: i64,
    pub phone_number: String,
    pub display_name: Option<String>,
    pub api_token: String,
    pub created_at: String,
}

pub fn create_user_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/users", post(register_user))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Invalid phone number"),
        (status = 409, description = "Phone number already registered")
    )
)]
pub async fn register_user(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<RegisterRequest>,
) -> GatewayResult<Json<RegisterResponse>> {
    let user = state
        .chama_service()
        .register_user(RegisterUserRequest {
            phone_number: body.phone_number,
            display_name: body.display_name,
        })
        .await?;

    Ok(Json(RegisterResponse {
        id: user.id,
        phone_number: user.phone_number,
        display_name: user.display_name,
        api_token: user.api_token,
        created_at: user.created_at,
    }))
}
