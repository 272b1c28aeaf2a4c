//! REST API endpoints for the gateway

pub mod chamas;
pub mod cycles;
pub mod health;
pub mod members;
pub mod users;

use std::sync::Arc;

use axum::Router;

use crate::state::GatewayState;

/// Create all REST API routes
pub fn create_rest_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .merge(health::create_health_routes())
        .merge(users::create_user_routes())
        .merge(chamas::create_chama_routes())
        .merge(members::create_member_routes())
        .merge(cycles::create_cycle_routes())
}
