//! # Cycle Gateway Crate
//!
//! HTTP API layer for the Cycle chama platform: REST routing, bearer token
//! authentication, error-to-status mapping, and OpenAPI documentation over
//! the chama service.

pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;

pub use error::{GatewayError, GatewayResult};
pub use middleware::{auth_middleware, AuthenticatedUser};
pub use state::GatewayState;

use std::sync::Arc;

use axum::{http::Method, middleware as axum_middleware, Router};
use tower_http::cors::{Any, CorsLayer};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let arc_state = Arc::new(state);

    let mut router = Router::new()
        .merge(rest::create_rest_routes().with_state(arc_state.clone()))
        .layer(axum_middleware::from_fn_with_state(
            arc_state,
            middleware::auth_middleware,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers(Any),
        )
        .layer(axum_middleware::from_fn(middleware::logging_middleware));

    // Swagger UI is only exposed in debug builds.
    #[cfg(debug_assertions)]
    {
        #[derive(OpenApi)]
        #[openapi(
            paths(
                rest::health::health,
                rest::users::register_user,
                rest::chamas::create_chama,
                rest::chamas::get_chama,
                rest::chamas::close_chama,
                rest::chamas::get_balance,
                rest::members::invite_member,
                rest::members::accept_invite,
                rest::members::list_members,
                rest::members::update_member_role,
                rest::members::remove_member,
                rest::cycles::create_cycle,
                rest::cycles::list_cycles,
                rest::cycles::get_active_cycle,
                rest::cycles::contribute,
                rest::cycles::execute_payout,
                rest::cycles::list_payouts,
            ),
            components(
                schemas(
                    rest::health::HealthResponse,
                    rest::users::RegisterRequest,
                    rest::users::RegisterResponse,
                    rest::chamas::ChamaResponse,
                    rest::chamas::CreateChamaBody,
                    rest::chamas::BalanceResponse,
                    rest::members::MemberResponse,
                    rest::members::InviteResponse,
                    rest::members::InviteBody,
                    rest::members::RoleBody,
                    rest::cycles::CycleResponse,
                    rest::cycles::ContributionResponse,
                    rest::cycles::PayoutResponse,
                    rest::cycles::CreateCycleBody,
                    rest::cycles::ContributeBody,
                )
            ),
            tags(
                (name = "health", description = "Service health"),
                (name = "users", description = "User registration"),
                (name = "chamas", description = "Chama management"),
                (name = "members", description = "Membership and invites"),
                (name = "cycles", description = "Contribution cycles and payouts"),
            )
        )]
        struct ApiDoc;

        router = router
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    router
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use sqlx::sqlite::SqlitePoolOptions;
    use tower::ServiceExt;

    use cycle_config::InviteConfig;
    use cycle_ledger::{InMemoryLedger, LogNotifier};

    async fn test_router() -> (Router, InMemoryLedger) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        cycle_database::run_migrations(&pool).await.unwrap();

        let ledger = InMemoryLedger::new();
        let state = GatewayState::new(
            pool,
            Arc::new(ledger.clone()),
            Arc::new(LogNotifier),
            &InviteConfig { expiry_hours: 72 },
        );
        (create_router(state), ledger)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_with_token(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn register(router: &Router, phone: &str) -> (i64, String) {
        let (status, body) = send(
            router,
            post_json("/users", None, json!({ "phone_number": phone })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        (
            body["id"].as_i64().unwrap(),
            body["api_token"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn health_is_public() {
        let (router, _) = test_router().await;
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        let (router, _) = test_router().await;
        let request = Request::builder()
            .uri("/chama/1")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&router, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = get_with_token("/chama/1", "not-a-real-token");
        let (status, _) = send(&router, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn registration_returns_api_token() {
        let (router, _) = test_router().await;
        let (id, token) = register(&router, "+254700100001").await;
        assert!(id > 0);
        assert_eq!(token.len(), 40);
    }

    #[tokio::test]
    async fn create_and_fetch_chama() {
        let (router, _) = test_router().await;
        let (_id, token) = register(&router, "+254700100010").await;

        let (status, body) = send(
            &router,
            post_json(
                "/chama",
                Some(&token),
                json!({
                    "name": "Umoja",
                    "contribution_amount": 1000.0,
                    "max_members": 5
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let chama_id = body["id"].as_i64().unwrap();
        assert_eq!(body["status"], "active");

        let (status, body) =
            send(&router, get_with_token(&format!("/chama/{chama_id}"), &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Umoja");
    }

    #[tokio::test]
    async fn invalid_chama_parameters_rejected() {
        let (router, _) = test_router().await;
        let (_id, token) = register(&router, "+254700100020").await;

        let (status, _) = send(
            &router,
            post_json(
                "/chama",
                Some(&token),
                json!({
                    "name": "Broke",
                    "contribution_amount": -5.0,
                    "max_members": 5
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn full_cycle_flow_over_http() {
        let (router, ledger) = test_router().await;
        let (admin_id, admin_token) = register(&router, "+254700100030").await;
        let (member_id, member_token) = register(&router, "+254700100031").await;

        let (_, body) = send(
            &router,
            post_json(
                "/chama",
                Some(&admin_token),
                json!({
                    "name": "Umoja",
                    "contribution_amount": 1000.0,
                    "max_members": 5
                }),
            ),
        )
        .await;
        let chama_id = body["id"].as_i64().unwrap();

        // Invite and accept.
        let (status, body) = send(
            &router,
            post_json(
                &format!("/chama/{chama_id}/invite"),
                Some(&admin_token),
                json!({ "user_id": member_id }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let invite_id = body["id"].as_i64().unwrap();

        let (status, body) = send(
            &router,
            post_json(
                &format!("/chama/invite/{invite_id}/accept"),
                Some(&member_token),
                json!({}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payout_position"], 2);

        // Open a cycle and contribute.
        let (status, body) = send(
            &router,
            post_json(
                &format!("/chama/{chama_id}/cycles"),
                Some(&admin_token),
                json!({}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let cycle_id = body["id"].as_i64().unwrap();

        ledger.deposit_user(member_id, 1045.0).await.unwrap();
        let (status, body) = send(
            &router,
            post_json(
                &format!("/chama/{chama_id}/cycles/{cycle_id}/contribute"),
                Some(&member_token),
                json!({ "amount": 1000.0 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fee_amount"], 45.0);

        // Duplicate contribution conflicts.
        ledger.deposit_user(member_id, 2000.0).await.unwrap();
        let (status, _) = send(
            &router,
            post_json(
                &format!("/chama/{chama_id}/cycles/{cycle_id}/contribute"),
                Some(&member_token),
                json!({ "amount": 1000.0 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        // Balance view.
        let (status, body) = send(
            &router,
            get_with_token(&format!("/chama/{chama_id}/balance"), &member_token),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balance"], 1000.0);
        assert_eq!(body["total_fees"], 45.0);

        // Payout goes to the admin, first in rotation.
        let (status, body) = send(
            &router,
            post_json(
                &format!("/chama/{chama_id}/cycles/{cycle_id}/payout"),
                Some(&admin_token),
                json!({}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recipient_user_id"], admin_id);
        assert_eq!(body["amount"], 1000.0);

        // A second payout conflicts.
        let (status, _) = send(
            &router,
            post_json(
                &format!("/chama/{chama_id}/cycles/{cycle_id}/payout"),
                Some(&admin_token),
                json!({}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        // History shows exactly one payout.
        let (status, body) = send(
            &router,
            get_with_token(&format!("/chama/{chama_id}/payouts"), &member_token),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_member_reads_are_forbidden() {
        let (router, _) = test_router().await;
        let (_admin_id, admin_token) = register(&router, "+254700100040").await;
        let (_outsider_id, outsider_token) = register(&router, "+254700100041").await;

        let (_, body) = send(
            &router,
            post_json(
                "/chama",
                Some(&admin_token),
                json!({
                    "name": "Umoja",
                    "contribution_amount": 1000.0,
                    "max_members": 5
                }),
            ),
        )
        .await;
        let chama_id = body["id"].as_i64().unwrap();

        let (status, _) = send(
            &router,
            get_with_token(&format!("/chama/{chama_id}/balance"), &outsider_token),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_chama_is_not_found() {
        let (router, _) = test_router().await;
        let (_id, token) = register(&router, "+254700100050").await;
        let (status, _) = send(&router, get_with_token("/chama/9999", &token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
