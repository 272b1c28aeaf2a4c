//! Middleware for authentication and other cross-cutting concerns

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;
use crate::state::GatewayState;

/// Authenticated caller, stored in request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub i64);

/// Authentication middleware that resolves bearer API tokens to user ids.
pub async fn auth_middleware(
    State(state): State<Arc<GatewayState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    if is_public_endpoint(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or_else(|| {
            GatewayError::AuthenticationFailed("Missing authentication token".to_string())
        })?;

    let user_id: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE api_token = ?")
        .bind(token)
        .fetch_optional(&state.pool)
        .await?;

    let user_id = user_id.ok_or_else(|| {
        GatewayError::AuthenticationFailed("Invalid authentication token".to_string())
    })?;

    request.extensions_mut().insert(AuthenticatedUser(user_id));

    Ok(next.run(request).await)
}

/// Endpoints reachable without a token: health, registration, and the
/// API docs.
fn is_public_endpoint(path: &str) -> bool {
    path == "/health"
        || path == "/users"
        || path.starts_with("/swagger-ui")
        || path == "/api-docs/openapi.json"
}

/// Logging middleware for request/response logging
pub async fn logging_middleware(
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_endpoints() {
        assert!(is_public_endpoint("/health"));
        assert!(is_public_endpoint("/users"));
        assert!(is_public_endpoint("/swagger-ui"));
        assert!(is_public_endpoint("/api-docs/openapi.json"));
        assert!(!is_public_endpoint("/chama"));
        assert!(!is_public_endpoint("/chama/1/balance"));
    }
}
