//! Session-token authentication middleware
//!
//! Requests to protected routes carry `Authorization: Bearer <token>`,
//! resolved against the `sessions` table. Session provisioning itself
//! (login, registration) happens outside this service; rows are created
//! out-of-band.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::warn;
use wmtr_common::db::models::Session;

use crate::AppState;

/// Authenticated user id, injected into request extensions for handlers
#[derive(Debug, Clone)]
pub struct UserId(pub String);

/// Authentication middleware for protected routes.
///
/// Returns 401 Unauthorized for a missing, unknown, or expired token.
/// Health and media routes do NOT use this middleware.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(&request).ok_or(AuthError::MissingToken)?;

    let session: Option<Session> =
        sqlx::query_as("SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?")
            .bind(&token)
            .fetch_optional(&state.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    let session = match session {
        Some(session) => session,
        None => {
            warn!("Rejected request with unknown session token");
            return Err(AuthError::InvalidToken);
        }
    };

    if let Some(expires_at) = session.expires_at {
        if expires_at < Utc::now().naive_utc() {
            return Err(AuthError::SessionExpired);
        }
    }

    request.extensions_mut().insert(UserId(session.user_id));
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// Authentication errors
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    SessionExpired,
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing session token"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid session token"),
            AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "Session expired"),
            AuthError::DatabaseError(ref msg) => {
                warn!("Auth lookup failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
