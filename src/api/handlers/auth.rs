use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson};
use crate::auth::AuthError;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub expires_at: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    match state.auth.login(&req.username, &req.password) {
        Ok(issued) => {
            tracing::info!(expires_at = %issued.expires_at, "Admin logged in");
            Ok(Json(LoginResponse {
                message: "Login successful".to_string(),
                token: issued.token,
                expires_at: issued.expires_at.to_rfc3339(),
            }))
        }
        Err(e) => {
            tracing::warn!("Rejected admin login");
            Err(ApiError::unauthorized(e.to_string()))
        }
    }
}

/// Middleware guarding admin routes: requires a valid `Authorization: Bearer` token.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req).ok_or(AuthError::MissingToken);
    match token.and_then(|t| state.auth.verify(t, Utc::now())) {
        Ok(_) => Ok(next.run(req).await),
        Err(e) => {
            tracing::debug!(error = %e, path = %req.uri().path(), "Rejected admin request");
            Err(ApiError::unauthorized(e.to_string()))
        }
    }
}

/// The "Bearer" scheme is matched case-insensitively.
fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() > 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(v[7..].trim())
            } else {
                None
            }
        })
}
