use axum::{
    Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::db::User;
use crate::services::auth_service::Registration;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

// ============================================================================
// Middleware
// ============================================================================

/// The authenticated user's ID, inserted into request extensions by
/// [`auth_middleware`] and read back by protected handlers.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

/// Requires a valid `Authorization: Bearer <token>` header on every
/// request it guards. On success the verified user ID is attached to the
/// request; all failures are 401s with a message naming what was missing.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(auth_header) = headers.get("Authorization").and_then(|h| h.to_str().ok()) else {
        return Err(ApiError::Unauthorized(
            "Authorization header required".to_string(),
        ));
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return Err(ApiError::Unauthorized("Bearer token required".to_string()));
    };

    let user_id = state
        .tokens()
        .verify(token.trim())
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    request.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /register
/// Create the account and hand out a session token right away, so a fresh
/// registration does not need a second round-trip through /login.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let session = state
        .auth_service()
        .register(Registration {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await?;

    Ok(Json(ApiResponse::success(SessionResponse {
        token: session.token,
        user: session.user,
    })))
}

/// POST /login
/// Verify credentials and hand out a session token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let session = state
        .auth_service()
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(SessionResponse {
        token: session.token,
        user: session.user,
    })))
}

/// GET /api/me
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    axum::Extension(AuthUser(user_id)): axum::Extension<AuthUser>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = state.auth_service().current_user(user_id).await?;
    Ok(Json(ApiResponse::success(user)))
}
