use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use super::auth::AuthUser;
use super::{ApiError, AppState};
use crate::db::TokenStoreError;
use crate::services::oidc::OidcClient;
use crate::services::token_service::TOKEN_TTL_SECS;

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub state: String,
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn oidc_client(state: &AppState) -> Result<&Arc<OidcClient>, ApiError> {
    state
        .oidc()
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Federated login is not configured".to_string()))
}

/// POST /login/oidc
/// Send the browser to the identity provider's authorization endpoint.
pub async fn login_oidc(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let oidc = oidc_client(&state)?;

    let auth_state = OidcClient::generate_state();
    Ok(redirect(&oidc.authorization_url(&auth_state)))
}

/// GET /login/oidc/callback
/// Exchange the authorization code, provision the account, and bounce the
/// browser back to the web UI with a freshly-issued session token.
///
/// The `state` query parameter is accepted but not bound to the request
/// that initiated the login.
pub async fn oidc_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let oidc = oidc_client(&state)?;

    if query.code.is_empty() {
        return Err(ApiError::validation("Authorization code is required"));
    }

    let tokens = oidc
        .exchange_code(&query.code)
        .await
        .map_err(|e| ApiError::oidc_error(e.to_string()))?;

    let id_token = tokens
        .id_token
        .ok_or_else(|| ApiError::oidc_error("provider returned no id_token"))?;

    let claims = oidc
        .verify_id_token(&id_token)
        .await
        .map_err(|e| ApiError::oidc_error(e.to_string()))?;

    let session = state.auth_service().federated_login(&claims).await?;

    // Kept so logout can pass it back to the provider as a hint. Losing it
    // only degrades logout, so a storage failure is not fatal here.
    let ttl = claims
        .exp
        .map_or(TOKEN_TTL_SECS, |exp| exp - chrono::Utc::now().timestamp());
    if let Err(e) = state
        .store()
        .put_id_token(session.user.id, &id_token, ttl)
        .await
    {
        warn!(user_id = session.user.id, error = %e, "Failed to store id_token");
    }

    let user_json = serde_json::to_string(&session.user)
        .map_err(|e| ApiError::internal(format!("Failed to serialize user: {e}")))?;

    let location = format!(
        "{}/oidc/callback?token={}&user={}",
        state.config().server.frontend_url.trim_end_matches('/'),
        urlencoding::encode(&session.token),
        urlencoding::encode(&user_json),
    );

    Ok(redirect(&location))
}

/// GET /logout/oidc
/// End the provider session and land the browser on the web UI's login
/// page. Requires a stored ID token; a session whose token was never
/// stored (or already expired out of the store) cannot be logged out of
/// the provider.
pub async fn logout_oidc(
    State(state): State<Arc<AppState>>,
    axum::Extension(AuthUser(user_id)): axum::Extension<AuthUser>,
) -> Result<Response, ApiError> {
    let oidc = oidc_client(&state)?;

    let id_token = match state.store().get_id_token(user_id).await {
        Ok(token) => token,
        Err(TokenStoreError::NotFound) => {
            return Err(ApiError::internal("No identity token stored for user"));
        }
        Err(e) => return Err(ApiError::internal(format!("Token store error: {e}"))),
    };

    if let Err(e) = state.store().delete_id_token(user_id).await {
        warn!(user_id, error = %e, "Failed to delete stored id_token");
    }

    let post_logout = format!(
        "{}/login",
        state.config().server.frontend_url.trim_end_matches('/')
    );

    Ok(redirect(&oidc.logout_url(&id_token, &post_logout)))
}
