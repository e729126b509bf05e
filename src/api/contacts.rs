use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::auth::AuthUser;
use super::{ApiError, ApiResponse, AppState};
use crate::db::{Contact, ContactInput, OwnedTable, OwnershipError};

fn guard_error(err: OwnershipError, id: i64) -> ApiError {
    match err {
        OwnershipError::NotOwned => ApiError::not_found("Contact", id),
        OwnershipError::Database(e) => ApiError::DatabaseError(e.to_string()),
    }
}

/// GET /api/contacts
pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    axum::Extension(AuthUser(user_id)): axum::Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<Contact>>>, ApiError> {
    let contacts = state.store().list_contacts(user_id).await?;
    Ok(Json(ApiResponse::success(contacts)))
}

/// POST /api/contacts
pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    axum::Extension(AuthUser(user_id)): axum::Extension<AuthUser>,
    Json(input): Json<ContactInput>,
) -> Result<Json<ApiResponse<Contact>>, ApiError> {
    if input.first_name.trim().is_empty() {
        return Err(ApiError::validation("First name is required"));
    }

    let contact = state.store().create_contact(user_id, input).await?;
    Ok(Json(ApiResponse::success(contact)))
}

/// GET /api/contacts/{id}
pub async fn get_contact(
    State(state): State<Arc<AppState>>,
    axum::Extension(AuthUser(user_id)): axum::Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Contact>>, ApiError> {
    state
        .store()
        .validate_ownership(OwnedTable::Contacts, id, user_id)
        .await
        .map_err(|e| guard_error(e, id))?;

    let contact = state
        .store()
        .get_contact(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Contact", id))?;

    Ok(Json(ApiResponse::success(contact)))
}

/// PUT /api/contacts/{id}
pub async fn update_contact(
    State(state): State<Arc<AppState>>,
    axum::Extension(AuthUser(user_id)): axum::Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(input): Json<ContactInput>,
) -> Result<Json<ApiResponse<Contact>>, ApiError> {
    state
        .store()
        .validate_ownership(OwnedTable::Contacts, id, user_id)
        .await
        .map_err(|e| guard_error(e, id))?;

    let contact = state
        .store()
        .update_contact(id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("Contact", id))?;

    Ok(Json(ApiResponse::success(contact)))
}

/// DELETE /api/contacts/{id}
pub async fn delete_contact(
    State(state): State<Arc<AppState>>,
    axum::Extension(AuthUser(user_id)): axum::Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .store()
        .validate_ownership(OwnedTable::Contacts, id, user_id)
        .await
        .map_err(|e| guard_error(e, id))?;

    if !state.store().delete_contact(id).await? {
        return Err(ApiError::not_found("Contact", id));
    }

    Ok(Json(ApiResponse::success(())))
}
