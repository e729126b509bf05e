use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::auth::AuthUser;
use super::{ApiError, ApiResponse, AppState};
use crate::db::{Company, CompanyInput, OwnedTable, OwnershipError};

fn guard_error(err: OwnershipError, id: i64) -> ApiError {
    match err {
        OwnershipError::NotOwned => ApiError::not_found("Company", id),
        OwnershipError::Database(e) => ApiError::DatabaseError(e.to_string()),
    }
}

/// GET /api/companies
pub async fn list_companies(
    State(state): State<Arc<AppState>>,
    axum::Extension(AuthUser(user_id)): axum::Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<Company>>>, ApiError> {
    let companies = state.store().list_companies(user_id).await?;
    Ok(Json(ApiResponse::success(companies)))
}

/// POST /api/companies
pub async fn create_company(
    State(state): State<Arc<AppState>>,
    axum::Extension(AuthUser(user_id)): axum::Extension<AuthUser>,
    Json(input): Json<CompanyInput>,
) -> Result<Json<ApiResponse<Company>>, ApiError> {
    if input.name.trim().is_empty() {
        return Err(ApiError::validation("Company name is required"));
    }

    let company = state.store().create_company(user_id, input).await?;
    Ok(Json(ApiResponse::success(company)))
}

/// GET /api/companies/{id}
pub async fn get_company(
    State(state): State<Arc<AppState>>,
    axum::Extension(AuthUser(user_id)): axum::Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Company>>, ApiError> {
    state
        .store()
        .validate_ownership(OwnedTable::Companies, id, user_id)
        .await
        .map_err(|e| guard_error(e, id))?;

    let company = state
        .store()
        .get_company(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Company", id))?;

    Ok(Json(ApiResponse::success(company)))
}

/// PUT /api/companies/{id}
pub async fn update_company(
    State(state): State<Arc<AppState>>,
    axum::Extension(AuthUser(user_id)): axum::Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(input): Json<CompanyInput>,
) -> Result<Json<ApiResponse<Company>>, ApiError> {
    state
        .store()
        .validate_ownership(OwnedTable::Companies, id, user_id)
        .await
        .map_err(|e| guard_error(e, id))?;

    let company = state
        .store()
        .update_company(id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("Company", id))?;

    Ok(Json(ApiResponse::success(company)))
}

/// DELETE /api/companies/{id}
pub async fn delete_company(
    State(state): State<Arc<AppState>>,
    axum::Extension(AuthUser(user_id)): axum::Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .store()
        .validate_ownership(OwnedTable::Companies, id, user_id)
        .await
        .map_err(|e| guard_error(e, id))?;

    if !state.store().delete_company(id).await? {
        return Err(ApiError::not_found("Company", id));
    }

    Ok(Json(ApiResponse::success(())))
}
