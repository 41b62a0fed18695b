use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse, PageQuery, Pagination, validation};
use crate::db::{NewUsuario, UpdateUsuario};
use crate::entities::usuarios;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub active: Option<bool>,
}

#[derive(Deserialize)]
pub struct BulkStatusRequest {
    pub ids: Vec<i32>,
    pub active: bool,
}

#[derive(Serialize)]
pub struct BulkStatusResponse {
    pub updated: u64,
}

/// GET /users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<usuarios::Model>>>, ApiError> {
    let (page, page_size, search) = validation::normalize_page_query(query);

    let (users, total) = state.store().usuarios().list(page, page_size, search).await?;

    Ok(Json(ApiResponse::success_paginated(
        users,
        Pagination::new(page, page_size, total),
    )))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<usuarios::Model>>, ApiError> {
    let id = validation::validate_id(id)?;

    let user = state
        .store()
        .usuarios()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    Ok(Json(ApiResponse::success(user)))
}

/// POST /users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<usuarios::Model>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    let email = validation::validate_email(&payload.email)?.to_string();

    if state.store().usuarios().email_exists(&email).await? {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let user = state
        .store()
        .usuarios()
        .create(NewUsuario {
            name: payload.name.trim().to_string(),
            email,
            phone: payload.phone,
        })
        .await?;

    Ok(Json(ApiResponse::success(user)))
}

/// PUT /users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<usuarios::Model>>, ApiError> {
    let id = validation::validate_id(id)?;

    let email = match payload.email {
        Some(ref raw) => Some(validation::validate_email(raw)?.to_string()),
        None => None,
    };

    let user = state
        .store()
        .usuarios()
        .update(
            id,
            UpdateUsuario {
                name: payload.name,
                email,
                phone: payload.phone,
                active: payload.active,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    Ok(Json(ApiResponse::success(user)))
}

/// DELETE /users/{id}
/// Soft delete via the active flag.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validation::validate_id(id)?;

    if !state.store().usuarios().set_active(id, false).await? {
        return Err(ApiError::not_found("User", id));
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "User deactivated",
    ))))
}

/// POST /users/bulk-status
/// Activates or deactivates a batch of users in one statement.
pub async fn bulk_status(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BulkStatusRequest>,
) -> Result<Json<ApiResponse<BulkStatusResponse>>, ApiError> {
    if payload.ids.is_empty() {
        return Err(ApiError::validation("No user ids provided"));
    }
    for id in &payload.ids {
        validation::validate_id(*id)?;
    }

    let updated = state
        .store()
        .usuarios()
        .bulk_set_active(&payload.ids, payload.active)
        .await?;

    Ok(Json(ApiResponse::success(BulkStatusResponse { updated })))
}
