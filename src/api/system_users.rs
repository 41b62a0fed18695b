use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use super::auth::CurrentAdmin;
use super::{ApiError, ApiResponse, AppState, MessageResponse, PageQuery, Pagination, validation};
use crate::constants::roles;
use crate::db::repositories::admin_user::generate_token;
use crate::db::{AdminUser, NewAdminUser};
use crate::services::{AdminInfo, EmailMessage};

#[derive(Deserialize)]
pub struct CreateSystemUserRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
}

#[derive(Deserialize)]
pub struct UpdateSystemUserRequest {
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

/// GET /system-users
pub async fn list_system_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<AdminUser>>>, ApiError> {
    let (page, page_size, search) = validation::normalize_page_query(query);

    let (admins, total) = state
        .store()
        .admin_users()
        .list(page, page_size, search)
        .await?;

    Ok(Json(ApiResponse::success_paginated(
        admins,
        Pagination::new(page, page_size, total),
    )))
}

/// GET /system-users/{id}
pub async fn get_system_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AdminUser>>, ApiError> {
    let id = validation::validate_id(id)?;

    let admin = state
        .store()
        .admin_users()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Admin", id))?;

    Ok(Json(ApiResponse::success(AdminUser::from(admin))))
}

/// POST /system-users
/// Creates an active, pre-verified admin and emails a temporary password.
pub async fn create_system_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSystemUserRequest>,
) -> Result<Json<ApiResponse<AdminInfo>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    let email = validation::validate_email(&payload.email)?.to_string();
    if !roles::is_valid(&payload.role) {
        return Err(ApiError::validation(format!(
            "Unknown role: {}",
            payload.role
        )));
    }

    // The admin signs in with this and is expected to change it.
    let temp_password: String = generate_token().chars().take(16).collect();

    let admin = state
        .auth
        .create_admin(
            NewAdminUser {
                name: payload.name.trim().to_string(),
                email: email.clone(),
                phone: payload.phone,
                role: payload.role,
                active: true,
                email_verified: true,
            },
            &temp_password,
        )
        .await?;

    let mailer = state.shared.mailer.clone();
    let message = EmailMessage {
        to: email,
        subject: "Tu cuenta de administración de Telegan".to_string(),
        body: format!(
            "Se creó una cuenta para ti. Contraseña temporal: {temp_password}\n\
             Cámbiala después de iniciar sesión."
        ),
    };
    tokio::spawn(async move {
        if let Err(e) = mailer.send(message).await {
            warn!("Temp password email failed: {e:#}");
        }
    });

    Ok(Json(ApiResponse::success(admin)))
}

/// PUT /system-users/{id}
pub async fn update_system_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentAdmin>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateSystemUserRequest>,
) -> Result<Json<ApiResponse<AdminUser>>, ApiError> {
    let id = validation::validate_id(id)?;

    if let Some(role) = payload.role.as_deref()
        && !roles::is_valid(role)
    {
        return Err(ApiError::validation(format!("Unknown role: {role}")));
    }
    if payload.active == Some(false) && current.id == id {
        return Err(ApiError::validation("You cannot deactivate yourself"));
    }

    let admin = state
        .store()
        .admin_users()
        .update_profile(id, payload.name, payload.phone, payload.role, payload.active)
        .await?
        .ok_or_else(|| ApiError::not_found("Admin", id))?;

    Ok(Json(ApiResponse::success(admin)))
}

/// DELETE /system-users/{id}
/// Soft delete via the active flag; self-deactivation is rejected.
pub async fn delete_system_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentAdmin>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validation::validate_id(id)?;

    if current.id == id {
        return Err(ApiError::validation("You cannot deactivate yourself"));
    }

    if !state.store().admin_users().set_active(id, false).await? {
        return Err(ApiError::not_found("Admin", id));
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Admin deactivated",
    ))))
}
