use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse, PageQuery, Pagination, validation};
use crate::db::{NewProvider, UpdateProvider};
use crate::entities::proveedores;

#[derive(Deserialize)]
pub struct CreateProviderRequest {
    pub name: String,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub service_type: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateProviderRequest {
    pub name: Option<String>,
    pub contact_email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub service_type: Option<Option<String>>,
    pub active: Option<bool>,
}

/// GET /providers
pub async fn list_providers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<proveedores::Model>>>, ApiError> {
    let (page, page_size, search) = validation::normalize_page_query(query);

    let (providers, total) = state
        .store()
        .providers()
        .list(page, page_size, search)
        .await?;

    Ok(Json(ApiResponse::success_paginated(
        providers,
        Pagination::new(page, page_size, total),
    )))
}

/// GET /providers/{id}
pub async fn get_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<proveedores::Model>>, ApiError> {
    let id = validation::validate_id(id)?;

    let provider = state
        .store()
        .providers()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Provider", id))?;

    Ok(Json(ApiResponse::success(provider)))
}

/// POST /providers
pub async fn create_provider(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProviderRequest>,
) -> Result<Json<ApiResponse<proveedores::Model>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Provider name is required"));
    }
    let contact_email = match payload.contact_email {
        Some(ref raw) => Some(validation::validate_email(raw)?.to_string()),
        None => None,
    };

    let provider = state
        .store()
        .providers()
        .create(NewProvider {
            name: payload.name.trim().to_string(),
            contact_email,
            phone: payload.phone,
            service_type: payload.service_type,
        })
        .await?;

    Ok(Json(ApiResponse::success(provider)))
}

/// PUT /providers/{id}
pub async fn update_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProviderRequest>,
) -> Result<Json<ApiResponse<proveedores::Model>>, ApiError> {
    let id = validation::validate_id(id)?;

    if let Some(Some(ref raw)) = payload.contact_email {
        validation::validate_email(raw)?;
    }

    let provider = state
        .store()
        .providers()
        .update(
            id,
            UpdateProvider {
                name: payload.name,
                contact_email: payload.contact_email,
                phone: payload.phone,
                service_type: payload.service_type,
                active: payload.active,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Provider", id))?;

    Ok(Json(ApiResponse::success(provider)))
}

/// DELETE /providers/{id}
pub async fn delete_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validation::validate_id(id)?;

    if !state.store().providers().set_active(id, false).await? {
        return Err(ApiError::not_found("Provider", id));
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Provider deactivated",
    ))))
}
