use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse, PageQuery, Pagination, validation};
use crate::db::{NewIndice, UpdateIndice};
use crate::entities::indices_satelitales;

#[derive(Deserialize)]
pub struct CreateIndiceRequest {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub formula: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateIndiceRequest {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub formula: Option<Option<String>>,
    pub active: Option<bool>,
}

/// GET /indices
pub async fn list_indices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<indices_satelitales::Model>>>, ApiError> {
    let (page, page_size, search) = validation::normalize_page_query(query);

    let (indices, total) = state
        .store()
        .indices()
        .list(page, page_size, search)
        .await?;

    Ok(Json(ApiResponse::success_paginated(
        indices,
        Pagination::new(page, page_size, total),
    )))
}

/// GET /indices/{id}
pub async fn get_indice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<indices_satelitales::Model>>, ApiError> {
    let id = validation::validate_id(id)?;

    let indice = state
        .store()
        .indices()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Index", id))?;

    Ok(Json(ApiResponse::success(indice)))
}

/// POST /indices
/// Codes are unique; duplicates answer 409.
pub async fn create_indice(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateIndiceRequest>,
) -> Result<Json<ApiResponse<indices_satelitales::Model>>, ApiError> {
    let code = payload.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(ApiError::validation("Index code is required"));
    }
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Index name is required"));
    }

    if state.store().indices().code_exists(&code).await? {
        return Err(ApiError::Conflict(format!(
            "Index code {code} already exists"
        )));
    }

    let indice = state
        .store()
        .indices()
        .create(NewIndice {
            code,
            name: payload.name.trim().to_string(),
            description: payload.description,
            formula: payload.formula,
        })
        .await?;

    Ok(Json(ApiResponse::success(indice)))
}

/// PUT /indices/{id}
pub async fn update_indice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateIndiceRequest>,
) -> Result<Json<ApiResponse<indices_satelitales::Model>>, ApiError> {
    let id = validation::validate_id(id)?;

    let indice = state
        .store()
        .indices()
        .update(
            id,
            UpdateIndice {
                name: payload.name,
                description: payload.description,
                formula: payload.formula,
                active: payload.active,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Index", id))?;

    Ok(Json(ApiResponse::success(indice)))
}

/// DELETE /indices/{id}
pub async fn delete_indice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validation::validate_id(id)?;

    if !state.store().indices().set_active(id, false).await? {
        return Err(ApiError::not_found("Index", id));
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Index deactivated",
    ))))
}
