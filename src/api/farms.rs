use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse, Pagination, validation};
use crate::constants::pagination;
use crate::db::{NewFarm, UpdateFarm};
use crate::entities::{fincas, potreros};

#[derive(Deserialize)]
pub struct FarmListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub search: Option<String>,
    pub admin_id: Option<i32>,
}

const fn default_page() -> u64 {
    1
}

const fn default_page_size() -> u64 {
    pagination::DEFAULT_PAGE_SIZE
}

#[derive(Deserialize)]
pub struct CreateFarmRequest {
    pub name: String,
    pub owner: Option<String>,
    pub location: Option<String>,
    pub area_hectares: Option<f64>,
    pub admin_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct UpdateFarmRequest {
    pub name: Option<String>,
    pub owner: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub area_hectares: Option<Option<f64>>,
    pub admin_id: Option<Option<i32>>,
    pub active: Option<bool>,
}

#[derive(Serialize)]
pub struct FarmDetail {
    #[serde(flatten)]
    pub farm: fincas::Model,
    pub paddock_count: usize,
}

#[derive(Deserialize)]
pub struct CreatePaddockRequest {
    pub name: String,
    pub area_hectares: Option<f64>,
}

/// GET /farms
pub async fn list_farms(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FarmListQuery>,
) -> Result<Json<ApiResponse<Vec<fincas::Model>>>, ApiError> {
    let page = query.page.max(1);
    let page_size = query.page_size.clamp(1, pagination::MAX_PAGE_SIZE);
    let search = query
        .search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let (farms, total) = state
        .store()
        .farms()
        .list(page, page_size, search, query.admin_id)
        .await?;

    Ok(Json(ApiResponse::success_paginated(
        farms,
        Pagination::new(page, page_size, total),
    )))
}

/// GET /farms/{id}
pub async fn get_farm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<FarmDetail>>, ApiError> {
    let id = validation::validate_id(id)?;

    let farm = state
        .store()
        .farms()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Farm", id))?;
    let paddocks = state.store().farms().list_paddocks(id).await?;

    Ok(Json(ApiResponse::success(FarmDetail {
        farm,
        paddock_count: paddocks.len(),
    })))
}

/// POST /farms
pub async fn create_farm(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateFarmRequest>,
) -> Result<Json<ApiResponse<fincas::Model>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Farm name is required"));
    }
    if payload.area_hectares.is_some_and(|a| a <= 0.0) {
        return Err(ApiError::validation("Area must be positive"));
    }

    let farm = state
        .store()
        .farms()
        .create(NewFarm {
            name: payload.name.trim().to_string(),
            owner: payload.owner,
            location: payload.location,
            area_hectares: payload.area_hectares,
            admin_id: payload.admin_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(farm)))
}

/// PUT /farms/{id}
pub async fn update_farm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateFarmRequest>,
) -> Result<Json<ApiResponse<fincas::Model>>, ApiError> {
    let id = validation::validate_id(id)?;

    if payload.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::validation("Farm name cannot be empty"));
    }
    if payload
        .area_hectares
        .flatten()
        .is_some_and(|a| a <= 0.0)
    {
        return Err(ApiError::validation("Area must be positive"));
    }

    let farm = state
        .store()
        .farms()
        .update(
            id,
            UpdateFarm {
                name: payload.name,
                owner: payload.owner,
                location: payload.location,
                area_hectares: payload.area_hectares,
                admin_id: payload.admin_id,
                active: payload.active,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Farm", id))?;

    Ok(Json(ApiResponse::success(farm)))
}

/// DELETE /farms/{id}
/// Soft-deletes the farm and removes its paddocks.
pub async fn delete_farm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validation::validate_id(id)?;

    if !state.store().farms().delete(id).await? {
        return Err(ApiError::not_found("Farm", id));
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Farm deleted",
    ))))
}

/// GET /farms/{id}/paddocks
pub async fn list_paddocks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<potreros::Model>>>, ApiError> {
    let id = validation::validate_id(id)?;

    state
        .store()
        .farms()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Farm", id))?;

    let paddocks = state.store().farms().list_paddocks(id).await?;
    Ok(Json(ApiResponse::success(paddocks)))
}

/// POST /farms/{id}/paddocks
pub async fn create_paddock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<CreatePaddockRequest>,
) -> Result<Json<ApiResponse<potreros::Model>>, ApiError> {
    let id = validation::validate_id(id)?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Paddock name is required"));
    }
    if payload.area_hectares.is_some_and(|a| a <= 0.0) {
        return Err(ApiError::validation("Area must be positive"));
    }

    state
        .store()
        .farms()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Farm", id))?;

    let paddock = state
        .store()
        .farms()
        .create_paddock(id, payload.name.trim().to_string(), payload.area_hectares)
        .await?;

    Ok(Json(ApiResponse::success(paddock)))
}

/// DELETE /farms/{id}/paddocks/{paddock_id}
pub async fn delete_paddock(
    State(state): State<Arc<AppState>>,
    Path((id, paddock_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validation::validate_id(id)?;
    let paddock_id = validation::validate_id(paddock_id)?;

    if !state.store().farms().delete_paddock(id, paddock_id).await? {
        return Err(ApiError::not_found("Paddock", paddock_id));
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Paddock deleted",
    ))))
}
