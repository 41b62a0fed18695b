use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse, PageQuery, Pagination, validation};
use crate::db::{NewRegion, UpdateRegion};
use crate::entities::regiones_umbral;

#[derive(Deserialize)]
pub struct CreateRegionRequest {
    pub name: String,
    pub description: Option<String>,
    /// GeoJSON document as a string.
    pub geometry: String,
}

#[derive(Deserialize)]
pub struct UpdateRegionRequest {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub geometry: Option<String>,
}

/// GET /regions
pub async fn list_regions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<regiones_umbral::Model>>>, ApiError> {
    let (page, page_size, search) = validation::normalize_page_query(query);

    let (regions, total) = state
        .store()
        .regions()
        .list(page, page_size, search)
        .await?;

    Ok(Json(ApiResponse::success_paginated(
        regions,
        Pagination::new(page, page_size, total),
    )))
}

/// GET /regions/{id}
pub async fn get_region(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<regiones_umbral::Model>>, ApiError> {
    let id = validation::validate_id(id)?;

    let region = state
        .store()
        .regions()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Region", id))?;

    Ok(Json(ApiResponse::success(region)))
}

/// POST /regions
pub async fn create_region(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRegionRequest>,
) -> Result<Json<ApiResponse<regiones_umbral::Model>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Region name is required"));
    }
    validation::validate_geojson(&payload.geometry)?;

    let region = state
        .store()
        .regions()
        .create(NewRegion {
            name: payload.name.trim().to_string(),
            description: payload.description,
            geometry: payload.geometry,
        })
        .await?;

    Ok(Json(ApiResponse::success(region)))
}

/// PUT /regions/{id}
pub async fn update_region(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateRegionRequest>,
) -> Result<Json<ApiResponse<regiones_umbral::Model>>, ApiError> {
    let id = validation::validate_id(id)?;

    if let Some(ref geometry) = payload.geometry {
        validation::validate_geojson(geometry)?;
    }

    let region = state
        .store()
        .regions()
        .update(
            id,
            UpdateRegion {
                name: payload.name,
                description: payload.description,
                geometry: payload.geometry,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Region", id))?;

    Ok(Json(ApiResponse::success(region)))
}

/// DELETE /regions/{id}
/// Hard delete; bands scoped to the region go with it.
pub async fn delete_region(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validation::validate_id(id)?;

    if !state.store().regions().delete(id).await? {
        return Err(ApiError::not_found("Region", id));
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Region deleted",
    ))))
}
