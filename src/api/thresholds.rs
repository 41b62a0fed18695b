use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse, validation};
use crate::db::{NewThreshold, UpdateThreshold};
use crate::entities::umbrales_indice;

#[derive(Deserialize)]
pub struct ThresholdListQuery {
    pub indice_id: i32,
    pub region_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct CreateThresholdRequest {
    pub indice_id: i32,
    pub region_id: Option<i32>,
    pub label: String,
    pub min_value: f64,
    pub max_value: f64,
    pub color: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateThresholdRequest {
    pub region_id: Option<Option<i32>>,
    pub label: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub color: Option<Option<String>>,
}

fn check_band(min_value: f64, max_value: f64) -> Result<(), ApiError> {
    if !min_value.is_finite() || !max_value.is_finite() {
        return Err(ApiError::validation("Band bounds must be finite numbers"));
    }
    if min_value >= max_value {
        return Err(ApiError::validation(
            "Band minimum must be below its maximum",
        ));
    }
    Ok(())
}

async fn ensure_indice_exists(state: &AppState, indice_id: i32) -> Result<(), ApiError> {
    state
        .store()
        .indices()
        .get(indice_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Index", indice_id))?;
    Ok(())
}

async fn ensure_region_exists(state: &AppState, region_id: i32) -> Result<(), ApiError> {
    state
        .store()
        .regions()
        .get(region_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Region", region_id))?;
    Ok(())
}

/// GET /thresholds?indice_id=&region_id=
pub async fn list_thresholds(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ThresholdListQuery>,
) -> Result<Json<ApiResponse<Vec<umbrales_indice::Model>>>, ApiError> {
    let indice_id = validation::validate_id(query.indice_id)?;
    ensure_indice_exists(&state, indice_id).await?;

    let bands = state
        .store()
        .thresholds()
        .list_for_indice(indice_id, query.region_id)
        .await?;

    Ok(Json(ApiResponse::success(bands)))
}

/// GET /thresholds/{id}
pub async fn get_threshold(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<umbrales_indice::Model>>, ApiError> {
    let id = validation::validate_id(id)?;

    let band = state
        .store()
        .thresholds()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Threshold", id))?;

    Ok(Json(ApiResponse::success(band)))
}

/// POST /thresholds
pub async fn create_threshold(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateThresholdRequest>,
) -> Result<Json<ApiResponse<umbrales_indice::Model>>, ApiError> {
    if payload.label.trim().is_empty() {
        return Err(ApiError::validation("Band label is required"));
    }
    check_band(payload.min_value, payload.max_value)?;

    let indice_id = validation::validate_id(payload.indice_id)?;
    ensure_indice_exists(&state, indice_id).await?;
    if let Some(region_id) = payload.region_id {
        ensure_region_exists(&state, validation::validate_id(region_id)?).await?;
    }

    let band = state
        .store()
        .thresholds()
        .create(NewThreshold {
            indice_id,
            region_id: payload.region_id,
            label: payload.label.trim().to_string(),
            min_value: payload.min_value,
            max_value: payload.max_value,
            color: payload.color,
        })
        .await?;

    Ok(Json(ApiResponse::success(band)))
}

/// PUT /thresholds/{id}
pub async fn update_threshold(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateThresholdRequest>,
) -> Result<Json<ApiResponse<umbrales_indice::Model>>, ApiError> {
    let id = validation::validate_id(id)?;

    let existing = state
        .store()
        .thresholds()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Threshold", id))?;

    // The band must stay well-formed after partial updates.
    let min_value = payload.min_value.unwrap_or(existing.min_value);
    let max_value = payload.max_value.unwrap_or(existing.max_value);
    check_band(min_value, max_value)?;

    if let Some(Some(region_id)) = payload.region_id {
        ensure_region_exists(&state, validation::validate_id(region_id)?).await?;
    }

    let band = state
        .store()
        .thresholds()
        .update(
            id,
            UpdateThreshold {
                region_id: payload.region_id,
                label: payload.label,
                min_value: payload.min_value,
                max_value: payload.max_value,
                color: payload.color,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Threshold", id))?;

    Ok(Json(ApiResponse::success(band)))
}

/// DELETE /thresholds/{id}
pub async fn delete_threshold(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validation::validate_id(id)?;

    if !state.store().thresholds().delete(id).await? {
        return Err(ApiError::not_found("Threshold", id));
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Threshold deleted",
    ))))
}
