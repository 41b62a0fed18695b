use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};

#[derive(Serialize)]
pub struct DashboardResponse {
    pub farms: u64,
    pub paddocks: u64,
    pub users: u64,
    pub providers: u64,
    pub indices: u64,
    pub active_sessions: u64,
    pub pending_confirmations: u64,
}

/// GET /dashboard
/// Aggregate counts for the admin landing page.
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<DashboardResponse>>, ApiError> {
    let store = state.store();

    let (farms, paddocks) = (
        store.farms().count_active().await?,
        store.farms().count_paddocks().await?,
    );
    let users = store.usuarios().count_active().await?;
    let providers = store.providers().count_active().await?;
    let indices = store.indices().count_active().await?;
    let active_sessions = store.sessions().count_active().await?;
    let pending_confirmations = store.confirmations().count_pending().await?;

    Ok(Json(ApiResponse::success(DashboardResponse {
        farms,
        paddocks,
        users,
        providers,
        indices,
        active_sessions,
        pending_confirmations,
    })))
}
