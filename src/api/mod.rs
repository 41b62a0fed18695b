use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use time;

use crate::config::Config;
use crate::services::{
    AuthService, ConfirmationService, SeaOrmAuthService, SeaOrmConfirmationService,
};
use crate::state::SharedState;

pub mod auth;
mod dashboard;
mod error;
mod farms;
mod indices;
mod observability;
mod providers;
mod regions;
mod system;
mod system_users;
mod thresholds;
mod types;
mod users;
pub mod validation;

pub use error::ApiError;
pub use types::*;

use tokio::sync::RwLock;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub auth: Arc<dyn AuthService>,

    pub confirmations: Arc<dyn ConfirmationService>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn mailer(&self) -> &Arc<dyn crate::services::EmailSender> {
        &self.shared.mailer
    }
}

pub async fn create_app_state(shared: Arc<SharedState>) -> anyhow::Result<Arc<AppState>> {
    create_app_state_with_metrics(shared, None).await
}

pub async fn create_app_state_with_metrics(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let config = shared.config.read().await.clone();

    let auth: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
        shared.store.clone(),
        config.security.clone(),
        config.server.session_token_ttl_minutes,
    ));
    let confirmations: Arc<dyn ConfirmationService> = Arc::new(SeaOrmConfirmationService::new(
        shared.store.clone(),
        config.security,
    ));

    Ok(Arc::new(AppState {
        shared,
        auth,
        confirmations,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    }))
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    create_app_state_with_metrics(shared, prometheus_handle).await
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, secure_cookies, session_ttl_minutes) = {
        let config = state.config().read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
            config.server.session_ttl_minutes,
        )
    };

    let protected_routes = create_protected_router(state.clone());

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            session_ttl_minutes,
        )));

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/health", get(system::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/confirm", post(auth::confirm))
        .route("/auth/confirm/resend", post(auth::confirm_resend))
        .route("/auth/verify-email", get(auth::verify_email))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route(
            "/auth/forgot-password/verify",
            post(auth::forgot_password_verify),
        )
        .route(
            "/auth/forgot-password/reset",
            post(auth::forgot_password_reset),
        )
        .route("/auth/reset-password", get(auth::reset_password_link))
        .layer(session_layer)
        .with_state(state.clone());

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/farms", get(farms::list_farms))
        .route("/farms", post(farms::create_farm))
        .route("/farms/{id}", get(farms::get_farm))
        .route("/farms/{id}", put(farms::update_farm))
        .route("/farms/{id}", delete(farms::delete_farm))
        .route("/farms/{id}/paddocks", get(farms::list_paddocks))
        .route("/farms/{id}/paddocks", post(farms::create_paddock))
        .route(
            "/farms/{id}/paddocks/{paddock_id}",
            delete(farms::delete_paddock),
        )
        .route("/users", get(users::list_users))
        .route("/users", post(users::create_user))
        .route("/users/bulk-status", post(users::bulk_status))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", put(users::update_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/system-users", get(system_users::list_system_users))
        .route("/system-users", post(system_users::create_system_user))
        .route("/system-users/{id}", get(system_users::get_system_user))
        .route("/system-users/{id}", put(system_users::update_system_user))
        .route(
            "/system-users/{id}",
            delete(system_users::delete_system_user),
        )
        .route("/providers", get(providers::list_providers))
        .route("/providers", post(providers::create_provider))
        .route("/providers/{id}", get(providers::get_provider))
        .route("/providers/{id}", put(providers::update_provider))
        .route("/providers/{id}", delete(providers::delete_provider))
        .route("/indices", get(indices::list_indices))
        .route("/indices", post(indices::create_indice))
        .route("/indices/{id}", get(indices::get_indice))
        .route("/indices/{id}", put(indices::update_indice))
        .route("/indices/{id}", delete(indices::delete_indice))
        .route("/thresholds", get(thresholds::list_thresholds))
        .route("/thresholds", post(thresholds::create_threshold))
        .route("/thresholds/{id}", get(thresholds::get_threshold))
        .route("/thresholds/{id}", put(thresholds::update_threshold))
        .route("/thresholds/{id}", delete(thresholds::delete_threshold))
        .route("/regions", get(regions::list_regions))
        .route("/regions", post(regions::create_region))
        .route("/regions/{id}", get(regions::get_region))
        .route("/regions/{id}", put(regions::update_region))
        .route("/regions/{id}", delete(regions::delete_region))
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
