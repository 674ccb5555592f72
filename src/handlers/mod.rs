pub mod admin;
pub mod health;
pub mod public;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::queries;
use crate::models::StoreConfig;
use crate::state::AppState;

/// Load the singleton store configuration, merged over defaults. A failed
/// or missing read degrades to the defaults so a request never fails just
/// because configuration is unavailable.
pub(crate) fn load_config(state: &AppState) -> StoreConfig {
    let db = state.db.lock().unwrap();
    match queries::load_config_blob(&db) {
        Ok(Some(blob)) => StoreConfig::from_partial(&blob),
        Ok(None) => StoreConfig::default(),
        Err(e) => {
            tracing::error!(error = %e, "failed to load store config, using defaults");
            StoreConfig::default()
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        // public booking API
        .route("/api/config", get(public::get_config))
        .route("/api/professionals", get(public::list_professionals))
        .route(
            "/api/professionals/:id/services",
            get(public::professional_services),
        )
        .route("/api/availability/dates", get(public::availability_dates))
        .route("/api/availability/slots", get(public::availability_slots))
        .route("/api/bookings", post(public::create_booking))
        // admin API
        .route(
            "/api/admin/services",
            get(admin::list_services).post(admin::create_service),
        )
        .route(
            "/api/admin/services/:id",
            put(admin::update_service).delete(admin::delete_service),
        )
        .route(
            "/api/admin/professionals",
            get(admin::list_professionals).post(admin::create_professional),
        )
        .route(
            "/api/admin/professionals/:id",
            put(admin::update_professional).delete(admin::delete_professional),
        )
        .route("/api/admin/appointments", get(admin::list_appointments))
        .route(
            "/api/admin/appointments/:id/cancel",
            post(admin::cancel_appointment),
        )
        .route(
            "/api/admin/config",
            get(admin::get_config).put(admin::update_config),
        )
        .route("/api/admin/plan/activate", post(admin::activate_plan))
        .route("/api/admin/upload", post(admin::upload_image))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
