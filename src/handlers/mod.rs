pub mod appointments;
pub mod auth;
pub mod availability;
pub mod health;
pub mod opening_hours;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let timeout = state.config.request_timeout;

    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/locations/:location_id/availability",
            get(availability::get_availability),
        )
        .route(
            "/api/locations/:location_id/appointments",
            post(appointments::create_booking),
        )
        .route(
            "/api/admin/locations/:location_id/opening-hours",
            get(opening_hours::get_opening_hours),
        )
        .route(
            "/api/admin/locations/:location_id/opening-hours/:day_of_week",
            put(opening_hours::update_opening_hours),
        )
        .route(
            "/api/admin/locations/:location_id/exceptions",
            get(opening_hours::list_exceptions),
        )
        .route(
            "/api/admin/locations/:location_id/exceptions/:date",
            put(opening_hours::upsert_exception).delete(opening_hours::delete_exception),
        )
        .route(
            "/api/admin/locations/:location_id/appointments",
            get(appointments::list_appointments),
        )
        .route(
            "/api/admin/appointments/:id/status",
            post(appointments::update_status),
        )
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
