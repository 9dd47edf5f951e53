use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::TimeSlot;
use crate::services::availability;
use crate::state::AppState;

// GET /api/locations/:location_id/availability
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
    pub appointment_type_id: String,
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(location_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<TimeSlot>>, AppError> {
    let slots = {
        let db = state.conn()?;
        availability::get_available_slots(&db, &location_id, &query.date, &query.appointment_type_id)?
    };
    Ok(Json(slots))
}
