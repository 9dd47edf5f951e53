use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::opening_hours::normalize_slots;
use crate::models::{OpeningHourException, OpeningSlot, RegularOpeningHours};
use crate::state::AppState;

use super::auth::check_auth;

fn require_location(conn: &rusqlite::Connection, location_id: &str) -> Result<(), AppError> {
    match queries::get_location(conn, location_id)? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("location {location_id}"))),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("invalid date: {s}")))
}

// GET /api/admin/locations/:location_id/opening-hours
pub async fn get_opening_hours(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(location_id): Path<String>,
) -> Result<Json<Vec<RegularOpeningHours>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.conn()?;
    require_location(&db, &location_id)?;
    Ok(Json(queries::list_opening_hours(&db, &location_id)?))
}

// PUT /api/admin/locations/:location_id/opening-hours/:day_of_week
#[derive(Deserialize)]
pub struct OpeningHoursRequest {
    pub slots: Vec<OpeningSlot>,
}

pub async fn update_opening_hours(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((location_id, day_of_week)): Path<(String, u8)>,
    Json(payload): Json<OpeningHoursRequest>,
) -> Result<Json<RegularOpeningHours>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if day_of_week > 6 {
        return Err(AppError::validation(format!(
            "day of week must be 0-6, got {day_of_week}"
        )));
    }
    let slots = normalize_slots(payload.slots)?;

    let hours = RegularOpeningHours {
        location_id,
        day_of_week,
        slots,
    };

    let db = state.conn()?;
    require_location(&db, &hours.location_id)?;
    if hours.slots.is_empty() {
        queries::delete_opening_hours(&db, &hours.location_id, day_of_week)?;
    } else {
        queries::set_opening_hours(&db, &hours)?;
    }

    tracing::info!(
        location_id = %hours.location_id,
        day_of_week,
        slots = hours.slots.len(),
        "opening hours updated"
    );
    Ok(Json(hours))
}

// GET /api/admin/locations/:location_id/exceptions
pub async fn list_exceptions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(location_id): Path<String>,
) -> Result<Json<Vec<OpeningHourException>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.conn()?;
    require_location(&db, &location_id)?;
    Ok(Json(queries::list_opening_hour_exceptions(&db, &location_id)?))
}

// PUT /api/admin/locations/:location_id/exceptions/:date
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionRequest {
    #[serde(default)]
    pub is_closed: bool,
    pub remark: Option<String>,
    #[serde(default)]
    pub slots: Vec<OpeningSlot>,
}

pub async fn upsert_exception(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((location_id, date)): Path<(String, String)>,
    Json(payload): Json<ExceptionRequest>,
) -> Result<Json<OpeningHourException>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = parse_date(&date)?;
    let slots = normalize_slots(payload.slots)?;
    let is_closed = payload.is_closed || slots.is_empty();

    let exception = OpeningHourException {
        location_id,
        date,
        is_closed,
        remark: payload
            .remark
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty()),
        slots: if is_closed { vec![] } else { slots },
    };

    let db = state.conn()?;
    require_location(&db, &exception.location_id)?;
    queries::upsert_opening_hour_exception(&db, &exception)?;

    tracing::info!(
        location_id = %exception.location_id,
        date = %exception.date,
        is_closed,
        "opening hour exception saved"
    );
    Ok(Json(exception))
}

// DELETE /api/admin/locations/:location_id/exceptions/:date
pub async fn delete_exception(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((location_id, date)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = parse_date(&date)?;
    let db = state.conn()?;
    if !queries::delete_opening_hour_exception(&db, &location_id, date)? {
        return Err(AppError::NotFound(format!("exception for {date}")));
    }

    tracing::info!(%location_id, %date, "opening hour exception deleted");
    Ok(StatusCode::NO_CONTENT)
}
