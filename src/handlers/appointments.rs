use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Appointment, AppointmentStatus};
use crate::services::booking::{self, NewAppointment};
use crate::state::AppState;

use super::auth::check_auth;

// POST /api/locations/:location_id/appointments
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub appointment_type_id: String,
    pub starts_at: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub appointment_id: String,
    pub starts_at: DateTime<Utc>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Path(location_id): Path<String>,
    Json(payload): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let starts_at = DateTime::parse_from_rfc3339(payload.starts_at.trim())
        .map_err(|_| AppError::validation("Please select a time"))?
        .with_timezone(&Utc);

    let new = NewAppointment {
        appointment_type_id: payload.appointment_type_id,
        starts_at,
        customer_name: payload.customer_name,
        customer_email: payload.customer_email,
        customer_phone: payload.customer_phone,
        notes: payload.notes,
    };

    let notice = {
        let mut db = state.conn()?;
        booking::create_appointment(&mut db, &location_id, &new)?
    };

    if let Err(e) = state.notifier.appointment_booked(&notice).await {
        tracing::warn!(
            appointment_id = %notice.appointment.id,
            error = %e,
            "failed to send booking notification"
        );
    }

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            appointment_id: notice.appointment.id,
            starts_at: notice.appointment.starts_at,
        }),
    ))
}

// GET /api/admin/locations/:location_id/appointments
const MAX_PAGE_SIZE: i64 = 500;

#[derive(Deserialize)]
pub struct AppointmentsQuery {
    pub limit: Option<i64>,
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(location_id): Path<String>,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(100).clamp(1, MAX_PAGE_SIZE);
    let appointments = {
        let db = state.conn()?;
        queries::list_appointments_for_location(&db, &location_id, limit)?
    };
    Ok(Json(appointments))
}

// POST /api/admin/appointments/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: AppointmentStatus,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<StatusRequest>,
) -> Result<Json<Appointment>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let appointment = {
        let db = state.conn()?;
        booking::update_appointment_status(&db, &id, payload.status)?
    };
    Ok(Json(appointment))
}
