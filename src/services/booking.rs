use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, TransactionBehavior};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Appointment, AppointmentStatus, AppointmentType, Customer, Location};
use crate::services::availability::{self, Unbookable};
use crate::services::time::display_time;

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub appointment_type_id: String,
    pub starts_at: DateTime<Utc>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
}

/// What was booked, with enough context to tell someone about it.
#[derive(Debug, Clone)]
pub struct BookingNotice {
    pub appointment: Appointment,
    pub customer: Customer,
    pub location: Location,
    pub appointment_type: AppointmentType,
    /// `YYYY-MM-DD HH:MM` on the location's wall clock.
    pub local_start: String,
}

impl NewAppointment {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.appointment_type_id.trim().is_empty() {
            return Err(AppError::validation("Please select a service"));
        }
        if self.customer_name.trim().chars().count() < 2 {
            return Err(AppError::validation("Name must be at least 2 characters"));
        }
        let email = self.customer_email.trim();
        match email.split_once('@') {
            Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(AppError::validation("Please enter a valid email")),
        }
    }
}

/// Books `new` at a location if its start is still offered.
///
/// The availability check and the insert share one IMMEDIATE transaction, so
/// the database write lock is held from the check until commit and two
/// bookers can never both take the same start. The partial unique index on
/// planned starts backs this up.
pub fn create_appointment(
    conn: &mut Connection,
    location_id: &str,
    new: &NewAppointment,
) -> Result<BookingNotice, AppError> {
    new.validate()?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let (location, appointment_type, clock) =
        match availability::load_bookable(&tx, location_id, &new.appointment_type_id)? {
            Ok(bookable) => bookable,
            Err(Unbookable::TimeZone) => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "location {location_id} has an unusable time zone"
                )))
            }
            Err(what) => return Err(AppError::NotFound(what.to_string())),
        };

    let local = clock.to_local(new.starts_at);
    let date = local.date();
    let start_minutes = clock.minutes_into_day(date, new.starts_at);

    let offered = availability::available_intervals(&tx, &location, &appointment_type, &clock, date)?
        .iter()
        .any(|i| i.start == start_minutes && clock.to_instant(date, i.start) == new.starts_at);
    if !offered {
        tracing::info!(
            %location_id,
            starts_at = %new.starts_at,
            "requested start is not available"
        );
        return Err(AppError::SlotUnavailable);
    }

    let customer = queries::upsert_customer(
        &tx,
        &location.organization_id,
        new.customer_name.trim(),
        new.customer_email.trim(),
        new.customer_phone.as_deref().filter(|p| !p.trim().is_empty()),
    )?;

    let appointment = Appointment {
        id: uuid::Uuid::new_v4().to_string(),
        location_id: location.id.clone(),
        customer_id: customer.id.clone(),
        appointment_type_id: appointment_type.id.clone(),
        starts_at: new.starts_at,
        status: AppointmentStatus::Planned,
        notes: new.notes.clone().filter(|n| !n.trim().is_empty()),
        created_at: Utc::now(),
    };

    queries::create_appointment(&tx, &appointment).map_err(|e| {
        if is_constraint_violation(&e) {
            AppError::SlotUnavailable
        } else {
            AppError::Internal(e)
        }
    })?;
    tx.commit()?;

    tracing::info!(
        appointment_id = %appointment.id,
        %location_id,
        starts_at = %appointment.starts_at,
        "appointment booked"
    );

    Ok(BookingNotice {
        local_start: format!("{} {}", date.format("%Y-%m-%d"), display_time(start_minutes)),
        appointment,
        customer,
        location,
        appointment_type,
    })
}

fn is_constraint_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Moves a planned appointment to a final status. Final statuses never change
/// again, and nothing moves back to planned.
pub fn update_appointment_status(
    conn: &Connection,
    id: &str,
    status: AppointmentStatus,
) -> Result<Appointment, AppError> {
    let mut appointment = queries::get_appointment(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("appointment {id}")))?;

    if status == AppointmentStatus::Planned {
        return Err(AppError::validation("appointments cannot be moved back to Planned"));
    }
    if appointment.status != AppointmentStatus::Planned {
        return Err(AppError::validation(format!(
            "appointment is already {}",
            appointment.status.as_str()
        )));
    }

    queries::update_appointment_status(conn, id, status)?;
    appointment.status = status;

    tracing::info!(appointment_id = %id, status = status.as_str(), "appointment status changed");
    Ok(appointment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{OpeningSlot, RegularOpeningHours};

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        queries::create_location(
            &conn,
            &Location {
                id: "loc-1".to_string(),
                organization_id: "org-1".to_string(),
                name: "Main salon".to_string(),
                time_zone: "Europe/Brussels".to_string(),
                is_active: true,
            },
        )
        .unwrap();
        queries::create_appointment_type(
            &conn,
            &AppointmentType {
                id: "cut".to_string(),
                organization_id: "org-1".to_string(),
                name: "Haircut".to_string(),
                description: None,
                duration_minutes: 30,
                price_cents: 2500,
                currency: "EUR".to_string(),
                is_active: true,
            },
        )
        .unwrap();
        queries::set_opening_hours(
            &conn,
            &RegularOpeningHours {
                location_id: "loc-1".to_string(),
                day_of_week: 1,
                slots: vec![OpeningSlot::parse("09:00", "12:00").unwrap()],
            },
        )
        .unwrap();
        conn
    }

    fn request(starts_at: &str) -> NewAppointment {
        NewAppointment {
            appointment_type_id: "cut".to_string(),
            starts_at: starts_at.parse().unwrap(),
            customer_name: "Erin".to_string(),
            customer_email: "erin@example.com".to_string(),
            customer_phone: None,
            notes: Some("Short please".to_string()),
        }
    }

    #[test]
    fn test_books_offered_slot() {
        let mut conn = setup_db();
        // 09:00 local
        let notice = create_appointment(&mut conn, "loc-1", &request("2025-06-16T07:00:00Z")).unwrap();
        assert_eq!(notice.local_start, "2025-06-16 09:00");
        assert_eq!(notice.appointment.status, AppointmentStatus::Planned);
        assert_eq!(notice.customer.email, "erin@example.com");

        let stored = queries::get_appointment(&conn, &notice.appointment.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.notes.as_deref(), Some("Short please"));
    }

    #[test]
    fn test_second_booking_of_same_slot_conflicts() {
        let mut conn = setup_db();
        create_appointment(&mut conn, "loc-1", &request("2025-06-16T07:00:00Z")).unwrap();
        let err = create_appointment(&mut conn, "loc-1", &request("2025-06-16T07:00:00Z"));
        assert!(matches!(err, Err(AppError::SlotUnavailable)));

        // 09:15 overlaps the 09:00-09:30 booking.
        let err = create_appointment(&mut conn, "loc-1", &request("2025-06-16T07:15:00Z"));
        assert!(matches!(err, Err(AppError::SlotUnavailable)));

        // 09:30 is free.
        assert!(create_appointment(&mut conn, "loc-1", &request("2025-06-16T07:30:00Z")).is_ok());
    }

    #[test]
    fn test_off_grid_or_closed_start_is_unavailable() {
        let mut conn = setup_db();
        let err = create_appointment(&mut conn, "loc-1", &request("2025-06-16T07:05:00Z"));
        assert!(matches!(err, Err(AppError::SlotUnavailable)));
        // Tuesday has no hours.
        let err = create_appointment(&mut conn, "loc-1", &request("2025-06-17T07:00:00Z"));
        assert!(matches!(err, Err(AppError::SlotUnavailable)));
    }

    #[test]
    fn test_unknown_location_and_type() {
        let mut conn = setup_db();
        let err = create_appointment(&mut conn, "nowhere", &request("2025-06-16T07:00:00Z"));
        assert!(matches!(err, Err(AppError::NotFound(what)) if what == "location"));

        let mut req = request("2025-06-16T07:00:00Z");
        req.appointment_type_id = "missing".to_string();
        let err = create_appointment(&mut conn, "loc-1", &req);
        assert!(matches!(err, Err(AppError::NotFound(what)) if what == "appointment type"));
    }

    #[test]
    fn test_inactive_location_and_bad_zone_report_cause() {
        let mut conn = setup_db();
        conn.execute("UPDATE locations SET is_active = 0 WHERE id = 'loc-1'", [])
            .unwrap();
        let err = create_appointment(&mut conn, "loc-1", &request("2025-06-16T07:00:00Z"));
        assert!(matches!(err, Err(AppError::NotFound(what)) if what == "location"));

        conn.execute(
            "UPDATE locations SET is_active = 1, time_zone = 'Mars/Olympus' WHERE id = 'loc-1'",
            [],
        )
        .unwrap();
        let err = create_appointment(&mut conn, "loc-1", &request("2025-06-16T07:00:00Z"));
        assert!(matches!(err, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_validation() {
        let mut req = request("2025-06-16T07:00:00Z");
        req.customer_name = "E".to_string();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        let mut req = request("2025-06-16T07:00:00Z");
        req.customer_email = "not-an-email".to_string();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        assert!(request("2025-06-16T07:00:00Z").validate().is_ok());
    }

    #[test]
    fn test_cancel_frees_slot() {
        let mut conn = setup_db();
        let notice = create_appointment(&mut conn, "loc-1", &request("2025-06-16T07:00:00Z")).unwrap();

        let cancelled =
            update_appointment_status(&conn, &notice.appointment.id, AppointmentStatus::Cancelled)
                .unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

        assert!(create_appointment(&mut conn, "loc-1", &request("2025-06-16T07:00:00Z")).is_ok());
    }

    #[test]
    fn test_final_status_is_final() {
        let mut conn = setup_db();
        let notice = create_appointment(&mut conn, "loc-1", &request("2025-06-16T07:00:00Z")).unwrap();
        let id = notice.appointment.id;

        update_appointment_status(&conn, &id, AppointmentStatus::Completed).unwrap();
        let err = update_appointment_status(&conn, &id, AppointmentStatus::NoShow);
        assert!(matches!(err, Err(AppError::Validation(_))));
        let err = update_appointment_status(&conn, &id, AppointmentStatus::Planned);
        assert!(matches!(err, Err(AppError::Validation(_))));
        let err = update_appointment_status(&conn, "missing", AppointmentStatus::Cancelled);
        assert!(matches!(err, Err(AppError::NotFound(_))));
    }
}
