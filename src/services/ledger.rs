use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::Connection;

use crate::db::queries;
use crate::services::time::{Interval, LocalClock};

/// One planned appointment on the location's day, both as wall-clock minutes
/// and as the instants it actually holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Held {
    pub interval: Interval,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Wall-clock spans on `date` held by the location's planned appointments.
///
/// The day is `[local midnight, next local midnight)` on the UTC timeline;
/// each appointment ends `duration_minutes` after its local start.
pub fn occupied_intervals(
    conn: &Connection,
    location_id: &str,
    clock: &LocalClock,
    date: NaiveDate,
) -> anyhow::Result<Vec<Interval>> {
    Ok(held_on(conn, location_id, clock, date)?
        .into_iter()
        .map(|h| h.interval)
        .collect())
}

pub fn held_on(
    conn: &Connection,
    location_id: &str,
    clock: &LocalClock,
    date: NaiveDate,
) -> anyhow::Result<Vec<Held>> {
    let (day_start, day_end) = clock.day_bounds(date);
    let planned = queries::get_planned_in_range(conn, location_id, &day_start, &day_end)?;

    Ok(planned
        .iter()
        .map(|p| {
            let start = clock.minutes_into_day(date, p.starts_at);
            let ends_at = p
                .starts_at
                .checked_add_signed(Duration::minutes(p.duration_minutes.into()))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            Held {
                interval: Interval::new(start, start.saturating_add(p.duration_minutes)),
                starts_at: p.starts_at,
                ends_at,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::db;
    use crate::models::{Appointment, AppointmentStatus, AppointmentType, Location};

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
                id: "color".to_string(),
                organization_id: "org-1".to_string(),
                name: "Color".to_string(),
                description: None,
                duration_minutes: 90,
                price_cents: 8000,
                currency: "EUR".to_string(),
                is_active: true,
            },
        )
        .unwrap();
        conn
    }

    fn book(conn: &Connection, id: &str, starts_at: &str, status: AppointmentStatus) {
        let customer =
            queries::upsert_customer(conn, "org-1", "Carol", "carol@example.com", None).unwrap();
        let starts_at: DateTime<Utc> = starts_at.parse().unwrap();
        queries::create_appointment(
            conn,
            &Appointment {
                id: id.to_string(),
                location_id: "loc-1".to_string(),
                customer_id: customer.id,
                appointment_type_id: "color".to_string(),
                starts_at,
                status,
                notes: None,
                created_at: starts_at,
            },
        )
        .unwrap();
    }

    fn clock() -> LocalClock {
        LocalClock::for_zone("Europe/Brussels").unwrap()
    }

    #[test]
    fn test_converts_to_local_wall_clock() {
        let conn = setup_db();
        // 08:00Z is 10:00 in Brussels during summer time.
        book(&conn, "a-1", "2025-06-16T08:00:00Z", AppointmentStatus::Planned);

        let date = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        let occupied = occupied_intervals(&conn, "loc-1", &clock(), date).unwrap();
        assert_eq!(occupied, vec![Interval::new(600, 690)]);
    }

    #[test]
    fn test_local_day_boundaries() {
        let conn = setup_db();
        // 22:30Z on the 15th is 00:30 local on the 16th.
        book(&conn, "early", "2025-06-15T22:30:00Z", AppointmentStatus::Planned);
        // 21:59Z on the 16th is 23:59 local, still the 16th.
        book(&conn, "late", "2025-06-16T21:59:00Z", AppointmentStatus::Planned);
        // 22:00Z on the 16th is already the 17th locally.
        book(&conn, "next", "2025-06-16T22:00:00Z", AppointmentStatus::Planned);

        let date = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        let occupied = occupied_intervals(&conn, "loc-1", &clock(), date).unwrap();
        assert_eq!(
            occupied,
            vec![Interval::new(30, 120), Interval::new(1439, 1529)]
        );
    }

    #[test]
    fn test_oversized_duration_saturates() {
        let conn = setup_db();
        book(&conn, "a-1", "2025-06-16T08:00:00Z", AppointmentStatus::Planned);
        conn.execute(
            "UPDATE appointment_types SET duration_minutes = ?1 WHERE id = 'color'",
            [i32::MAX],
        )
        .unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        let occupied = occupied_intervals(&conn, "loc-1", &clock(), date).unwrap();
        assert_eq!(occupied, vec![Interval::new(600, i32::MAX)]);
    }

    #[test]
    fn test_other_location_does_not_occupy() {
        let conn = setup_db();
        queries::create_location(
            &conn,
            &Location {
                id: "loc-2".to_string(),
                organization_id: "org-1".to_string(),
                name: "Second salon".to_string(),
                time_zone: "Europe/Brussels".to_string(),
                is_active: true,
            },
        )
        .unwrap();
        book(&conn, "a-1", "2025-06-16T08:00:00Z", AppointmentStatus::Planned);

        let date = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        assert!(occupied_intervals(&conn, "loc-2", &clock(), date)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_non_planned_never_occupy() {
        let conn = setup_db();
        book(&conn, "c", "2025-06-16T08:00:00Z", AppointmentStatus::Cancelled);
        book(&conn, "d", "2025-06-16T09:00:00Z", AppointmentStatus::Completed);
        book(&conn, "n", "2025-06-16T10:00:00Z", AppointmentStatus::NoShow);

        let date = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        assert!(occupied_intervals(&conn, "loc-1", &clock(), date)
            .unwrap()
            .is_empty());
    }
}
