use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Appointment, AppointmentStatus, AppointmentType, Customer, Location, OpeningHourException,
    OpeningSlot, RegularOpeningHours,
};
use crate::services::time::MINUTES_PER_DAY;

/// Instants are stored as UTC text in this shape so that lexical order is
/// chronological order.
const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.format(INSTANT_FORMAT).to_string()
}

fn parse_instant(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, INSTANT_FORMAT)?;
    Ok(naive.and_utc())
}

fn slots_to_json(slots: &[OpeningSlot]) -> anyhow::Result<String> {
    Ok(serde_json::to_string(slots)?)
}

fn slots_from_json(s: &str) -> anyhow::Result<Vec<OpeningSlot>> {
    Ok(serde_json::from_str(s)?)
}

// ── Locations ──

pub fn create_location(conn: &Connection, location: &Location) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO locations (id, organization_id, name, time_zone, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            location.id,
            location.organization_id,
            location.name,
            location.time_zone,
            location.is_active,
        ],
    )?;
    Ok(())
}

pub fn get_location(conn: &Connection, id: &str) -> anyhow::Result<Option<Location>> {
    let location = conn
        .query_row(
            "SELECT id, organization_id, name, time_zone, is_active FROM locations WHERE id = ?1",
            params![id],
            |row| {
                Ok(Location {
                    id: row.get(0)?,
                    organization_id: row.get(1)?,
                    name: row.get(2)?,
                    time_zone: row.get(3)?,
                    is_active: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(location)
}

// ── Appointment Types ──

pub fn create_appointment_type(conn: &Connection, t: &AppointmentType) -> anyhow::Result<()> {
    anyhow::ensure!(
        (1..=MINUTES_PER_DAY).contains(&t.duration_minutes),
        "appointment type {} has duration {} outside 1..={MINUTES_PER_DAY} minutes",
        t.id,
        t.duration_minutes
    );
    conn.execute(
        "INSERT INTO appointment_types (id, organization_id, name, description, duration_minutes, price_cents, currency, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            t.id,
            t.organization_id,
            t.name,
            t.description,
            t.duration_minutes,
            t.price_cents,
            t.currency,
            t.is_active,
        ],
    )?;
    Ok(())
}

pub fn get_appointment_type(conn: &Connection, id: &str) -> anyhow::Result<Option<AppointmentType>> {
    let appointment_type = conn
        .query_row(
            "SELECT id, organization_id, name, description, duration_minutes, price_cents, currency, is_active
             FROM appointment_types WHERE id = ?1",
            params![id],
            |row| {
                Ok(AppointmentType {
                    id: row.get(0)?,
                    organization_id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                    duration_minutes: row.get(4)?,
                    price_cents: row.get(5)?,
                    currency: row.get(6)?,
                    is_active: row.get(7)?,
                })
            },
        )
        .optional()?;
    Ok(appointment_type)
}

// ── Customers ──

/// Looks up a customer by email within the organization, refreshing name and
/// phone when found, and creates one otherwise.
pub fn upsert_customer(
    conn: &Connection,
    organization_id: &str,
    name: &str,
    email: &str,
    phone: Option<&str>,
) -> anyhow::Result<Customer> {
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO customers (id, organization_id, name, email, phone)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(organization_id, email) DO UPDATE SET
           name = excluded.name,
           phone = excluded.phone",
        params![id, organization_id, name, email, phone],
    )?;

    let customer = conn.query_row(
        "SELECT id, organization_id, name, email, phone FROM customers
         WHERE organization_id = ?1 AND email = ?2",
        params![organization_id, email],
        |row| {
            Ok(Customer {
                id: row.get(0)?,
                organization_id: row.get(1)?,
                name: row.get(2)?,
                email: row.get(3)?,
                phone: row.get(4)?,
            })
        },
    )?;
    Ok(customer)
}

// ── Regular Opening Hours ──

pub fn get_opening_hours(
    conn: &Connection,
    location_id: &str,
    day_of_week: u8,
) -> anyhow::Result<Option<RegularOpeningHours>> {
    let slots_json: Option<String> = conn
        .query_row(
            "SELECT slots FROM opening_hours WHERE location_id = ?1 AND day_of_week = ?2",
            params![location_id, day_of_week],
            |row| row.get(0),
        )
        .optional()?;

    match slots_json {
        Some(json) => Ok(Some(RegularOpeningHours {
            location_id: location_id.to_string(),
            day_of_week,
            slots: slots_from_json(&json)?,
        })),
        None => Ok(None),
    }
}

pub fn list_opening_hours(
    conn: &Connection,
    location_id: &str,
) -> anyhow::Result<Vec<RegularOpeningHours>> {
    let mut stmt = conn.prepare(
        "SELECT day_of_week, slots FROM opening_hours WHERE location_id = ?1 ORDER BY day_of_week ASC",
    )?;
    let rows = stmt.query_map(params![location_id], |row| {
        Ok((row.get::<_, u8>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut hours = vec![];
    for row in rows {
        let (day_of_week, json) = row?;
        hours.push(RegularOpeningHours {
            location_id: location_id.to_string(),
            day_of_week,
            slots: slots_from_json(&json)?,
        });
    }
    Ok(hours)
}

pub fn set_opening_hours(conn: &Connection, hours: &RegularOpeningHours) -> anyhow::Result<()> {
    let slots = slots_to_json(&hours.slots)?;
    conn.execute(
        "INSERT INTO opening_hours (location_id, day_of_week, slots) VALUES (?1, ?2, ?3)
         ON CONFLICT(location_id, day_of_week) DO UPDATE SET slots = excluded.slots",
        params![hours.location_id, hours.day_of_week, slots],
    )?;
    Ok(())
}

pub fn delete_opening_hours(
    conn: &Connection,
    location_id: &str,
    day_of_week: u8,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM opening_hours WHERE location_id = ?1 AND day_of_week = ?2",
        params![location_id, day_of_week],
    )?;
    Ok(count > 0)
}

// ── Opening Hour Exceptions ──

fn parse_exception_row(
    location_id: &str,
    date_str: &str,
    is_closed: bool,
    remark: Option<String>,
    slots_json: &str,
) -> anyhow::Result<OpeningHourException> {
    Ok(OpeningHourException {
        location_id: location_id.to_string(),
        date: NaiveDate::parse_from_str(date_str, DATE_FORMAT)?,
        is_closed,
        remark,
        slots: slots_from_json(slots_json)?,
    })
}

pub fn get_opening_hour_exception(
    conn: &Connection,
    location_id: &str,
    date: NaiveDate,
) -> anyhow::Result<Option<OpeningHourException>> {
    let date_str = date.format(DATE_FORMAT).to_string();
    let row = conn
        .query_row(
            "SELECT is_closed, remark, slots FROM opening_hour_exceptions
             WHERE location_id = ?1 AND date = ?2",
            params![location_id, date_str],
            |row| {
                Ok((
                    row.get::<_, bool>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((is_closed, remark, slots)) => Ok(Some(parse_exception_row(
            location_id,
            &date_str,
            is_closed,
            remark,
            &slots,
        )?)),
        None => Ok(None),
    }
}

pub fn list_opening_hour_exceptions(
    conn: &Connection,
    location_id: &str,
) -> anyhow::Result<Vec<OpeningHourException>> {
    let mut stmt = conn.prepare(
        "SELECT date, is_closed, remark, slots FROM opening_hour_exceptions
         WHERE location_id = ?1 ORDER BY date ASC",
    )?;
    let rows = stmt.query_map(params![location_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, bool>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut exceptions = vec![];
    for row in rows {
        let (date, is_closed, remark, slots) = row?;
        exceptions.push(parse_exception_row(
            location_id,
            &date,
            is_closed,
            remark,
            &slots,
        )?);
    }
    Ok(exceptions)
}

pub fn upsert_opening_hour_exception(
    conn: &Connection,
    exception: &OpeningHourException,
) -> anyhow::Result<()> {
    let date = exception.date.format(DATE_FORMAT).to_string();
    let slots = slots_to_json(&exception.slots)?;
    conn.execute(
        "INSERT INTO opening_hour_exceptions (location_id, date, is_closed, remark, slots)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(location_id, date) DO UPDATE SET
           is_closed = excluded.is_closed,
           remark = excluded.remark,
           slots = excluded.slots",
        params![
            exception.location_id,
            date,
            exception.is_closed,
            exception.remark,
            slots,
        ],
    )?;
    Ok(())
}

pub fn delete_opening_hour_exception(
    conn: &Connection,
    location_id: &str,
    date: NaiveDate,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM opening_hour_exceptions WHERE location_id = ?1 AND date = ?2",
        params![location_id, date.format(DATE_FORMAT).to_string()],
    )?;
    Ok(count > 0)
}

// ── Appointments ──

/// A planned appointment as seen by the ledger: where it starts and how long
/// its service runs.
#[derive(Debug, Clone)]
pub struct PlannedOccupancy {
    pub appointment_id: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i32,
}

pub fn create_appointment(conn: &Connection, appointment: &Appointment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO appointments (id, location_id, customer_id, appointment_type_id, starts_at, status, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            appointment.id,
            appointment.location_id,
            appointment.customer_id,
            appointment.appointment_type_id,
            format_instant(&appointment.starts_at),
            appointment.status.as_str(),
            appointment.notes,
            format_instant(&appointment.created_at),
        ],
    )?;
    Ok(())
}

const APPOINTMENT_COLUMNS: &str =
    "id, location_id, customer_id, appointment_type_id, starts_at, status, notes, created_at";

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let starts_at: String = row.get(4)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(7)?;

    Ok(Appointment {
        id: row.get(0)?,
        location_id: row.get(1)?,
        customer_id: row.get(2)?,
        appointment_type_id: row.get(3)?,
        starts_at: parse_instant(&starts_at)?,
        status: AppointmentStatus::parse(&status)
            .ok_or_else(|| anyhow::anyhow!("unknown appointment status: {status}"))?,
        notes: row.get(6)?,
        created_at: parse_instant(&created_at)?,
    })
}

pub fn get_appointment(conn: &Connection, id: &str) -> anyhow::Result<Option<Appointment>> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], |row| Ok(parse_appointment_row(row)));

    match result {
        Ok(appointment) => Ok(Some(appointment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_appointments_for_location(
    conn: &Connection,
    location_id: &str,
    limit: i64,
) -> anyhow::Result<Vec<Appointment>> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE location_id = ?1 ORDER BY starts_at ASC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![location_id, limit], |row| {
        Ok(parse_appointment_row(row))
    })?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

/// Planned appointments of a location starting in `[start, end)`.
pub fn get_planned_in_range(
    conn: &Connection,
    location_id: &str,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> anyhow::Result<Vec<PlannedOccupancy>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.starts_at, t.duration_minutes
         FROM appointments a
         INNER JOIN appointment_types t ON t.id = a.appointment_type_id
         WHERE a.location_id = ?1 AND a.status = ?2
           AND a.starts_at >= ?3 AND a.starts_at < ?4
         ORDER BY a.starts_at ASC",
    )?;

    let rows = stmt.query_map(
        params![
            location_id,
            AppointmentStatus::Planned.as_str(),
            format_instant(start),
            format_instant(end),
        ],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i32>(2)?,
            ))
        },
    )?;

    let mut occupied = vec![];
    for row in rows {
        let (appointment_id, starts_at, duration_minutes) = row?;
        occupied.push(PlannedOccupancy {
            appointment_id,
            starts_at: parse_instant(&starts_at)?,
            duration_minutes,
        });
    }
    Ok(occupied)
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &str,
    status: AppointmentStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    Ok(count > 0)
}
