//! Bookable start times for a (location, date, appointment type) query.
//!
//! Missing or unusable data folds into an empty answer; only store failures
//! surface as errors.

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{AppointmentType, DaySchedule, Location, SlotDisplay, TimeSlot};
use crate::services::time::{display_time, overlaps, Interval, LocalClock};
use crate::services::{ledger, schedule, slots};

/// Why a (location, appointment type) pair cannot be offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Unbookable {
    #[error("location")]
    Location,
    #[error("appointment type")]
    AppointmentType,
    #[error("location time zone")]
    TimeZone,
}

pub fn get_available_slots(
    conn: &Connection,
    location_id: &str,
    date_iso: &str,
    appointment_type_id: &str,
) -> Result<Vec<TimeSlot>, AppError> {
    let date = match NaiveDate::parse_from_str(date_iso, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => {
            tracing::warn!(date = %date_iso, "malformed availability date");
            return Ok(vec![]);
        }
    };

    let Ok((location, appointment_type, clock)) =
        load_bookable(conn, location_id, appointment_type_id)?
    else {
        return Ok(vec![]);
    };

    let available = available_intervals(conn, &location, &appointment_type, &clock, date)?;

    tracing::debug!(
        location_id = %location.id,
        %date,
        appointment_type_id = %appointment_type.id,
        slots = available.len(),
        "computed availability"
    );

    Ok(available
        .iter()
        .map(|i| TimeSlot {
            starts_at: clock.to_zoned(clock.to_instant(date, i.start)),
            ends_at: clock.to_zoned(clock.to_instant(date, i.end)),
            display: SlotDisplay {
                start_time: display_time(i.start),
                end_time: display_time(i.end),
            },
        })
        .collect())
}

/// Loads the location and appointment type and checks that the pair can be
/// offered at all: both active, same organization, and a known time zone.
/// The outer error is a store failure; the inner one says what is unusable.
pub fn load_bookable(
    conn: &Connection,
    location_id: &str,
    appointment_type_id: &str,
) -> Result<Result<(Location, AppointmentType, LocalClock), Unbookable>, AppError> {
    let location = match queries::get_location(conn, location_id)? {
        Some(l) if l.is_active => l,
        Some(_) => {
            tracing::warn!(%location_id, "location is inactive");
            return Ok(Err(Unbookable::Location));
        }
        None => {
            tracing::warn!(%location_id, "location not found");
            return Ok(Err(Unbookable::Location));
        }
    };

    let appointment_type = match queries::get_appointment_type(conn, appointment_type_id)? {
        Some(t) if t.is_active && t.organization_id == location.organization_id => t,
        _ => {
            tracing::warn!(%location_id, %appointment_type_id, "appointment type not offerable");
            return Ok(Err(Unbookable::AppointmentType));
        }
    };

    let clock = match LocalClock::for_zone(&location.time_zone) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(%location_id, error = %e, "location has unusable time zone");
            return Ok(Err(Unbookable::TimeZone));
        }
    };

    Ok(Ok((location, appointment_type, clock)))
}

/// Free wall-clock spans on `date`, in chronological order.
///
/// On DST transition days wall-clock minutes and elapsed time disagree, so
/// candidates are also checked against the instants each planned appointment
/// holds. Starts that fall in a spring-forward gap are not offered; they would
/// duplicate the grid start the gap shifts them onto.
pub fn available_intervals(
    conn: &Connection,
    location: &Location,
    appointment_type: &AppointmentType,
    clock: &LocalClock,
    date: NaiveDate,
) -> anyhow::Result<Vec<Interval>> {
    let open = match schedule::resolve_open_intervals(conn, &location.id, date)? {
        DaySchedule::Closed => {
            tracing::debug!(location_id = %location.id, %date, "closed");
            return Ok(vec![]);
        }
        DaySchedule::Open(open) => open,
    };

    let held = ledger::held_on(conn, &location.id, clock, date)?;
    let occupied: Vec<Interval> = held.iter().map(|h| h.interval).collect();
    let candidates = slots::candidate_slots(&open, appointment_type.duration_minutes);

    tracing::debug!(
        location_id = %location.id,
        %date,
        open_intervals = open.len(),
        occupied = occupied.len(),
        candidates = candidates.len(),
        "resolved day"
    );

    Ok(slots::filter_available(candidates, &occupied)
        .into_iter()
        .filter(|c| {
            let starts_at = clock.to_instant(date, c.start);
            let ends_at = clock.to_instant(date, c.end);
            clock.minutes_into_day(date, starts_at) == c.start
                && !held
                    .iter()
                    .any(|h| overlaps(starts_at, ends_at, h.starts_at, h.ends_at))
        })
        .collect())
}
