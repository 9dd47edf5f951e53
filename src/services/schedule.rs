use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::DaySchedule;

/// Resolves the open intervals of `date` for a location.
///
/// An exception for the date decides on its own: closed, or its slot list
/// (closed when that list is empty). Without one, the weekly template for the
/// date's weekday applies, and a missing or empty template means closed.
pub fn resolve_open_intervals(
    conn: &Connection,
    location_id: &str,
    date: NaiveDate,
) -> anyhow::Result<DaySchedule> {
    if let Some(exception) = queries::get_opening_hour_exception(conn, location_id, date)? {
        if exception.is_closed {
            return Ok(DaySchedule::Closed);
        }
        return Ok(DaySchedule::from_slots(exception.slots));
    }

    let day_of_week = date.weekday().num_days_from_sunday() as u8;
    match queries::get_opening_hours(conn, location_id, day_of_week)? {
        Some(hours) => Ok(DaySchedule::from_slots(hours.slots)),
        None => Ok(DaySchedule::Closed),
    }
}
