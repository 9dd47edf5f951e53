use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::services::time::{display_time, overlaps, time_to_minutes};

/// One open stretch of a day, in wall-clock minutes since midnight.
///
/// Shared by regular weekly hours and date exceptions. On the wire it reads
/// `{"opensAt": "09:00", "closesAt": "12:30"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSlot", into = "RawSlot")]
pub struct OpeningSlot {
    opens_at: i32,
    closes_at: i32,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSlot {
    opens_at: String,
    closes_at: String,
}

impl OpeningSlot {
    pub fn new(opens_at: i32, closes_at: i32) -> Result<Self, AppError> {
        if opens_at >= closes_at {
            return Err(AppError::validation(format!(
                "opening slot must open before it closes: {}-{}",
                display_time(opens_at),
                display_time(closes_at)
            )));
        }
        Ok(Self {
            opens_at,
            closes_at,
        })
    }

    pub fn parse(opens_at: &str, closes_at: &str) -> Result<Self, AppError> {
        Self::new(time_to_minutes(opens_at)?, time_to_minutes(closes_at)?)
    }

    pub fn opens_at(&self) -> i32 {
        self.opens_at
    }

    pub fn closes_at(&self) -> i32 {
        self.closes_at
    }
}

impl TryFrom<RawSlot> for OpeningSlot {
    type Error = AppError;

    fn try_from(raw: RawSlot) -> Result<Self, Self::Error> {
        OpeningSlot::parse(&raw.opens_at, &raw.closes_at)
    }
}

impl From<OpeningSlot> for RawSlot {
    fn from(slot: OpeningSlot) -> Self {
        RawSlot {
            opens_at: display_time(slot.opens_at),
            closes_at: display_time(slot.closes_at),
        }
    }
}

/// Sorts a day's slots by opening time and rejects overlapping entries.
/// Slots that touch (one closes exactly when the next opens) are accepted.
pub fn normalize_slots(mut slots: Vec<OpeningSlot>) -> Result<Vec<OpeningSlot>, AppError> {
    slots.sort_by_key(|s| s.opens_at);
    for pair in slots.windows(2) {
        if overlaps(
            pair[0].opens_at,
            pair[0].closes_at,
            pair[1].opens_at,
            pair[1].closes_at,
        ) {
            return Err(AppError::validation(format!(
                "opening slots overlap: {}-{} and {}-{}",
                display_time(pair[0].opens_at),
                display_time(pair[0].closes_at),
                display_time(pair[1].opens_at),
                display_time(pair[1].closes_at)
            )));
        }
    }
    Ok(slots)
}

/// Weekly template for one weekday (0 = Sunday).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegularOpeningHours {
    pub location_id: String,
    pub day_of_week: u8,
    pub slots: Vec<OpeningSlot>,
}

/// Date-specific override. When present it fully replaces the weekly
/// template for its date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningHourException {
    pub location_id: String,
    pub date: NaiveDate,
    pub is_closed: bool,
    pub remark: Option<String>,
    pub slots: Vec<OpeningSlot>,
}

/// The resolved hours of one calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaySchedule {
    Closed,
    /// Non-empty, ordered by opening time.
    Open(Vec<OpeningSlot>),
}

impl DaySchedule {
    pub fn from_slots(mut slots: Vec<OpeningSlot>) -> Self {
        if slots.is_empty() {
            return DaySchedule::Closed;
        }
        slots.sort_by_key(|s| s.opens_at);
        DaySchedule::Open(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(o: &str, c: &str) -> OpeningSlot {
        OpeningSlot::parse(o, c).unwrap()
    }

    #[test]
    fn test_slot_requires_open_before_close() {
        assert!(OpeningSlot::parse("09:00", "09:00").is_err());
        assert!(OpeningSlot::parse("12:00", "09:00").is_err());
        assert!(OpeningSlot::parse("09:00", "09:15").is_ok());
    }

    #[test]
    fn test_slot_json_shape() {
        let parsed: OpeningSlot =
            serde_json::from_str(r#"{"opensAt":"09:00:00","closesAt":"12:30"}"#).unwrap();
        assert_eq!(parsed.opens_at(), 540);
        assert_eq!(parsed.closes_at(), 750);

        let json = serde_json::to_value(parsed).unwrap();
        assert_eq!(json["opensAt"], "09:00");
        assert_eq!(json["closesAt"], "12:30");
    }

    #[test]
    fn test_slot_json_rejects_bad_time() {
        let parsed: Result<OpeningSlot, _> =
            serde_json::from_str(r#"{"opensAt":"25:00","closesAt":"26:00"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_normalize_sorts_and_accepts_touching() {
        let slots = normalize_slots(vec![slot("13:30", "18:00"), slot("09:00", "13:30")]).unwrap();
        assert_eq!(slots[0].opens_at(), 540);
        assert_eq!(slots[1].opens_at(), 810);
    }

    #[test]
    fn test_normalize_rejects_overlap() {
        let err = normalize_slots(vec![slot("09:00", "12:30"), slot("12:00", "14:00")]);
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_day_schedule_from_empty_is_closed() {
        assert_eq!(DaySchedule::from_slots(vec![]), DaySchedule::Closed);
    }
}
