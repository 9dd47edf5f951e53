use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// An offerable start time. Computed per query, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub starts_at: DateTime<FixedOffset>,
    pub ends_at: DateTime<FixedOffset>,
    pub display: SlotDisplay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDisplay {
    pub start_time: String,
    pub end_time: String,
}
