use crate::models::OpeningSlot;
use crate::services::time::Interval;

/// Spacing between candidate start times, counted from each interval's
/// opening time.
pub const SLOT_GRID_MINUTES: i32 = 15;

/// Every grid start within the open intervals at which a service of
/// `duration_minutes` finishes no later than closing.
pub fn candidate_slots(open: &[OpeningSlot], duration_minutes: i32) -> Vec<Interval> {
    if duration_minutes <= 0 {
        return vec![];
    }

    let mut candidates = vec![];
    for interval in open {
        let mut start = interval.opens_at();
        while start < interval.closes_at() {
            let end = match start.checked_add(duration_minutes) {
                Some(end) if end <= interval.closes_at() => end,
                _ => break,
            };
            candidates.push(Interval::new(start, end));
            start += SLOT_GRID_MINUTES;
        }
    }
    candidates
}

/// Drops every candidate that overlaps an occupied span. Candidates are kept
/// or dropped whole.
pub fn filter_available(candidates: Vec<Interval>, occupied: &[Interval]) -> Vec<Interval> {
    candidates
        .into_iter()
        .filter(|c| !occupied.iter().any(|o| c.overlaps(o)))
        .collect()
}
