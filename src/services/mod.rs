pub mod availability;
pub mod booking;
pub mod ledger;
pub mod notify;
pub mod schedule;
pub mod slots;
pub mod time;
