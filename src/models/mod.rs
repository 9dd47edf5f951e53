pub mod appointment;
pub mod appointment_type;
pub mod customer;
pub mod location;
pub mod opening_hours;
pub mod time_slot;

pub use appointment::{Appointment, AppointmentStatus};
pub use appointment_type::AppointmentType;
pub use customer::Customer;
pub use location::Location;
pub use opening_hours::{DaySchedule, OpeningHourException, OpeningSlot, RegularOpeningHours};
pub use time_slot::{SlotDisplay, TimeSlot};
