//! Calendar and timetable computations

mod fortnight;
mod layout;
mod recurrence;

pub use fortnight::week_parity;
pub use layout::{Slot, layout_overlaps};
pub use recurrence::{Occurrence, events_on};
