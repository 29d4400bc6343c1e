//! Domain types for TaskBurst
//!
//! Every collection entity implements [`Record`] and lives as one element of
//! a JSON array under its store key. Settings are a single object.

pub mod keys;

mod assessment;
mod backup;
mod event;
mod id;
mod list;
mod priority;
mod record;
mod settings;
mod task;
mod timetable;

pub use assessment::{Assessment, AssessmentType, weighted_average};
pub use backup::TextBackup;
pub use event::{CalendarEvent, Recurrence};
pub use id::{IdResolver, generate_id};
pub use list::{ListItem, TaskList};
pub use priority::Priority;
pub use record::{Ordered, Record, next_order, renumber};
pub use settings::{DefaultView, Settings, Theme};
pub use task::{Category, Project, Task};
pub use timetable::{Timetable, TimetableBlock, Week};
