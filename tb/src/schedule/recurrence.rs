//! Expanding calendar events onto concrete days

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::domain::{CalendarEvent, Recurrence};

/// One concrete appearance of an event
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence<'a> {
    pub event: &'a CalendarEvent,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl CalendarEvent {
    /// Whether the event appears on `date`
    ///
    /// One-off events appear on every day they span. Recurring events appear
    /// on each repeat of their start date up to `until`; monthly repeats skip
    /// months without that day.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        self.occurrence_on(date).is_some()
    }

    /// Start and end of the appearance on `date`, if any
    pub fn occurrence_on(&self, date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
        if self.deleted_at.is_some() {
            return None;
        }
        let first = self.start.date();

        let Some(recurrence) = self.recurrence else {
            return (first <= date && date <= self.end.date()).then_some((self.start, self.end));
        };

        if date < first || self.until.is_some_and(|until| date > until) {
            return None;
        }
        let repeats = match recurrence {
            Recurrence::Daily => true,
            Recurrence::Weekly => (date - first).num_days() % 7 == 0,
            Recurrence::Monthly => date.day() == first.day(),
        };
        if !repeats {
            return None;
        }

        let start = date.and_time(self.start.time());
        Some((start, start + (self.end - self.start)))
    }
}

/// Occurrences on `date` across `events`, sorted by start
pub fn events_on(events: &[CalendarEvent], date: NaiveDate) -> Vec<Occurrence<'_>> {
    let mut occurrences: Vec<Occurrence<'_>> = events
        .iter()
        .filter_map(|event| {
            event
                .occurrence_on(date)
                .map(|(start, end)| Occurrence { event, start, end })
        })
        .collect();
    occurrences.sort_by_key(|occ| (occ.start, occ.end));
    occurrences
}
