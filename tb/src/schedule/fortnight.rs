//! Fortnight week parity and timetable block lookup

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::domain::{Timetable, TimetableBlock, Week};

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Week A or B of the fortnight containing `date`
///
/// The week containing `anchor` is week A; weeks alternate from there in both
/// directions.
pub fn week_parity(date: NaiveDate, anchor: NaiveDate) -> Week {
    let weeks = (monday_of(date) - monday_of(anchor)).num_days() / 7;
    if weeks.rem_euclid(2) == 0 { Week::A } else { Week::B }
}

impl Timetable {
    /// Week label for `date`, or None when the timetable repeats every week
    pub fn week_on(&self, date: NaiveDate) -> Option<Week> {
        self.fortnightly.then(|| week_parity(date, self.anchor_date))
    }

    fn blocks_on(&self, date: NaiveDate) -> impl Iterator<Item = &TimetableBlock> {
        let week = self.week_on(date);
        self.blocks.iter().filter(move |block| {
            block.day == date.weekday()
                && match (block.week, week) {
                    (None, _) | (_, None) => true,
                    (Some(wanted), Some(actual)) => wanted == actual,
                }
        })
    }

    /// Blocks that apply on `date`, sorted by start time
    pub fn day_schedule(&self, date: NaiveDate) -> Vec<&TimetableBlock> {
        let mut blocks: Vec<&TimetableBlock> = self.blocks_on(date).collect();
        blocks.sort_by_key(|block| block.start);
        blocks
    }

    /// Block in progress at `at` (`start <= t < end`)
    pub fn current_block(&self, at: NaiveDateTime) -> Option<&TimetableBlock> {
        let time = at.time();
        self.blocks_on(at.date())
            .find(|block| block.start <= time && time < block.end)
    }

    /// First block starting after `at` on the same day
    pub fn next_block(&self, at: NaiveDateTime) -> Option<&TimetableBlock> {
        let time = at.time();
        self.blocks_on(at.date())
            .filter(|block| block.start > time)
            .min_by_key(|block| block.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
        d.and_hms_opt(h, min, 0).unwrap()
    }

    fn block(day: Weekday, week: Option<Week>, start: (u32, u32), end: (u32, u32), subject: &str) -> TimetableBlock {
        TimetableBlock {
            day,
            week,
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            subject: subject.into(),
            room: None,
        }
    }

    #[test]
    fn test_week_parity() {
        // 2026-01-07 is a Wednesday
        let anchor = date(2026, 1, 7);
        assert_eq!(week_parity(date(2026, 1, 5), anchor), Week::A);
        assert_eq!(week_parity(date(2026, 1, 11), anchor), Week::A);
        assert_eq!(week_parity(date(2026, 1, 12), anchor), Week::B);
        assert_eq!(week_parity(date(2026, 1, 19), anchor), Week::A);
        assert_eq!(week_parity(date(2026, 1, 4), anchor), Week::B);
        assert_eq!(week_parity(date(2025, 12, 29), anchor), Week::B);
        assert_eq!(week_parity(date(2025, 12, 22), anchor), Week::A);
    }

    fn fortnightly() -> Timetable {
        let mut tt = Timetable::new("School", date(2026, 1, 5));
        tt.fortnightly = true;
        tt.blocks = vec![
            block(Weekday::Mon, None, (9, 0), (10, 0), "Maths"),
            block(Weekday::Mon, Some(Week::A), (10, 0), (11, 0), "Art"),
            block(Weekday::Mon, Some(Week::B), (10, 0), (11, 0), "Music"),
            block(Weekday::Tue, None, (9, 0), (10, 0), "English"),
        ];
        tt
    }

    #[test]
    fn test_current_block_respects_week() {
        let tt = fortnightly();
        let week_a = date(2026, 1, 5);
        let week_b = date(2026, 1, 12);

        assert_eq!(tt.current_block(at(week_a, 9, 30)).unwrap().subject, "Maths");
        assert_eq!(tt.current_block(at(week_a, 10, 0)).unwrap().subject, "Art");
        assert_eq!(tt.current_block(at(week_b, 10, 59)).unwrap().subject, "Music");
        assert!(tt.current_block(at(week_a, 11, 0)).is_none());
        assert!(tt.current_block(at(week_a, 8, 59)).is_none());
    }

    #[test]
    fn test_next_block() {
        let tt = fortnightly();
        let week_b = date(2026, 1, 12);

        assert_eq!(tt.next_block(at(week_b, 8, 0)).unwrap().subject, "Maths");
        assert_eq!(tt.next_block(at(week_b, 9, 15)).unwrap().subject, "Music");
        assert!(tt.next_block(at(week_b, 10, 30)).is_none());
    }

    #[test]
    fn test_weekly_timetable_ignores_week_tags() {
        let mut tt = fortnightly();
        tt.fortnightly = false;
        let schedule = tt.day_schedule(date(2026, 1, 12));
        let subjects: Vec<&str> = schedule.iter().map(|b| b.subject.as_str()).collect();
        assert_eq!(subjects.len(), 3);
        assert_eq!(subjects[0], "Maths");
        assert_eq!(tt.week_on(date(2026, 1, 12)), None);
    }
}
