use chrono::{Duration, NaiveDateTime, NaiveTime};

/// A job that recurs once a day at a fixed local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// Today at the scheduled time if that is still ahead of `now`,
    /// otherwise tomorrow.
    pub fn next_occurrence(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.at);
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }

    /// The slot after `fired`, skipping any days that already passed.
    pub fn following(&self, fired: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
        let mut next = fired + Duration::days(1);
        while next <= now {
            next += Duration::days(1);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, d)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn daily() -> DailySchedule {
        DailySchedule::new(NaiveTime::from_hms_opt(3, 33, 0).unwrap())
    }

    #[test]
    fn before_the_slot_runs_today() {
        assert_eq!(daily().next_occurrence(at(17, 1, 0, 0)), at(17, 3, 33, 0));
    }

    #[test]
    fn at_or_after_the_slot_runs_tomorrow() {
        assert_eq!(daily().next_occurrence(at(17, 3, 33, 0)), at(18, 3, 33, 0));
        assert_eq!(daily().next_occurrence(at(17, 23, 59, 59)), at(18, 3, 33, 0));
    }

    #[test]
    fn month_rollover() {
        assert_eq!(
            daily().next_occurrence(at(31, 12, 0, 0)),
            NaiveDate::from_ymd_opt(2026, 11, 1)
                .unwrap()
                .and_hms_opt(3, 33, 0)
                .unwrap()
        );
    }

    #[test]
    fn following_skips_missed_days() {
        let fired = at(10, 3, 33, 0);
        assert_eq!(daily().following(fired, at(10, 3, 33, 5)), at(11, 3, 33, 0));
        assert_eq!(daily().following(fired, at(16, 9, 0, 0)), at(17, 3, 33, 0));
    }
}
