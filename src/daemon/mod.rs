pub mod schedule;
pub mod state_file;

use anyhow::Result;
use chrono::NaiveDateTime;
use log::{error, info, warn};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use crate::clock::Clock;
use crate::daemon::schedule::DailySchedule;
use crate::daemon::state_file::ScheduleFile;
use crate::forwarder::Forwarder;
use crate::forwarder::progress::Silent;

const TICK: Duration = Duration::from_secs(1);

/// Holds the single pending daily run and persists it across restarts.
pub struct Scheduler {
    schedule: DailySchedule,
    state: ScheduleFile,
    pending: NaiveDateTime,
}

impl Scheduler {
    /// Reuses a stored pending run; registers the next occurrence otherwise.
    pub fn init(schedule: DailySchedule, state: ScheduleFile, now: NaiveDateTime) -> Result<Self> {
        let pending = match state.load()? {
            Some(p) => p,
            None => {
                let p = schedule.next_occurrence(now);
                state.save(p)?;
                info!("registered daily error check at {p}");
                p
            }
        };
        Ok(Self {
            schedule,
            state,
            pending,
        })
    }

    pub fn pending(&self) -> NaiveDateTime {
        self.pending
    }

    /// If the pending run is due, moves the schedule forward and returns the
    /// slot that fired.
    pub fn poll(&mut self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        if now < self.pending {
            return None;
        }
        let fired = self.pending;
        self.pending = self.schedule.following(fired, now);
        if let Err(e) = self.state.save(self.pending) {
            warn!("could not persist next run {}: {e}", self.pending);
        }
        Some(fired)
    }
}

/// Runs the forwarder whenever the schedule comes due, until `running` is
/// cleared. Scheduled runs report through `log` only.
pub fn run_daemon(
    forwarder: &Forwarder,
    mut scheduler: Scheduler,
    clock: &dyn Clock,
    running: &AtomicBool,
) -> Result<()> {
    info!("scheduler started, next run at {}", scheduler.pending());

    while running.load(Ordering::SeqCst) {
        if let Some(slot) = scheduler.poll(clock.now()) {
            match forwarder.run(&mut Silent) {
                Ok(summary) => info!(
                    "scheduled run for {slot} sent {} entries",
                    summary.sent_count
                ),
                Err(e) => error!("scheduled run for {slot} failed: {e:#}"),
            }
            info!("next run at {}", scheduler.pending());
        }

        thread::sleep(TICK);
    }

    info!("scheduler stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn daily() -> DailySchedule {
        DailySchedule::new(NaiveTime::from_hms_opt(3, 33, 0).unwrap())
    }

    #[test]
    fn registers_once_and_reuses_the_stored_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.json");

        let first = Scheduler::init(daily(), ScheduleFile::new(&path), at(17, 12, 0)).unwrap();
        assert_eq!(first.pending(), at(18, 3, 33));

        // a restart later the same day keeps the same registration
        let second = Scheduler::init(daily(), ScheduleFile::new(&path), at(17, 20, 0)).unwrap();
        assert_eq!(second.pending(), at(18, 3, 33));
    }

    #[test]
    fn fires_once_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.json");
        let mut s = Scheduler::init(daily(), ScheduleFile::new(&path), at(17, 1, 0)).unwrap();

        assert_eq!(s.poll(at(17, 3, 32)), None);
        assert_eq!(s.poll(at(17, 3, 33)), Some(at(17, 3, 33)));
        assert_eq!(s.poll(at(17, 3, 34)), None);
        assert_eq!(s.pending(), at(18, 3, 33));
        assert_eq!(ScheduleFile::new(&path).load().unwrap(), Some(at(18, 3, 33)));
    }

    #[test]
    fn overdue_slot_fires_once_after_downtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.json");
        ScheduleFile::new(&path).save(at(12, 3, 33)).unwrap();

        let mut s = Scheduler::init(daily(), ScheduleFile::new(&path), at(17, 9, 0)).unwrap();
        assert_eq!(s.poll(at(17, 9, 0)), Some(at(12, 3, 33)));
        assert_eq!(s.poll(at(17, 9, 1)), None);
        assert_eq!(s.pending(), at(18, 3, 33));
    }
}
