//! sciagg-scheduler — the once-a-day harvest, process and graph run.
//!
//! [`DailySchedule`] works out when the next run is due; [`Scheduler`] runs
//! the four steps with whole-run retries and records each attempt in the
//! `runs` table.

pub mod daily;
pub mod schedule;

pub use daily::{retry_run, DailyReport, Scheduler, DAILY_RUN};
pub use schedule::{next_run, DailySchedule, ScheduleZone};
