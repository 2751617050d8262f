//! Next-run computation for a fixed time of day.

use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Days, Local, NaiveTime, TimeZone, Utc};
use sciagg_common::config::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleZone {
    Local,
    Utc,
}

impl ScheduleZone {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(ScheduleZone::Local),
            "utc"   => Ok(ScheduleZone::Utc),
            other   => bail!("unknown scheduler timezone '{other}' (expected 'local' or 'utc')"),
        }
    }
}

/// First instant strictly after `now` whose wall-clock time in `now`'s zone
/// is `at`.
///
/// A time skipped by a DST jump falls back to the same time one hour later;
/// a repeated time takes the earlier occurrence.
pub fn next_run<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut date = now.date_naive();
    loop {
        let wall = date.and_time(at);
        let candidate = tz
            .from_local_datetime(&wall)
            .earliest()
            .or_else(|| tz.from_local_datetime(&(wall + chrono::Duration::hours(1))).earliest());
        if let Some(candidate) = candidate {
            if candidate > *now {
                return candidate;
            }
        }
        date = match date.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => return now.clone(),
        };
    }
}

/// The configured daily run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub at: NaiveTime,
    pub zone: ScheduleZone,
}

impl DailySchedule {
    pub fn new(at: NaiveTime, zone: ScheduleZone) -> Self {
        Self { at, zone }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            at: settings.schedule_time()?,
            zone: ScheduleZone::parse(&settings.scheduler.timezone)?,
        })
    }

    /// Next run after `now`, expressed in UTC.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.zone {
            ScheduleZone::Utc   => next_run(&now, self.at),
            ScheduleZone::Local => next_run(&now.with_timezone(&Local), self.at).with_timezone(&Utc),
        }
    }

    /// Time to wait from `now` until the next run.
    pub fn wait_from(&self, now: DateTime<Utc>) -> Duration {
        (self.next_after(now) - now).to_std().unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_later_today() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 6, 30, 0).unwrap();
        let next = next_run(&now, hm(8, 0));
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_already_passed_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        assert_eq!(next_run(&now, hm(8, 0)), Utc.with_ymd_and_hms(2026, 3, 11, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_exactly_now_is_not_due_again() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap();
        assert_eq!(next_run(&now, hm(8, 0)), Utc.with_ymd_and_hms(2026, 3, 11, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_month_and_year_boundaries() {
        let now = Utc.with_ymd_and_hms(2026, 12, 31, 23, 30, 0).unwrap();
        assert_eq!(next_run(&now, hm(8, 0)), Utc.with_ymd_and_hms(2027, 1, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_fixed_offset_wall_clock() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        // 07:00 at +02:00 is 05:00 UTC.
        let now = tz.with_ymd_and_hms(2026, 5, 1, 7, 0, 0).unwrap();
        let next = next_run(&now, hm(8, 0));
        assert_eq!(next.with_timezone(&Utc), Utc.with_ymd_and_hms(2026, 5, 1, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_utc_schedule_wait() {
        let schedule = DailySchedule::new(hm(8, 0), ScheduleZone::Utc);
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 7, 59, 0).unwrap();
        assert_eq!(schedule.wait_from(now), Duration::from_secs(60));
    }

    #[test]
    fn test_local_schedule_is_within_a_day() {
        let schedule = DailySchedule::new(hm(8, 0), ScheduleZone::Local);
        let now = Utc::now();
        let next = schedule.next_after(now);
        assert!(next > now);
        assert!(next - now <= chrono::Duration::hours(25));
    }

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::default();
        settings.scheduler.time = "21:15".into();
        settings.scheduler.timezone = "UTC".into();
        let schedule = DailySchedule::from_settings(&settings).unwrap();
        assert_eq!(schedule, DailySchedule::new(hm(21, 15), ScheduleZone::Utc));

        settings.scheduler.timezone = "Europe/Madrid".into();
        assert!(DailySchedule::from_settings(&settings).is_err());

        settings.scheduler.timezone = "local".into();
        settings.scheduler.time = "8am".into();
        assert!(DailySchedule::from_settings(&settings).is_err());
    }
}
