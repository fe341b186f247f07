//! Daily trigger time computation
//!
//! The report runs once a day at a fixed wall-clock time in a fixed UTC offset.
//!
//! # Example
//!
//! ```rust
//! use daily_basket::scheduler::DailySchedule;
//! use chrono::{FixedOffset, TimeZone, Utc};
//!
//! let schedule = DailySchedule::new(6, 0, FixedOffset::east_opt(2 * 3600).unwrap()).unwrap();
//! let now = Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap(); // 07:00 local
//! let next = schedule.next_run_after(now);
//! assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 2, 4, 0, 0).unwrap());
//! ```

use crate::config::ScheduleConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, Days, FixedOffset, NaiveTime, Utc};
use std::fmt;
use std::time::Duration;

/// A time of day, in a fixed offset, at which the report runs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DailySchedule {
    time: NaiveTime,
    offset: FixedOffset,
}

impl DailySchedule {
    /// Schedule at `hour:minute` in `offset`
    pub fn new(hour: u32, minute: u32, offset: FixedOffset) -> Result<Self> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| Error::Config {
            message: format!("{:02}:{:02} is not a valid time of day", hour, minute),
            key: Some("schedule".to_string()),
        })?;
        Ok(Self { time, offset })
    }

    /// Schedule described by the configuration
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        Self::new(config.hour, config.minute, config.utc_offset()?)
    }

    /// Wall-clock time of the run
    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// Offset the time is expressed in
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// First run strictly after `now`
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_now = now.with_timezone(&self.offset);
        let today = local_now.date_naive().and_time(self.time);

        let candidate = if today > local_now.naive_local() {
            today
        } else {
            today
                .checked_add_days(Days::new(1))
                .unwrap_or(today)
        };

        // A fixed offset maps every local time to exactly one instant
        match candidate.and_local_timezone(self.offset).single() {
            Some(at) => at.with_timezone(&Utc),
            None => now,
        }
    }

    /// How long to sleep from `now` until the next run
    pub fn delay_until_next(&self, now: DateTime<Utc>) -> Duration {
        (self.next_run_after(now) - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

impl fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "daily at {} (UTC{})", self.time.format("%H:%M"), self.offset)
    }
}

#[cfg(test)]
mod tests;
