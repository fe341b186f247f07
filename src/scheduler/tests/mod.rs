use super::*;
use chrono::TimeZone;

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

fn at(hour: u32, minute: u32, offset_hours: i32) -> DailySchedule {
    DailySchedule::new(
        hour,
        minute,
        FixedOffset::east_opt(offset_hours * 3600).unwrap(),
    )
    .unwrap()
}

#[test]
fn test_next_run_later_today() {
    let schedule = at(6, 30, 0);
    assert_eq!(
        schedule.next_run_after(utc(2024, 3, 1, 5, 0, 0)),
        utc(2024, 3, 1, 6, 30, 0)
    );
}

#[test]
fn test_next_run_tomorrow_when_time_has_passed() {
    let schedule = at(6, 0, 0);
    assert_eq!(
        schedule.next_run_after(utc(2024, 3, 1, 8, 0, 0)),
        utc(2024, 3, 2, 6, 0, 0)
    );
}

#[test]
fn test_exact_run_time_schedules_next_day() {
    let schedule = at(6, 0, 0);
    assert_eq!(
        schedule.next_run_after(utc(2024, 3, 1, 6, 0, 0)),
        utc(2024, 3, 2, 6, 0, 0)
    );
}

#[test]
fn test_offset_shifts_local_day() {
    // 06:00 at UTC-5 is 11:00 UTC
    let schedule = at(6, 0, -5);
    assert_eq!(
        schedule.next_run_after(utc(2024, 3, 1, 10, 59, 0)),
        utc(2024, 3, 1, 11, 0, 0)
    );

    // 02:00 UTC on March 1st is still February 29th at UTC-5, before 06:00 local
    assert_eq!(
        schedule.next_run_after(utc(2024, 3, 1, 2, 0, 0)),
        utc(2024, 3, 1, 11, 0, 0)
    );
}

#[test]
fn test_month_and_year_rollover() {
    let schedule = at(0, 15, 0);
    assert_eq!(
        schedule.next_run_after(utc(2024, 12, 31, 23, 0, 0)),
        utc(2025, 1, 1, 0, 15, 0)
    );
}

#[test]
fn test_delay_until_next() {
    let schedule = at(6, 0, 0);
    assert_eq!(
        schedule.delay_until_next(utc(2024, 3, 1, 5, 59, 30)),
        Duration::from_secs(30)
    );
}

#[test]
fn test_invalid_time_rejected() {
    let offset = FixedOffset::east_opt(0).unwrap();
    assert!(DailySchedule::new(24, 0, offset).is_err());
    assert!(DailySchedule::new(6, 60, offset).is_err());
}

#[test]
fn test_from_config() {
    let config = ScheduleConfig {
        enabled: true,
        hour: 7,
        minute: 45,
        utc_offset_minutes: 90,
    };
    let schedule = DailySchedule::from_config(&config).unwrap();
    assert_eq!(schedule.time(), NaiveTime::from_hms_opt(7, 45, 0).unwrap());
    assert_eq!(schedule.offset().local_minus_utc(), 90 * 60);
    assert_eq!(schedule.to_string(), "daily at 07:45 (UTC+01:30)");
}
