//! Conversions for the Modified Julian date + seconds timestamps used in
//! Level III headers.
//!
//! Day 1 is 1970-01-01; the time of day is carried as seconds after
//! midnight UTC.

use chrono::{DateTime, Duration, TimeZone, Utc};

const SECONDS_PER_DAY: i64 = 86_400;

/// Convert a Julian day number and seconds after midnight to a UTC time.
///
/// Returns `None` for day 0 (the "not set" value) or when the result is
/// outside chrono's representable range.
pub fn datetime_from_julian(julian_date: u16, seconds: u32) -> Option<DateTime<Utc>> {
    if julian_date == 0 {
        return None;
    }
    let epoch = Utc.timestamp_opt(0, 0).single()?;
    let days = Duration::try_days(i64::from(julian_date) - 1)?;
    let secs = Duration::try_seconds(i64::from(seconds))?;
    epoch.checked_add_signed(days)?.checked_add_signed(secs)
}

/// Split a UTC time into a Julian day number and seconds after midnight.
///
/// Times before 1970-01-01 clamp to day 1.
pub fn julian_from_datetime(time: DateTime<Utc>) -> (u16, u32) {
    let ts = time.timestamp().max(0);
    let days = ts / SECONDS_PER_DAY;
    let seconds = ts % SECONDS_PER_DAY;
    let julian = (days + 1).min(i64::from(u16::MAX)) as u16;
    (julian, seconds as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_epoch_is_day_one() {
        let t = datetime_from_julian(1, 0).unwrap();
        assert_eq!(t.timestamp(), 0);
        assert!(datetime_from_julian(0, 0).is_none());
    }

    #[test]
    fn test_known_date() {
        // 2024-05-06 is 19849 days after the epoch.
        let t = datetime_from_julian(19850, 3600 * 22 + 61).unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (2024, 5, 6));
        assert_eq!((t.hour(), t.minute(), t.second()), (22, 1, 1));
        assert_eq!(julian_from_datetime(t), (19850, 3600 * 22 + 61));
    }
}
