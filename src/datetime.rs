/// Day-of-year (JDAY) conversions
///
/// W2 output carries time as a fractional day of year relative to Jan 1 of the
/// simulation start year: day 1.0 is Jan 1 00:00, day 32.5 is Feb 1 12:00. Values past
/// 365/366 simply run into the following year.
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::W2Error;

pub const SECONDS_PER_HOUR: u32 = 3600;
const SECONDS_PER_DAY: f64 = 86_400.0;
const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Jan 1, 00:00:00 of `year`
pub fn start_of_year(year: i32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, 1, 1).map(|d| d.and_time(NaiveTime::MIN))
}

/// Round a timestamp to the nearest multiple of `interval_seconds` since midnight.
/// Halfway values round up. Sub-second precision is discarded.
///
/// Returns `None` when rounding up passes the largest representable timestamp.
pub fn round_to_nearest(date_time: NaiveDateTime, interval_seconds: u32) -> Option<NaiveDateTime> {
    let interval = i64::from(interval_seconds.max(1)) * NANOS_PER_SECOND;
    let since_midnight = i64::from(date_time.num_seconds_from_midnight()) * NANOS_PER_SECOND
        + i64::from(date_time.nanosecond().min(999_999_999));

    let rounded = (since_midnight + interval / 2) / interval * interval;
    date_time
        .date()
        .and_time(NaiveTime::MIN)
        .checked_add_signed(Duration::nanoseconds(rounded))
}

/// Round a timestamp to the nearest hour
pub fn round_to_hour(date_time: NaiveDateTime) -> Option<NaiveDateTime> {
    round_to_nearest(date_time, SECONDS_PER_HOUR)
}

/// Convert one fractional day of year to a timestamp rounded to the nearest hour.
///
/// Returns `None` for non-finite values or results outside chrono's range.
pub fn day_of_year_to_datetime(year: i32, day_of_year: f64) -> Option<NaiveDateTime> {
    if !day_of_year.is_finite() {
        return None;
    }

    let offset_micros = ((day_of_year - 1.0) * SECONDS_PER_DAY * 1e6).round();
    if offset_micros.abs() > i64::MAX as f64 {
        return None;
    }

    let start = start_of_year(year)?;
    let unrounded = start.checked_add_signed(Duration::microseconds(offset_micros as i64))?;
    round_to_hour(unrounded)
}

/// Convert a sequence of day-of-year values, failing on the first value that does not convert
pub fn day_of_year_to_datetimes(
    year: i32,
    days_of_year: &[f64],
) -> Result<Vec<NaiveDateTime>, W2Error> {
    days_of_year
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            day_of_year_to_datetime(year, d).ok_or_else(|| W2Error::InvalidDayOfYear {
                line: i + 1,
                value: d.to_string(),
            })
        })
        .collect()
}

/// Whole day-of-year numbers to midnight timestamps (no rounding needed)
pub fn whole_days_to_dates(year: i32, days: &[i64]) -> Option<Vec<NaiveDateTime>> {
    let start = start_of_year(year)?;
    days.iter()
        .map(|&day| start.checked_add_signed(Duration::try_days(day - 1)?))
        .collect()
}

/// Inverse conversion: the fractional JDAY of `date_time` relative to Jan 1 of `year`
pub fn datetime_to_day_of_year(year: i32, date_time: NaiveDateTime) -> Option<f64> {
    let start = start_of_year(year)?;
    let diff = date_time.signed_duration_since(start);
    Some(diff.num_seconds() as f64 / SECONDS_PER_DAY + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_day_one_is_jan_first() {
        assert_eq!(
            day_of_year_to_datetime(2006, 1.0),
            Some(dt(2006, 1, 1, 0, 0, 0))
        );
    }

    #[test]
    fn test_fractional_day() {
        assert_eq!(
            day_of_year_to_datetime(2006, 32.5),
            Some(dt(2006, 2, 1, 12, 0, 0))
        );
    }

    #[test]
    fn test_float_noise_rounds_to_hour() {
        // 1/24 day is not exactly representable
        let d = 1.0 + 13.0 / 24.0 - 1e-9;
        assert_eq!(
            day_of_year_to_datetime(2006, d),
            Some(dt(2006, 1, 1, 13, 0, 0))
        );
    }

    #[test]
    fn test_day_past_year_end_rolls_over() {
        assert_eq!(
            day_of_year_to_datetime(2006, 366.0),
            Some(dt(2007, 1, 1, 0, 0, 0))
        );
    }

    #[test]
    fn test_non_finite_day_rejected() {
        assert_eq!(day_of_year_to_datetime(2006, f64::NAN), None);
        assert_eq!(day_of_year_to_datetime(2006, f64::INFINITY), None);
    }

    #[test]
    fn test_rounding_past_last_date_rejected() {
        let last_evening = NaiveDate::MAX.and_hms_opt(23, 40, 0).unwrap();
        assert_eq!(round_to_hour(last_evening), None);

        // 23:40 on the last representable day
        assert_eq!(day_of_year_to_datetime(2006, 95013088.9861111), None);
    }

    #[test]
    fn test_rounding_down_on_last_date() {
        let last_morning = NaiveDate::MAX.and_hms_opt(0, 10, 0).unwrap();
        assert_eq!(
            round_to_hour(last_morning),
            NaiveDate::MAX.and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(
            round_to_hour(dt(2006, 3, 1, 5, 30, 0)),
            Some(dt(2006, 3, 1, 6, 0, 0))
        );
        assert_eq!(
            round_to_hour(dt(2006, 3, 1, 5, 29, 59)),
            Some(dt(2006, 3, 1, 5, 0, 0))
        );
    }

    #[test]
    fn test_round_crosses_midnight() {
        assert_eq!(
            round_to_hour(dt(2006, 12, 31, 23, 45, 0)),
            Some(dt(2007, 1, 1, 0, 0, 0))
        );
    }

    #[test]
    fn test_round_is_idempotent() {
        let aligned = dt(2006, 7, 4, 18, 0, 0);
        assert_eq!(round_to_hour(aligned), Some(aligned));
        assert_eq!(round_to_hour(aligned).and_then(round_to_hour), Some(aligned));
    }

    #[test]
    fn test_round_to_minutes() {
        assert_eq!(
            round_to_nearest(dt(2006, 1, 1, 0, 0, 31), 60),
            Some(dt(2006, 1, 1, 0, 1, 0))
        );
    }

    #[test]
    fn test_vector_conversion_reports_position() {
        let result = day_of_year_to_datetimes(2006, &[1.0, f64::NAN]);
        match result {
            Err(W2Error::InvalidDayOfYear { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected InvalidDayOfYear, got {other:?}"),
        }
    }

    #[test]
    fn test_whole_days() {
        let dates = whole_days_to_dates(2006, &[1, 32]).unwrap();
        assert_eq!(dates, vec![dt(2006, 1, 1, 0, 0, 0), dt(2006, 2, 1, 0, 0, 0)]);
    }

    #[test]
    fn test_datetime_to_day_of_year() {
        assert_eq!(
            datetime_to_day_of_year(2006, dt(2006, 1, 1, 0, 0, 0)),
            Some(1.0)
        );
        assert_eq!(
            datetime_to_day_of_year(2006, dt(2006, 2, 1, 12, 0, 0)),
            Some(32.5)
        );
    }
}
