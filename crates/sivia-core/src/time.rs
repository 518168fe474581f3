//! UTC timestamps for conversation turns, without a calendar dependency.

use std::time::{SystemTime, UNIX_EPOCH};

const SECS_PER_DAY: u64 = 86_400;

/// Proleptic Gregorian date.
#[derive(Debug, PartialEq, Eq)]
struct CivilDate {
    year: i64,
    month: u32,
    day: u32,
}

impl CivilDate {
    /// Days since 1970-01-01 to a calendar date (Hinnant's algorithm).
    fn from_epoch_days(days: i64) -> Self {
        let shifted = days + 719_468;
        let era = shifted.div_euclid(146_097);
        let day_of_era = shifted.rem_euclid(146_097);
        let year_of_era =
            (day_of_era - day_of_era / 1_460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
        let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
        let mp = (5 * day_of_year + 2) / 153;
        let day = (day_of_year - (153 * mp + 2) / 5 + 1) as u32;
        let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
        let year = year_of_era + era * 400 + i64::from(month <= 2);
        Self { year, month, day }
    }
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// `YYYY-MM-DDTHH:MM:SSZ` for the given Unix second.
pub fn format_iso8601(secs: u64) -> String {
    let date = CivilDate::from_epoch_days((secs / SECS_PER_DAY) as i64);
    let rem = secs % SECS_PER_DAY;
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        date.year,
        date.month,
        date.day,
        rem / 3_600,
        (rem % 3_600) / 60,
        rem % 60
    )
}

pub fn now_iso8601() -> String {
    format_iso8601(unix_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch() {
        assert_eq!(format_iso8601(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_leap_day() {
        // 2024-02-29T12:30:15Z
        assert_eq!(format_iso8601(1_709_209_815), "2024-02-29T12:30:15Z");
    }

    #[test]
    fn test_year_boundary() {
        // 2025-12-31T23:59:59Z
        assert_eq!(format_iso8601(1_767_225_599), "2025-12-31T23:59:59Z");
    }

    #[test]
    fn test_now_is_recent() {
        assert!(now_iso8601().starts_with("20"));
    }
}
