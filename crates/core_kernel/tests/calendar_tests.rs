//! Tests for the calendar types: ranges, months, clocks

use chrono::{NaiveDate, TimeZone, Utc};
use core_kernel::temporal::{add_years, parse_iso_date};
use core_kernel::{Clock, DateRange, FixedClock, TemporalError, Timezone, YearMonth};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

mod date_range {
    use super::*;

    #[test]
    fn test_new_fails_when_start_after_end() {
        let result = DateRange::new(d(2025, 1, 10), d(2025, 1, 9));
        assert!(matches!(result, Err(TemporalError::InvalidRange { .. })));
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::single(d(2025, 1, 10));
        assert!(range.is_single_day());
        assert_eq!(range.day_count(), 1);
        assert_eq!(range.to_string(), "2025-01-10");
    }

    #[test]
    fn test_touching_ranges_intersect() {
        let a = DateRange::new(d(2025, 1, 1), d(2025, 1, 3)).unwrap();
        let b = DateRange::single(d(2025, 1, 3));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let range = DateRange::new(d(2025, 1, 1), d(2025, 1, 3)).unwrap();
        assert!(range.contains(d(2025, 1, 1)));
        assert!(range.contains(d(2025, 1, 3)));
        assert!(!range.contains(d(2025, 1, 4)));
    }

    #[test]
    fn test_months_of_single_month_range() {
        let range = DateRange::new(d(2025, 3, 1), d(2025, 3, 31)).unwrap();
        assert_eq!(range.months(), vec![YearMonth::new(2025, 3).unwrap()]);
    }
}

mod year_month {
    use super::*;

    #[test]
    fn test_next_rolls_over_year() {
        let dec = YearMonth::new(2024, 12).unwrap();
        assert_eq!(dec.next(), YearMonth::new(2025, 1).unwrap());
    }

    #[test]
    fn test_of_date() {
        assert_eq!(YearMonth::of(d(2024, 2, 29)), YearMonth::new(2024, 2).unwrap());
    }

    #[test]
    fn test_display_is_zero_padded() {
        assert_eq!(YearMonth::new(2025, 3).unwrap().to_string(), "2025-03");
    }

    #[test]
    fn test_range_covers_whole_month() {
        let range = YearMonth::new(2025, 2).unwrap().range();
        assert_eq!(range.start, d(2025, 2, 1));
        assert_eq!(range.end, d(2025, 2, 28));
    }
}

mod parsing {
    use super::*;

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_iso_date("2017-06-01").unwrap(), d(2017, 6, 1));
        assert!(parse_iso_date("2017/06/01").is_err());
        assert!(parse_iso_date("").is_err());
    }

    #[test]
    fn test_add_years() {
        assert_eq!(add_years(d(2019, 3, 15), 1), Some(d(2020, 3, 15)));
    }
}

mod clocks {
    use super::*;

    #[test]
    fn test_local_date_crosses_midnight() {
        // 2024-11-28 16:00 UTC is already 2024-11-29 in Seoul
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 11, 28, 16, 0, 0).unwrap());
        let seoul = Timezone::default();
        let utc = Timezone::new(chrono_tz::UTC);

        assert_eq!(clock.today(&seoul), d(2024, 11, 29));
        assert_eq!(clock.today(&utc), d(2024, 11, 28));
    }

    #[test]
    fn test_timezone_roundtrips_through_serde() {
        let tz = Timezone::default();
        let json = serde_json::to_string(&tz).unwrap();
        assert_eq!(json, "\"Asia/Seoul\"");
        let back: Timezone = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tz);
    }
}
