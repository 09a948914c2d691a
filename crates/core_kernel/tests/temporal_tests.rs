//! Tests for milestone windows, calendar conversion and clocks

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

use core_kernel::temporal::TemporalError;
use core_kernel::{Clock, FixedClock, MilestoneWindow, Timezone, WindowPosition};

mod timezone {
    use super::*;

    #[test]
    fn test_parse_known_zone() {
        let tz = Timezone::parse("Europe/London").unwrap();
        assert_eq!(tz, Timezone::default());
    }

    #[test]
    fn test_parse_unknown_zone() {
        assert_eq!(
            Timezone::parse("Mars/Olympus_Mons"),
            Err(TemporalError::UnknownTimezone("Mars/Olympus_Mons".to_string()))
        );
    }

    #[test]
    fn test_winter_dates_match_utc() {
        let tz = Timezone::default();
        let date = NaiveDate::from_ymd_opt(2022, 1, 15).unwrap();

        assert_eq!(tz.start_of_day(date).unwrap(), Utc.with_ymd_and_hms(2022, 1, 15, 0, 0, 0).unwrap());
        let end = tz.end_of_day(date).unwrap();
        assert_eq!(end.date_naive(), date);
        assert!(end > Utc.with_ymd_and_hms(2022, 1, 15, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_serde_uses_iana_name() {
        let json = serde_json::to_string(&Timezone::default()).unwrap();
        assert_eq!(json, "\"Europe/London\"");

        let back: Timezone = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Timezone::default());
        assert!(serde_json::from_str::<Timezone>("\"Nowhere/Special\"").is_err());
    }
}

mod window {
    use super::*;

    #[test]
    fn test_open_ended_window_never_too_late() {
        let start = Utc.with_ymd_and_hms(2021, 9, 1, 0, 0, 0).unwrap();
        let window = MilestoneWindow::open_ended(start);

        assert_eq!(window.position(start + Duration::days(3650)), WindowPosition::Within);
        assert_eq!(window.position(start), WindowPosition::TooEarly);
    }

    #[test]
    fn test_unbounded_window_accepts_everything() {
        let window = MilestoneWindow::new(None, None).unwrap();
        assert!(window.contains(Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap()));
    }

    proptest! {
        #[test]
        fn prop_lower_bound_exclusive_upper_bound_inclusive(offset_secs in 1i64..10_000_000, length_secs in 1i64..10_000_000) {
            let start = Utc.with_ymd_and_hms(2021, 9, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs);
            let end = start + Duration::seconds(length_secs);
            let window = MilestoneWindow::bounded(start, end).unwrap();

            prop_assert_eq!(window.position(start), WindowPosition::TooEarly);
            prop_assert_eq!(window.position(end), WindowPosition::Within);
            prop_assert_eq!(window.position(end + Duration::nanoseconds(1)), WindowPosition::TooLate);
        }
    }
}

mod clock {
    use super::*;

    #[test]
    fn test_fixed_clock_reports_pinned_instant() {
        let instant = Utc.with_ymd_and_hms(2021, 11, 2, 9, 30, 0).unwrap();
        let clock = FixedClock::at(instant);
        assert_eq!(clock.now(), instant);
    }
}
