//! Pre-built Test Fixtures
//!
//! Deterministic data for the 2021 cohort. The clock fixture sits on
//! 15 October 2021, inside the `started` window of the September schedule
//! and before the November statement deadline.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{FixedClock, ProviderId, ScheduleId, Timezone};
use domain_declarations::{Cohort, DeclarationType, Milestone, Schedule};
use uuid::Uuid;

pub const COHORT: Cohort = Cohort(2021);

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    pub fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
    }

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    /// 15 October 2021, midday
    pub fn now() -> DateTime<Utc> {
        Self::utc(2021, 10, 15, 12)
    }

    pub fn clock() -> FixedClock {
        FixedClock::at(Self::now())
    }

    /// A date inside the `started` window and not in the future
    pub fn started_declaration_date() -> DateTime<Utc> {
        Self::utc(2021, 10, 1, 9)
    }

    pub fn november_deadline() -> DateTime<Utc> {
        Self::utc(2021, 11, 30, 23)
    }

    pub fn december_deadline() -> DateTime<Utc> {
        Self::utc(2021, 12, 31, 23)
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    pub fn provider_id() -> ProviderId {
        ProviderId::from_uuid(Uuid::parse_str("8c6a9c5e-2f1d-4c57-9a35-0d1c7f1b0a01").unwrap())
    }

    pub fn other_provider_id() -> ProviderId {
        ProviderId::from_uuid(Uuid::parse_str("8c6a9c5e-2f1d-4c57-9a35-0d1c7f1b0a02").unwrap())
    }

    pub fn schedule_id() -> ScheduleId {
        ScheduleId::from_uuid(Uuid::parse_str("3f0e4b7a-91c2-4d0b-8f11-5b6c2e9d0c01").unwrap())
    }
}

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    pub fn provider_name() -> &'static str {
        "Ambition Institute"
    }

    pub fn other_provider_name() -> &'static str {
        "Best Practice Network"
    }

    pub fn november_statement() -> &'static str {
        "November 2021"
    }

    pub fn december_statement() -> &'static str {
        "December 2021"
    }

    pub fn trn() -> &'static str {
        "1234567"
    }
}

/// Fixture for schedules
pub struct ScheduleFixtures;

impl ScheduleFixtures {
    /// The standard September ECF schedule
    ///
    /// `started` 1 Sep - 30 Nov 2021, `retained-1` 1 Nov 2021 - 31 Jan 2022,
    /// `completed` open-ended from 1 Sep 2021. Dates are London calendar days.
    pub fn ecf_september() -> Schedule {
        let tz = Timezone::default();
        let d = TemporalFixtures::date;
        let milestones = vec![
            Milestone::from_dates(DeclarationType::Started, d(2021, 9, 1), Some(d(2021, 11, 30)), tz).unwrap(),
            Milestone::from_dates(DeclarationType::Retained1, d(2021, 11, 1), Some(d(2022, 1, 31)), tz).unwrap(),
            Milestone::from_dates(DeclarationType::Completed, d(2021, 9, 1), None, tz).unwrap(),
        ];
        Schedule::new(IdFixtures::schedule_id(), "ecf-standard-september", COHORT, milestones)
    }
}
