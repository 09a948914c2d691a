//! Schedules and milestones
//!
//! A schedule belongs to a cohort and carries one milestone per declaration
//! type. The milestone's window is the only period in which that type may be
//! claimed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{MilestoneWindow, ScheduleId, Timezone, WindowPosition};
use core_kernel::temporal::TemporalError;

use crate::course::DeclarationType;

/// Funding cohort, identified by its start year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cohort(pub i32);

impl Cohort {
    pub fn start_year(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The claim window for one declaration type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub declaration_type: DeclarationType,
    /// Exclusive lower bound
    pub start_date: DateTime<Utc>,
    /// Inclusive upper bound; `None` leaves the milestone open
    pub milestone_date: Option<DateTime<Utc>>,
}

impl Milestone {
    pub fn new(
        declaration_type: DeclarationType,
        start_date: DateTime<Utc>,
        milestone_date: Option<DateTime<Utc>>,
    ) -> Result<Self, TemporalError> {
        MilestoneWindow::new(Some(start_date), milestone_date)?;
        Ok(Self { declaration_type, start_date, milestone_date })
    }

    /// Builds a milestone from published calendar dates
    ///
    /// The window opens after the first instant of `start` and closes at the
    /// last instant of `milestone`, both in `tz`.
    pub fn from_dates(
        declaration_type: DeclarationType,
        start: NaiveDate,
        milestone: Option<NaiveDate>,
        tz: Timezone,
    ) -> Result<Self, TemporalError> {
        let start_date = tz.start_of_day(start)?;
        let milestone_date = milestone.map(|date| tz.end_of_day(date)).transpose()?;
        Self::new(declaration_type, start_date, milestone_date)
    }

    pub fn window(&self) -> MilestoneWindow {
        MilestoneWindow {
            start: Some(self.start_date),
            end: self.milestone_date,
        }
    }

    pub fn position(&self, declaration_date: DateTime<Utc>) -> WindowPosition {
        self.window().position(declaration_date)
    }
}

/// A cohort's calendar of milestones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    /// Human alias such as `ecf-standard-september`
    pub identifier: String,
    pub cohort: Cohort,
    milestones: Vec<Milestone>,
}

impl Schedule {
    /// Creates a schedule; milestones are kept ordered by start date
    pub fn new(
        id: ScheduleId,
        identifier: impl Into<String>,
        cohort: Cohort,
        mut milestones: Vec<Milestone>,
    ) -> Self {
        milestones.sort_by_key(|m| (m.start_date, m.declaration_type));
        Self {
            id,
            identifier: identifier.into(),
            cohort,
            milestones,
        }
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn milestone_for(&self, declaration_type: DeclarationType) -> Option<&Milestone> {
        self.milestones
            .iter()
            .find(|m| m.declaration_type == declaration_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_from_dates_closes_at_end_of_day() {
        let milestone = Milestone::from_dates(
            DeclarationType::Started,
            date(2021, 9, 1),
            Some(date(2021, 11, 30)),
            Timezone::default(),
        )
        .unwrap();

        let last_instant = milestone.milestone_date.unwrap();
        assert_eq!(milestone.position(last_instant), WindowPosition::Within);
        assert_eq!(
            milestone.position(last_instant + Duration::nanoseconds(1)),
            WindowPosition::TooLate
        );
    }

    #[test]
    fn test_schedule_orders_milestones() {
        let later = Milestone::new(
            DeclarationType::Retained1,
            Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap(),
            None,
        )
        .unwrap();
        let earlier = Milestone::new(
            DeclarationType::Started,
            Utc.with_ymd_and_hms(2021, 9, 1, 0, 0, 0).unwrap(),
            None,
        )
        .unwrap();

        let schedule = Schedule::new(ScheduleId::new(), "ecf-standard-september", Cohort(2021), vec![later, earlier]);

        assert_eq!(schedule.milestones()[0].declaration_type, DeclarationType::Started);
        assert!(schedule.milestone_for(DeclarationType::Completed).is_none());
    }
}
