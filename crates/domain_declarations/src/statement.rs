//! Statements
//!
//! A statement is one provider's billing period for a cohort. Line items
//! attach declarations to it until its deadline passes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ProviderId, StatementId};

use crate::schedule::Cohort;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub id: StatementId,
    /// Period name shared by every provider's statement, e.g. `November 2021`
    pub name: String,
    pub provider_id: ProviderId,
    pub provider_name: String,
    pub cohort: Cohort,
    /// Last instant new claims are accepted
    pub deadline: DateTime<Utc>,
    /// Whether the period carries output fees
    pub output_fee: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Statement {
    pub fn new(
        name: impl Into<String>,
        provider_id: ProviderId,
        provider_name: impl Into<String>,
        cohort: Cohort,
        deadline: DateTime<Utc>,
        output_fee: bool,
    ) -> Self {
        Self {
            id: StatementId::new_v7(),
            name: name.into(),
            provider_id,
            provider_name: provider_name.into(),
            cohort,
            deadline,
            output_fee,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    /// The deadline has not yet passed
    pub fn is_future_dated(&self, now: DateTime<Utc>) -> bool {
        self.deadline > now
    }

    pub fn accepts_output_fees(&self, now: DateTime<Utc>) -> bool {
        self.output_fee && !self.is_paid() && self.is_future_dated(now)
    }

    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }

    pub fn apply(&mut self, update: &StatementUpdate) {
        if let Some(deadline) = update.deadline {
            self.deadline = deadline;
        }
        if let Some(output_fee) = update.output_fee {
            self.output_fee = output_fee;
        }
        if let Some(paid_at) = update.paid_at {
            self.paid_at = Some(paid_at);
        }
    }
}

/// Picks the provider's open output-fee statement: the earliest deadline
/// among output-fee statements still accepting claims
pub fn open_output_fee_statement<'a, I>(statements: I, now: DateTime<Utc>) -> Option<&'a Statement>
where
    I: IntoIterator<Item = &'a Statement>,
{
    statements
        .into_iter()
        .filter(|s| s.accepts_output_fees(now))
        .min_by_key(|s| (s.deadline, s.id))
}

/// Partial update to a statement; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementUpdate {
    pub deadline: Option<DateTime<Utc>>,
    pub output_fee: Option<bool>,
    #[serde(skip)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl StatementUpdate {
    pub fn is_empty(&self) -> bool {
        self.deadline.is_none() && self.output_fee.is_none() && self.paid_at.is_none()
    }

    pub fn output_fee(output_fee: bool) -> Self {
        Self {
            output_fee: Some(output_fee),
            ..Self::default()
        }
    }

    pub fn paid_at(at: DateTime<Utc>) -> Self {
        Self {
            paid_at: Some(at),
            ..Self::default()
        }
    }
}

/// Filter for statement lookups
#[derive(Debug, Clone, Default)]
pub struct StatementQuery {
    pub provider_id: Option<ProviderId>,
    pub cohort: Option<Cohort>,
    pub name: Option<String>,
}

impl StatementQuery {
    pub fn for_provider(provider_id: ProviderId, cohort: Cohort) -> Self {
        Self {
            provider_id: Some(provider_id),
            cohort: Some(cohort),
            name: None,
        }
    }

    pub fn named(cohort: Cohort, name: impl Into<String>) -> Self {
        Self {
            provider_id: None,
            cohort: Some(cohort),
            name: Some(name.into()),
        }
    }

    pub fn matches(&self, statement: &Statement) -> bool {
        self.provider_id.map_or(true, |p| p == statement.provider_id)
            && self.cohort.map_or(true, |c| c == statement.cohort)
            && self.name.as_deref().map_or(true, |n| n == statement.name)
    }
}
