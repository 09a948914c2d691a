//! Statement line items
//!
//! A line item places one declaration on one statement, either to be paid
//! (billable) or to be recovered (refundable).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{DeclarationId, LineItemId, StatementId};

use crate::course::UnknownValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemIntent {
    Billable,
    Refundable,
}

impl LineItemIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineItemIntent::Billable => "billable",
            LineItemIntent::Refundable => "refundable",
        }
    }
}

impl fmt::Display for LineItemIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineItemIntent {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "billable" => Ok(LineItemIntent::Billable),
            "refundable" => Ok(LineItemIntent::Refundable),
            other => Err(UnknownValue {
                kind: "line item intent",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub declaration_id: DeclarationId,
    pub statement_id: StatementId,
    pub intent: LineItemIntent,
    /// Inactive items stay for audit but no longer count on the statement
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl LineItem {
    pub fn new(
        declaration_id: DeclarationId,
        statement_id: StatementId,
        intent: LineItemIntent,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LineItemId::new_v7(),
            declaration_id,
            statement_id,
            intent,
            active: true,
            created_at,
        }
    }

    pub fn billable(declaration_id: DeclarationId, statement_id: StatementId, at: DateTime<Utc>) -> Self {
        Self::new(declaration_id, statement_id, LineItemIntent::Billable, at)
    }

    pub fn refundable(declaration_id: DeclarationId, statement_id: StatementId, at: DateTime<Utc>) -> Self {
        Self::new(declaration_id, statement_id, LineItemIntent::Refundable, at)
    }
}
