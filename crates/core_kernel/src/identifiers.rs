//! Strongly-typed identifiers for funding entities
//!
//! Every persisted entity gets a newtype over a UUID so that a statement id
//! can never be passed where a declaration id is expected. Declaration and
//! line item ids are time-ordered (v7) so that ordering by id follows
//! creation order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            /// Accepts both the prefixed display form and a bare UUID
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(raw)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Declaration lifecycle
define_id!(
    /// A training-milestone claim
    DeclarationId, "DECL"
);
define_id!(
    /// One row of a declaration's append-only state history
    DeclarationStateId, "DST"
);
define_id!(ParticipantProfileId, "PP");
define_id!(
    /// The underlying person; several profiles may share one identity
    ParticipantIdentityId, "PID"
);
define_id!(ProviderId, "LP");
define_id!(ScheduleId, "SCHED");

// Statement ledger
define_id!(StatementId, "STMT");
define_id!(LineItemId, "SLI");

// Training records
define_id!(InductionRecordId, "IR");
define_id!(SchoolId, "URN");
define_id!(DeliveryPartnerId, "DP");
define_id!(PartnershipId, "PTN");
