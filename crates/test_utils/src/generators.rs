//! Property-Based Test Generators
//!
//! proptest strategies for the funding vocabulary and for milestone
//! windows around the fixture clock.

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;

use core_kernel::{MilestoneWindow, ParticipantIdentityId};
use domain_declarations::{CourseIdentifier, DeclarationState, DeclarationType};

use crate::fixtures::TemporalFixtures;

pub fn declaration_state_strategy() -> impl Strategy<Value = DeclarationState> {
    prop::sample::select(DeclarationState::ALL.to_vec())
}

pub fn course_strategy() -> impl Strategy<Value = CourseIdentifier> {
    prop::sample::select(CourseIdentifier::ALL.to_vec())
}

pub fn declaration_type_strategy() -> impl Strategy<Value = DeclarationType> {
    prop::sample::select(DeclarationType::ALL.to_vec())
}

/// A course paired with one of the declaration types it accepts
pub fn course_and_type_strategy() -> impl Strategy<Value = (CourseIdentifier, DeclarationType)> {
    course_strategy().prop_flat_map(|course| {
        let types = course.valid_declaration_types().to_vec();
        (Just(course), prop::sample::select(types))
    })
}

pub fn participant_identity_strategy() -> impl Strategy<Value = ParticipantIdentityId> {
    any::<[u8; 16]>().prop_map(|bytes| ParticipantIdentityId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}

/// An instant within a year either side of the fixture clock, to the second
pub fn instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (-365 * 86_400i64..365 * 86_400i64).prop_map(|secs| TemporalFixtures::now() + Duration::seconds(secs))
}

/// A bounded window with start strictly before end
pub fn window_strategy() -> impl Strategy<Value = MilestoneWindow> {
    (instant_strategy(), 1i64..200 * 86_400i64).prop_map(|(start, length)| {
        MilestoneWindow::bounded(start, start + Duration::seconds(length))
            .expect("generated window is ordered")
    })
}
