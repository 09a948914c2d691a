//! Duplicate resolution
//!
//! Two declarations are duplicates when they claim the same milestone for the
//! same person with the same provider and course, even through different
//! profiles. The earliest-created surviving declaration is the original; any
//! later one is created ineligible and points at it.

use crate::declaration::{Declaration, DuplicateScope, InitialState};

/// Finds the original for `scope` among `candidates`
///
/// Only surviving declarations (live and not themselves superseded) can be
/// an original. Ties on creation time fall back to the identifier so the
/// answer does not depend on iteration order.
pub fn find_original<'a, I>(scope: &DuplicateScope, candidates: I) -> Option<&'a Declaration>
where
    I: IntoIterator<Item = &'a Declaration>,
{
    candidates
        .into_iter()
        .filter(|d| d.scope() == *scope && d.is_surviving())
        .min_by_key(|d| (d.created_at, d.id))
}

/// Decides the state a new declaration is created in
pub fn initial_state(original: Option<&Declaration>, funding_eligible: bool) -> InitialState {
    match original {
        Some(original) => InitialState::DuplicateOf(original.id),
        None if funding_eligible => InitialState::Eligible,
        None => InitialState::Submitted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use core_kernel::{ParticipantIdentityId, ParticipantProfileId, ProviderId};

    use crate::course::{CourseIdentifier, DeclarationType};
    use crate::declaration::{DeclarationDraft, DeclarationState};
    use crate::schedule::Cohort;

    fn draft(identity: ParticipantIdentityId, provider: ProviderId) -> DeclarationDraft {
        DeclarationDraft {
            participant_profile_id: ParticipantProfileId::new(),
            participant_identity_id: identity,
            provider_id: provider,
            course: CourseIdentifier::EcfMentor,
            declaration_type: DeclarationType::Started,
            declaration_date: Utc.with_ymd_and_hms(2021, 10, 1, 9, 0, 0).unwrap(),
            evidence_held: None,
            cohort: Cohort(2021),
        }
    }

    #[test]
    fn test_earliest_surviving_is_original() {
        let identity = ParticipantIdentityId::new();
        let provider = ProviderId::new();
        let t0 = Utc.with_ymd_and_hms(2021, 10, 2, 0, 0, 0).unwrap();

        let first = Declaration::create(draft(identity, provider), InitialState::Submitted, t0);
        let second = Declaration::create(
            draft(identity, provider),
            InitialState::Submitted,
            t0 + Duration::hours(1),
        );
        let scope = draft(identity, provider).scope();

        let original = find_original(&scope, [&second, &first]).unwrap();
        assert_eq!(original.id, first.id);
    }

    #[test]
    fn test_voided_and_superseded_are_not_originals() {
        let identity = ParticipantIdentityId::new();
        let provider = ProviderId::new();
        let now = Utc::now();

        let mut voided = Declaration::create(draft(identity, provider), InitialState::Submitted, now);
        voided.state = DeclarationState::Voided;
        let duplicate = Declaration::create(
            draft(identity, provider),
            InitialState::DuplicateOf(voided.id),
            now,
        );

        let scope = draft(identity, provider).scope();
        assert!(find_original(&scope, [&voided, &duplicate]).is_none());
    }

    #[test]
    fn test_other_provider_is_not_a_duplicate() {
        let identity = ParticipantIdentityId::new();
        let other = Declaration::create(
            draft(identity, ProviderId::new()),
            InitialState::Eligible,
            Utc::now(),
        );
        let scope = draft(identity, ProviderId::new()).scope();

        assert!(find_original(&scope, [&other]).is_none());
        assert_eq!(initial_state(None, true), InitialState::Eligible);
        assert_eq!(initial_state(Some(&other), true), InitialState::DuplicateOf(other.id));
    }
}
