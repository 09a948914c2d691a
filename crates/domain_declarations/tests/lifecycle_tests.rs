//! Declaration Lifecycle Tests
//!
//! Creation, idempotence, duplicate resolution and voiding against the
//! in-memory store.
//!
//! # Test Organization
//!
//! - `creation` - initial state and statement attachment
//! - `preconditions` - each rejected precondition and its error kind
//! - `milestone_window` - window boundaries
//! - `idempotence` - identical resubmission and concurrent submitters
//! - `duplicates` - supersession across profiles of one person
//! - `voiding` - void, detach and resubmission

mod common;

use chrono::Duration;
use common::{utc, Harness};
use core_kernel::ParticipantIdentityId;
use domain_declarations::{
    CourseIdentifier, DeclarationState, DeclarationStore, DeclarationType, FieldErrorCode,
    LineItemIntent, ParticipantProfile, RuleViolation, StateReason,
};

// ============================================================================
// CREATION
// ============================================================================

mod creation {
    use super::*;

    #[tokio::test]
    async fn test_fundable_participant_is_eligible_and_billed() {
        let h = Harness::new().await;
        let profile = h.enrol(true).await;

        let receipt = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 9)))
            .await
            .unwrap();

        assert!(receipt.created);
        assert_eq!(receipt.declaration.state, DeclarationState::Eligible);
        let items = h.store.line_items_for_declaration(receipt.declaration.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].intent, LineItemIntent::Billable);
        assert_eq!(items[0].statement_id, h.november.id);
    }

    #[tokio::test]
    async fn test_unfunded_participant_is_submitted_and_unbilled() {
        let h = Harness::new().await;
        let profile = h.enrol(false).await;

        let receipt = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 9)))
            .await
            .unwrap();

        assert_eq!(receipt.declaration.state, DeclarationState::Submitted);
        assert_eq!(receipt.declaration.history.len(), 1);
        assert_eq!(h.store.line_item_count().await, 0);
    }

    #[tokio::test]
    async fn test_eligible_without_open_statement_is_integrity_failure() {
        let h = Harness::new().await;
        let profile = h.enrol(true).await;
        h.clock.set(utc(2022, 1, 15, 12));

        let err = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 9)))
            .await
            .unwrap_err();

        assert!(err.is_integrity());
        assert_eq!(h.store.declaration_count().await, 0);
    }

    #[tokio::test]
    async fn test_mark_eligible_attaches_to_open_statement() {
        let h = Harness::new().await;
        let profile = h.enrol(false).await;
        let submitted = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 9)))
            .await
            .unwrap()
            .declaration;
        h.directory
            .update_profile(ParticipantProfile { funding_eligible: true, ..profile })
            .await;

        let eligible = h.services.declarations.mark_eligible(submitted.id).await.unwrap();

        assert_eq!(eligible.state, DeclarationState::Eligible);
        assert_eq!(h.reload(&submitted).await.state, DeclarationState::Eligible);
        let items = h.store.line_items_for_declaration(submitted.id).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_mark_eligible_requires_fundable_participant() {
        let h = Harness::new().await;
        let profile = h.enrol(false).await;
        let submitted = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 9)))
            .await
            .unwrap()
            .declaration;

        let err = h.services.declarations.mark_eligible(submitted.id).await.unwrap_err();

        assert_eq!(err.violation(), Some(RuleViolation::ParticipantNotFundable));
        assert_eq!(h.reload(&submitted).await.state, DeclarationState::Submitted);
        assert!(h.store.line_items_for_declaration(submitted.id).await.unwrap().is_empty());
    }
}

// ============================================================================
// PRECONDITIONS
// ============================================================================

mod preconditions {
    use super::*;

    #[tokio::test]
    async fn test_unknown_participant() {
        let h = Harness::new().await;
        let stranger = h.enrol(true).await;
        let mut request = h.request(&stranger, DeclarationType::Started, utc(2021, 10, 1, 9));
        request.participant_id = ParticipantIdentityId::new().to_string();

        let err = h.services.declarations.create_declaration(h.provider, &request).await.unwrap_err();

        assert_eq!(err.field_errors()[0].field, "participant_id");
        assert_eq!(err.field_errors()[0].code, FieldErrorCode::InvalidParticipant);
    }

    #[tokio::test]
    async fn test_withdrawn_participant_is_invalid() {
        let h = Harness::new().await;
        let profile = h.enrol(true).await;
        h.withdraw(&profile).await;

        let err = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 9)))
            .await
            .unwrap_err();

        assert_eq!(err.field_errors()[0].code, FieldErrorCode::InvalidParticipant);
    }

    #[tokio::test]
    async fn test_declaration_type_not_offered_by_course() {
        let h = Harness::new().await;
        let profile = h
            .enrol_as(ParticipantIdentityId::new(), CourseIdentifier::NpqHeadship, true)
            .await;

        let err = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Retained3, utc(2021, 10, 1, 9)))
            .await
            .unwrap_err();

        assert_eq!(err.field_errors()[0].code, FieldErrorCode::InvalidForCourse);
    }

    #[tokio::test]
    async fn test_declaration_type_missing_from_schedule() {
        let h = Harness::new().await;
        let profile = h.enrol(true).await;

        let err = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Extended1, utc(2021, 10, 1, 9)))
            .await
            .unwrap_err();

        assert_eq!(err.field_errors()[0].code, FieldErrorCode::NotInSchedule);
    }

    #[tokio::test]
    async fn test_future_date() {
        let h = Harness::new().await;
        let profile = h.enrol(true).await;

        let err = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Started, utc(2021, 10, 16, 9)))
            .await
            .unwrap_err();

        assert_eq!(err.field_errors()[0].field, "declaration_date");
        assert_eq!(err.field_errors()[0].code, FieldErrorCode::InFuture);
    }

    #[tokio::test]
    async fn test_evidence_required_after_started() {
        let h = Harness::new().await;
        h.clock.set(utc(2021, 11, 15, 12));
        let profile = h.enrol(true).await;
        let mut request = h.request(&profile, DeclarationType::Retained1, utc(2021, 11, 10, 9));
        request.evidence_held = None;

        let err = h.services.declarations.create_declaration(h.provider, &request).await.unwrap_err();

        assert_eq!(err.field_errors()[0].code, FieldErrorCode::EvidenceRequired);
    }

    #[tokio::test]
    async fn test_failed_preconditions_store_nothing() {
        let h = Harness::new().await;
        let profile = h.enrol(true).await;
        let mut request = h.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 9));
        request.declaration_type = "begun".to_string();

        let err = h.services.declarations.create_declaration(h.provider, &request).await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(h.store.declaration_count().await, 0);
    }
}

// ============================================================================
// MILESTONE WINDOW
// ============================================================================

mod milestone_window {
    use super::*;

    #[tokio::test]
    async fn test_start_date_itself_is_too_early() {
        let h = Harness::new().await;
        let profile = h.enrol(false).await;
        let start = h.schedule.milestone_for(DeclarationType::Started).unwrap().start_date;

        let err = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Started, start))
            .await
            .unwrap_err();

        assert_eq!(err.violation(), Some(RuleViolation::DeclarationTooEarly));
    }

    #[tokio::test]
    async fn test_milestone_date_itself_is_accepted() {
        let h = Harness::new().await;
        h.clock.set(utc(2021, 12, 15, 12));
        let profile = h.enrol(false).await;
        let milestone_date = h
            .schedule
            .milestone_for(DeclarationType::Started)
            .unwrap()
            .milestone_date
            .unwrap();

        let receipt = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Started, milestone_date))
            .await
            .unwrap();

        assert_eq!(receipt.declaration.declaration_date, milestone_date);
    }

    #[tokio::test]
    async fn test_after_milestone_date_is_too_late() {
        let h = Harness::new().await;
        h.clock.set(utc(2021, 12, 15, 12));
        let profile = h.enrol(false).await;

        let err = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Started, utc(2021, 12, 1, 9)))
            .await
            .unwrap_err();

        assert_eq!(err.violation(), Some(RuleViolation::DeclarationTooLate));
    }

    #[tokio::test]
    async fn test_open_ended_milestone_has_no_upper_bound() {
        let h = Harness::new().await;
        h.clock.set(utc(2024, 6, 1, 12));
        let profile = h.enrol(false).await;

        let receipt = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Completed, utc(2024, 5, 1, 9)))
            .await
            .unwrap();

        assert_eq!(receipt.declaration.declaration_type, DeclarationType::Completed);
    }
}

// ============================================================================
// IDEMPOTENCE
// ============================================================================

mod idempotence {
    use super::*;

    #[tokio::test]
    async fn test_identical_resubmission_returns_existing() {
        let h = Harness::new().await;
        let profile = h.enrol(true).await;
        let request = h.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 9));

        let first = h.services.declarations.create_declaration(h.provider, &request).await.unwrap();
        let second = h.services.declarations.create_declaration(h.provider, &request).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.declaration.id, second.declaration.id);
        assert_eq!(h.store.declaration_count().await, 1);
        assert_eq!(h.store.line_item_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_identical_submissions_store_one_row() {
        let h = Harness::new().await;
        let profile = h.enrol(true).await;
        let request = h.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 9));

        let (a, b) = tokio::join!(
            h.services.declarations.create_declaration(h.provider, &request),
            h.services.declarations.create_declaration(h.provider, &request),
        );

        assert_eq!(h.store.declaration_count().await, 1);
        let mut ids = Vec::new();
        for outcome in [a, b] {
            match outcome {
                Ok(receipt) => ids.push(receipt.declaration.id),
                Err(err) => assert!(err.is_conflict(), "loser must see a conflict, got {err}"),
            }
        }
        assert!(!ids.is_empty());
        assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[tokio::test]
    async fn test_concurrent_claims_for_one_milestone_leave_one_survivor() {
        let h = Harness::new().await;
        let profile = h.enrol(true).await;
        let morning = h.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 9));
        let afternoon = h.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 15));

        let (a, b) = tokio::join!(
            h.services.declarations.create_declaration(h.provider, &morning),
            h.services.declarations.create_declaration(h.provider, &afternoon),
        );
        let states = [a.unwrap().declaration.state, b.unwrap().declaration.state];

        assert_eq!(states.iter().filter(|s| **s == DeclarationState::Ineligible).count(), 1);
        assert_eq!(states.iter().filter(|s| **s == DeclarationState::Eligible).count(), 1);
    }
}

// ============================================================================
// DUPLICATES
// ============================================================================

mod duplicates {
    use super::*;

    #[tokio::test]
    async fn test_later_profile_of_same_person_is_superseded() {
        let h = Harness::new().await;
        let identity = ParticipantIdentityId::new();
        let first_profile = h.enrol_as(identity, CourseIdentifier::EcfInduction, true).await;
        let original = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&first_profile, DeclarationType::Started, utc(2021, 10, 1, 9)))
            .await
            .unwrap()
            .declaration;

        h.withdraw(&first_profile).await;
        let second_profile = h.enrol_as(identity, CourseIdentifier::EcfInduction, true).await;
        let duplicate = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&second_profile, DeclarationType::Started, utc(2021, 10, 5, 9)))
            .await
            .unwrap()
            .declaration;

        assert_eq!(duplicate.state, DeclarationState::Ineligible);
        assert_eq!(duplicate.superseded_by_id, Some(original.id));
        assert_eq!(duplicate.history.last().unwrap().reason, Some(StateReason::Duplicate));
        assert!(h.store.line_items_for_declaration(duplicate.id).await.unwrap().is_empty());
        assert_eq!(h.reload(&original).await.state, DeclarationState::Eligible);
    }

    #[tokio::test]
    async fn test_duplicate_is_resolved_before_window_check() {
        let h = Harness::new().await;
        let profile = h.enrol(false).await;
        h.services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 9)))
            .await
            .unwrap();

        let too_early = h.schedule.milestone_for(DeclarationType::Started).unwrap().start_date - Duration::days(3);
        let duplicate = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Started, too_early))
            .await
            .unwrap()
            .declaration;

        assert_eq!(duplicate.state, DeclarationState::Ineligible);
    }

    #[tokio::test]
    async fn test_different_milestones_are_not_duplicates() {
        let h = Harness::new().await;
        h.clock.set(utc(2021, 11, 15, 12));
        let profile = h.enrol(true).await;

        let started = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 9)))
            .await
            .unwrap();
        let retained = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Retained1, utc(2021, 11, 10, 9)))
            .await
            .unwrap();

        assert_eq!(started.declaration.state, DeclarationState::Eligible);
        assert_eq!(retained.declaration.state, DeclarationState::Eligible);
    }
}

// ============================================================================
// VOIDING
// ============================================================================

mod voiding {
    use super::*;

    #[tokio::test]
    async fn test_void_detaches_billable_item() {
        let h = Harness::new().await;
        let declaration = h.eligible_declaration().await;

        let voided = h.services.declarations.void_declaration(declaration.id).await.unwrap();

        assert_eq!(voided.state, DeclarationState::Voided);
        let items = h.store.line_items_for_declaration(declaration.id).await.unwrap();
        assert!(items.iter().all(|item| !item.active));
    }

    #[tokio::test]
    async fn test_void_twice_is_already_terminal() {
        let h = Harness::new().await;
        let declaration = h.eligible_declaration().await;
        h.services.declarations.void_declaration(declaration.id).await.unwrap();

        let err = h.services.declarations.void_declaration(declaration.id).await.unwrap_err();

        assert_eq!(err.violation(), Some(RuleViolation::AlreadyTerminal));
    }

    #[tokio::test]
    async fn test_paid_declaration_cannot_be_voided() {
        let h = Harness::new().await;
        let paid = h.paid_declaration().await;

        let err = h.services.declarations.void_declaration(paid.id).await.unwrap_err();

        assert_eq!(err.violation(), Some(RuleViolation::AlreadyTerminal));
        assert_eq!(h.reload(&paid).await.state, DeclarationState::Paid);
    }

    #[tokio::test]
    async fn test_voided_tuple_can_be_declared_again() {
        let h = Harness::new().await;
        let profile = h.enrol(true).await;
        let request = h.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 9));
        let first = h.services.declarations.create_declaration(h.provider, &request).await.unwrap();
        h.services.declarations.void_declaration(first.declaration.id).await.unwrap();

        let again = h.services.declarations.create_declaration(h.provider, &request).await.unwrap();

        assert!(again.created);
        assert_ne!(again.declaration.id, first.declaration.id);
        assert_eq!(again.declaration.state, DeclarationState::Eligible);
    }
}
