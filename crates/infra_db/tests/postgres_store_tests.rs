//! PostgreSQL Store Integration Tests
//!
//! These need Docker and are ignored by default:
//! `cargo test -p infra_db -- --ignored`
//!
//! # Test Organization
//!
//! - `commit` - change-set atomicity, dry runs and compare-and-set
//! - `constraints` - the partial unique indexes surface as named violations
//! - `services` - the declaration services running on PostgreSQL

use std::sync::Arc;

use chrono::Utc;
use core_kernel::{DeclarationId, ParticipantIdentityId, PortError};
use domain_declarations::{
    constraints, ChangeSet, CommitMode, Declaration, DeclarationDraft, DeclarationState,
    DeclarationStore, DeclarationType, FundingServices, InitialState, LineItem, LineItemIntent,
    LineItemMove, ParticipantProfile, Statement, StatementQuery, StatementUpdate,
};
use infra_db::{PostgresDeclarationStore, PostgresParticipantDirectory};
use test_utils::{
    assert_active_items, assert_history, create_isolated_test_database, DeclarationRequestBuilder,
    IdFixtures, ParticipantProfileBuilder, ScheduleFixtures, StatementBuilder, TemporalFixtures,
    TestDatabase, COHORT,
};

// ============================================================================
// TEST FIXTURES
// ============================================================================

struct Fixture {
    db: TestDatabase,
    store: PostgresDeclarationStore,
    november: Statement,
    december: Statement,
}

async fn fixture() -> Fixture {
    let db = create_isolated_test_database().await.expect("container starts");
    let store = PostgresDeclarationStore::new(db.pool().clone());

    let november = StatementBuilder::new().build();
    let december = StatementBuilder::new()
        .named("December 2021")
        .with_deadline(TemporalFixtures::december_deadline())
        .build();
    store.insert_statement(&november).await.unwrap();
    store.insert_statement(&december).await.unwrap();

    Fixture { db, store, november, december }
}

fn declaration(profile: &ParticipantProfile, declaration_type: DeclarationType, initial: InitialState) -> Declaration {
    let draft = DeclarationDraft {
        participant_profile_id: profile.id,
        participant_identity_id: profile.identity_id,
        provider_id: profile.provider_id,
        course: profile.course,
        declaration_type,
        declaration_date: TemporalFixtures::started_declaration_date(),
        evidence_held: None,
        cohort: COHORT,
    };
    Declaration::create(draft, initial, TemporalFixtures::now())
}

// ============================================================================
// COMMIT
// ============================================================================

mod commit {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_declaration_and_history_round_trip() {
        let f = fixture().await;
        let profile = ParticipantProfileBuilder::new().build();
        let original = declaration(&profile, DeclarationType::Started, InitialState::Eligible);
        let duplicate = declaration(
            &ParticipantProfileBuilder::new().with_identity(profile.identity_id).build(),
            DeclarationType::Started,
            InitialState::DuplicateOf(original.id),
        );

        f.store
            .commit(
                ChangeSet::new("insert")
                    .insert_declaration(original.clone())
                    .insert_declaration(duplicate.clone()),
                CommitMode::Apply,
            )
            .await
            .unwrap();

        let loaded = f.store.get_declaration(duplicate.id).await.unwrap().unwrap();
        assert_eq!(loaded.superseded_by_id, Some(original.id));
        assert_history(&loaded, &[DeclarationState::Submitted, DeclarationState::Ineligible]);

        let scope = f.store.find_in_scope(&original.scope()).await.unwrap();
        assert_eq!(scope.len(), 2);
        assert_eq!(scope[0].id, original.id);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_dry_run_writes_nothing() {
        let f = fixture().await;
        let profile = ParticipantProfileBuilder::new().build();
        let d = declaration(&profile, DeclarationType::Started, InitialState::Eligible);

        let report = f
            .store
            .commit(
                ChangeSet::new("dry")
                    .insert_declaration(d.clone())
                    .add_line_item(LineItem::billable(d.id, f.november.id, Utc::now())),
                CommitMode::DryRun,
            )
            .await
            .unwrap();

        assert!(report.rolled_back);
        assert_eq!(report.line_items_added, 1);
        assert!(f.store.get_declaration(d.id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_stale_transition_is_precondition_failure() {
        let f = fixture().await;
        let profile = ParticipantProfileBuilder::new().build();
        let d = declaration(&profile, DeclarationType::Started, InitialState::Submitted);
        f.store
            .commit(ChangeSet::new("insert").insert_declaration(d.clone()), CommitMode::Apply)
            .await
            .unwrap();

        let to_eligible = d.transition(DeclarationState::Eligible, None, Utc::now()).unwrap();
        let to_voided = d.transition(DeclarationState::Voided, None, Utc::now()).unwrap();
        f.store
            .commit(ChangeSet::new("eligible").transition(to_eligible), CommitMode::Apply)
            .await
            .unwrap();

        let err = f
            .store
            .commit(ChangeSet::new("void").transition(to_voided), CommitMode::Apply)
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::PreconditionFailed { .. }));

        let loaded = f.store.get_declaration(d.id).await.unwrap().unwrap();
        assert_eq!(loaded.state, DeclarationState::Eligible);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_closed_statement_fails_deadline_check() {
        let f = fixture().await;
        let extend = StatementUpdate {
            deadline: Some(TemporalFixtures::december_deadline()),
            ..StatementUpdate::default()
        };

        let err = f
            .store
            .commit(
                ChangeSet::new("extend")
                    .require_deadline_after(f.november.id, Utc::now())
                    .update_statement(f.november.id, extend.clone()),
                CommitMode::Apply,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::PreconditionFailed { .. }));
        let november = f.store.get_statement(f.november.id).await.unwrap().unwrap();
        assert_eq!(november.deadline, f.november.deadline);

        let report = f
            .store
            .commit(
                ChangeSet::new("extend")
                    .require_deadline_after(f.november.id, TemporalFixtures::now())
                    .update_statement(f.november.id, extend),
                CommitMode::Apply,
            )
            .await
            .unwrap();
        assert_eq!(report.statements_updated, 1);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_move_respects_declaration_type_filter() {
        let f = fixture().await;
        let profile = ParticipantProfileBuilder::new().build();
        let started = declaration(&profile, DeclarationType::Started, InitialState::Eligible);
        let retained = declaration(&profile, DeclarationType::Retained1, InitialState::Eligible);

        f.store
            .commit(
                ChangeSet::new("attach")
                    .insert_declaration(started.clone())
                    .insert_declaration(retained.clone())
                    .add_line_item(LineItem::billable(started.id, f.november.id, Utc::now()))
                    .add_line_item(LineItem::billable(retained.id, f.november.id, Utc::now())),
                CommitMode::Apply,
            )
            .await
            .unwrap();

        let report = f
            .store
            .commit(
                ChangeSet::new("move").move_line_items(LineItemMove {
                    from: f.november.id,
                    to: f.december.id,
                    declaration_types: Some(vec![DeclarationType::Started]),
                }),
                CommitMode::Apply,
            )
            .await
            .unwrap();

        assert_eq!(report.moved_from(f.november.id), 1);
        let december = f.store.line_items_for_statement(f.december.id).await.unwrap();
        assert_eq!(december.len(), 1);
        assert_eq!(december[0].declaration_id, started.id);
    }
}

// ============================================================================
// CONSTRAINTS
// ============================================================================

mod constraint_names {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_second_survivor_violates_live_scope_key() {
        let f = fixture().await;
        let identity = ParticipantIdentityId::new();
        let a = ParticipantProfileBuilder::new().with_identity(identity).build();
        let b = ParticipantProfileBuilder::new().with_identity(identity).build();

        let err = f
            .store
            .commit(
                ChangeSet::new("two survivors")
                    .insert_declaration(declaration(&a, DeclarationType::Started, InitialState::Submitted))
                    .insert_declaration(declaration(&b, DeclarationType::Started, InitialState::Submitted)),
                CommitMode::Apply,
            )
            .await
            .unwrap_err();

        assert!(err.violates(constraints::LIVE_SCOPE_KEY));
        let scope = declaration(&a, DeclarationType::Started, InitialState::Submitted).scope();
        assert!(f.store.find_in_scope(&scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_resubmission_violates_submission_key() {
        let f = fixture().await;
        let profile = ParticipantProfileBuilder::new().build();
        let first = declaration(&profile, DeclarationType::Started, InitialState::Submitted);
        let again = declaration(&profile, DeclarationType::Started, InitialState::DuplicateOf(first.id));

        f.store
            .commit(ChangeSet::new("first").insert_declaration(first), CommitMode::Apply)
            .await
            .unwrap();
        let err = f
            .store
            .commit(ChangeSet::new("again").insert_declaration(again), CommitMode::Apply)
            .await
            .unwrap_err();

        assert!(err.violates(constraints::SUBMISSION_KEY));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_second_active_billable_item_violates_active_key() {
        let f = fixture().await;
        let d = declaration(&ParticipantProfileBuilder::new().build(), DeclarationType::Started, InitialState::Eligible);
        f.store
            .commit(
                ChangeSet::new("attach")
                    .insert_declaration(d.clone())
                    .add_line_item(LineItem::billable(d.id, f.november.id, Utc::now())),
                CommitMode::Apply,
            )
            .await
            .unwrap();

        let err = f
            .store
            .commit(
                ChangeSet::new("attach again").add_line_item(LineItem::billable(d.id, f.december.id, Utc::now())),
                CommitMode::Apply,
            )
            .await
            .unwrap_err();

        assert!(err.violates(constraints::ACTIVE_LINE_ITEM_KEY));
        let items = f.store.line_items_for_declaration(d.id).await.unwrap();
        assert_active_items(&items, LineItemIntent::Billable, 1);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_unknown_declaration_transition_is_not_found() {
        let f = fixture().await;
        let d = declaration(&ParticipantProfileBuilder::new().build(), DeclarationType::Started, InitialState::Submitted);
        let mut transition = d.transition(DeclarationState::Voided, None, Utc::now()).unwrap();
        transition.declaration_id = DeclarationId::new();

        let err = f
            .store
            .commit(ChangeSet::new("void").transition(transition), CommitMode::Apply)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}

// ============================================================================
// SERVICES
// ============================================================================

mod services {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_create_declaration_attaches_to_november() {
        let f = fixture().await;
        let directory = PostgresParticipantDirectory::new(f.db.pool().clone());
        let schedule = ScheduleFixtures::ecf_september();
        directory.save_schedule(&schedule).await.unwrap();
        let profile = ParticipantProfileBuilder::new().build();
        directory.save_profile(&profile).await.unwrap();

        let services = FundingServices::new(
            Arc::new(f.store.clone()),
            Arc::new(directory),
            Arc::new(TemporalFixtures::clock()),
        );
        let receipt = services
            .declarations
            .create_declaration(IdFixtures::provider_id(), &DeclarationRequestBuilder::for_profile(&profile).build())
            .await
            .unwrap();

        assert!(receipt.created);
        assert_eq!(receipt.declaration.state, DeclarationState::Eligible);
        let items = f.store.line_items_for_statement(f.november.id).await.unwrap();
        assert_active_items(&items, LineItemIntent::Billable, 1);

        let statements = f
            .store
            .find_statements(&StatementQuery::for_provider(IdFixtures::provider_id(), COHORT))
            .await
            .unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].id, f.november.id);
    }
}
