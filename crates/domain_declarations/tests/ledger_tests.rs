//! Statement Ledger Tests
//!
//! # Test Organization
//!
//! - `attachment` - open statement selection and attach
//! - `migration` - moving line items between named statements
//! - `payment` - payable and paid progression

mod common;

use common::{utc, Harness, COHORT};
use core_kernel::ProviderId;
use domain_declarations::ledger::DRY_RUN_BANNER;
use domain_declarations::{
    DeclarationState, DeclarationStore, DeclarationType, MigrationRequest, Statement, StatementUpdate,
};

async fn second_provider(h: &Harness, names: &[&str]) -> ProviderId {
    let provider = ProviderId::new();
    for (i, name) in names.iter().enumerate() {
        let statement = Statement::new(
            *name,
            provider,
            "Best Practice Network",
            COHORT,
            utc(2021, 11 + i as u32, 28, 23),
            true,
        );
        h.store.insert_statement(&statement).await.unwrap();
    }
    provider
}

async fn items_on(h: &Harness, statement: &Statement) -> usize {
    h.store.line_items_for_statement(statement.id).await.unwrap().len()
}

// ============================================================================
// ATTACHMENT
// ============================================================================

mod attachment {
    use super::*;

    #[tokio::test]
    async fn test_open_statement_is_earliest_future_output_fee() {
        let h = Harness::new().await;

        let open = h
            .services
            .ledger
            .open_output_fee_statement(h.provider, COHORT, utc(2021, 10, 15, 12))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(open.id, h.november.id);

        let after_november = h
            .services
            .ledger
            .open_output_fee_statement(h.provider, COHORT, utc(2021, 12, 1, 0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after_november.id, h.december.id);
    }

    #[tokio::test]
    async fn test_attach_is_idempotent() {
        let h = Harness::new().await;
        let declaration = h.eligible_declaration().await;

        let item = h.services.ledger.attach(declaration.id).await.unwrap();

        assert_eq!(item.statement_id, h.november.id);
        assert_eq!(h.store.line_item_count().await, 1);
    }

    #[tokio::test]
    async fn test_submitted_declaration_cannot_be_attached() {
        let h = Harness::new().await;
        let profile = h.enrol(false).await;
        let submitted = h
            .services
            .declarations
            .create_declaration(h.provider, &h.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 9)))
            .await
            .unwrap()
            .declaration;

        let err = h.services.ledger.attach(submitted.id).await.unwrap_err();

        assert!(err.is_business_rule());
        assert_eq!(h.store.line_item_count().await, 0);
    }
}

// ============================================================================
// MIGRATION
// ============================================================================

mod migration {
    use super::*;

    fn november_to_december() -> MigrationRequest {
        MigrationRequest::new(COHORT, "November 2021", "December 2021")
    }

    #[tokio::test]
    async fn test_dry_run_previews_real_run() {
        let h = Harness::new().await;
        second_provider(&h, &["November 2021", "December 2021"]).await;
        h.eligible_declaration().await;
        h.eligible_declaration().await;

        let preview = h.services.ledger.migrate(november_to_december().dry_run(true)).await.unwrap();

        assert_eq!(
            preview.log,
            vec![
                DRY_RUN_BANNER.to_string(),
                "Migrating declarations from November 2021 to December 2021 for 2 providers".to_string(),
                "Migrating 2 declarations for Ambition Institute".to_string(),
                "Migrating 0 declarations for Best Practice Network".to_string(),
            ]
        );
        assert!(preview.report.rolled_back);
        assert_eq!(items_on(&h, &h.november).await, 2);

        let applied = h.services.ledger.migrate(november_to_december().dry_run(false)).await.unwrap();

        assert_eq!(applied.log, preview.log[1..].to_vec());
        assert_eq!(items_on(&h, &h.november).await, 0);
        assert_eq!(items_on(&h, &h.december).await, 2);
    }

    #[tokio::test]
    async fn test_provider_with_only_source_statement_aborts() {
        let h = Harness::new().await;
        second_provider(&h, &["November 2021"]).await;
        h.eligible_declaration().await;

        let err = h
            .services
            .ledger
            .migrate(november_to_december().dry_run(false))
            .await
            .unwrap_err();

        assert!(err.is_integrity());
        assert!(err.to_string().contains("Best Practice Network"));
        assert_eq!(items_on(&h, &h.november).await, 1);
        assert_eq!(items_on(&h, &h.december).await, 0);

        let narrowed = h
            .services
            .ledger
            .migrate(november_to_december().dry_run(false).for_providers(vec![h.provider]))
            .await
            .unwrap();
        assert_eq!(narrowed.report.moved_from(h.november.id), 1);
    }

    #[tokio::test]
    async fn test_no_matching_statements_aborts() {
        let h = Harness::new().await;

        let err = h
            .services
            .ledger
            .migrate(MigrationRequest::new(COHORT, "March 2022", "April 2022"))
            .await
            .unwrap_err();

        assert!(err.is_integrity());
    }

    #[tokio::test]
    async fn test_past_target_aborts_even_when_deadline_is_moved() {
        let h = Harness::new().await;
        h.eligible_declaration().await;
        h.clock.set(utc(2022, 1, 5, 12));

        let err = h
            .services
            .ledger
            .migrate(november_to_december().dry_run(false))
            .await
            .unwrap_err();
        assert!(err.is_integrity());

        let extended = StatementUpdate {
            deadline: Some(utc(2022, 1, 31, 23)),
            ..StatementUpdate::default()
        };
        let err = h
            .services
            .ledger
            .migrate(november_to_december().dry_run(false).with_to_statement_updates(extended))
            .await
            .unwrap_err();

        assert!(err.is_integrity());
        assert!(err.to_string().contains("not future dated"));
        assert_eq!(items_on(&h, &h.november).await, 1);
        let december = h.store.get_statement(h.december.id).await.unwrap().unwrap();
        assert_eq!(december.deadline, h.december.deadline);
    }

    #[tokio::test]
    async fn test_statements_without_output_fee_are_ignored() {
        let h = Harness::new().await;
        h.eligible_declaration().await;
        let other = ProviderId::new();
        let december = Statement::new(
            "December 2021",
            other,
            "Best Practice Network",
            COHORT,
            utc(2021, 12, 31, 23),
            false,
        );
        h.store.insert_statement(&december).await.unwrap();

        let outcome = h
            .services
            .ledger
            .migrate(november_to_december().dry_run(false))
            .await
            .unwrap();

        assert_eq!(
            outcome.log,
            vec![
                "Migrating declarations from November 2021 to December 2021 for 1 providers".to_string(),
                "Migrating 1 declarations for Ambition Institute".to_string(),
            ]
        );
        assert_eq!(items_on(&h, &h.december).await, 1);
        assert_eq!(items_on(&h, &december).await, 0);
    }

    #[tokio::test]
    async fn test_declaration_type_filter_and_source_output_fee() {
        let h = Harness::new().await;
        h.clock.set(utc(2021, 11, 15, 12));
        let profile = h.enrol(true).await;
        for (declaration_type, date) in [
            (DeclarationType::Started, utc(2021, 10, 1, 9)),
            (DeclarationType::Retained1, utc(2021, 11, 10, 9)),
        ] {
            h.services
                .declarations
                .create_declaration(h.provider, &h.request(&profile, declaration_type, date))
                .await
                .unwrap();
        }

        let outcome = h
            .services
            .ledger
            .migrate(
                november_to_december()
                    .dry_run(false)
                    .for_declaration_types(vec![DeclarationType::Retained1])
                    .with_from_statement_output_fee(false),
            )
            .await
            .unwrap();

        assert_eq!(outcome.report.moved_from(h.november.id), 1);
        assert_eq!(items_on(&h, &h.november).await, 1);
        assert_eq!(items_on(&h, &h.december).await, 1);
        let november = h.store.get_statement(h.november.id).await.unwrap().unwrap();
        assert!(!november.output_fee);
        assert_eq!(
            outcome.log.last().unwrap(),
            "Setting output fee of November 2021 for Ambition Institute to false"
        );
    }
}

// ============================================================================
// PAYMENT
// ============================================================================

mod payment {
    use super::*;

    #[tokio::test]
    async fn test_statement_progresses_to_paid() {
        let h = Harness::new().await;
        let declaration = h.eligible_declaration().await;

        assert_eq!(h.services.ledger.mark_payable(h.november.id).await.unwrap(), 1);
        assert_eq!(h.reload(&declaration).await.state, DeclarationState::Payable);

        let summary = h.services.ledger.mark_paid(h.november.id).await.unwrap();

        assert_eq!(summary.paid, 1);
        assert_eq!(summary.clawed_back, 0);
        assert_eq!(h.reload(&declaration).await.state, DeclarationState::Paid);
        let november = h.store.get_statement(h.november.id).await.unwrap().unwrap();
        assert!(november.is_paid());
    }

    #[tokio::test]
    async fn test_statement_cannot_be_paid_twice() {
        let h = Harness::new().await;
        h.services.ledger.mark_paid(h.november.id).await.unwrap();

        let err = h.services.ledger.mark_paid(h.november.id).await.unwrap_err();

        assert!(err.is_integrity());
    }

    #[tokio::test]
    async fn test_paid_statement_no_longer_takes_claims() {
        let h = Harness::new().await;
        h.services.ledger.mark_paid(h.november.id).await.unwrap();

        let declaration = h.eligible_declaration().await;

        let items = h.store.line_items_for_declaration(declaration.id).await.unwrap();
        assert_eq!(items[0].statement_id, h.december.id);
    }
}
