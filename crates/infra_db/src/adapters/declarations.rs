//! PostgreSQL Declaration Store
//!
//! Implements [`DeclarationStore`] on top of [`DeclarationRepository`].
//! A commit runs the whole [`ChangeSet`] in one transaction in a fixed
//! order (deadline checks under row locks, declarations, transitions,
//! deactivations, new line items, moves, statement updates) and relies on the partial unique indexes from the
//! migrations for the storage-layer constraints. A dry run performs every
//! write and then rolls back.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, DeclarationId, DeclarationStateId, DomainPort, HealthCheckResult,
    HealthCheckable, LineItemId, ParticipantIdentityId, ParticipantProfileId, PortError,
    ProviderId, StatementId,
};
use domain_declarations::{
    ChangeSet, Cohort, CommitMode, CommitReport, Declaration, DeclarationStateRecord,
    DeclarationStore, DuplicateScope, LineItem, MoveOutcome, Statement, StatementQuery,
    SubmissionKey,
};

use crate::error::DatabaseError;
use crate::repositories::declarations::{
    DeclarationRepository, DeclarationRow, DeclarationStateRow, LineItemRow, StatementRow,
    SubmissionKeyParams,
};

/// PostgreSQL-backed implementation of [`DeclarationStore`]
#[derive(Debug, Clone)]
pub struct PostgresDeclarationStore {
    repository: DeclarationRepository,
    pool: PgPool,
}

impl PostgresDeclarationStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: DeclarationRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &DeclarationRepository {
        &self.repository
    }

    /// Loads the state history for `rows` and builds domain declarations
    async fn hydrate(&self, rows: Vec<DeclarationRow>) -> Result<Vec<Declaration>, DatabaseError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut histories: HashMap<Uuid, Vec<DeclarationStateRecord>> = HashMap::new();
        for state in self.repository.states_for(&ids).await? {
            let declaration_id = state.participant_declaration_id;
            histories
                .entry(declaration_id)
                .or_default()
                .push(row_to_state_record(state)?);
        }

        rows.into_iter()
            .map(|row| {
                let history = histories.remove(&row.id).unwrap_or_default();
                row_to_declaration(row, history)
            })
            .collect()
    }

    async fn apply(
        conn: &mut sqlx::PgConnection,
        changes: &ChangeSet,
    ) -> Result<CommitReport, DatabaseError> {
        let mut report = CommitReport::default();

        for check in &changes.deadline_checks {
            let statement_id = *check.statement_id.as_uuid();
            let deadline = DeclarationRepository::lock_statement_deadline(conn, statement_id).await?;
            if deadline <= check.after {
                return Err(DatabaseError::StaleState(format!(
                    "statement {} closed at {}",
                    statement_id, deadline
                )));
            }
        }

        for declaration in &changes.new_declarations {
            DeclarationRepository::insert_declaration(conn, &declaration_to_row(declaration)).await?;
            for record in &declaration.history {
                DeclarationRepository::insert_state(conn, &state_record_to_row(record)).await?;
            }
            report.declarations_inserted += 1;
        }

        for transition in &changes.transitions {
            DeclarationRepository::compare_and_set_state(
                conn,
                *transition.declaration_id.as_uuid(),
                transition.from.as_str(),
                transition.to.as_str(),
                transition.record.created_at,
            )
            .await?;
            DeclarationRepository::insert_state(conn, &state_record_to_row(&transition.record)).await?;
            report.transitions_applied += 1;
        }

        for id in &changes.deactivated_line_items {
            DeclarationRepository::deactivate_line_item(conn, *id.as_uuid()).await?;
            report.line_items_deactivated += 1;
        }

        for item in &changes.new_line_items {
            DeclarationRepository::insert_line_item(conn, &line_item_to_row(item)).await?;
            report.line_items_added += 1;
        }

        for line_item_move in &changes.line_item_moves {
            let types: Option<Vec<String>> = line_item_move
                .declaration_types
                .as_ref()
                .map(|types| types.iter().map(|t| t.as_str().to_string()).collect());
            let moved = DeclarationRepository::move_line_items(
                conn,
                *line_item_move.from.as_uuid(),
                *line_item_move.to.as_uuid(),
                types.as_deref(),
            )
            .await?;
            report.moves.push(MoveOutcome {
                from: line_item_move.from,
                to: line_item_move.to,
                moved: moved as usize,
            });
        }

        for (id, update) in &changes.statement_updates {
            DeclarationRepository::update_statement(
                conn,
                *id.as_uuid(),
                update.deadline,
                update.output_fee,
                update.paid_at,
            )
            .await?;
            report.statements_updated += 1;
        }

        Ok(report)
    }
}

impl DomainPort for PostgresDeclarationStore {}

#[async_trait]
impl HealthCheckable for PostgresDeclarationStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: "postgres-declaration-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: "postgres-declaration-store".to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl DeclarationStore for PostgresDeclarationStore {
    #[instrument(skip(self), fields(declaration_id = %id))]
    async fn get_declaration(&self, id: DeclarationId) -> Result<Option<Declaration>, PortError> {
        let Some(row) = self.repository.get_declaration(*id.as_uuid()).await? else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }

    #[instrument(skip(self, key))]
    async fn find_submission(&self, key: &SubmissionKey) -> Result<Option<Declaration>, PortError> {
        let params = SubmissionKeyParams {
            participant_profile_id: *key.participant_profile_id.as_uuid(),
            provider_id: *key.provider_id.as_uuid(),
            course_identifier: key.course.as_str(),
            declaration_type: key.declaration_type.as_str(),
            declaration_date: key.declaration_date,
        };
        let Some(row) = self.repository.find_submission(&params).await? else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }

    #[instrument(skip(self, scope), fields(participant_id = %scope.participant_identity_id))]
    async fn find_in_scope(&self, scope: &DuplicateScope) -> Result<Vec<Declaration>, PortError> {
        let rows = self
            .repository
            .find_in_scope(
                *scope.participant_identity_id.as_uuid(),
                *scope.provider_id.as_uuid(),
                scope.course.as_str(),
                scope.declaration_type.as_str(),
            )
            .await?;
        debug!(count = rows.len(), "Loaded declarations in scope");
        Ok(self.hydrate(rows).await?)
    }

    async fn get_statement(&self, id: StatementId) -> Result<Option<Statement>, PortError> {
        let row = self.repository.get_statement(*id.as_uuid()).await?;
        Ok(row.map(row_to_statement))
    }

    async fn find_statements(&self, query: &StatementQuery) -> Result<Vec<Statement>, PortError> {
        let rows = self
            .repository
            .find_statements(
                query.provider_id.map(|id| *id.as_uuid()),
                query.cohort.map(|c| c.0),
                query.name.as_deref(),
            )
            .await?;
        Ok(rows.into_iter().map(row_to_statement).collect())
    }

    #[instrument(skip(self, statement), fields(statement = %statement.name, provider = %statement.provider_name))]
    async fn insert_statement(&self, statement: &Statement) -> Result<(), PortError> {
        self.repository.insert_statement(&statement_to_row(statement)).await?;
        Ok(())
    }

    async fn line_items_for_statement(&self, id: StatementId) -> Result<Vec<LineItem>, PortError> {
        let rows = self.repository.line_items_for_statement(*id.as_uuid()).await?;
        Ok(rows.into_iter().map(row_to_line_item).collect::<Result<_, _>>()?)
    }

    async fn line_items_for_declaration(&self, id: DeclarationId) -> Result<Vec<LineItem>, PortError> {
        let rows = self.repository.line_items_for_declaration(*id.as_uuid()).await?;
        Ok(rows.into_iter().map(row_to_line_item).collect::<Result<_, _>>()?)
    }

    #[instrument(skip(self, changes), fields(description = %changes.description, mode = ?mode))]
    async fn commit(&self, changes: ChangeSet, mode: CommitMode) -> Result<CommitReport, PortError> {
        let mut tx = self.repository.begin().await?;
        let mut report = Self::apply(&mut *tx, &changes).await?;

        match mode {
            CommitMode::Apply => {
                tx.commit()
                    .await
                    .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
            }
            CommitMode::DryRun => {
                tx.rollback()
                    .await
                    .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
                report.rolled_back = true;
                info!("Dry run rolled back");
            }
        }
        Ok(report)
    }
}

// =============================================================================
// Conversion Functions
// =============================================================================

fn declaration_to_row(declaration: &Declaration) -> DeclarationRow {
    DeclarationRow {
        id: *declaration.id.as_uuid(),
        participant_profile_id: *declaration.participant_profile_id.as_uuid(),
        participant_identity_id: *declaration.participant_identity_id.as_uuid(),
        provider_id: *declaration.provider_id.as_uuid(),
        course_identifier: declaration.course.as_str().to_string(),
        declaration_type: declaration.declaration_type.as_str().to_string(),
        declaration_date: declaration.declaration_date,
        evidence_held: declaration.evidence_held.map(|e| e.as_str().to_string()),
        cohort: declaration.cohort.0,
        state: declaration.state.as_str().to_string(),
        superseded_by_id: declaration.superseded_by_id.map(|id| *id.as_uuid()),
        created_at: declaration.created_at,
        updated_at: declaration.updated_at,
    }
}

fn row_to_declaration(
    row: DeclarationRow,
    history: Vec<DeclarationStateRecord>,
) -> Result<Declaration, DatabaseError> {
    let evidence_held = row
        .evidence_held
        .as_deref()
        .map(|e| e.parse().map_err(|_| DatabaseError::corrupt("evidence_held", e)))
        .transpose()?;

    Ok(Declaration {
        id: DeclarationId::from_uuid(row.id),
        participant_profile_id: ParticipantProfileId::from_uuid(row.participant_profile_id),
        participant_identity_id: ParticipantIdentityId::from_uuid(row.participant_identity_id),
        provider_id: ProviderId::from_uuid(row.provider_id),
        course: row
            .course_identifier
            .parse()
            .map_err(|_| DatabaseError::corrupt("course_identifier", &row.course_identifier))?,
        declaration_type: row
            .declaration_type
            .parse()
            .map_err(|_| DatabaseError::corrupt("declaration_type", &row.declaration_type))?,
        declaration_date: row.declaration_date,
        evidence_held,
        cohort: Cohort(row.cohort),
        state: row
            .state
            .parse()
            .map_err(|_| DatabaseError::corrupt("state", &row.state))?,
        superseded_by_id: row.superseded_by_id.map(DeclarationId::from_uuid),
        created_at: row.created_at,
        updated_at: row.updated_at,
        history,
    })
}

fn state_record_to_row(record: &DeclarationStateRecord) -> DeclarationStateRow {
    DeclarationStateRow {
        id: *record.id.as_uuid(),
        participant_declaration_id: *record.declaration_id.as_uuid(),
        state: record.state.as_str().to_string(),
        state_reason: record.reason.map(|r| r.as_str().to_string()),
        created_at: record.created_at,
    }
}

fn row_to_state_record(row: DeclarationStateRow) -> Result<DeclarationStateRecord, DatabaseError> {
    let reason = row
        .state_reason
        .as_deref()
        .map(|r| r.parse().map_err(|_| DatabaseError::corrupt("state_reason", r)))
        .transpose()?;

    Ok(DeclarationStateRecord {
        id: DeclarationStateId::from_uuid(row.id),
        declaration_id: DeclarationId::from_uuid(row.participant_declaration_id),
        state: row
            .state
            .parse()
            .map_err(|_| DatabaseError::corrupt("state", &row.state))?,
        reason,
        created_at: row.created_at,
    })
}

fn statement_to_row(statement: &Statement) -> StatementRow {
    StatementRow {
        id: *statement.id.as_uuid(),
        name: statement.name.clone(),
        provider_id: *statement.provider_id.as_uuid(),
        provider_name: statement.provider_name.clone(),
        cohort: statement.cohort.0,
        deadline: statement.deadline,
        output_fee: statement.output_fee,
        paid_at: statement.paid_at,
        created_at: statement.created_at,
    }
}

fn row_to_statement(row: StatementRow) -> Statement {
    Statement {
        id: StatementId::from_uuid(row.id),
        name: row.name,
        provider_id: ProviderId::from_uuid(row.provider_id),
        provider_name: row.provider_name,
        cohort: Cohort(row.cohort),
        deadline: row.deadline,
        output_fee: row.output_fee,
        paid_at: row.paid_at,
        created_at: row.created_at,
    }
}

fn line_item_to_row(item: &LineItem) -> LineItemRow {
    LineItemRow {
        id: *item.id.as_uuid(),
        participant_declaration_id: *item.declaration_id.as_uuid(),
        statement_id: *item.statement_id.as_uuid(),
        intent: item.intent.as_str().to_string(),
        active: item.active,
        created_at: item.created_at,
    }
}

fn row_to_line_item(row: LineItemRow) -> Result<LineItem, DatabaseError> {
    Ok(LineItem {
        id: LineItemId::from_uuid(row.id),
        declaration_id: DeclarationId::from_uuid(row.participant_declaration_id),
        statement_id: StatementId::from_uuid(row.statement_id),
        intent: row
            .intent
            .parse()
            .map_err(|_| DatabaseError::corrupt("intent", &row.intent))?,
        active: row.active,
        created_at: row.created_at,
    })
}
