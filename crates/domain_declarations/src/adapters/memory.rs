//! In-memory adapters
//!
//! [`InMemoryDeclarationStore`] applies each change set to a copy of its
//! tables, checks the same uniqueness constraints as the database, and swaps
//! the copy in only when everything passed. A single write lock spans the
//! whole commit, so concurrent commits are serialised the way row locks
//! serialise them in PostgreSQL.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use core_kernel::{
    AdapterHealth, DeclarationId, DomainPort, HealthCheckResult, HealthCheckable, LineItemId,
    ParticipantIdentityId, PortError, ProviderId, ScheduleId, StatementId,
};

use crate::changeset::{ChangeSet, CommitMode, CommitReport, MoveOutcome};
use crate::course::CourseIdentifier;
use crate::declaration::{Declaration, DeclarationState, DuplicateScope, SubmissionKey};
use crate::line_item::LineItem;
use crate::participant::ParticipantProfile;
use crate::ports::{constraints, DeclarationStore, ParticipantDirectory};
use crate::schedule::{Cohort, Schedule};
use crate::statement::{Statement, StatementQuery};

#[derive(Debug, Clone, Default)]
struct Tables {
    declarations: HashMap<DeclarationId, Declaration>,
    statements: HashMap<StatementId, Statement>,
    line_items: HashMap<LineItemId, LineItem>,
}

impl Tables {
    fn apply(&mut self, changes: &ChangeSet) -> Result<CommitReport, PortError> {
        let mut report = CommitReport::default();

        for check in &changes.deadline_checks {
            let statement = self
                .statements
                .get(&check.statement_id)
                .ok_or_else(|| PortError::not_found("Statement", check.statement_id))?;
            if statement.deadline <= check.after {
                return Err(PortError::precondition_failed(format!(
                    "statement {} for {} closed at {}",
                    statement.name, statement.provider_name, statement.deadline
                )));
            }
        }

        for declaration in &changes.new_declarations {
            self.check_declaration_keys(declaration)?;
            self.declarations.insert(declaration.id, declaration.clone());
            report.declarations_inserted += 1;
        }

        for transition in &changes.transitions {
            let declaration = self
                .declarations
                .get_mut(&transition.declaration_id)
                .ok_or_else(|| PortError::not_found("Declaration", transition.declaration_id))?;
            if declaration.state != transition.from {
                return Err(PortError::precondition_failed(format!(
                    "declaration {} is {}, expected {}",
                    declaration.id, declaration.state, transition.from
                )));
            }
            declaration.apply(transition);
            report.transitions_applied += 1;
        }

        for id in &changes.deactivated_line_items {
            let item = self
                .line_items
                .get_mut(id)
                .ok_or_else(|| PortError::not_found("LineItem", id))?;
            item.active = false;
            report.line_items_deactivated += 1;
        }

        for item in &changes.new_line_items {
            if !self.declarations.contains_key(&item.declaration_id) {
                return Err(PortError::not_found("Declaration", item.declaration_id));
            }
            if !self.statements.contains_key(&item.statement_id) {
                return Err(PortError::not_found("Statement", item.statement_id));
            }
            let clash = self.line_items.values().any(|existing| {
                existing.active
                    && existing.declaration_id == item.declaration_id
                    && existing.intent == item.intent
            });
            if clash {
                return Err(PortError::unique_violation(
                    constraints::ACTIVE_LINE_ITEM_KEY,
                    format!("declaration {} already has an active {} line item", item.declaration_id, item.intent),
                ));
            }
            self.line_items.insert(item.id, item.clone());
            report.line_items_added += 1;
        }

        for line_item_move in &changes.line_item_moves {
            if !self.statements.contains_key(&line_item_move.to) {
                return Err(PortError::not_found("Statement", line_item_move.to));
            }
            let declarations = &self.declarations;
            let mut moved = 0;
            for item in self.line_items.values_mut() {
                if item.statement_id != line_item_move.from {
                    continue;
                }
                let included = declarations
                    .get(&item.declaration_id)
                    .is_some_and(|d| line_item_move.includes(d.declaration_type));
                if included {
                    item.statement_id = line_item_move.to;
                    moved += 1;
                }
            }
            report.moves.push(MoveOutcome {
                from: line_item_move.from,
                to: line_item_move.to,
                moved,
            });
        }

        for (id, update) in &changes.statement_updates {
            let statement = self
                .statements
                .get_mut(id)
                .ok_or_else(|| PortError::not_found("Statement", id))?;
            statement.apply(update);
            report.statements_updated += 1;
        }

        Ok(report)
    }

    fn check_declaration_keys(&self, candidate: &Declaration) -> Result<(), PortError> {
        if candidate.state != DeclarationState::Voided {
            let key = candidate.submission_key();
            let taken = self
                .declarations
                .values()
                .any(|d| d.state != DeclarationState::Voided && d.submission_key() == key);
            if taken {
                return Err(PortError::unique_violation(
                    constraints::SUBMISSION_KEY,
                    "an identical declaration already exists",
                ));
            }
        }

        if candidate.is_surviving() {
            let scope = candidate.scope();
            let taken = self
                .declarations
                .values()
                .any(|d| d.is_surviving() && d.scope() == scope);
            if taken {
                return Err(PortError::unique_violation(
                    constraints::LIVE_SCOPE_KEY,
                    "a surviving declaration already exists for this participant",
                ));
            }
        }

        Ok(())
    }
}

/// In-memory [`DeclarationStore`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeclarationStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryDeclarationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates with statements
    pub async fn with_statements(statements: Vec<Statement>) -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.write().await;
            for statement in statements {
                tables.statements.insert(statement.id, statement);
            }
        }
        store
    }

    pub async fn declaration_count(&self) -> usize {
        self.tables.read().await.declarations.len()
    }

    pub async fn line_item_count(&self) -> usize {
        self.tables.read().await.line_items.len()
    }
}

impl DomainPort for InMemoryDeclarationStore {}

#[async_trait]
impl HealthCheckable for InMemoryDeclarationStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "memory-declaration-store".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: Some("In-memory adapter always healthy".to_string()),
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl DeclarationStore for InMemoryDeclarationStore {
    async fn get_declaration(&self, id: DeclarationId) -> Result<Option<Declaration>, PortError> {
        Ok(self.tables.read().await.declarations.get(&id).cloned())
    }

    async fn find_submission(&self, key: &SubmissionKey) -> Result<Option<Declaration>, PortError> {
        Ok(self
            .tables
            .read()
            .await
            .declarations
            .values()
            .find(|d| d.state != DeclarationState::Voided && d.submission_key() == *key)
            .cloned())
    }

    async fn find_in_scope(&self, scope: &DuplicateScope) -> Result<Vec<Declaration>, PortError> {
        let tables = self.tables.read().await;
        let mut found: Vec<Declaration> = tables
            .declarations
            .values()
            .filter(|d| d.scope() == *scope)
            .cloned()
            .collect();
        found.sort_by_key(|d| (d.created_at, d.id));
        Ok(found)
    }

    async fn get_statement(&self, id: StatementId) -> Result<Option<Statement>, PortError> {
        Ok(self.tables.read().await.statements.get(&id).cloned())
    }

    async fn find_statements(&self, query: &StatementQuery) -> Result<Vec<Statement>, PortError> {
        let tables = self.tables.read().await;
        let mut found: Vec<Statement> = tables
            .statements
            .values()
            .filter(|s| query.matches(s))
            .cloned()
            .collect();
        found.sort_by_key(|s| (s.deadline, s.id));
        Ok(found)
    }

    async fn insert_statement(&self, statement: &Statement) -> Result<(), PortError> {
        let mut tables = self.tables.write().await;
        if tables.statements.contains_key(&statement.id) {
            return Err(PortError::unique_violation("statements_pkey", statement.id.to_string()));
        }
        tables.statements.insert(statement.id, statement.clone());
        Ok(())
    }

    async fn line_items_for_statement(&self, id: StatementId) -> Result<Vec<LineItem>, PortError> {
        let tables = self.tables.read().await;
        let mut found: Vec<LineItem> = tables
            .line_items
            .values()
            .filter(|item| item.statement_id == id)
            .cloned()
            .collect();
        found.sort_by_key(|item| (item.created_at, item.id));
        Ok(found)
    }

    async fn line_items_for_declaration(&self, id: DeclarationId) -> Result<Vec<LineItem>, PortError> {
        let tables = self.tables.read().await;
        let mut found: Vec<LineItem> = tables
            .line_items
            .values()
            .filter(|item| item.declaration_id == id)
            .cloned()
            .collect();
        found.sort_by_key(|item| (item.created_at, item.id));
        Ok(found)
    }

    async fn commit(&self, changes: ChangeSet, mode: CommitMode) -> Result<CommitReport, PortError> {
        let mut tables = self.tables.write().await;
        let mut working = tables.clone();
        let mut report = working.apply(&changes)?;

        match mode {
            CommitMode::Apply => *tables = working,
            CommitMode::DryRun => report.rolled_back = true,
        }
        Ok(report)
    }
}

/// In-memory [`ParticipantDirectory`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryParticipantDirectory {
    profiles: Arc<RwLock<Vec<ParticipantProfile>>>,
    schedules: Arc<RwLock<HashMap<ScheduleId, Schedule>>>,
}

impl InMemoryParticipantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_profile(&self, profile: ParticipantProfile) {
        self.profiles.write().await.push(profile);
    }

    pub async fn add_schedule(&self, schedule: Schedule) {
        self.schedules.write().await.insert(schedule.id, schedule);
    }

    /// Replaces a stored profile with the same id
    pub async fn update_profile(&self, profile: ParticipantProfile) {
        let mut profiles = self.profiles.write().await;
        profiles.retain(|p| p.id != profile.id);
        profiles.push(profile);
    }
}

impl DomainPort for InMemoryParticipantDirectory {}

#[async_trait]
impl HealthCheckable for InMemoryParticipantDirectory {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "memory-participant-directory".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: None,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl ParticipantDirectory for InMemoryParticipantDirectory {
    async fn resolve_participant(
        &self,
        participant_id: ParticipantIdentityId,
        provider_id: ProviderId,
        course: CourseIdentifier,
    ) -> Result<Option<ParticipantProfile>, PortError> {
        Ok(self
            .profiles
            .read()
            .await
            .iter()
            .find(|p| p.identity_id == participant_id && p.is_active_for(provider_id, course))
            .cloned())
    }

    async fn schedule(&self, id: ScheduleId, cohort: Cohort) -> Result<Option<Schedule>, PortError> {
        Ok(self
            .schedules
            .read()
            .await
            .get(&id)
            .filter(|s| s.cohort == cohort)
            .cloned())
    }
}
