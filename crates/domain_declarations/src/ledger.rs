//! Statement ledger
//!
//! The ledger is the only writer of line items and statements. It attaches
//! fundable declarations to the provider's open output-fee statement, moves
//! line items between periods for back-office corrections, and walks a
//! statement's declarations through payment.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::{Clock, DeclarationId, PortError, ProviderId, StatementId};

use crate::changeset::{ChangeSet, CommitMode, CommitReport, LineItemMove};
use crate::course::DeclarationType;
use crate::declaration::{Declaration, DeclarationState};
use crate::error::{DeclarationError, RuleViolation};
use crate::line_item::{LineItem, LineItemIntent};
use crate::ports::DeclarationStore;
use crate::schedule::Cohort;
use crate::statement::{open_output_fee_statement, Statement, StatementQuery, StatementUpdate};

/// Back-office request to move line items between two named statements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    pub cohort: Cohort,
    pub from_statement_name: String,
    pub to_statement_name: String,
    pub dry_run: bool,
    /// Restrict to these providers; `None` means every provider
    pub providers: Option<Vec<ProviderId>>,
    pub declaration_types: Option<Vec<DeclarationType>>,
    /// Applied to every target statement
    pub to_statement_updates: StatementUpdate,
    /// Output-fee flag to leave on every source statement
    pub from_statement_output_fee: Option<bool>,
}

impl MigrationRequest {
    pub fn new(cohort: Cohort, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            cohort,
            from_statement_name: from.into(),
            to_statement_name: to.into(),
            dry_run: true,
            providers: None,
            declaration_types: None,
            to_statement_updates: StatementUpdate::default(),
            from_statement_output_fee: None,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn for_providers(mut self, providers: Vec<ProviderId>) -> Self {
        self.providers = Some(providers);
        self
    }

    pub fn for_declaration_types(mut self, types: Vec<DeclarationType>) -> Self {
        self.declaration_types = Some(types);
        self
    }

    pub fn with_to_statement_updates(mut self, updates: StatementUpdate) -> Self {
        self.to_statement_updates = updates;
        self
    }

    pub fn with_from_statement_output_fee(mut self, output_fee: bool) -> Self {
        self.from_statement_output_fee = Some(output_fee);
        self
    }

    fn includes(&self, provider: ProviderId) -> bool {
        self.providers
            .as_ref()
            .map_or(true, |providers| providers.contains(&provider))
    }
}

/// Result of a migration: the action log and what the store did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub log: Vec<String>,
    pub report: CommitReport,
}

/// Result of paying a statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentSummary {
    pub paid: usize,
    pub clawed_back: usize,
}

pub const DRY_RUN_BANNER: &str = "~~~ DRY RUN ~~~";

pub struct Ledger {
    store: Arc<dyn DeclarationStore>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(store: Arc<dyn DeclarationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The statement new output-fee business for `provider` lands on
    pub async fn open_output_fee_statement(
        &self,
        provider_id: ProviderId,
        cohort: Cohort,
        now: DateTime<Utc>,
    ) -> Result<Option<Statement>, DeclarationError> {
        let statements = self
            .store
            .find_statements(&StatementQuery::for_provider(provider_id, cohort))
            .await?;
        Ok(open_output_fee_statement(&statements, now).cloned())
    }

    /// Builds the billable line item for `declaration` without storing it
    pub async fn billable_line_item(
        &self,
        declaration: &Declaration,
        now: DateTime<Utc>,
    ) -> Result<LineItem, DeclarationError> {
        let statement = self
            .open_output_fee_statement(declaration.provider_id, declaration.cohort, now)
            .await?
            .ok_or_else(|| {
                warn!(declaration_id = %declaration.id, cohort = %declaration.cohort, "no open statement");
                DeclarationError::integrity(format!(
                    "There is no open statement for this provider in the {} cohort",
                    declaration.cohort
                ))
            })?;
        Ok(LineItem::billable(declaration.id, statement.id, now))
    }

    /// Attaches a fundable declaration to its provider's open statement
    ///
    /// Returns the existing item when the declaration is already attached.
    #[instrument(skip(self), fields(declaration_id = %id))]
    pub async fn attach(&self, id: DeclarationId) -> Result<LineItem, DeclarationError> {
        let declaration = self
            .store
            .get_declaration(id)
            .await?
            .ok_or_else(|| DeclarationError::not_found("Declaration", id))?;

        if !declaration.state.is_billable() {
            return Err(DeclarationError::rule(
                RuleViolation::InvalidTransition,
                format!("A {} declaration cannot be attached to a statement", declaration.state),
            ));
        }

        let existing = self.store.line_items_for_declaration(id).await?;
        if let Some(item) = existing
            .into_iter()
            .find(|item| item.active && item.intent == LineItemIntent::Billable)
        {
            return Ok(item);
        }

        let item = self.billable_line_item(&declaration, self.clock.now()).await?;
        self.store
            .commit(
                ChangeSet::new(format!("attach {id}")).add_line_item(item.clone()),
                CommitMode::Apply,
            )
            .await?;
        info!(statement_id = %item.statement_id, "declaration attached");
        Ok(item)
    }

    /// Moves line items between two named statements for every provider
    ///
    /// Only output-fee statements take part. Every check happens before
    /// anything is written, target deadlines are checked again inside the
    /// commit, and the whole move is one commit. A dry run goes through the same commit and is rolled back
    /// by the store, so its log matches a real run line for line.
    #[instrument(skip(self, request), fields(
        cohort = %request.cohort,
        from = %request.from_statement_name,
        to = %request.to_statement_name,
        dry_run = request.dry_run,
    ))]
    pub async fn migrate(&self, request: MigrationRequest) -> Result<MigrationOutcome, DeclarationError> {
        let now = self.clock.now();
        let from_statements = self
            .named_statements(&request, &request.from_statement_name)
            .await?;
        let to_statements = self
            .named_statements(&request, &request.to_statement_name)
            .await?;

        let from_providers: BTreeSet<ProviderId> = from_statements.keys().copied().collect();
        let to_providers: BTreeSet<ProviderId> = to_statements.keys().copied().collect();
        if from_providers != to_providers {
            let unmatched: Vec<String> = from_providers
                .symmetric_difference(&to_providers)
                .map(|provider| {
                    from_statements
                        .get(provider)
                        .or_else(|| to_statements.get(provider))
                        .map_or_else(|| provider.to_string(), |s| s.provider_name.clone())
                })
                .collect();
            warn!(?unmatched, "statement providers do not correspond");
            return Err(DeclarationError::integrity(format!(
                "Statements {} and {} do not cover the same providers; unmatched: {}",
                request.from_statement_name,
                request.to_statement_name,
                unmatched.join(", ")
            )));
        }
        if from_statements.is_empty() {
            return Err(DeclarationError::integrity(format!(
                "No statements named {} and {} exist for the {} cohort",
                request.from_statement_name, request.to_statement_name, request.cohort
            )));
        }

        if let Some(stale) = to_statements.values().find(|s| s.deadline <= now) {
            return Err(DeclarationError::integrity(format!(
                "Statement {} for {} is not future dated",
                stale.name, stale.provider_name
            )));
        }

        let mut pairs: Vec<(&Statement, &Statement)> = from_statements
            .iter()
            .filter_map(|(provider, from)| to_statements.get(provider).map(|to| (from, to)))
            .collect();
        pairs.sort_by(|a, b| a.0.provider_name.cmp(&b.0.provider_name));

        let mut changes = ChangeSet::new(format!(
            "migrate {} to {} for cohort {}",
            request.from_statement_name, request.to_statement_name, request.cohort
        ));
        for (from, to) in &pairs {
            changes = changes
                .require_deadline_after(to.id, now)
                .move_line_items(LineItemMove {
                    from: from.id,
                    to: to.id,
                    declaration_types: request.declaration_types.clone(),
                })
                .update_statement(to.id, request.to_statement_updates.clone());
            if let Some(output_fee) = request.from_statement_output_fee {
                if from.output_fee != output_fee {
                    changes = changes.update_statement(from.id, StatementUpdate::output_fee(output_fee));
                }
            }
        }

        let mode = if request.dry_run { CommitMode::DryRun } else { CommitMode::Apply };
        let report = match self.store.commit(changes, mode).await {
            Ok(report) => report,
            Err(PortError::PreconditionFailed { message }) => {
                warn!(%message, "target statement closed during migration");
                return Err(DeclarationError::integrity(format!(
                    "Target statement is no longer future dated: {message}"
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let mut log = Vec::new();
        if request.dry_run {
            log.push(DRY_RUN_BANNER.to_string());
        }
        log.push(format!(
            "Migrating declarations from {} to {} for {} providers",
            request.from_statement_name,
            request.to_statement_name,
            pairs.len()
        ));
        for (from, to) in &pairs {
            log.push(format!(
                "Migrating {} declarations for {}",
                report.moved_from(from.id),
                from.provider_name
            ));
            if let Some(deadline) = request.to_statement_updates.deadline {
                log.push(format!(
                    "Setting deadline of {} for {} to {}",
                    to.name,
                    to.provider_name,
                    deadline.to_rfc3339()
                ));
            }
            if let Some(output_fee) = request.to_statement_updates.output_fee {
                log.push(format!(
                    "Setting output fee of {} for {} to {}",
                    to.name, to.provider_name, output_fee
                ));
            }
            if let Some(output_fee) = request.from_statement_output_fee {
                if from.output_fee != output_fee {
                    log.push(format!(
                        "Setting output fee of {} for {} to {}",
                        from.name, from.provider_name, output_fee
                    ));
                }
            }
        }

        if request.dry_run {
            info!(providers = pairs.len(), "migration previewed and rolled back");
        } else {
            info!(providers = pairs.len(), "migration applied");
        }
        Ok(MigrationOutcome { log, report })
    }

    /// Moves eligible declarations billed on `statement_id` to payable
    #[instrument(skip(self), fields(statement_id = %statement_id))]
    pub async fn mark_payable(&self, statement_id: StatementId) -> Result<usize, DeclarationError> {
        let statement = self.statement(statement_id).await?;
        let now = self.clock.now();

        let mut changes = ChangeSet::new(format!("mark {} payable", statement.name));
        for declaration in self
            .declarations_on(statement_id, LineItemIntent::Billable, DeclarationState::Eligible)
            .await?
        {
            changes = changes.transition(declaration.transition(DeclarationState::Payable, None, now)?);
        }

        let report = self.store.commit(changes, CommitMode::Apply).await?;
        info!(count = report.transitions_applied, "declarations marked payable");
        Ok(report.transitions_applied)
    }

    /// Settles a statement: payable declarations become paid and
    /// declarations awaiting clawback become clawed back
    #[instrument(skip(self), fields(statement_id = %statement_id))]
    pub async fn mark_paid(&self, statement_id: StatementId) -> Result<PaymentSummary, DeclarationError> {
        let statement = self.statement(statement_id).await?;
        if statement.is_paid() {
            return Err(DeclarationError::integrity(format!(
                "Statement {} for {} has already been paid",
                statement.name, statement.provider_name
            )));
        }
        let now = self.clock.now();

        let payable = self
            .declarations_on(statement_id, LineItemIntent::Billable, DeclarationState::Payable)
            .await?;
        let refundable = self
            .declarations_on(statement_id, LineItemIntent::Refundable, DeclarationState::AwaitingClawback)
            .await?;

        let mut changes = ChangeSet::new(format!("pay {}", statement.name))
            .update_statement(statement_id, StatementUpdate::paid_at(now));
        for declaration in &payable {
            changes = changes.transition(declaration.transition(DeclarationState::Paid, None, now)?);
        }
        for declaration in &refundable {
            changes = changes.transition(declaration.transition(DeclarationState::ClawedBack, None, now)?);
        }

        self.store.commit(changes, CommitMode::Apply).await?;
        let summary = PaymentSummary {
            paid: payable.len(),
            clawed_back: refundable.len(),
        };
        info!(paid = summary.paid, clawed_back = summary.clawed_back, "statement paid");
        Ok(summary)
    }

    async fn statement(&self, id: StatementId) -> Result<Statement, DeclarationError> {
        self.store
            .get_statement(id)
            .await?
            .ok_or_else(|| DeclarationError::not_found("Statement", id))
    }

    /// Output-fee statements called `name`, keyed by provider
    async fn named_statements(
        &self,
        request: &MigrationRequest,
        name: &str,
    ) -> Result<BTreeMap<ProviderId, Statement>, DeclarationError> {
        let statements = self
            .store
            .find_statements(&StatementQuery::named(request.cohort, name))
            .await?;
        Ok(statements
            .into_iter()
            .filter(|s| s.output_fee && request.includes(s.provider_id))
            .map(|s| (s.provider_id, s))
            .collect())
    }

    async fn declarations_on(
        &self,
        statement_id: StatementId,
        intent: LineItemIntent,
        state: DeclarationState,
    ) -> Result<Vec<Declaration>, DeclarationError> {
        let mut found = Vec::new();
        for item in self.store.line_items_for_statement(statement_id).await? {
            if !item.active || item.intent != intent {
                continue;
            }
            if let Some(declaration) = self.store.get_declaration(item.declaration_id).await? {
                if declaration.state == state {
                    found.push(declaration);
                }
            }
        }
        Ok(found)
    }
}
