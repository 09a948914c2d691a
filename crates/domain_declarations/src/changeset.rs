//! Units of work
//!
//! Every mutation of declarations, line items and statements is described as
//! a [`ChangeSet`] and handed to the store in one call. The store applies it
//! atomically: either every change lands or none does.

use chrono::{DateTime, Utc};
use core_kernel::{LineItemId, StatementId};

use crate::course::DeclarationType;
use crate::declaration::{Declaration, StateTransition};
use crate::line_item::LineItem;
use crate::statement::StatementUpdate;

/// Whether the store keeps or discards an applied change set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    Apply,
    /// Apply every change and check every constraint, then roll back
    DryRun,
}

/// Moves line items from one statement to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemMove {
    pub from: StatementId,
    pub to: StatementId,
    /// Only items for these declaration types; `None` moves all
    pub declaration_types: Option<Vec<DeclarationType>>,
}

impl LineItemMove {
    pub fn includes(&self, declaration_type: DeclarationType) -> bool {
        self.declaration_types
            .as_ref()
            .map_or(true, |types| types.contains(&declaration_type))
    }
}

/// Requires a statement's stored deadline to fall after `after`
///
/// Checked under the commit's lock before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineCheck {
    pub statement_id: StatementId,
    pub after: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub description: String,
    pub new_declarations: Vec<Declaration>,
    pub transitions: Vec<StateTransition>,
    pub deactivated_line_items: Vec<LineItemId>,
    pub new_line_items: Vec<LineItem>,
    pub line_item_moves: Vec<LineItemMove>,
    pub statement_updates: Vec<(StatementId, StatementUpdate)>,
    pub deadline_checks: Vec<DeadlineCheck>,
}

impl ChangeSet {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn insert_declaration(mut self, declaration: Declaration) -> Self {
        self.new_declarations.push(declaration);
        self
    }

    pub fn transition(mut self, transition: StateTransition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn deactivate_line_item(mut self, id: LineItemId) -> Self {
        self.deactivated_line_items.push(id);
        self
    }

    pub fn add_line_item(mut self, item: LineItem) -> Self {
        self.new_line_items.push(item);
        self
    }

    pub fn move_line_items(mut self, line_item_move: LineItemMove) -> Self {
        self.line_item_moves.push(line_item_move);
        self
    }

    pub fn update_statement(mut self, id: StatementId, update: StatementUpdate) -> Self {
        if !update.is_empty() {
            self.statement_updates.push((id, update));
        }
        self
    }

    pub fn require_deadline_after(mut self, statement_id: StatementId, after: DateTime<Utc>) -> Self {
        self.deadline_checks.push(DeadlineCheck { statement_id, after });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.new_declarations.is_empty()
            && self.transitions.is_empty()
            && self.deactivated_line_items.is_empty()
            && self.new_line_items.is_empty()
            && self.line_item_moves.is_empty()
            && self.statement_updates.is_empty()
    }
}

/// Outcome of one [`LineItemMove`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub from: StatementId,
    pub to: StatementId,
    pub moved: usize,
}

/// What a commit did; identical for applied and dry-run commits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub declarations_inserted: usize,
    pub transitions_applied: usize,
    pub line_items_added: usize,
    pub line_items_deactivated: usize,
    /// One entry per move, in request order
    pub moves: Vec<MoveOutcome>,
    pub statements_updated: usize,
    pub rolled_back: bool,
}

impl CommitReport {
    pub fn moved_from(&self, statement: StatementId) -> usize {
        self.moves
            .iter()
            .filter(|m| m.from == statement)
            .map(|m| m.moved)
            .sum()
    }
}
