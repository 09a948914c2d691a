//! Clawback workflow
//!
//! Recovers funding for a paid declaration by placing a refundable line item
//! on the provider's next output-fee statement.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::{Clock, DeclarationId, PortError};

use crate::changeset::{ChangeSet, CommitMode};
use crate::declaration::{Declaration, DeclarationState};
use crate::error::{DeclarationError, RuleViolation};
use crate::ledger::Ledger;
use crate::line_item::LineItem;
use crate::ports::{constraints, DeclarationStore};

pub struct ClawbackWorkflow {
    store: Arc<dyn DeclarationStore>,
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
}

impl ClawbackWorkflow {
    pub fn new(store: Arc<dyn DeclarationStore>, ledger: Arc<Ledger>, clock: Arc<dyn Clock>) -> Self {
        Self { store, ledger, clock }
    }

    /// Moves a paid declaration to awaiting clawback
    ///
    /// Only `paid` declarations qualify; anything else, including one already
    /// awaiting clawback, is rejected without writing.
    #[instrument(skip(self), fields(declaration_id = %id))]
    pub async fn clawback(&self, id: DeclarationId) -> Result<Declaration, DeclarationError> {
        let declaration = self
            .store
            .get_declaration(id)
            .await?
            .ok_or_else(|| DeclarationError::not_found("Declaration", id))?;

        if declaration.state != DeclarationState::Paid {
            warn!(state = %declaration.state, "clawback rejected");
            return Err(not_paid(&declaration));
        }

        let now = self.clock.now();
        let statement = self
            .ledger
            .open_output_fee_statement(declaration.provider_id, declaration.cohort, now)
            .await?
            .ok_or_else(|| {
                DeclarationError::integrity(format!(
                    "You cannot submit or void declarations for the {} cohort. \
                     The funding contract for this cohort has ended.",
                    declaration.cohort
                ))
            })?;

        let transition = declaration.transition(DeclarationState::AwaitingClawback, None, now)?;
        let changes = ChangeSet::new(format!("clawback {id}"))
            .transition(transition.clone())
            .add_line_item(LineItem::refundable(id, statement.id, now));

        match self.store.commit(changes, CommitMode::Apply).await {
            Ok(_) => {}
            // A concurrent clawback got there first
            Err(PortError::PreconditionFailed { .. }) => return Err(no_longer_paid()),
            Err(e) if e.violates(constraints::ACTIVE_LINE_ITEM_KEY) => return Err(no_longer_paid()),
            Err(e) => return Err(e.into()),
        }

        info!(statement_id = %statement.id, "declaration awaiting clawback");
        let mut updated = declaration;
        updated.apply(&transition);
        Ok(updated)
    }
}

fn not_paid(declaration: &Declaration) -> DeclarationError {
    DeclarationError::rule(
        RuleViolation::NotPaid,
        format!(
            "Only paid declarations can be clawed back; this declaration is {}",
            declaration.state
        ),
    )
}

fn no_longer_paid() -> DeclarationError {
    DeclarationError::rule(RuleViolation::NotPaid, "The declaration is no longer paid")
}
