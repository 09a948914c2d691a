//! Wiring for the declaration services
//!
//! The lifecycle service, ledger and clawback workflow share one store and
//! one clock; [`FundingServices`] builds them together.

use std::sync::Arc;

use core_kernel::Clock;

use crate::clawback::ClawbackWorkflow;
use crate::ledger::Ledger;
use crate::lifecycle::DeclarationService;
use crate::ports::{DeclarationStore, ParticipantDirectory};

#[derive(Clone)]
pub struct FundingServices {
    pub declarations: Arc<DeclarationService>,
    pub ledger: Arc<Ledger>,
    pub clawbacks: Arc<ClawbackWorkflow>,
}

impl FundingServices {
    pub fn new(
        store: Arc<dyn DeclarationStore>,
        directory: Arc<dyn ParticipantDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ledger = Arc::new(Ledger::new(store.clone(), clock.clone()));
        let declarations = Arc::new(DeclarationService::new(
            store.clone(),
            directory,
            ledger.clone(),
            clock.clone(),
        ));
        let clawbacks = Arc::new(ClawbackWorkflow::new(store, ledger.clone(), clock));
        Self { declarations, ledger, clawbacks }
    }
}
