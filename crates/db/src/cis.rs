//! CIS apply/undo as single commands at the persistence boundary. The core
//! planners decide what changes; a command carries the complete after-state
//! so the repository can commit it in one transaction.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use stairbooks_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use stairbooks_core::cis::{self, CisApplication, CisError};
use stairbooks_core::domain::invoice::{CisRecordId, Invoice};
use stairbooks_core::domain::quote::QuoteItem;

use crate::repositories::{InvoiceRepository, RepositoryError};

/// Complete after-state of a CIS application. The repository assigns the
/// ledger row id and links it before committing.
#[derive(Clone, Debug)]
pub struct ApplyCisCommand {
    pub invoice: Invoice,
    pub application: CisApplication,
    pub recorded_on: NaiveDate,
}

impl ApplyCisCommand {
    pub fn new(
        mut invoice: Invoice,
        quote_items: &[QuoteItem],
        rate: Decimal,
        recorded_on: NaiveDate,
    ) -> Result<Self, CisError> {
        let application = cis::plan_application(&invoice, quote_items, rate)?;
        cis::apply(&mut invoice, &application);
        Ok(Self { invoice, application, recorded_on })
    }
}

/// Complete after-state of a CIS undo, plus the ledger row to drop.
#[derive(Clone, Debug)]
pub struct UndoCisCommand {
    pub invoice: Invoice,
    pub cis_record_id: Option<CisRecordId>,
}

impl UndoCisCommand {
    pub fn new(mut invoice: Invoice) -> Result<Self, CisError> {
        let removal = cis::plan_removal(&invoice)?;
        let cis_record_id = removal.cis_record_id.clone();
        cis::undo(&mut invoice, &removal);
        Ok(Self { invoice, cis_record_id })
    }
}

#[derive(Debug, Error)]
pub enum CisWorkflowError {
    #[error(transparent)]
    Cis(#[from] CisError),
    #[error("persistence failure: {0}")]
    Repository(#[from] RepositoryError),
}

/// Orchestrates the deduction lifecycle against a repository: implicit save
/// for unsaved invoices, plan, single-command execution, audit trail.
pub struct CisWorkflow<'a> {
    invoices: &'a dyn InvoiceRepository,
    audit: &'a dyn AuditSink,
    actor: String,
}

impl<'a> CisWorkflow<'a> {
    pub fn new(
        invoices: &'a dyn InvoiceRepository,
        audit: &'a dyn AuditSink,
        actor: impl Into<String>,
    ) -> Self {
        Self { invoices, audit, actor: actor.into() }
    }

    pub async fn apply(
        &self,
        invoice: Invoice,
        quote_items: &[QuoteItem],
        rate: Decimal,
        recorded_on: NaiveDate,
    ) -> Result<Invoice, CisWorkflowError> {
        // An unsaved invoice is saved first; if that fails the whole
        // operation aborts before any CIS state exists.
        let invoice = if invoice.id.is_none() {
            self.invoices.save(invoice).await?
        } else {
            invoice
        };
        let correlation_id = invoice.invoice_number.clone();

        let command = match ApplyCisCommand::new(invoice.clone(), quote_items, rate, recorded_on) {
            Ok(command) => command,
            Err(error) => {
                self.audit.emit(
                    self.event(&invoice, &correlation_id, "cis.apply", AuditOutcome::Rejected)
                        .with_metadata("reason", error.to_string()),
                );
                return Err(error.into());
            }
        };
        let deduction = command.application.deduction;

        match self.invoices.apply_cis(command).await {
            Ok(stored) => {
                self.audit.emit(
                    self.event(&stored, &correlation_id, "cis.apply", AuditOutcome::Success)
                        .with_metadata("deduction", format!("{deduction:.2}")),
                );
                Ok(stored)
            }
            Err(error) => {
                self.audit.emit(
                    self.event(&invoice, &correlation_id, "cis.apply", AuditOutcome::Failed)
                        .with_metadata("reason", error.to_string()),
                );
                Err(error.into())
            }
        }
    }

    pub async fn undo(&self, invoice: Invoice) -> Result<Invoice, CisWorkflowError> {
        let correlation_id = invoice.invoice_number.clone();

        let command = match UndoCisCommand::new(invoice.clone()) {
            Ok(command) => command,
            Err(error) => {
                self.audit.emit(
                    self.event(&invoice, &correlation_id, "cis.undo", AuditOutcome::Rejected)
                        .with_metadata("reason", error.to_string()),
                );
                return Err(error.into());
            }
        };

        match self.invoices.undo_cis(command).await {
            Ok(stored) => {
                self.audit
                    .emit(self.event(&stored, &correlation_id, "cis.undo", AuditOutcome::Success));
                Ok(stored)
            }
            Err(error) => {
                self.audit.emit(
                    self.event(&invoice, &correlation_id, "cis.undo", AuditOutcome::Failed)
                        .with_metadata("reason", error.to_string()),
                );
                Err(error.into())
            }
        }
    }

    fn event(
        &self,
        invoice: &Invoice,
        correlation_id: &str,
        event_type: &str,
        outcome: AuditOutcome,
    ) -> AuditEvent {
        AuditEvent::new(
            invoice.quote_id.clone(),
            invoice.id.clone(),
            correlation_id,
            event_type,
            AuditCategory::Cis,
            self.actor.clone(),
            outcome,
        )
    }
}
