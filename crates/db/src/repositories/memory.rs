use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use stairbooks_core::domain::contact::{Contact, ContactId};
use stairbooks_core::domain::invoice::{CisRecord, CisRecordId, Invoice, InvoiceId};
use stairbooks_core::domain::quote::{Quote, QuoteId};

use super::{CisLedger, ContactRepository, InvoiceRepository, QuoteRepository, RepositoryError};
use crate::cis::{ApplyCisCommand, UndoCisCommand};

#[derive(Default)]
pub struct InMemoryContactRepository {
    contacts: RwLock<HashMap<String, Contact>>,
}

#[async_trait::async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError> {
        let contacts = self.contacts.read().await;
        Ok(contacts.get(&id.0).cloned())
    }

    async fn list(&self) -> Result<Vec<(ContactId, Contact)>, RepositoryError> {
        let contacts = self.contacts.read().await;
        let mut entries: Vec<(ContactId, Contact)> = contacts
            .iter()
            .map(|(id, contact)| (ContactId(id.clone()), contact.clone()))
            .collect();
        entries.sort_by(|left, right| left.1.name.cmp(&right.1.name));
        Ok(entries)
    }

    async fn save(&self, id: &ContactId, contact: Contact) -> Result<(), RepositoryError> {
        let mut contacts = self.contacts.write().await;
        contacts.insert(id.0.clone(), contact);
        Ok(())
    }

    async fn delete(&self, id: &ContactId) -> Result<(), RepositoryError> {
        let mut contacts = self.contacts.write().await;
        contacts.remove(&id.0);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<HashMap<String, Quote>>,
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.get(&id.0).cloned())
    }

    async fn list(&self) -> Result<Vec<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        let mut entries: Vec<Quote> = quotes.values().cloned().collect();
        entries.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(entries)
    }

    async fn save(&self, quote: Quote) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        quotes.insert(quote.id.0.clone(), quote);
        Ok(())
    }

    async fn delete(&self, id: &QuoteId) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        quotes.remove(&id.0);
        Ok(())
    }
}

/// Invoices and their CIS ledger in one store, so apply/undo can mutate both
/// under a single lock the way the SQL implementation uses a transaction.
#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    invoices: RwLock<HashMap<String, Invoice>>,
    records: RwLock<HashMap<String, CisRecord>>,
}

fn require_id(invoice: &Invoice, operation: &str) -> Result<InvoiceId, RepositoryError> {
    invoice.id.clone().ok_or_else(|| {
        RepositoryError::InvalidCommand(format!("{operation} requires a saved invoice"))
    })
}

fn require_consistent(invoice: &Invoice) -> Result<(), RepositoryError> {
    if invoice.cis_state_consistent() {
        Ok(())
    } else {
        Err(RepositoryError::InvalidCommand(
            "invoice CIS bookkeeping fields are inconsistent".to_string(),
        ))
    }
}

#[async_trait::async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        let invoices = self.invoices.read().await;
        Ok(invoices.get(&id.0).cloned())
    }

    async fn list(&self) -> Result<Vec<Invoice>, RepositoryError> {
        let invoices = self.invoices.read().await;
        let mut entries: Vec<Invoice> = invoices.values().cloned().collect();
        entries.sort_by(|left, right| left.invoice_number.cmp(&right.invoice_number));
        Ok(entries)
    }

    async fn save(&self, mut invoice: Invoice) -> Result<Invoice, RepositoryError> {
        require_consistent(&invoice)?;
        let id =
            invoice.id.get_or_insert_with(|| InvoiceId(Uuid::new_v4().to_string())).clone();
        let mut invoices = self.invoices.write().await;
        invoices.insert(id.0, invoice.clone());
        Ok(invoice)
    }

    async fn delete(&self, id: &InvoiceId) -> Result<(), RepositoryError> {
        let mut invoices = self.invoices.write().await;
        let mut records = self.records.write().await;
        invoices.remove(&id.0);
        records.retain(|_, record| record.invoice_id != *id);
        Ok(())
    }

    async fn apply_cis(&self, command: ApplyCisCommand) -> Result<Invoice, RepositoryError> {
        let mut invoice = command.invoice;
        let invoice_id = require_id(&invoice, "apply-cis")?;
        let record_id = CisRecordId(Uuid::new_v4().to_string());
        invoice.cis_record_id = Some(record_id.clone());
        require_consistent(&invoice)?;

        let record = command.application.ledger_record(
            record_id,
            invoice_id.clone(),
            &invoice,
            command.recorded_on,
        );

        let mut invoices = self.invoices.write().await;
        let mut records = self.records.write().await;
        if !invoices.contains_key(&invoice_id.0) {
            return Err(RepositoryError::InvalidCommand(format!(
                "apply-cis targets unknown invoice `{}`",
                invoice_id.0
            )));
        }
        invoices.insert(invoice_id.0, invoice.clone());
        records.insert(record.id.0.clone(), record);
        Ok(invoice)
    }

    async fn undo_cis(&self, command: UndoCisCommand) -> Result<Invoice, RepositoryError> {
        let invoice = command.invoice;
        let invoice_id = require_id(&invoice, "undo-cis")?;
        require_consistent(&invoice)?;

        let mut invoices = self.invoices.write().await;
        let mut records = self.records.write().await;
        invoices.insert(invoice_id.0, invoice.clone());
        if let Some(record_id) = command.cis_record_id {
            records.remove(&record_id.0);
        }
        Ok(invoice)
    }
}

#[async_trait::async_trait]
impl CisLedger for InMemoryInvoiceRepository {
    async fn list(&self) -> Result<Vec<CisRecord>, RepositoryError> {
        let records = self.records.read().await;
        let mut entries: Vec<CisRecord> = records.values().cloned().collect();
        entries.sort_by(|left, right| {
            left.recorded_on.cmp(&right.recorded_on).then_with(|| left.id.0.cmp(&right.id.0))
        });
        Ok(entries)
    }

    async fn find_for_invoice(
        &self,
        invoice_id: &InvoiceId,
    ) -> Result<Option<CisRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.values().find(|record| record.invoice_id == *invoice_id).cloned())
    }
}
