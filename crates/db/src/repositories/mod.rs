use async_trait::async_trait;
use thiserror::Error;

use stairbooks_core::domain::contact::{Contact, ContactId};
use stairbooks_core::domain::invoice::{CisRecord, Invoice, InvoiceId};
use stairbooks_core::domain::quote::{Quote, QuoteId};

use crate::cis::{ApplyCisCommand, UndoCisCommand};

pub mod contact;
pub mod invoice;
pub mod memory;
pub mod quote;

pub use contact::SqlContactRepository;
pub use invoice::{SqlCisLedger, SqlInvoiceRepository};
pub use memory::{
    InMemoryContactRepository, InMemoryInvoiceRepository, InMemoryQuoteRepository,
};
pub use quote::SqlQuoteRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(data: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(data).map_err(|error| RepositoryError::Decode(error.to_string()))
}

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|error| RepositoryError::Decode(error.to_string()))
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError>;
    async fn list(&self) -> Result<Vec<(ContactId, Contact)>, RepositoryError>;
    async fn save(&self, id: &ContactId, contact: Contact) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &ContactId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Quote>, RepositoryError>;
    async fn save(&self, quote: Quote) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &QuoteId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Invoice>, RepositoryError>;

    /// Stores the invoice, assigning an id when it has none, and returns the
    /// stored record. Refuses invoices whose CIS bookkeeping is inconsistent.
    async fn save(&self, invoice: Invoice) -> Result<Invoice, RepositoryError>;

    /// Removes the invoice. Any linked CIS ledger row is removed best-effort;
    /// a ledger failure is logged, not returned.
    async fn delete(&self, id: &InvoiceId) -> Result<(), RepositoryError>;

    /// Applies a CIS deduction atomically: the invoice update and the new
    /// ledger row commit together or not at all. Returns the stored invoice
    /// with its assigned `cis_record_id`.
    async fn apply_cis(&self, command: ApplyCisCommand) -> Result<Invoice, RepositoryError>;

    /// Reverts a CIS deduction. The invoice restore must succeed; deleting
    /// the linked ledger row is best-effort.
    async fn undo_cis(&self, command: UndoCisCommand) -> Result<Invoice, RepositoryError>;
}

#[async_trait]
pub trait CisLedger: Send + Sync {
    async fn list(&self) -> Result<Vec<CisRecord>, RepositoryError>;
    async fn find_for_invoice(
        &self,
        invoice_id: &InvoiceId,
    ) -> Result<Option<CisRecord>, RepositoryError>;
}
