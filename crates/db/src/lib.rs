pub mod cis;
pub mod connection;
pub mod migrations;
pub mod repositories;

pub use cis::{ApplyCisCommand, CisWorkflow, CisWorkflowError, UndoCisCommand};
pub use connection::{connect, connect_with_settings, DbPool};
pub use repositories::{
    CisLedger, ContactRepository, InMemoryContactRepository, InMemoryInvoiceRepository,
    InMemoryQuoteRepository, InvoiceRepository, QuoteRepository, RepositoryError,
    SqlCisLedger, SqlContactRepository, SqlInvoiceRepository, SqlQuoteRepository,
};
