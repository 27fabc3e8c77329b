pub mod audit;
pub mod cis;
pub mod config;
pub mod domain;
pub mod errors;
pub mod export;
pub mod pricing;
pub mod schedule;
pub mod validation;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use cis::{CisApplication, CisError, CisRemoval, DEFAULT_CIS_RATE};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, TaxConfig};
pub use domain::catalog::{Catalog, CatalogEntry, CatalogEntryId, ItemCategory, LineItemKind};
pub use domain::contact::{Contact, ContactId};
pub use domain::invoice::{
    CisRecord, CisRecordId, Invoice, InvoiceId, InvoiceLine, InvoiceStatus,
};
pub use domain::quote::{
    DistributionMethod, HiddenCost, PaymentTerms, Quote, QuoteId, QuoteItem, QuoteItemId,
    VatSettings,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use export::{write_cis_csv, ExportError, CIS_EXPORT_HEADER};
pub use pricing::invoice::{invoice_totals, InvoiceTotals};
pub use pricing::{
    price_quote, quote_total, DeterministicPricingEngine, ItemPricing, PricingEngine,
    QuoteBreakdown, QuoteTotals,
};
pub use schedule::{payment_schedule, schedule_for_quote, stage_status, PaymentStage, StageStatus};
pub use validation::{validate_invoice, validate_quote, FieldError, ValidationFailure};
