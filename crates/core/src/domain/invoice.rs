use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::LineItemKind;
use crate::domain::contact::Contact;
use crate::domain::quote::QuoteId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvoiceId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CisRecordId(pub String);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Pending,
    Paid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    pub amount: Decimal,
    #[serde(default = "default_quantity")]
    pub quantity: Decimal,
    /// `None` only on legacy records; new lines are tagged at creation.
    #[serde(default)]
    pub kind: Option<LineItemKind>,
}

fn default_quantity() -> Decimal {
    Decimal::ONE
}

impl InvoiceLine {
    pub fn total(&self) -> Decimal {
        self.amount * self.quantity
    }

    pub fn is_cis_deduction(&self) -> bool {
        self.kind == Some(LineItemKind::CisDeduction)
    }
}

/// An invoice, entered manually or derived from a quote payment stage. The
/// CIS fields move together: `apply`/`undo` in `cis` are the only writers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// `None` until first persisted; the repository assigns one on save.
    #[serde(default)]
    pub id: Option<InvoiceId>,
    pub invoice_number: String,
    pub client: Contact,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quote_id: Option<QuoteId>,
    /// Machine key of the payment stage this invoice bills, set at creation.
    /// Legacy invoices without it fall back to description matching.
    #[serde(default)]
    pub payment_stage: Option<String>,
    pub line_items: Vec<InvoiceLine>,
    /// Net total after CIS when applied, gross otherwise. This is the figure
    /// persisted and displayed.
    pub amount: Decimal,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub issued_on: NaiveDate,
    #[serde(default)]
    pub cis_applied: bool,
    #[serde(default)]
    pub cis_deduction: Decimal,
    #[serde(default)]
    pub labour_total: Decimal,
    #[serde(default)]
    pub original_gross_amount: Option<Decimal>,
    #[serde(default)]
    pub original_line_items_before_cis: Option<Vec<InvoiceLine>>,
    #[serde(default)]
    pub cis_record_id: Option<CisRecordId>,
}

impl Invoice {
    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_paid() && self.due_date.map(|due| due < today).unwrap_or(false)
    }

    /// Checks the CIS bookkeeping fields against each other. Repositories
    /// refuse to store an invoice that fails this.
    pub fn cis_state_consistent(&self) -> bool {
        if self.cis_applied {
            let tolerance = Decimal::new(1, 2);
            let gross = match self.original_gross_amount {
                Some(gross) => gross,
                None => return false,
            };
            self.original_line_items_before_cis.is_some()
                && (gross - self.cis_deduction - self.amount).abs() < tolerance
        } else {
            self.cis_deduction.is_zero() && self.original_line_items_before_cis.is_none()
        }
    }
}

/// Ledger row created when a deduction is applied, consumed by the CSV
/// export for the contractor's HMRC return.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CisRecord {
    pub id: CisRecordId,
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub client_name: String,
    pub client_company: String,
    pub labour_amount: Decimal,
    /// Fraction, e.g. 0.20.
    pub rate: Decimal,
    pub deduction: Decimal,
    pub recorded_on: NaiveDate,
}
