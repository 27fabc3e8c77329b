use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::invoice::Invoice;
use crate::domain::quote::VatSettings;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub base_for_vat: Decimal,
    pub vat_amount: Decimal,
    pub cis_deduction: Decimal,
    pub grand_total: Decimal,
}

/// Invoice total with VAT and CIS combined. VAT is charged on the pre-CIS
/// gross and the deduction is subtracted afterwards; this ordering is the
/// business policy inherited from the books and must not be reordered.
pub fn invoice_totals(invoice: &Invoice, vat: &VatSettings) -> InvoiceTotals {
    let base_for_vat = if invoice.cis_applied {
        invoice.original_gross_amount.unwrap_or(invoice.amount)
    } else {
        invoice.amount
    };

    let vat_amount = if vat.enabled {
        base_for_vat * vat.rate / Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    let cis_deduction = if invoice.cis_applied { invoice.cis_deduction } else { Decimal::ZERO };

    InvoiceTotals {
        base_for_vat,
        vat_amount,
        cis_deduction,
        grand_total: base_for_vat + vat_amount - cis_deduction,
    }
}
