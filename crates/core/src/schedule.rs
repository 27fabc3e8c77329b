use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::invoice::Invoice;
use crate::domain::quote::{PaymentTerms, Quote};
use crate::pricing::quote_total;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStage {
    /// Machine key, referenced by `Invoice::payment_stage`.
    pub stage: String,
    pub description: String,
    pub amount: Decimal,
    pub due_when: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    NotInvoiced,
    InvoicedPending,
    Paid,
    Overdue,
}

fn stage(key: &str, description: &str, amount: Decimal, due_when: &str) -> PaymentStage {
    PaymentStage {
        stage: key.to_string(),
        description: description.to_string(),
        amount,
        due_when: due_when.to_string(),
    }
}

/// Expands a payment-terms template into staged amounts. Unrecognized terms
/// schedule nothing.
pub fn payment_schedule(terms: &PaymentTerms, total: Decimal) -> Vec<PaymentStage> {
    let half = Decimal::new(5, 1);
    let quarter = Decimal::new(25, 2);

    match terms {
        PaymentTerms::DepositThenFinal => vec![
            stage("deposit", "Deposit", total * half, "on order confirmation"),
            stage("final", "Final payment", total * half, "on completion"),
        ],
        PaymentTerms::DepositInterimFinal => vec![
            stage("deposit", "Deposit", total * half, "on order confirmation"),
            stage("interim", "Interim payment", total * quarter, "on joinery completion"),
            stage("final", "Final payment", total * quarter, "on completion"),
        ],
        PaymentTerms::FullBeforeDelivery => {
            vec![stage("full", "Full payment", total, "before delivery")]
        }
        PaymentTerms::CustomTerms => {
            vec![stage("custom", "Payment per custom terms", total, "as per custom terms")]
        }
        PaymentTerms::Unrecognized => Vec::new(),
    }
}

pub fn schedule_for_quote(quote: &Quote) -> Vec<PaymentStage> {
    payment_schedule(&quote.payment_terms, quote_total(quote))
}

/// Correlates a stage with the invoices raised against it. The explicit
/// stage key wins; invoices that predate the key are matched by looking for
/// the stage name inside their free-text description, case-insensitively.
fn invoice_matches_stage(stage: &PaymentStage, invoice: &Invoice) -> bool {
    if let Some(key) = &invoice.payment_stage {
        return key == &stage.stage;
    }
    invoice.description.to_lowercase().contains(&stage.stage.to_lowercase())
}

pub fn stage_status(stage: &PaymentStage, invoices: &[Invoice], today: NaiveDate) -> StageStatus {
    let matched: Vec<&Invoice> =
        invoices.iter().filter(|invoice| invoice_matches_stage(stage, invoice)).collect();

    if matched.is_empty() {
        StageStatus::NotInvoiced
    } else if matched.iter().any(|invoice| invoice.is_paid()) {
        StageStatus::Paid
    } else if matched.iter().any(|invoice| invoice.is_overdue(today)) {
        StageStatus::Overdue
    } else {
        StageStatus::InvoicedPending
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::domain::contact::Contact;
    use crate::domain::invoice::{Invoice, InvoiceLine, InvoiceStatus};
    use crate::domain::quote::PaymentTerms;

    use super::{payment_schedule, stage_status, PaymentStage, StageStatus};

    fn invoice(
        description: &str,
        payment_stage: Option<&str>,
        status: InvoiceStatus,
        due_date: Option<NaiveDate>,
    ) -> Invoice {
        Invoice {
            id: None,
            invoice_number: "INV-1".to_string(),
            client: Contact { name: "B Hartley".to_string(), ..Contact::default() },
            description: description.to_string(),
            quote_id: None,
            payment_stage: payment_stage.map(str::to_string),
            line_items: vec![InvoiceLine {
                description: description.to_string(),
                amount: Decimal::from(500),
                quantity: Decimal::ONE,
                kind: None,
            }],
            amount: Decimal::from(500),
            status,
            due_date,
            issued_on: NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date"),
            cis_applied: false,
            cis_deduction: Decimal::ZERO,
            labour_total: Decimal::ZERO,
            original_gross_amount: None,
            original_line_items_before_cis: None,
            cis_record_id: None,
        }
    }

    fn deposit_stage() -> PaymentStage {
        payment_schedule(&PaymentTerms::DepositThenFinal, Decimal::from(1000))
            .into_iter()
            .next()
            .expect("deposit stage")
    }

    #[test]
    fn three_stage_terms_split_half_quarter_quarter() {
        let stages = payment_schedule(&PaymentTerms::DepositInterimFinal, Decimal::from(1000));

        let amounts: Vec<Decimal> = stages.iter().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![Decimal::from(500), Decimal::from(250), Decimal::from(250)]);
    }

    #[test]
    fn staged_amounts_sum_to_the_total() {
        let total = Decimal::new(123_456, 2);
        for terms in [
            PaymentTerms::DepositThenFinal,
            PaymentTerms::DepositInterimFinal,
            PaymentTerms::FullBeforeDelivery,
        ] {
            let sum: Decimal = payment_schedule(&terms, total).iter().map(|s| s.amount).sum();
            assert!((sum - total).abs() < Decimal::new(1, 2), "stages must add up for {terms:?}");
        }
    }

    #[test]
    fn custom_terms_schedule_a_single_stage() {
        let stages = payment_schedule(&PaymentTerms::CustomTerms, Decimal::from(750));

        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].amount, Decimal::from(750));
        assert_eq!(stages[0].due_when, "as per custom terms");
    }

    #[test]
    fn unrecognized_terms_schedule_nothing() {
        assert!(payment_schedule(&PaymentTerms::Unrecognized, Decimal::from(1000)).is_empty());
    }

    #[test]
    fn stage_without_invoices_is_not_invoiced() {
        let today = NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date");
        assert_eq!(stage_status(&deposit_stage(), &[], today), StageStatus::NotInvoiced);
    }

    #[test]
    fn paid_invoice_wins_over_overdue() {
        let today = NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date");
        let past_due = NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date");
        let invoices = vec![
            invoice("Deposit", Some("deposit"), InvoiceStatus::Pending, Some(past_due)),
            invoice("Deposit resend", Some("deposit"), InvoiceStatus::Paid, None),
        ];

        assert_eq!(stage_status(&deposit_stage(), &invoices, today), StageStatus::Paid);
    }

    #[test]
    fn unpaid_past_due_is_overdue() {
        let today = NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date");
        let past_due = NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date");
        let invoices =
            vec![invoice("Deposit", Some("deposit"), InvoiceStatus::Pending, Some(past_due))];

        assert_eq!(stage_status(&deposit_stage(), &invoices, today), StageStatus::Overdue);
    }

    #[test]
    fn unpaid_within_due_is_pending() {
        let today = NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date");
        let future_due = NaiveDate::from_ymd_opt(2025, 4, 20).expect("valid date");
        let invoices =
            vec![invoice("Deposit", Some("deposit"), InvoiceStatus::Pending, Some(future_due))];

        assert_eq!(
            stage_status(&deposit_stage(), &invoices, today),
            StageStatus::InvoicedPending
        );
    }

    #[test]
    fn explicit_stage_key_beats_description_text() {
        let today = NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date");
        // Description mentions the deposit, but the key says this invoice
        // bills the final stage.
        let invoices =
            vec![invoice("Balance after deposit", Some("final"), InvoiceStatus::Paid, None)];

        assert_eq!(stage_status(&deposit_stage(), &invoices, today), StageStatus::NotInvoiced);
    }

    #[test]
    fn legacy_invoices_fall_back_to_description_matching() {
        let today = NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date");
        let invoices = vec![invoice("DEPOSIT for oak staircase", None, InvoiceStatus::Paid, None)];

        assert_eq!(stage_status(&deposit_stage(), &invoices, today), StageStatus::Paid);
    }
}
