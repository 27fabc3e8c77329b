//! Construction Industry Scheme withholding. Everything here is pure: the
//! planners turn an invoice into an apply/undo plan, and the persistence
//! layer executes a plan atomically.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::catalog::{ItemCategory, LineItemKind};
use crate::domain::invoice::{CisRecord, CisRecordId, Invoice, InvoiceId, InvoiceLine};
use crate::domain::quote::QuoteItem;

/// Statutory rate for registered subcontractors, as a fraction.
pub const DEFAULT_CIS_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

/// Amounts at or below this are treated as nothing to deduct.
const MINIMUM_LABOUR: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Legacy classifier vocabulary for records that predate the kind tag.
const LABOUR_KEYWORDS: [&str; 4] = ["labour", "labor", "install", "fitting"];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CisError {
    #[error("CIS has already been applied to this invoice")]
    AlreadyApplied,
    #[error("CIS is not applied to this invoice")]
    NotApplied,
    #[error("invoice must be saved before CIS can be applied")]
    Unsaved,
    #[error("invoice gross amount must be positive, got {amount}")]
    NonPositiveGross { amount: Decimal },
    #[error("no labour-classified amount found on the invoice or its quote")]
    NoLabourFound,
}

pub fn is_labour_text(text: &str) -> bool {
    let lowered = text.to_lowercase();
    LABOUR_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// The kind tag decides when present; untagged legacy items fall back to
/// category and keyword matching.
pub fn quote_item_is_labour(item: &QuoteItem) -> bool {
    match item.kind {
        Some(kind) => kind == LineItemKind::Labour,
        None => {
            item.category == ItemCategory::Labour
                || is_labour_text(&item.name)
                || is_labour_text(&item.description)
        }
    }
}

pub fn invoice_line_is_labour(line: &InvoiceLine) -> bool {
    match line.kind {
        Some(kind) => kind == LineItemKind::Labour,
        None => is_labour_text(&line.description),
    }
}

/// Labour-classified money across both sources: the originating quote's
/// items and the invoice's own lines. Deduction lines and negative amounts
/// never count.
pub fn labour_total(quote_items: &[QuoteItem], line_items: &[InvoiceLine]) -> Decimal {
    let from_quote: Decimal = quote_items
        .iter()
        .filter(|item| quote_item_is_labour(item))
        .map(QuoteItem::base_cost)
        .sum();

    let from_lines: Decimal = line_items
        .iter()
        .filter(|line| !line.is_cis_deduction())
        .filter(|line| line.amount >= Decimal::ZERO)
        .filter(|line| invoice_line_is_labour(line))
        .map(InvoiceLine::total)
        .sum();

    from_quote + from_lines
}

/// Everything the persistence boundary needs to apply a deduction in one
/// step, including the snapshot that makes undo possible.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CisApplication {
    /// Fraction, e.g. 0.20.
    pub rate: Decimal,
    pub original_gross_amount: Decimal,
    pub labour_total: Decimal,
    pub deduction: Decimal,
    pub net_amount: Decimal,
    pub replacement_lines: Vec<InvoiceLine>,
    pub snapshot: Vec<InvoiceLine>,
}

pub fn plan_application(
    invoice: &Invoice,
    quote_items: &[QuoteItem],
    rate: Decimal,
) -> Result<CisApplication, CisError> {
    if invoice.cis_applied {
        return Err(CisError::AlreadyApplied);
    }
    if invoice.id.is_none() {
        return Err(CisError::Unsaved);
    }

    let gross = invoice.amount;
    if gross <= Decimal::ZERO {
        return Err(CisError::NonPositiveGross { amount: gross });
    }

    let mut labour = labour_total(quote_items, &invoice.line_items);
    if labour <= MINIMUM_LABOUR {
        return Err(CisError::NoLabourFound);
    }
    // Labour cannot exceed what the invoice actually bills.
    if labour > gross {
        labour = gross;
    }

    let deduction = labour * rate;
    let materials = gross - labour;
    let percent = (rate * Decimal::ONE_HUNDRED).normalize();

    let mut replacement_lines = Vec::with_capacity(3);
    if materials > MINIMUM_LABOUR {
        replacement_lines.push(InvoiceLine {
            description: "Materials".to_string(),
            amount: materials,
            quantity: Decimal::ONE,
            kind: Some(LineItemKind::Materials),
        });
    }
    if labour > MINIMUM_LABOUR {
        replacement_lines.push(InvoiceLine {
            description: "Labour".to_string(),
            amount: labour,
            quantity: Decimal::ONE,
            kind: Some(LineItemKind::Labour),
        });
    }
    replacement_lines.push(InvoiceLine {
        description: format!("CIS deduction ({percent}% of labour)"),
        amount: -deduction,
        quantity: Decimal::ONE,
        kind: Some(LineItemKind::CisDeduction),
    });

    Ok(CisApplication {
        rate,
        original_gross_amount: gross,
        labour_total: labour,
        deduction,
        net_amount: gross - deduction,
        replacement_lines,
        snapshot: invoice.line_items.clone(),
    })
}

impl CisApplication {
    /// The ledger row recorded alongside the invoice update.
    pub fn ledger_record(
        &self,
        id: CisRecordId,
        invoice_id: InvoiceId,
        invoice: &Invoice,
        recorded_on: NaiveDate,
    ) -> CisRecord {
        CisRecord {
            id,
            invoice_id,
            invoice_number: invoice.invoice_number.clone(),
            client_name: invoice.client.name.clone(),
            client_company: invoice.client.company.clone(),
            labour_amount: self.labour_total,
            rate: self.rate,
            deduction: self.deduction,
            recorded_on,
        }
    }
}

/// Writes an application plan into the invoice. Field changes move together
/// so the CIS invariants hold on the way out.
pub fn apply(invoice: &mut Invoice, plan: &CisApplication) {
    invoice.original_line_items_before_cis = Some(plan.snapshot.clone());
    invoice.line_items = plan.replacement_lines.clone();
    invoice.amount = plan.net_amount;
    invoice.cis_applied = true;
    invoice.cis_deduction = plan.deduction;
    invoice.labour_total = plan.labour_total;
    invoice.original_gross_amount = Some(plan.original_gross_amount);
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CisRemoval {
    pub restored_lines: Vec<InvoiceLine>,
    pub restored_amount: Decimal,
    pub cis_record_id: Option<CisRecordId>,
}

/// Plans the undo. Missing snapshots degrade to keeping the current state
/// rather than refusing the undo outright.
pub fn plan_removal(invoice: &Invoice) -> Result<CisRemoval, CisError> {
    if !invoice.cis_applied {
        return Err(CisError::NotApplied);
    }

    Ok(CisRemoval {
        restored_lines: invoice
            .original_line_items_before_cis
            .clone()
            .unwrap_or_else(|| invoice.line_items.clone()),
        restored_amount: invoice.original_gross_amount.unwrap_or(invoice.amount),
        cis_record_id: invoice.cis_record_id.clone(),
    })
}

pub fn undo(invoice: &mut Invoice, removal: &CisRemoval) {
    invoice.line_items = removal.restored_lines.clone();
    invoice.amount = removal.restored_amount;
    invoice.cis_applied = false;
    invoice.cis_deduction = Decimal::ZERO;
    invoice.labour_total = Decimal::ZERO;
    invoice.original_gross_amount = None;
    invoice.original_line_items_before_cis = None;
    invoice.cis_record_id = None;
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::domain::catalog::{ItemCategory, LineItemKind};
    use crate::domain::contact::Contact;
    use crate::domain::invoice::{Invoice, InvoiceId, InvoiceLine, InvoiceStatus};
    use crate::domain::quote::{QuoteItem, QuoteItemId};

    use super::{
        apply, labour_total, plan_application, plan_removal, quote_item_is_labour, undo, CisError,
        DEFAULT_CIS_RATE,
    };

    fn line(description: &str, amount: i64, kind: Option<LineItemKind>) -> InvoiceLine {
        InvoiceLine {
            description: description.to_string(),
            amount: Decimal::from(amount),
            quantity: Decimal::ONE,
            kind,
        }
    }

    fn invoice(lines: Vec<InvoiceLine>) -> Invoice {
        let amount = lines.iter().map(InvoiceLine::total).sum();
        Invoice {
            id: Some(InvoiceId("inv-1".to_string())),
            invoice_number: "INV-42".to_string(),
            client: Contact {
                name: "R Feldman".to_string(),
                company: "Feldman Joinery".to_string(),
                ..Contact::default()
            },
            description: "Final balance".to_string(),
            quote_id: None,
            payment_stage: None,
            line_items: lines,
            amount,
            status: InvoiceStatus::Pending,
            due_date: None,
            issued_on: NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date"),
            cis_applied: false,
            cis_deduction: Decimal::ZERO,
            labour_total: Decimal::ZERO,
            original_gross_amount: None,
            original_line_items_before_cis: None,
            cis_record_id: None,
        }
    }

    fn quote_item(name: &str, cost: i64, category: ItemCategory, kind: Option<LineItemKind>) -> QuoteItem {
        QuoteItem {
            id: QuoteItemId("qi-1".to_string()),
            name: name.to_string(),
            description: String::new(),
            category,
            supplier: None,
            cost: Decimal::from(cost),
            quantity: Decimal::ONE,
            markup: None,
            hide_in_quote: false,
            kind,
        }
    }

    #[test]
    fn all_labour_invoice_deducts_and_skips_materials_line() {
        let subject = invoice(vec![line("Fitting", 1000, Some(LineItemKind::Labour))]);
        let plan = plan_application(&subject, &[], DEFAULT_CIS_RATE).expect("plan");

        assert_eq!(plan.labour_total, Decimal::from(1000));
        assert_eq!(plan.deduction, Decimal::from(200));
        assert_eq!(plan.net_amount, Decimal::from(800));
        // No materials line: gross minus labour is zero.
        assert_eq!(plan.replacement_lines.len(), 2);
        assert_eq!(plan.replacement_lines[0].kind, Some(LineItemKind::Labour));
        assert_eq!(plan.replacement_lines[1].amount, Decimal::from(-200));
    }

    #[test]
    fn mixed_invoice_splits_materials_and_labour() {
        let subject = invoice(vec![
            line("Oak treads", 600, Some(LineItemKind::Materials)),
            line("Installation", 400, Some(LineItemKind::Labour)),
        ]);
        let plan = plan_application(&subject, &[], DEFAULT_CIS_RATE).expect("plan");

        assert_eq!(plan.labour_total, Decimal::from(400));
        assert_eq!(plan.deduction, Decimal::from(80));
        assert_eq!(plan.replacement_lines.len(), 3);
        assert_eq!(plan.replacement_lines[0].amount, Decimal::from(600));
        assert_eq!(plan.replacement_lines[1].amount, Decimal::from(400));
        assert_eq!(plan.replacement_lines[2].amount, Decimal::from(-80));
    }

    #[test]
    fn quote_labour_joins_the_union() {
        let subject = invoice(vec![line("Balance", 2000, Some(LineItemKind::Materials))]);
        let items =
            vec![quote_item("Staircase install", 500, ItemCategory::Labour, Some(LineItemKind::Labour))];
        let plan = plan_application(&subject, &items, DEFAULT_CIS_RATE).expect("plan");

        assert_eq!(plan.labour_total, Decimal::from(500));
        assert_eq!(plan.deduction, Decimal::from(100));
    }

    #[test]
    fn labour_is_clamped_to_the_invoice_gross() {
        let subject = invoice(vec![line("Part payment", 300, Some(LineItemKind::Labour))]);
        let items =
            vec![quote_item("Full install", 900, ItemCategory::Labour, Some(LineItemKind::Labour))];
        let plan = plan_application(&subject, &items, DEFAULT_CIS_RATE).expect("plan");

        assert_eq!(plan.labour_total, Decimal::from(300), "clamped to gross");
        assert_eq!(plan.deduction, Decimal::from(60));
    }

    #[test]
    fn deduction_and_negative_lines_never_count_as_labour() {
        let lines = vec![
            line("Labour", 500, Some(LineItemKind::Labour)),
            line("CIS deduction (20% of labour)", -100, Some(LineItemKind::CisDeduction)),
            line("Labour credit", -50, None),
        ];

        assert_eq!(labour_total(&[], &lines), Decimal::from(500));
    }

    #[test]
    fn explicit_kind_tag_beats_keyword_text() {
        let tagged_materials =
            quote_item("Install brackets", 100, ItemCategory::Hardware, Some(LineItemKind::Materials));
        assert!(!quote_item_is_labour(&tagged_materials));

        let legacy_keyword = quote_item("Install brackets", 100, ItemCategory::Hardware, None);
        assert!(quote_item_is_labour(&legacy_keyword));
    }

    #[test]
    fn legacy_classifier_accepts_category_and_keywords() {
        assert!(quote_item_is_labour(&quote_item("Site work", 100, ItemCategory::Labour, None)));
        for name in ["Labour day rate", "labor day rate", "Install handrail", "Fitting charge"] {
            assert!(
                quote_item_is_labour(&quote_item(name, 100, ItemCategory::Other, None)),
                "{name} should classify as labour"
            );
        }
        assert!(!quote_item_is_labour(&quote_item("Oak newel", 100, ItemCategory::Timber, None)));
    }

    #[test]
    fn guards_refuse_bad_preconditions() {
        let mut applied = invoice(vec![line("Labour", 100, Some(LineItemKind::Labour))]);
        applied.cis_applied = true;
        assert_eq!(
            plan_application(&applied, &[], DEFAULT_CIS_RATE),
            Err(CisError::AlreadyApplied)
        );

        let mut unsaved = invoice(vec![line("Labour", 100, Some(LineItemKind::Labour))]);
        unsaved.id = None;
        assert_eq!(plan_application(&unsaved, &[], DEFAULT_CIS_RATE), Err(CisError::Unsaved));

        let zero = invoice(vec![line("Labour", 0, Some(LineItemKind::Labour))]);
        assert_eq!(
            plan_application(&zero, &[], DEFAULT_CIS_RATE),
            Err(CisError::NonPositiveGross { amount: Decimal::ZERO })
        );

        let no_labour = invoice(vec![line("Oak treads", 500, Some(LineItemKind::Materials))]);
        assert_eq!(
            plan_application(&no_labour, &[], DEFAULT_CIS_RATE),
            Err(CisError::NoLabourFound)
        );

        let not_applied = invoice(vec![line("Labour", 100, Some(LineItemKind::Labour))]);
        assert_eq!(plan_removal(&not_applied), Err(CisError::NotApplied));
    }

    #[test]
    fn apply_then_undo_restores_the_invoice_exactly() {
        let original = invoice(vec![
            line("Oak treads", 600, Some(LineItemKind::Materials)),
            line("Installation", 400, Some(LineItemKind::Labour)),
        ]);

        let mut subject = original.clone();
        let plan = plan_application(&subject, &[], DEFAULT_CIS_RATE).expect("plan");
        apply(&mut subject, &plan);

        assert!(subject.cis_applied);
        assert!(subject.cis_state_consistent());
        let gross = subject.original_gross_amount.expect("gross snapshot");
        assert!((gross - subject.cis_deduction - subject.amount).abs() < Decimal::new(1, 2));

        let removal = plan_removal(&subject).expect("removal");
        undo(&mut subject, &removal);

        assert_eq!(subject, original);
        assert!(subject.cis_state_consistent());
    }

    #[test]
    fn undo_without_snapshot_keeps_current_lines() {
        let mut subject = invoice(vec![line("Labour", 1000, Some(LineItemKind::Labour))]);
        let plan = plan_application(&subject, &[], DEFAULT_CIS_RATE).expect("plan");
        apply(&mut subject, &plan);
        subject.original_line_items_before_cis = None;

        let removal = plan_removal(&subject).expect("removal");
        assert_eq!(removal.restored_lines, subject.line_items);
        assert_eq!(removal.restored_amount, Decimal::from(1000));
    }

    #[test]
    fn deduction_line_names_the_rate() {
        let subject = invoice(vec![line("Labour", 1000, Some(LineItemKind::Labour))]);
        let plan = plan_application(&subject, &[], DEFAULT_CIS_RATE).expect("plan");
        let deduction_line = plan.replacement_lines.last().expect("deduction line");

        assert_eq!(deduction_line.description, "CIS deduction (20% of labour)");
    }
}
