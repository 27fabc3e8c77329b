//! Input sanitization run before anything reaches the calculators. The
//! pricing and CIS code assume non-negative costs and positive quantities;
//! this is where that assumption is enforced.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::domain::catalog::LineItemKind;
use crate::domain::contact::Contact;
use crate::domain::invoice::Invoice;
use crate::domain::quote::{HiddenCost, Quote, QuoteItem};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("input validation failed on {} field(s)", errors.len())]
pub struct ValidationFailure {
    pub errors: Vec<FieldError>,
}

fn check(errors: &mut Vec<FieldError>, condition: bool, field: &str, message: &str) {
    if !condition {
        errors.push(FieldError { field: field.to_string(), message: message.to_string() });
    }
}

fn email_shape_ok(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

pub fn validate_contact(contact: &Contact, prefix: &str, errors: &mut Vec<FieldError>) {
    check(errors, !contact.name.trim().is_empty(), &format!("{prefix}.name"), "name is required");
    if !contact.email.trim().is_empty() {
        check(
            errors,
            email_shape_ok(contact.email.trim()),
            &format!("{prefix}.email"),
            "email address is not valid",
        );
    }
}

pub fn validate_quote_item(item: &QuoteItem, prefix: &str, errors: &mut Vec<FieldError>) {
    check(errors, item.cost >= Decimal::ZERO, &format!("{prefix}.cost"), "cost must not be negative");
    check(
        errors,
        item.quantity > Decimal::ZERO,
        &format!("{prefix}.quantity"),
        "quantity must be positive",
    );
    if let Some(markup) = item.markup {
        check(
            errors,
            (Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&markup),
            &format!("{prefix}.markup"),
            "markup must be between 0 and 100",
        );
    }
    check(
        errors,
        item.kind != Some(LineItemKind::CisDeduction),
        &format!("{prefix}.kind"),
        "quote items cannot be tagged as CIS deductions",
    );
}

pub fn validate_hidden_cost(cost: &HiddenCost, prefix: &str, errors: &mut Vec<FieldError>) {
    check(
        errors,
        cost.amount >= Decimal::ZERO,
        &format!("{prefix}.amount"),
        "amount must not be negative",
    );
}

pub fn validate_quote(quote: &Quote) -> Result<(), ValidationFailure> {
    let mut errors = Vec::new();

    validate_contact(&quote.client, "client", &mut errors);
    check(
        &mut errors,
        (Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&quote.global_markup),
        "global_markup",
        "global markup must be between 0 and 100",
    );
    for (index, item) in quote.selected_items.iter().enumerate() {
        validate_quote_item(item, &format!("selected_items[{index}]"), &mut errors);
    }
    for (index, cost) in quote.hidden_costs.iter().enumerate() {
        validate_hidden_cost(cost, &format!("hidden_costs[{index}]"), &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure { errors })
    }
}

pub fn validate_invoice(invoice: &Invoice) -> Result<(), ValidationFailure> {
    let mut errors = Vec::new();

    check(
        &mut errors,
        !invoice.invoice_number.trim().is_empty(),
        "invoice_number",
        "invoice number is required",
    );
    validate_contact(&invoice.client, "client", &mut errors);
    for (index, line) in invoice.line_items.iter().enumerate() {
        check(
            &mut errors,
            line.quantity > Decimal::ZERO,
            &format!("line_items[{index}].quantity"),
            "quantity must be positive",
        );
        // Negative amounts are reserved for deduction lines.
        if line.amount < Decimal::ZERO {
            check(
                &mut errors,
                line.is_cis_deduction(),
                &format!("line_items[{index}].amount"),
                "only CIS deduction lines may be negative",
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure { errors })
    }
}
