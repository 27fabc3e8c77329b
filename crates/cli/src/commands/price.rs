use std::fs;
use std::path::Path;

use stairbooks_core::pricing::price_quote;
use stairbooks_core::validation::{validate_quote, ValidationFailure};
use stairbooks_core::Quote;

use crate::commands::CommandResult;

fn describe_failure(failure: &ValidationFailure) -> String {
    failure
        .errors
        .iter()
        .map(|error| format!("{}: {}", error.field, error.message))
        .collect::<Vec<_>>()
        .join("; ")
}

pub(crate) fn load_quote(command: &str, path: &Path) -> Result<Quote, CommandResult> {
    let raw = fs::read_to_string(path).map_err(|error| {
        CommandResult::failure(
            command,
            "read_input",
            format!("could not read `{}`: {error}", path.display()),
            2,
        )
    })?;

    let quote: Quote = serde_json::from_str(&raw).map_err(|error| {
        CommandResult::failure(
            command,
            "parse_input",
            format!("`{}` is not a valid quote: {error}", path.display()),
            2,
        )
    })?;

    validate_quote(&quote).map_err(|failure| {
        CommandResult::failure(command, "validation", describe_failure(&failure), 2)
    })?;

    Ok(quote)
}

pub fn run(path: &Path) -> CommandResult {
    let quote = match load_quote("price", path) {
        Ok(quote) => quote,
        Err(result) => return result,
    };

    let breakdown = price_quote(&quote).rounded(2);
    let payload = match serde_json::to_value(&breakdown) {
        Ok(payload) => payload,
        Err(error) => {
            return CommandResult::failure(
                "price",
                "serialization",
                format!("could not serialize breakdown: {error}"),
                3,
            );
        }
    };

    CommandResult::success_with_payload(
        "price",
        format!(
            "priced quote `{}`: {} visible item(s), grand total {}",
            quote.id.0,
            breakdown.items.len(),
            breakdown.totals.grand_total
        ),
        payload,
    )
}
