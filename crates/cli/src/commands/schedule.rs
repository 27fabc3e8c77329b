use std::path::Path;

use stairbooks_core::schedule::schedule_for_quote;

use crate::commands::price::load_quote;
use crate::commands::CommandResult;

pub fn run(path: &Path) -> CommandResult {
    let quote = match load_quote("schedule", path) {
        Ok(quote) => quote,
        Err(result) => return result,
    };

    let stages: Vec<_> = schedule_for_quote(&quote)
        .into_iter()
        .map(|mut stage| {
            stage.amount = stage.amount.round_dp(2);
            stage.amount.rescale(2);
            stage
        })
        .collect();

    let payload = match serde_json::to_value(&stages) {
        Ok(payload) => payload,
        Err(error) => {
            return CommandResult::failure(
                "schedule",
                "serialization",
                format!("could not serialize schedule: {error}"),
                3,
            );
        }
    };

    CommandResult::success_with_payload(
        "schedule",
        format!("expanded {:?} into {} stage(s)", quote.payment_terms, stages.len()),
        payload,
    )
}
