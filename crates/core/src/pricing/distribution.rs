use rust_decimal::Decimal;

use crate::domain::quote::{DistributionMethod, HiddenCost, QuoteItem};

/// Pool of costs spread across the visible items: the explicit hidden costs
/// plus the base cost of every item excluded from visible pricing.
pub fn shared_cost_pool(items: &[QuoteItem], hidden_costs: &[HiddenCost]) -> Decimal {
    let explicit: Decimal = hidden_costs.iter().map(|cost| cost.amount).sum();
    let hidden_items: Decimal =
        items.iter().filter(|item| !item.is_visible()).map(QuoteItem::base_cost).sum();

    explicit + hidden_items
}

/// One visible item's slice of the pool. Empty quotes and zero-cost quotes
/// get a zero share rather than a division error.
pub fn hidden_cost_share(
    method: DistributionMethod,
    pool: Decimal,
    item_base_cost: Decimal,
    visible_count: usize,
    visible_base_sum: Decimal,
) -> Decimal {
    match method {
        DistributionMethod::Even => {
            if visible_count == 0 {
                Decimal::ZERO
            } else {
                pool / Decimal::from(visible_count)
            }
        }
        DistributionMethod::Proportional => {
            if visible_base_sum.is_zero() {
                Decimal::ZERO
            } else {
                pool * item_base_cost / visible_base_sum
            }
        }
    }
}
