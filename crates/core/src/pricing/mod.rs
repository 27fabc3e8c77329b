pub mod distribution;
pub mod invoice;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote::{Quote, QuoteItem, QuoteItemId};

use self::distribution::{hidden_cost_share, shared_cost_pool};

/// Priced view of one visible quote item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPricing {
    pub item_id: QuoteItemId,
    pub name: String,
    pub quantity: Decimal,
    pub base_cost: Decimal,
    pub hidden_cost_share: Decimal,
    pub cost_with_hidden: Decimal,
    pub markup_rate: Decimal,
    pub markup_amount: Decimal,
    pub final_total: Decimal,
    pub unit_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub visible_base_cost: Decimal,
    pub total_hidden_cost: Decimal,
    /// Sum of visible item final totals, before VAT.
    pub subtotal: Decimal,
    pub total_markup: Decimal,
    pub profit_percentage: Decimal,
    pub vat_amount: Decimal,
    pub grand_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteBreakdown {
    pub items: Vec<ItemPricing>,
    pub totals: QuoteTotals,
}

impl QuoteBreakdown {
    /// Presentation copy with every money figure rounded. Calculations stay
    /// at full precision; rounding belongs to display and export boundaries.
    pub fn rounded(&self, dp: u32) -> Self {
        Self {
            items: self
                .items
                .iter()
                .map(|item| ItemPricing {
                    item_id: item.item_id.clone(),
                    name: item.name.clone(),
                    quantity: item.quantity,
                    base_cost: item.base_cost.round_dp(dp),
                    hidden_cost_share: item.hidden_cost_share.round_dp(dp),
                    cost_with_hidden: item.cost_with_hidden.round_dp(dp),
                    markup_rate: item.markup_rate,
                    markup_amount: item.markup_amount.round_dp(dp),
                    final_total: item.final_total.round_dp(dp),
                    unit_price: item.unit_price.round_dp(dp),
                })
                .collect(),
            totals: QuoteTotals {
                visible_base_cost: self.totals.visible_base_cost.round_dp(dp),
                total_hidden_cost: self.totals.total_hidden_cost.round_dp(dp),
                subtotal: self.totals.subtotal.round_dp(dp),
                total_markup: self.totals.total_markup.round_dp(dp),
                profit_percentage: self.totals.profit_percentage.round_dp(dp),
                vat_amount: self.totals.vat_amount.round_dp(dp),
                grand_total: self.totals.grand_total.round_dp(dp),
            },
        }
    }
}

pub trait PricingEngine: Send + Sync {
    fn price(&self, quote: &Quote) -> QuoteBreakdown;
}

#[derive(Default)]
pub struct DeterministicPricingEngine;

impl PricingEngine for DeterministicPricingEngine {
    fn price(&self, quote: &Quote) -> QuoteBreakdown {
        price_quote(quote)
    }
}

/// Prices every visible item and aggregates the quote. Pure: identical
/// inputs give identical output.
pub fn price_quote(quote: &Quote) -> QuoteBreakdown {
    let visible: Vec<&QuoteItem> = quote.visible_items().collect();
    let pool = shared_cost_pool(&quote.selected_items, &quote.hidden_costs);
    let visible_base_sum: Decimal = visible.iter().map(|item| item.base_cost()).sum();

    let items: Vec<ItemPricing> = visible
        .iter()
        .map(|item| {
            let base_cost = item.base_cost();
            let share = hidden_cost_share(
                quote.distribution_method,
                pool,
                base_cost,
                visible.len(),
                visible_base_sum,
            );
            let cost_with_hidden = base_cost + share;
            let markup_rate = item.effective_markup(quote.global_markup);
            let markup_amount = cost_with_hidden * markup_rate / Decimal::ONE_HUNDRED;
            let final_total = cost_with_hidden + markup_amount;
            let unit_price = if item.quantity.is_zero() {
                Decimal::ZERO
            } else {
                final_total / item.quantity
            };

            ItemPricing {
                item_id: item.id.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
                base_cost,
                hidden_cost_share: share,
                cost_with_hidden,
                markup_rate,
                markup_amount,
                final_total,
                unit_price,
            }
        })
        .collect();

    let subtotal: Decimal = items.iter().map(|item| item.final_total).sum();
    let total_markup: Decimal = items.iter().map(|item| item.markup_amount).sum();
    let cost_base = visible_base_sum + pool;
    let profit_percentage = if cost_base.is_zero() {
        Decimal::ZERO
    } else {
        total_markup / cost_base * Decimal::ONE_HUNDRED
    };
    let vat_amount = if quote.vat.enabled {
        subtotal * quote.vat.rate / Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    QuoteBreakdown {
        items,
        totals: QuoteTotals {
            visible_base_cost: visible_base_sum,
            total_hidden_cost: pool,
            subtotal,
            total_markup,
            profit_percentage,
            vat_amount,
            grand_total: subtotal + vat_amount,
        },
    }
}

/// Quote total for consumers that may not hold the full inputs (payment
/// schedules, invoice construction): the carried-forward figure when one
/// exists, a fresh computation otherwise.
pub fn quote_total(quote: &Quote) -> Decimal {
    match quote.cached_grand_total {
        Some(cached) => cached,
        None => price_quote(quote).totals.grand_total,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::catalog::ItemCategory;
    use crate::domain::contact::Contact;
    use crate::domain::quote::{
        DistributionMethod, HiddenCost, PaymentTerms, Quote, QuoteId, QuoteItem, QuoteItemId,
        VatSettings,
    };

    use super::{price_quote, quote_total, DeterministicPricingEngine, PricingEngine};

    fn item(id: &str, cost: i64, quantity: i64, markup: Option<i64>, hidden: bool) -> QuoteItem {
        QuoteItem {
            id: QuoteItemId(id.to_string()),
            name: format!("item {id}"),
            description: String::new(),
            category: ItemCategory::Timber,
            supplier: None,
            cost: Decimal::from(cost),
            quantity: Decimal::from(quantity),
            markup: markup.map(Decimal::from),
            hide_in_quote: hidden,
            kind: None,
        }
    }

    fn quote(items: Vec<QuoteItem>, hidden_costs: Vec<HiddenCost>) -> Quote {
        Quote {
            id: QuoteId("Q-1".to_string()),
            client: Contact { name: "A Brennan".to_string(), ..Contact::default() },
            selected_items: items,
            hidden_costs,
            global_markup: Decimal::from(20),
            distribution_method: DistributionMethod::Even,
            payment_terms: PaymentTerms::DepositThenFinal,
            vat: VatSettings::default(),
            exclusions: Vec::new(),
            notes: String::new(),
            cached_grand_total: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn single_item_without_hidden_costs() {
        let breakdown = price_quote(&quote(vec![item("a", 100, 2, Some(20), false)], Vec::new()));

        let priced = &breakdown.items[0];
        assert_eq!(priced.base_cost, Decimal::from(200));
        assert_eq!(priced.hidden_cost_share, Decimal::ZERO);
        assert_eq!(priced.markup_amount, Decimal::from(40));
        assert_eq!(priced.final_total, Decimal::from(240));
        assert_eq!(breakdown.totals.grand_total, Decimal::from(240));
    }

    #[test]
    fn hidden_cost_flows_through_markup() {
        let hidden = vec![HiddenCost {
            id: "hc".to_string(),
            name: "delivery".to_string(),
            amount: Decimal::from(100),
        }];
        let breakdown = price_quote(&quote(vec![item("a", 100, 2, Some(20), false)], hidden));

        let priced = &breakdown.items[0];
        assert_eq!(priced.hidden_cost_share, Decimal::from(100));
        assert_eq!(priced.cost_with_hidden, Decimal::from(300));
        assert_eq!(priced.markup_amount, Decimal::from(60));
        assert_eq!(priced.final_total, Decimal::from(360));
    }

    #[test]
    fn markup_and_totals_are_conserved() {
        let breakdown = price_quote(&quote(
            vec![item("a", 100, 1, Some(10), false), item("b", 50, 2, None, false)],
            vec![HiddenCost {
                id: "hc".to_string(),
                name: "waste".to_string(),
                amount: Decimal::from(30),
            }],
        ));

        let markup_sum: Decimal = breakdown.items.iter().map(|i| i.markup_amount).sum();
        let final_sum: Decimal = breakdown.items.iter().map(|i| i.final_total).sum();
        assert_eq!(markup_sum, breakdown.totals.total_markup);
        assert_eq!(final_sum, breakdown.totals.grand_total, "VAT disabled");
    }

    #[test]
    fn empty_quote_prices_to_zero_everywhere() {
        let breakdown = price_quote(&quote(Vec::new(), Vec::new()));

        assert!(breakdown.items.is_empty());
        assert_eq!(breakdown.totals.subtotal, Decimal::ZERO);
        assert_eq!(breakdown.totals.grand_total, Decimal::ZERO);
        assert_eq!(breakdown.totals.profit_percentage, Decimal::ZERO);
    }

    #[test]
    fn hidden_item_feeds_pool_but_is_not_priced() {
        let breakdown = price_quote(&quote(
            vec![item("a", 100, 1, Some(0), false), item("b", 40, 1, None, true)],
            Vec::new(),
        ));

        assert_eq!(breakdown.items.len(), 1);
        assert_eq!(breakdown.items[0].hidden_cost_share, Decimal::from(40));
        assert_eq!(breakdown.totals.total_hidden_cost, Decimal::from(40));
        assert_eq!(breakdown.totals.grand_total, Decimal::from(140));
    }

    #[test]
    fn zero_quantity_guards_unit_price() {
        let breakdown = price_quote(&quote(vec![item("a", 100, 0, Some(20), false)], Vec::new()));

        assert_eq!(breakdown.items[0].unit_price, Decimal::ZERO);
    }

    #[test]
    fn proportional_distribution_follows_base_cost() {
        let mut subject = quote(
            vec![item("a", 300, 1, Some(0), false), item("b", 100, 1, Some(0), false)],
            vec![HiddenCost {
                id: "hc".to_string(),
                name: "crane hire".to_string(),
                amount: Decimal::from(80),
            }],
        );
        subject.distribution_method = DistributionMethod::Proportional;
        let breakdown = price_quote(&subject);

        assert_eq!(breakdown.items[0].hidden_cost_share, Decimal::from(60));
        assert_eq!(breakdown.items[1].hidden_cost_share, Decimal::from(20));
    }

    #[test]
    fn vat_adds_onto_the_subtotal() {
        let mut subject = quote(vec![item("a", 100, 1, Some(0), false)], Vec::new());
        subject.vat = VatSettings { enabled: true, rate: Decimal::from(20) };
        let breakdown = price_quote(&subject);

        assert_eq!(breakdown.totals.vat_amount, Decimal::from(20));
        assert_eq!(breakdown.totals.grand_total, Decimal::from(120));
    }

    #[test]
    fn profit_percentage_relates_markup_to_full_cost() {
        let breakdown = price_quote(&quote(
            vec![item("a", 100, 1, Some(20), false)],
            vec![HiddenCost {
                id: "hc".to_string(),
                name: "delivery".to_string(),
                amount: Decimal::from(100),
            }],
        ));

        // 40 markup over 200 of cost.
        assert_eq!(breakdown.totals.profit_percentage, Decimal::from(20));
    }

    #[test]
    fn engine_trait_matches_free_function() {
        let subject = quote(vec![item("a", 100, 2, Some(20), false)], Vec::new());
        let engine = DeterministicPricingEngine;

        assert_eq!(engine.price(&subject), price_quote(&subject));
    }

    #[test]
    fn quote_total_uses_carried_forward_figure_then_recomputes() {
        let mut subject = quote(vec![item("a", 100, 2, Some(20), false)], Vec::new());
        assert_eq!(quote_total(&subject), Decimal::from(240));

        subject.cached_grand_total = Some(Decimal::from(9999));
        assert_eq!(quote_total(&subject), Decimal::from(9999));
    }

    #[test]
    fn rounded_breakdown_is_presentation_only() {
        let mut subject = quote(vec![item("a", 100, 3, Some(20), false)], Vec::new());
        subject.distribution_method = DistributionMethod::Even;
        subject.hidden_costs.push(HiddenCost {
            id: "hc".to_string(),
            name: "delivery".to_string(),
            amount: Decimal::from(10),
        });

        let breakdown = price_quote(&subject);
        let rounded = breakdown.rounded(2);

        assert_eq!(rounded.items[0].unit_price, breakdown.items[0].unit_price.round_dp(2));
        // The full-precision figure is untouched.
        assert_eq!(price_quote(&subject), breakdown);
    }
}
