use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{CatalogEntry, ItemCategory, LineItemKind, SupplierId};
use crate::domain::contact::Contact;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteItemId(pub String);

/// An item selected into a quote, either from the catalog or entered ad hoc.
/// Lives and dies with its parent quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub id: QuoteItemId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: ItemCategory,
    #[serde(default)]
    pub supplier: Option<SupplierId>,
    pub cost: Decimal,
    #[serde(default = "default_quantity")]
    pub quantity: Decimal,
    /// Item-specific markup percentage; `None` falls back to the quote's
    /// global markup.
    #[serde(default)]
    pub markup: Option<Decimal>,
    /// Excluded from visible pricing, but its own cost still feeds the
    /// shared-cost pool.
    #[serde(default)]
    pub hide_in_quote: bool,
    /// `None` only on records imported before the kind tag existed; the
    /// legacy classifier in `cis` covers those.
    #[serde(default)]
    pub kind: Option<LineItemKind>,
}

fn default_quantity() -> Decimal {
    Decimal::ONE
}

impl QuoteItem {
    pub fn from_catalog(id: QuoteItemId, entry: &CatalogEntry, quantity: Decimal) -> Self {
        Self {
            id,
            name: entry.name.clone(),
            description: entry.description.clone(),
            category: entry.category,
            supplier: entry.supplier.clone(),
            cost: entry.unit_cost,
            quantity,
            markup: None,
            hide_in_quote: false,
            kind: Some(entry.default_kind()),
        }
    }

    pub fn base_cost(&self) -> Decimal {
        self.cost * self.quantity
    }

    pub fn is_visible(&self) -> bool {
        !self.hide_in_quote
    }

    pub fn effective_markup(&self, global_markup: Decimal) -> Decimal {
        self.markup.unwrap_or(global_markup)
    }
}

/// A cost shared across the quote but never shown as its own line, e.g.
/// delivery or waste disposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenCost {
    pub id: String,
    pub name: String,
    pub amount: Decimal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMethod {
    #[default]
    Even,
    Proportional,
}

/// Staged-payment template selection. Legacy records carried single-character
/// codes; `from_code` maps those, and anything unknown schedules nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTerms {
    /// 50% deposit, 50% on completion.
    #[default]
    DepositThenFinal,
    /// 50% deposit, 25% on joinery completion, 25% on completion.
    DepositInterimFinal,
    /// Single stage per custom terms text.
    CustomTerms,
    /// 100% before delivery.
    FullBeforeDelivery,
    Unrecognized,
}

impl PaymentTerms {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "1" => Self::DepositThenFinal,
            "2" => Self::DepositInterimFinal,
            "3" | "custom" => Self::CustomTerms,
            "4" => Self::FullBeforeDelivery,
            _ => Self::Unrecognized,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatSettings {
    pub enabled: bool,
    /// Percentage, e.g. 20 for UK standard rate.
    pub rate: Decimal,
}

impl Default for VatSettings {
    fn default() -> Self {
        Self { enabled: false, rate: Decimal::from(20) }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub client: Contact,
    pub selected_items: Vec<QuoteItem>,
    #[serde(default)]
    pub hidden_costs: Vec<HiddenCost>,
    /// Default markup percentage for items without their own.
    pub global_markup: Decimal,
    #[serde(default)]
    pub distribution_method: DistributionMethod,
    #[serde(default)]
    pub payment_terms: PaymentTerms,
    #[serde(default)]
    pub vat: VatSettings,
    #[serde(default)]
    pub exclusions: Vec<String>,
    #[serde(default)]
    pub notes: String,
    /// Carried forward for consumers that cannot recompute (invoice
    /// construction). Never trusted when the inputs are available.
    #[serde(default)]
    pub cached_grand_total: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Quote {
    pub fn visible_items(&self) -> impl Iterator<Item = &QuoteItem> {
        self.selected_items.iter().filter(|item| item.is_visible())
    }

    pub fn hidden_items(&self) -> impl Iterator<Item = &QuoteItem> {
        self.selected_items.iter().filter(|item| !item.is_visible())
    }
}
