use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SupplierId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntryId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Timber,
    Hardware,
    Fixtures,
    Glass,
    Labour,
    Other,
}

/// Cost classification for statutory withholding. Every new line carries an
/// explicit tag; `CisDeduction` marks the negative deduction line itself and
/// is never a valid tag for catalog or quote items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    Materials,
    Labour,
    CisDeduction,
}

/// A purchasable item from a supplier's price list. Quote items are created
/// from catalog entries (or ad hoc) and then live inside their quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: CatalogEntryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: ItemCategory,
    #[serde(default)]
    pub supplier: Option<SupplierId>,
    pub unit_cost: Decimal,
    pub active: bool,
}

impl CatalogEntry {
    /// The kind a quote item created from this entry starts with.
    pub fn default_kind(&self) -> LineItemKind {
        match self.category {
            ItemCategory::Labour => LineItemKind::Labour,
            _ => LineItemKind::Materials,
        }
    }
}

#[derive(Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn find(&self, id: &CatalogEntryId) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }
}
