use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::format::{clamp_amount, coerce_amount};
use crate::model::LineItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Quantity,
    Description,
    UnitPrice,
}

/// Ordered line items. Never empty: removing the last row puts a blank one back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<LineItem>", into = "Vec<LineItem>")]
pub struct Ledger {
    items: Vec<LineItem>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            items: vec![LineItem::default()],
        }
    }

    pub fn from_items(items: Vec<LineItem>) -> Self {
        let mut ledger = Self { items };
        ledger.heal();
        ledger
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn add_item(&mut self, item: LineItem) {
        self.items.push(LineItem {
            quantity: clamp_amount(item.quantity),
            unit_price: clamp_amount(item.unit_price),
            ..item
        });
    }

    /// Returns false when `index` is out of range.
    pub fn remove_item(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            debug!(index, len = self.items.len(), "remove_item out of range");
            return false;
        }
        self.items.remove(index);
        self.heal();
        true
    }

    /// Numeric fields are coerced, invalid input becomes 0.
    pub fn update_field(&mut self, index: usize, field: ItemField, raw: &str) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            debug!(index, "update_field out of range");
            return false;
        };
        match field {
            ItemField::Quantity => item.quantity = coerce_amount(raw),
            ItemField::UnitPrice => item.unit_price = coerce_amount(raw),
            ItemField::Description => item.description = raw.to_string(),
        }
        true
    }

    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(LineItem::subtotal).sum()
    }

    fn heal(&mut self) {
        if self.items.is_empty() {
            self.items.push(LineItem::default());
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<LineItem>> for Ledger {
    fn from(items: Vec<LineItem>) -> Self {
        Self::from_items(items)
    }
}

impl From<Ledger> for Vec<LineItem> {
    fn from(ledger: Ledger) -> Self {
        ledger.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_empty_after_any_removal() {
        let mut ledger = Ledger::new();
        ledger.add_item(LineItem::new(2.0, "Kabel", 5000.0));
        ledger.add_item(LineItem::default());

        for _ in 0..5 {
            ledger.remove_item(0);
            assert!(ledger.len() >= 1);
        }
        assert_eq!(ledger.items(), &[LineItem::default()]);
    }

    #[test]
    fn removing_out_of_range_is_a_no_op() {
        let mut ledger = Ledger::new();
        assert!(!ledger.remove_item(3));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn subtotal_tracks_item_updates() {
        let mut ledger = Ledger::from_items(vec![
            LineItem::new(2.0, "LCD", 150_000.0),
            LineItem::new(1.0, "Jasa", 50_000.0),
        ]);
        assert_eq!(ledger.subtotal(), 350_000.0);

        let before = ledger.subtotal();
        let previous = ledger.items()[1].subtotal();
        ledger.update_field(1, ItemField::Quantity, "3");
        ledger.update_field(1, ItemField::UnitPrice, "20000");
        assert_eq!(ledger.subtotal(), before - previous + 3.0 * 20_000.0);
    }

    #[test]
    fn invalid_numbers_coerce_to_zero() {
        let mut ledger = Ledger::new();
        ledger.update_field(0, ItemField::Quantity, "lots");
        ledger.update_field(0, ItemField::Description, "Baterai");
        assert_eq!(ledger.items()[0], LineItem::new(0.0, "Baterai", 0.0));
        assert!(!ledger.update_field(9, ItemField::Quantity, "1"));
    }

    #[test]
    fn deserializing_an_empty_list_heals() {
        let ledger: Ledger = serde_json::from_str("[]").unwrap();
        assert_eq!(ledger, Ledger::new());
    }
}
