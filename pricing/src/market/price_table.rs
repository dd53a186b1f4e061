use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use tracing::trace;

/// Concurrent product id -> current price map.
///
/// Readers share the lock; writers hold it exclusively, so a racing read sees
/// either the old or the new price. Entries are created on first write and
/// never removed during a run.
///
/// Concurrent `set`s to the same product are last-writer-wins: the table makes
/// each write atomic but does not order tasks that touch the same product.
#[derive(Debug, Default)]
pub struct SharedPriceTable {
    prices: RwLock<HashMap<String, f64>>,
}

impl SharedPriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current price, or `None` if the product was never priced.
    pub fn get(&self, product_id: &str) -> Option<f64> {
        self.prices.read().get(product_id).copied()
    }

    /// Unconditional insert or overwrite.
    pub fn set(&self, product_id: &str, price: f64) {
        let mut g = self.prices.write();
        let prev = g.insert(product_id.to_string(), price);
        trace!(product_id, price, ?prev, "price set");
    }

    /// Insert if absent, or overwrite only when `new_price` is strictly lower.
    ///
    /// The lookup, comparison and write happen under one write guard.
    pub fn update_if_lower(&self, product_id: &str, new_price: f64) -> bool {
        let mut g = self.prices.write();
        match g.get_mut(product_id) {
            Some(current) if new_price < *current => {
                *current = new_price;
                true
            }
            Some(_) => false,
            None => {
                g.insert(product_id.to_string(), new_price);
                true
            }
        }
    }

    /// Independent copy ordered by product id; safe to iterate after return.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        let g = self.prices.read();
        g.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    pub fn size(&self) -> usize {
        self.prices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.read().is_empty()
    }

    /// Lowest and highest price across the table, read under one guard.
    pub fn price_range(&self) -> Option<(f64, f64)> {
        let g = self.prices.read();
        let mut it = g.values().copied();
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }
}
