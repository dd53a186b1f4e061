use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One historical sales observation, as handed over by the history loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: String,
    pub product_id: String,
    pub units_sold: u32,
    pub price: f64,
    pub stock: u32,
}

impl SalesRecord {
    pub fn new(date: &str, product_id: &str, units_sold: u32, price: f64, stock: u32) -> Self {
        Self {
            date: date.to_string(),
            product_id: product_id.to_string(),
            units_sold,
            price,
            stock,
        }
    }
}

/// Chronological sales records of a single product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductHistory {
    pub product_id: String,
    pub records: Vec<SalesRecord>,
}

impl ProductHistory {
    pub fn last(&self) -> Option<&SalesRecord> {
        self.records.last()
    }
}

/// Group records per product, keeping input order within each product.
pub fn group_by_product<I>(records: I) -> BTreeMap<String, ProductHistory>
where
    I: IntoIterator<Item = SalesRecord>,
{
    let mut out: BTreeMap<String, ProductHistory> = BTreeMap::new();
    for r in records {
        out.entry(r.product_id.clone())
            .or_insert_with(|| ProductHistory {
                product_id: r.product_id.clone(),
                records: Vec::new(),
            })
            .records
            .push(r);
    }
    out
}
