use std::fmt;

use serde::Serialize;

/// Product family, inferred from the product id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Smartphone,
    Laptop,
    Gpu,
    Other,
}

impl Category {
    pub fn infer(product_id: &str) -> Self {
        if product_id.contains("iPhone") {
            Category::Smartphone
        } else if product_id.contains("MacBook") {
            Category::Laptop
        } else if product_id.contains("RTX") {
            Category::Gpu
        } else {
            Category::Other
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Smartphone => "smartphone",
            Category::Laptop => "laptop",
            Category::Gpu => "gpu",
            Category::Other => "other",
        };
        f.write_str(s)
    }
}

/// Product as seen by the pricing strategy for one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: Category,
    /// Price in effect before this task ran.
    pub base_price: f64,
    pub stock: u32,
    pub is_new_model: bool,
    pub series: String,
}

impl Product {
    pub fn new(id: &str, base_price: f64, stock: u32) -> Self {
        let category = Category::infer(id);
        Self {
            id: id.to_string(),
            name: id.to_string(),
            category,
            base_price,
            stock,
            is_new_model: id.contains("New"),
            series: category.to_string(),
        }
    }
}

/// Market signals accompanying a product snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketContext {
    pub competitor_price: f64,
    pub demand_forecast: f64,
    pub is_peak_season: bool,
    pub view_count: u32,
    pub cart_count: u32,
    pub purchase_count: u32,
    /// Local hour of day, 0..=23.
    pub hour_of_day: u32,
    pub newer_model_available: bool,
}

/// Everything the strategy needs for one (merchant, product) task.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketObservation {
    pub product: Product,
    pub context: MarketContext,
}
