use chrono::{DateTime, Local};
use uuid::Uuid;

/// A seller repricing its own list of products.
#[derive(Clone, Debug, PartialEq)]
pub struct Merchant {
    pub name: String,
    /// Products this merchant reprices, in processing order.
    pub products: Vec<String>,
    /// 1 is highest. Carried for reporting only; scheduling is FIFO.
    pub priority: u8,
}

impl Merchant {
    pub fn new<I, S>(name: &str, products: I, priority: u8) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            products: products.into_iter().map(Into::into).collect(),
            priority,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TaskOutcome {
    /// Not executed yet.
    Pending,
    Succeeded,
    Failed { reason: String },
}

/// One (merchant, product) repricing attempt.
#[derive(Clone, Debug)]
pub struct PricingTask {
    pub task_id: Uuid,
    pub merchant: String,
    pub product_id: String,
    /// Price in effect before the task ran.
    pub base_price: f64,
    /// Price produced by the task; equals `base_price` when it failed.
    pub adjusted_price: f64,
    pub stock_level: u32,
    pub created_at: DateTime<Local>,
    pub outcome: TaskOutcome,
}

impl PricingTask {
    pub fn pending(merchant: &str, product_id: &str) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            merchant: merchant.to_string(),
            product_id: product_id.to_string(),
            base_price: 0.0,
            adjusted_price: 0.0,
            stock_level: 0,
            created_at: Local::now(),
            outcome: TaskOutcome::Pending,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Succeeded)
    }

    /// Percentage change from base to adjusted price; 0 when no base price.
    pub fn adjustment_rate(&self) -> f64 {
        if self.base_price > 0.0 {
            (self.adjusted_price / self.base_price - 1.0) * 100.0
        } else {
            0.0
        }
    }
}
