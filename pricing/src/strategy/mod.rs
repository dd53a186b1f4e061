//! The pricing-decision seam.
//!
//! The engine treats a strategy as an opaque, side-effect-free function from a
//! product/market snapshot to a recommended price. It is invoked on worker
//! threads concurrently and without a timeout.

pub mod blended;

use serde::Serialize;

use crate::error::StrategyError;
use crate::market::types::{MarketContext, Product};

pub use blended::BlendedStrategy;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingResult {
    pub new_price: f64,
    /// Relative adjustment applied to the base price (0.05 = +5%).
    pub adjustment: f64,
    pub explanation: String,
}

impl PricingResult {
    /// Result that keeps the base price unchanged.
    pub fn unchanged(product: &Product) -> Self {
        Self {
            new_price: product.base_price,
            adjustment: 0.0,
            explanation: "price unchanged".to_string(),
        }
    }
}

pub trait PricingStrategy: Send + Sync {
    fn calculate(
        &self,
        product: &Product,
        context: &MarketContext,
    ) -> Result<PricingResult, StrategyError>;
}

impl<F> PricingStrategy for F
where
    F: Fn(&Product, &MarketContext) -> Result<PricingResult, StrategyError> + Send + Sync,
{
    fn calculate(
        &self,
        product: &Product,
        context: &MarketContext,
    ) -> Result<PricingResult, StrategyError> {
        self(product, context)
    }
}
