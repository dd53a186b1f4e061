//! Reference strategy used by the demo binary.
//!
//! Blends four bounded factors (stock pressure, competitor gap, demand, time
//! of day) into one relative adjustment and clamps the result to
//! `[0.5, 2.0] * base_price`.

use super::{PricingResult, PricingStrategy};
use crate::error::StrategyError;
use crate::market::types::{MarketContext, Product};

const STOCK_WEIGHT: f64 = 0.35;
const COMPETITOR_WEIGHT: f64 = 0.25;
const DEMAND_WEIGHT: f64 = 0.25;
const TIME_WEIGHT: f64 = 0.15;

const MIN_PRICE_MULTIPLIER: f64 = 0.5;
const MAX_PRICE_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct BlendedStrategy;

impl BlendedStrategy {
    fn stock_factor(p: &Product, ctx: &MarketContext) -> f64 {
        let ratio = p.stock as f64 / ctx.demand_forecast.max(1.0);
        let mut f: f64 = if ratio > 2.5 {
            -0.18
        } else if ratio > 1.5 {
            -0.08
        } else if ratio < 0.3 {
            0.12
        } else if ratio < 0.7 {
            0.05
        } else {
            0.0
        };

        // Older model with a newer sibling on the shelf
        if !p.is_new_model && ctx.newer_model_available {
            f -= 0.05 + 0.1 * (p.stock as f64 / 500.0).clamp(0.0, 1.0);
        }
        f.clamp(-0.25, 0.2)
    }

    fn competitor_factor(p: &Product, ctx: &MarketContext) -> f64 {
        if ctx.competitor_price <= 0.0 || p.base_price <= 0.0 {
            return 0.0;
        }
        let gap = (ctx.competitor_price - p.base_price) / p.base_price;
        let f = if gap < -0.05 {
            let severity = ((-0.05 - gap) / 0.3).clamp(0.0, 1.0);
            let mut cut = -0.06 - 0.12 * severity;
            if p.is_new_model || ctx.demand_forecast > 150.0 {
                cut *= 0.6;
            }
            cut
        } else if gap > 0.05 {
            (gap * 0.5).min(0.05)
        } else {
            0.0
        };
        f.clamp(-0.3, 0.2)
    }

    fn demand_factor(ctx: &MarketContext) -> f64 {
        let mut f = (ctx.demand_forecast / 200.0).clamp(-0.2, 0.2);

        if ctx.view_count >= 50 {
            let views = ctx.view_count as f64;
            let conversion = ctx.purchase_count as f64 / views;
            let cart_rate = ctx.cart_count as f64 / views;
            f += if conversion < 0.03 && cart_rate > 0.1 {
                -0.08
            } else if conversion < 0.05 {
                -0.05
            } else if cart_rate > 0.2 && conversion < 0.1 {
                -0.03
            } else {
                0.0
            };
        }
        f.clamp(-0.25, 0.25)
    }

    fn time_factor(p: &Product, ctx: &MarketContext) -> f64 {
        let mut f: f64 = 0.0;
        if ctx.is_peak_season {
            let ratio = p.stock as f64 / ctx.demand_forecast.max(1.0);
            f += if ratio < 0.3 {
                0.08
            } else if ratio < 0.7 {
                0.06
            } else {
                0.02
            };
        }
        match ctx.hour_of_day {
            h if h >= 20 || h < 6 => f -= 0.01,
            10..=16 => f += 0.01,
            _ => {}
        }
        f.clamp(-0.15, 0.2)
    }
}

impl PricingStrategy for BlendedStrategy {
    fn calculate(
        &self,
        product: &Product,
        context: &MarketContext,
    ) -> Result<PricingResult, StrategyError> {
        if !product.base_price.is_finite() || product.base_price <= 0.0 {
            return Err(StrategyError::Rejected(format!(
                "base price must be positive, got {}",
                product.base_price
            )));
        }

        let stock = Self::stock_factor(product, context);
        let competitor = Self::competitor_factor(product, context);
        let demand = Self::demand_factor(context);
        let time = Self::time_factor(product, context);

        let adjustment = STOCK_WEIGHT * stock
            + COMPETITOR_WEIGHT * competitor
            + DEMAND_WEIGHT * demand
            + TIME_WEIGHT * time;

        let new_price = (product.base_price * (1.0 + adjustment)).clamp(
            product.base_price * MIN_PRICE_MULTIPLIER,
            product.base_price * MAX_PRICE_MULTIPLIER,
        );

        Ok(PricingResult {
            new_price,
            adjustment,
            explanation: format!(
                "stock={stock:.3} competitor={competitor:.3} demand={demand:.3} time={time:.3} total={:.2}%",
                adjustment * 100.0
            ),
        })
    }
}
