//! Market inputs for the pricing strategy.
//!
//! There is no live market-data feed: the executor asks a
//! [`MarketDataProvider`] for a first price and for a per-task snapshot.
//! Production runs use [`SeededMarketData`], which draws plausible values from
//! a seeded generator so load tests are reproducible; tests inject
//! [`FixedMarketData`].

use std::collections::HashMap;
use std::ops::RangeInclusive;

use chrono::Timelike;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::sales::ProductHistory;
use super::types::{MarketContext, MarketObservation, Product};

pub trait MarketDataProvider: Send + Sync {
    /// Price used the first time a product is priced in a run.
    fn initial_price(&self, product_id: &str) -> f64;

    /// Product and market snapshot for one task.
    fn observe(&self, product_id: &str, base_price: f64) -> MarketObservation;
}

/// Ranges the simulated signals are drawn from.
#[derive(Debug, Clone)]
pub struct SimulationProfile {
    pub base_price: RangeInclusive<f64>,
    pub stock: RangeInclusive<u32>,
    pub views: RangeInclusive<u32>,
    pub carts: RangeInclusive<u32>,
    pub purchases: RangeInclusive<u32>,
    pub demand: RangeInclusive<f64>,
    /// Competitor price as a multiple of the current price.
    pub competitor_ratio: RangeInclusive<f64>,
    pub peak_season_probability: f64,
    pub newer_model_probability: f64,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            base_price: 5_000.0..=15_000.0,
            stock: 50..=500,
            views: 100..=2_000,
            carts: 20..=400,
            purchases: 5..=80,
            demand: 50.0..=250.0,
            competitor_ratio: 0.85..=1.15,
            peak_season_probability: 0.3,
            newer_model_probability: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LastSeen {
    price: f64,
    stock: u32,
}

pub struct SeededMarketData {
    profile: SimulationProfile,
    rng: Mutex<StdRng>,
    last_seen: RwLock<HashMap<String, LastSeen>>,
}

impl SeededMarketData {
    pub fn new(profile: SimulationProfile, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            profile,
            rng: Mutex::new(rng),
            last_seen: RwLock::new(HashMap::new()),
        }
    }

    /// Seed first prices and stock levels from grouped sales history.
    ///
    /// Products with history start from their last observed price instead of
    /// a synthesized one.
    pub fn prime_from_history<'a, I>(&self, histories: I) -> usize
    where
        I: IntoIterator<Item = &'a ProductHistory>,
    {
        let mut g = self.last_seen.write();
        let mut primed = 0;
        for h in histories {
            if let Some(last) = h.last() {
                g.insert(
                    h.product_id.clone(),
                    LastSeen {
                        price: last.price,
                        stock: last.stock,
                    },
                );
                primed += 1;
            }
        }
        debug!(primed, "market data primed from sales history");
        primed
    }
}

impl MarketDataProvider for SeededMarketData {
    fn initial_price(&self, product_id: &str) -> f64 {
        if let Some(seen) = self.last_seen.read().get(product_id) {
            return seen.price;
        }
        self.rng.lock().gen_range(self.profile.base_price.clone())
    }

    fn observe(&self, product_id: &str, base_price: f64) -> MarketObservation {
        let seen_stock = self.last_seen.read().get(product_id).map(|s| s.stock);
        let p = &self.profile;

        let (product, context) = {
            let mut rng = self.rng.lock();

            let stock = seen_stock.unwrap_or_else(|| rng.gen_range(p.stock.clone()));
            let product = Product::new(product_id, base_price, stock);

            let context = MarketContext {
                competitor_price: base_price * rng.gen_range(p.competitor_ratio.clone()),
                demand_forecast: rng.gen_range(p.demand.clone()),
                is_peak_season: rng.gen_bool(p.peak_season_probability),
                view_count: rng.gen_range(p.views.clone()),
                cart_count: rng.gen_range(p.carts.clone()),
                purchase_count: rng.gen_range(p.purchases.clone()),
                hour_of_day: chrono::Local::now().hour(),
                newer_model_available: rng.gen_bool(p.newer_model_probability),
            };
            (product, context)
        };

        MarketObservation { product, context }
    }
}

/// Deterministic provider: every product starts at the same price and every
/// snapshot carries the same context.
#[derive(Debug, Clone)]
pub struct FixedMarketData {
    pub initial_price: f64,
    pub stock: u32,
    pub context: MarketContext,
}

impl FixedMarketData {
    pub fn new(initial_price: f64) -> Self {
        Self {
            initial_price,
            stock: 100,
            context: MarketContext {
                competitor_price: initial_price,
                demand_forecast: 100.0,
                is_peak_season: false,
                view_count: 500,
                cart_count: 50,
                purchase_count: 25,
                hour_of_day: 12,
                newer_model_available: false,
            },
        }
    }
}

impl MarketDataProvider for FixedMarketData {
    fn initial_price(&self, _product_id: &str) -> f64 {
        self.initial_price
    }

    fn observe(&self, product_id: &str, base_price: f64) -> MarketObservation {
        MarketObservation {
            product: Product::new(product_id, base_price, self.stock),
            context: self.context.clone(),
        }
    }
}
