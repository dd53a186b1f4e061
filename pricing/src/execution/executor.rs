//! Single-task orchestration.
//!
//! `TaskExecutor` turns one pending (merchant, product) task into a completed
//! one: read the current price, gather market inputs, ask the strategy, write
//! the new price, log a summary line.
//!
//! It holds no mutable state of its own; everything shared lives in the price
//! table and the log sink. Strategy failures of any kind (error, panic,
//! unusable price) become a failed task and never leave this module.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::StrategyError;
use crate::execution::types::{PricingTask, TaskOutcome};
use crate::journal::LogSink;
use crate::logger::warn_if_slow;
use crate::market::types::{MarketContext, Product};
use crate::market::{MarketDataProvider, SharedPriceTable};
use crate::strategy::{PricingResult, PricingStrategy};

pub struct TaskExecutor {
    table: Arc<SharedPriceTable>,
    journal: Arc<LogSink>,
    market: Arc<dyn MarketDataProvider>,
    slow_strategy_threshold: Duration,
}

impl TaskExecutor {
    pub fn new(
        table: Arc<SharedPriceTable>,
        journal: Arc<LogSink>,
        market: Arc<dyn MarketDataProvider>,
        slow_strategy_threshold: Duration,
    ) -> Self {
        Self {
            table,
            journal,
            market,
            slow_strategy_threshold,
        }
    }

    /// Execute `task` with `strategy` and return it completed.
    ///
    /// Writes to the price table are last-writer-wins: two units repricing
    /// the same product concurrently each write atomically, and whichever
    /// lands last is kept.
    pub fn execute(&self, mut task: PricingTask, strategy: &dyn PricingStrategy) -> PricingTask {
        let current = match self.table.get(&task.product_id) {
            Some(p) => p,
            None => {
                let first = self.market.initial_price(&task.product_id);
                debug!(product_id = %task.product_id, first, "first pricing of product");
                first
            }
        };

        let observation = self.market.observe(&task.product_id, current);
        task.base_price = current;
        task.stock_level = observation.product.stock;

        let result = warn_if_slow("pricing_strategy", self.slow_strategy_threshold, || {
            invoke(strategy, &observation.product, &observation.context)
        });

        match result {
            Ok(priced) => {
                self.table.set(&task.product_id, priced.new_price);
                task.adjusted_price = priced.new_price;
                task.outcome = TaskOutcome::Succeeded;

                debug!(
                    task_id = %task.task_id,
                    merchant = %task.merchant,
                    product_id = %task.product_id,
                    base_price = current,
                    new_price = priced.new_price,
                    explanation = %priced.explanation,
                    "task priced"
                );
                self.journal.log(format!(
                    "[{}] {}: {:.2} -> {:.2} ({:+.2}%)",
                    task.merchant,
                    task.product_id,
                    current,
                    priced.new_price,
                    task.adjustment_rate()
                ));
            }
            Err(e) => {
                task.adjusted_price = current;
                task.outcome = TaskOutcome::Failed {
                    reason: e.to_string(),
                };

                warn!(
                    task_id = %task.task_id,
                    merchant = %task.merchant,
                    product_id = %task.product_id,
                    error = %e,
                    "pricing task failed"
                );
                self.journal.log(format!(
                    "[ERROR] {} - {}: {}",
                    task.merchant, task.product_id, e
                ));
            }
        }

        task
    }
}

fn invoke(
    strategy: &dyn PricingStrategy,
    product: &Product,
    context: &MarketContext,
) -> Result<PricingResult, StrategyError> {
    let priced = catch_unwind(AssertUnwindSafe(|| strategy.calculate(product, context)))
        .map_err(|payload| StrategyError::Panicked(panic_message(payload.as_ref())))??;

    if !priced.new_price.is_finite() || priced.new_price <= 0.0 {
        return Err(StrategyError::InvalidPrice(priced.new_price));
    }
    Ok(priced)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
