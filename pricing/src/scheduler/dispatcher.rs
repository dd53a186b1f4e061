//! Dispatcher for concurrent pricing runs.
//!
//! Responsibilities:
//! - Spawn execution units: one thread per merchant, or a fixed worker pool
//!   fed through [`Dispatcher::add_task`].
//! - Run every unit through the same loop: execute, record history, count.
//! - Cooperative shutdown through the run's cancellation flag.
//!
//! Non-responsibilities:
//! - Pricing decisions (the strategy) and price-table writes (the executor).
//! - Ordering across units. Within one unit tasks run in source order; across
//!   units nothing is ordered.
//!
//! Every `start_*` call clears the cancellation flag, so a dispatcher can be
//! started again after `stop_all`. Units of an earlier batch that have not
//! been joined yet run again as well.

use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{Span, debug, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::execution::TaskExecutor;
use crate::execution::types::{Merchant, PricingTask};
use crate::history::HistoryRecorder;
use crate::journal::LogSink;
use crate::logger::{RunId, annotate_product, run_span, unit_span};
use crate::market::{MarketDataProvider, SharedPriceTable};
use crate::metrics::StatsSnapshot;
use crate::scheduler::context::RunContext;
use crate::scheduler::source::{MerchantWorkSource, QueueWorkSource, TaskQueue, WorkSource};
use crate::strategy::PricingStrategy;

/// Everything an execution unit touches, shared by `Arc`.
struct UnitDeps {
    executor: TaskExecutor,
    journal: Arc<LogSink>,
    history: Arc<HistoryRecorder>,
    ctx: Arc<RunContext>,
}

pub struct Dispatcher {
    table: Arc<SharedPriceTable>,
    journal: Arc<LogSink>,
    queue: Arc<TaskQueue>,
    deps: Arc<UnitDeps>,
    throttle_ms: RangeInclusive<u64>,
    span: Span,
    units: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Dispatcher writing its operator log to `config.log_path`.
    pub fn from_config(config: &EngineConfig, market: Arc<dyn MarketDataProvider>) -> Self {
        let journal = Arc::new(LogSink::open(&config.log_path));
        Self::new(config, market, journal)
    }

    pub fn new(
        config: &EngineConfig,
        market: Arc<dyn MarketDataProvider>,
        journal: Arc<LogSink>,
    ) -> Self {
        let table = Arc::new(SharedPriceTable::new());
        let history = Arc::new(HistoryRecorder::new());
        let ctx = Arc::new(RunContext::new());

        let executor = TaskExecutor::new(
            table.clone(),
            journal.clone(),
            market,
            config.slow_strategy_threshold,
        );
        let span = run_span(ctx.run_id());
        info!(run_id = %ctx.run_id(), "dispatcher created");

        Self {
            table,
            journal: journal.clone(),
            queue: Arc::new(TaskQueue::new()),
            deps: Arc::new(UnitDeps {
                executor,
                journal,
                history,
                ctx,
            }),
            throttle_ms: config.throttle_ms.clone(),
            span,
            units: Mutex::new(Vec::new()),
        }
    }

    /// Spawn one unit per merchant and return without waiting.
    ///
    /// If a spawn fails, units already started keep running and are still
    /// joined by [`wait_all`](Self::wait_all).
    pub fn start_pricing(
        &self,
        merchants: Vec<Merchant>,
        strategy: Arc<dyn PricingStrategy>,
    ) -> Result<(), EngineError> {
        info!(merchants = merchants.len(), "starting per-merchant units");
        self.deps.ctx.resume();
        self.journal.log(format!(
            "=== Pricing System Started: {} merchants ===",
            merchants.len()
        ));

        for merchant in merchants {
            debug!(
                merchant = %merchant.name,
                priority = merchant.priority,
                products = merchant.products.len(),
                "spawning merchant unit"
            );
            let name = format!("merchant-{}", merchant.name);
            let source =
                MerchantWorkSource::new(merchant, self.deps.ctx.clone(), self.throttle_ms.clone());
            self.spawn_unit(name, source, strategy.clone())?;
        }
        Ok(())
    }

    /// Spawn `workers` units draining the shared queue.
    pub fn start_workers(
        &self,
        workers: usize,
        strategy: Arc<dyn PricingStrategy>,
    ) -> Result<(), EngineError> {
        if workers == 0 {
            warn!("worker pool started with zero workers; queued tasks will not run");
        }
        info!(workers, pending = self.pending_tasks(), "starting worker pool");
        self.deps.ctx.resume();
        self.journal
            .log(format!("=== Worker Pool Started: {workers} workers ==="));

        for i in 0..workers {
            let source = QueueWorkSource::new(self.queue.clone(), self.deps.ctx.clone());
            self.spawn_unit(format!("worker-{i}"), source, strategy.clone())?;
        }
        Ok(())
    }

    /// Enqueue a task for the worker pool and wake one waiting worker.
    ///
    /// Accepted even after [`stop_all`](Self::stop_all): workers that are
    /// still draining will run it, otherwise it stays in
    /// [`pending_tasks`](Self::pending_tasks).
    pub fn add_task(&self, task: PricingTask) {
        if self.deps.ctx.is_cancelled() {
            debug!(product_id = %task.product_id, "task added after stop");
        }
        self.queue.push(task);
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    /// Set the cancellation flag and wake idle workers. Does not join.
    ///
    /// Merchant units exit before their next product; pool workers first
    /// drain whatever is queued.
    pub fn stop_all(&self) {
        info!(pending = self.pending_tasks(), "stop requested");
        if !self.deps.ctx.is_cancelled() {
            self.journal.log("=== Stop Requested ===");
        }
        self.queue.close(&self.deps.ctx);
    }

    /// Join every unit spawned so far.
    pub fn wait_all(&self) {
        let handles = std::mem::take(&mut *self.units.lock());
        let joined = handles.len();
        for h in handles {
            let name = h.thread().name().unwrap_or("unnamed").to_string();
            if h.join().is_err() {
                warn!(unit = %name, "execution unit panicked");
            }
        }
        debug!(joined, "execution units joined");
    }

    /// Stop, join every unit and flush the operator log.
    pub fn shutdown(&self) {
        self.stop_all();
        self.wait_all();
        self.journal.shutdown();
    }

    pub fn statistics(&self) -> StatsSnapshot {
        self.deps.ctx.stats().snapshot(&self.table)
    }

    pub fn export_history(&self, path: impl AsRef<Path>) -> Result<usize, EngineError> {
        self.deps.history.export_to_path(path)
    }

    pub fn price_table(&self) -> &SharedPriceTable {
        &self.table
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.deps.history
    }

    pub fn journal(&self) -> &LogSink {
        &self.journal
    }

    pub fn run_id(&self) -> &RunId {
        self.deps.ctx.run_id()
    }

    fn spawn_unit<S>(
        &self,
        name: String,
        source: S,
        strategy: Arc<dyn PricingStrategy>,
    ) -> Result<(), EngineError>
    where
        S: WorkSource + 'static,
    {
        let deps = self.deps.clone();
        let parent = self.span.clone();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let span = parent.in_scope(|| unit_span(deps.ctx.run_id(), &name));
                let _entered = span.enter();
                run_unit(&name, source, &deps, strategy.as_ref());
            })
            .map_err(EngineError::Spawn)?;

        self.units.lock().push(handle);
        Ok(())
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_unit<S: WorkSource>(
    name: &str,
    mut source: S,
    deps: &UnitDeps,
    strategy: &dyn PricingStrategy,
) {
    let mut processed = 0u64;
    deps.journal.log(format!("[{name}] Started"));

    while let Some(task) = source.next_task() {
        annotate_product(&task.product_id);

        let done = deps.executor.execute(task, strategy);
        deps.history.record(&done, &done.merchant);
        deps.ctx.stats().record(done.is_success());
        processed += 1;

        source.after_task();
    }

    if source.interrupted() {
        deps.journal
            .log(format!("[{name}] Stopped by signal after {processed} tasks"));
        info!(processed, "execution unit stopped by signal");
    } else {
        deps.journal
            .log(format!("[{name}] Completed: {processed} tasks"));
        info!(processed, "execution unit finished");
    }
}
