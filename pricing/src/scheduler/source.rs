use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rand::Rng;
use tracing::debug;

use crate::execution::types::{Merchant, PricingTask};
use crate::scheduler::context::RunContext;

/// Where an execution unit gets its next task from.
///
/// `None` ends the unit.
pub trait WorkSource: Send {
    fn next_task(&mut self) -> Option<PricingTask>;

    /// Called after each task has been executed and recorded.
    fn after_task(&mut self) {}

    /// True when the source ended because of cancellation with work left.
    fn interrupted(&self) -> bool {
        false
    }
}

/// Walks one merchant's products in order, pausing between them.
pub struct MerchantWorkSource {
    merchant: Merchant,
    next: usize,
    ctx: Arc<RunContext>,
    throttle_ms: RangeInclusive<u64>,
    interrupted: bool,
}

impl MerchantWorkSource {
    pub fn new(merchant: Merchant, ctx: Arc<RunContext>, throttle_ms: RangeInclusive<u64>) -> Self {
        let (lo, hi) = (*throttle_ms.start(), *throttle_ms.end());
        Self {
            merchant,
            next: 0,
            ctx,
            throttle_ms: lo.min(hi)..=lo.max(hi),
            interrupted: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.merchant.products.len().saturating_sub(self.next)
    }
}

impl WorkSource for MerchantWorkSource {
    fn next_task(&mut self) -> Option<PricingTask> {
        if self.ctx.is_cancelled() {
            if self.remaining() > 0 {
                self.interrupted = true;
                debug!(
                    merchant = %self.merchant.name,
                    skipped = self.remaining(),
                    "cancelled; remaining products skipped"
                );
            }
            return None;
        }

        let product = self.merchant.products.get(self.next)?;
        self.next += 1;
        Some(PricingTask::pending(&self.merchant.name, product))
    }

    fn after_task(&mut self) {
        if self.remaining() == 0 || *self.throttle_ms.end() == 0 {
            return;
        }
        let ms = rand::thread_rng().gen_range(self.throttle_ms.clone());
        thread::sleep(Duration::from_millis(ms));
    }

    fn interrupted(&self) -> bool {
        self.interrupted
    }
}

/// FIFO of pending tasks shared by the worker pool.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<PricingTask>>,
    ready: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue and wake exactly one waiting worker.
    pub fn push(&self, task: PricingTask) {
        self.tasks.lock().push_back(task);
        self.ready.notify_one();
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// Cancel `ctx` and wake every waiting worker.
    ///
    /// The flag is raised under the queue lock so a worker cannot check it,
    /// miss the store and then sleep through the wake-up.
    pub fn close(&self, ctx: &RunContext) {
        {
            let _tasks = self.tasks.lock();
            ctx.cancel();
        }
        self.ready.notify_all();
    }

    /// Block until a task is available or the run is cancelled with nothing
    /// left to do. Queued tasks are always handed out before `None`.
    pub fn pop_or_wait(&self, ctx: &RunContext) -> Option<PricingTask> {
        let mut tasks = self.tasks.lock();
        loop {
            if let Some(task) = tasks.pop_front() {
                return Some(task);
            }
            if ctx.is_cancelled() {
                return None;
            }
            self.ready.wait(&mut tasks);
        }
    }
}

pub struct QueueWorkSource {
    queue: Arc<TaskQueue>,
    ctx: Arc<RunContext>,
}

impl QueueWorkSource {
    pub fn new(queue: Arc<TaskQueue>, ctx: Arc<RunContext>) -> Self {
        Self { queue, ctx }
    }
}

impl WorkSource for QueueWorkSource {
    fn next_task(&mut self) -> Option<PricingTask> {
        self.queue.pop_or_wait(&self.ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn merchant_source_yields_products_in_order() {
        let ctx = Arc::new(RunContext::new());
        let mut src = MerchantWorkSource::new(Merchant::new("M", ["A", "B", "C"], 1), ctx, 0..=0);

        let ids: Vec<String> = std::iter::from_fn(|| src.next_task())
            .map(|t| t.product_id)
            .collect();
        assert_eq!(ids, ["A", "B", "C"]);
        assert_eq!(src.remaining(), 0);
    }

    #[test]
    fn merchant_source_stops_when_cancelled() {
        let ctx = Arc::new(RunContext::new());
        let mut src =
            MerchantWorkSource::new(Merchant::new("M", ["A", "B", "C"], 1), ctx.clone(), 0..=0);

        assert_eq!(src.next_task().map(|t| t.product_id), Some("A".to_string()));
        ctx.cancel();
        assert!(src.next_task().is_none());
        assert_eq!(src.remaining(), 2);
    }

    #[test]
    fn throttle_sleeps_within_bounds() {
        let ctx = Arc::new(RunContext::new());
        let mut src = MerchantWorkSource::new(Merchant::new("M", ["A", "B"], 1), ctx, 20..=30);

        src.next_task();
        let start = Instant::now();
        src.after_task();
        assert!(start.elapsed() >= Duration::from_millis(20));

        // No pause after the last product.
        src.next_task();
        let start = Instant::now();
        src.after_task();
        assert!(start.elapsed() < Duration::from_millis(20));
    }

    #[test]
    fn reversed_throttle_bounds_are_normalized() {
        let ctx = Arc::new(RunContext::new());
        let mut src = MerchantWorkSource::new(Merchant::new("M", ["A", "B"], 1), ctx, 30..=10);

        src.next_task();
        let start = Instant::now();
        src.after_task();
        let slept = start.elapsed();
        assert!(slept >= Duration::from_millis(10), "slept {slept:?}");
    }

    #[test]
    fn interrupted_only_with_products_left() {
        let ctx = Arc::new(RunContext::new());
        let mut src = MerchantWorkSource::new(Merchant::new("M", ["A"], 1), ctx.clone(), 0..=0);

        src.next_task();
        ctx.cancel();
        assert!(src.next_task().is_none());
        assert!(!src.interrupted());

        let mut src = MerchantWorkSource::new(Merchant::new("M", ["A", "B"], 1), ctx, 0..=0);
        assert!(src.next_task().is_none());
        assert!(src.interrupted());
    }

    #[test]
    fn closed_queue_still_hands_out_queued_tasks() {
        let ctx = RunContext::new();
        let q = TaskQueue::new();
        q.push(PricingTask::pending("M", "A"));
        q.push(PricingTask::pending("M", "B"));
        q.close(&ctx);

        assert_eq!(q.pop_or_wait(&ctx).map(|t| t.product_id), Some("A".into()));
        assert_eq!(q.pop_or_wait(&ctx).map(|t| t.product_id), Some("B".into()));
        assert!(q.pop_or_wait(&ctx).is_none());
    }

    #[test]
    fn waiting_worker_wakes_on_push_and_on_close() {
        let ctx = Arc::new(RunContext::new());
        let q = Arc::new(TaskQueue::new());

        let worker = {
            let (q, ctx) = (q.clone(), ctx.clone());
            thread::spawn(move || {
                let mut src = QueueWorkSource::new(q, ctx);
                let mut seen = 0;
                while src.next_task().is_some() {
                    seen += 1;
                }
                seen
            })
        };

        thread::sleep(Duration::from_millis(20));
        q.push(PricingTask::pending("M", "A"));
        thread::sleep(Duration::from_millis(20));
        q.close(&ctx);

        assert_eq!(worker.join().unwrap(), 1);
        assert!(q.is_empty());
    }
}
