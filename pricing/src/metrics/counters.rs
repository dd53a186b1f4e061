use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::market::SharedPriceTable;

/// Task counters for one run.
///
/// Updated with atomic fetch-add, independently of the history lock, so a
/// snapshot taken while units are running may lag the history by the tasks
/// in flight.
#[derive(Debug, Default)]
pub struct RunStatistics {
    total: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl RunStatistics {
    pub fn record(&self, success: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, table: &SharedPriceTable) -> StatsSnapshot {
        let range = table.price_range();
        StatsSnapshot {
            total: self.total(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            unique_products: table.size(),
            min_price: range.map(|(lo, _)| lo),
            max_price: range.map(|(_, hi)| hi),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub unique_products: usize,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl StatsSnapshot {
    /// Succeeded share of all tasks, in percent. 0 for an empty run.
    pub fn success_rate(&self) -> f64 {
        Self::percent(self.succeeded, self.total)
    }

    pub fn failure_rate(&self) -> f64 {
        Self::percent(self.failed, self.total)
    }

    fn percent(part: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            part as f64 * 100.0 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn empty_run_has_zero_rates() {
        let stats = RunStatistics::default();
        let snap = stats.snapshot(&SharedPriceTable::new());

        assert_eq!(snap.total, 0);
        assert_eq!(snap.success_rate(), 0.0);
        assert_eq!(snap.failure_rate(), 0.0);
        assert_eq!(snap.min_price, None);
        assert_eq!(snap.max_price, None);
    }

    #[test]
    fn snapshot_reads_table_range() {
        let table = SharedPriceTable::new();
        table.set("A", 120.0);
        table.set("B", 80.0);

        let stats = RunStatistics::default();
        stats.record(true);
        stats.record(true);
        stats.record(false);
        let snap = stats.snapshot(&table);

        assert_eq!(snap.unique_products, 2);
        assert_eq!(snap.min_price, Some(80.0));
        assert_eq!(snap.max_price, Some(120.0));
        assert!((snap.failure_rate() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn concurrent_records_balance() {
        let stats = Arc::new(RunStatistics::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let stats = stats.clone();
                thread::spawn(move || {
                    for j in 0..1_000 {
                        stats.record((i + j) % 3 != 0);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.total(), 8_000);
        assert_eq!(stats.succeeded() + stats.failed(), stats.total());
    }

    #[test]
    fn snapshot_serializes_as_flat_object() {
        let snap = StatsSnapshot {
            total: 2,
            succeeded: 2,
            failed: 0,
            unique_products: 2,
            min_price: Some(1.5),
            max_price: None,
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["min_price"], 1.5);
        assert!(json["max_price"].is_null());
    }
}
