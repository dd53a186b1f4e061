use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::EngineError;
use crate::execution::types::PricingTask;
use crate::time::local_timestamp;

pub const CSV_HEADER: &str =
    "timestamp,merchant,product,original_price,adjusted_price,adjustment_rate,stock_level,status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Success,
    Failed,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordStatus::Success => "SUCCESS",
            RecordStatus::Failed => "FAILED",
        })
    }
}

/// Immutable audit row for one completed task, stamped when it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    pub timestamp: String,
    pub merchant: String,
    pub product_id: String,
    pub original_price: f64,
    pub adjusted_price: f64,
    /// Percent, e.g. `-3.5` for a 3.5% cut.
    pub adjustment_rate: f64,
    pub stock_level: u32,
    pub status: RecordStatus,
}

impl PriceRecord {
    pub fn from_task(task: &PricingTask, merchant: &str) -> Self {
        Self {
            timestamp: local_timestamp(),
            merchant: merchant.to_string(),
            product_id: task.product_id.clone(),
            original_price: task.base_price,
            adjusted_price: task.adjusted_price,
            adjustment_rate: task.adjustment_rate(),
            stock_level: task.stock_level,
            status: if task.is_success() {
                RecordStatus::Success
            } else {
                RecordStatus::Failed
            },
        }
    }

    fn write_csv_row<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(
            w,
            "{},{},{},{:.2},{:.2},{:.2}%,{},{}",
            csv_field(&self.timestamp),
            csv_field(&self.merchant),
            csv_field(&self.product_id),
            self.original_price,
            self.adjusted_price,
            self.adjustment_rate,
            self.stock_level,
            self.status
        )
    }
}

/// Append-only price-change history of a run.
///
/// Order of records is lock-acquisition order, which across execution units
/// says nothing about submission order.
#[derive(Debug, Default)]
pub struct HistoryRecorder {
    records: Mutex<Vec<PriceRecord>>,
}

impl HistoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, task: &PricingTask, merchant: &str) -> PriceRecord {
        let record = PriceRecord::from_task(task, merchant);
        self.records.lock().push(record.clone());
        record
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn records(&self) -> Vec<PriceRecord> {
        self.records.lock().clone()
    }

    /// Write the header and every record as CSV.
    ///
    /// The history lock is held for the whole write, so the export is a
    /// consistent cut relative to concurrent `record` calls. It is not atomic
    /// with respect to the file system.
    pub fn export_to<W: Write>(&self, destination: &mut W) -> std::io::Result<usize> {
        let records = self.records.lock();
        writeln!(destination, "{CSV_HEADER}")?;
        for r in records.iter() {
            r.write_csv_row(destination)?;
        }
        destination.flush()?;
        Ok(records.len())
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn export_to_path(&self, path: impl AsRef<Path>) -> Result<usize, EngineError> {
        let path = path.as_ref();
        let export_err = |source| EngineError::Export {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(export_err)?;
        }
        let mut out = BufWriter::new(File::create(path).map_err(export_err)?);
        let rows = self.export_to(&mut out).map_err(export_err)?;

        info!(rows, "price history exported");
        Ok(rows)
    }
}

fn csv_field(raw: &str) -> std::borrow::Cow<'_, str> {
    if raw.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", raw.replace('"', "\"\"")).into()
    } else {
        raw.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::types::TaskOutcome;
    use std::sync::Arc;
    use std::thread;

    fn completed(product: &str, base: f64, adjusted: f64, ok: bool) -> PricingTask {
        let mut t = PricingTask::pending("Shop", product);
        t.base_price = base;
        t.adjusted_price = adjusted;
        t.stock_level = 42;
        t.outcome = if ok {
            TaskOutcome::Succeeded
        } else {
            TaskOutcome::Failed {
                reason: "x".into(),
            }
        };
        t
    }

    #[test]
    fn record_derives_rate_and_status() {
        let h = HistoryRecorder::new();
        let r = h.record(&completed("A", 200.0, 180.0, true), "Shop");

        assert_eq!(r.status, RecordStatus::Success);
        assert!((r.adjustment_rate + 10.0).abs() < 1e-9);
        assert_eq!(r.stock_level, 42);
        assert_eq!(h.len(), 1);

        let failed = h.record(&completed("B", 100.0, 100.0, false), "Shop");
        assert_eq!(failed.status, RecordStatus::Failed);
        assert_eq!(failed.adjustment_rate, 0.0);
    }

    #[test]
    fn timestamp_is_taken_at_record_time() {
        let mut task = completed("A", 10.0, 11.0, true);
        task.created_at = task.created_at - chrono::Duration::hours(2);
        let queued_at = crate::time::format_local(&task.created_at);

        let before = local_timestamp();
        let r = HistoryRecorder::new().record(&task, "Shop");

        assert!(r.timestamp >= before, "{} < {before}", r.timestamp);
        assert_ne!(r.timestamp, queued_at);
    }

    #[test]
    fn zero_base_price_gives_zero_rate() {
        let h = HistoryRecorder::new();
        let r = h.record(&completed("A", 0.0, 0.0, false), "Shop");
        assert_eq!(r.adjustment_rate, 0.0);
    }

    #[test]
    fn export_writes_fixed_schema() {
        let h = HistoryRecorder::new();
        h.record(&completed("iPhone-15-Pro", 100.0, 105.0, true), "Shop");
        h.record(&completed("RTX-4090", 80.0, 80.0, false), "Shop");

        let mut out = Vec::new();
        let rows = h.export_to(&mut out).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].ends_with(",Shop,iPhone-15-Pro,100.00,105.00,5.00%,42,SUCCESS"));
        assert!(lines[2].ends_with(",Shop,RTX-4090,80.00,80.00,0.00%,42,FAILED"));
    }

    #[test]
    fn export_of_empty_history_is_header_only() {
        let mut out = Vec::new();
        assert_eq!(HistoryRecorder::new().export_to(&mut out).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), format!("{CSV_HEADER}\n"));
    }

    #[test]
    fn merchant_names_with_commas_are_quoted() {
        let h = HistoryRecorder::new();
        h.record(&completed("A", 1.0, 1.0, true), "Smith, \"Sons\"");

        let mut out = Vec::new();
        h.export_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(",\"Smith, \"\"Sons\"\"\",A,"));
    }

    #[test]
    fn export_to_path_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("trend.csv");

        let h = HistoryRecorder::new();
        h.record(&completed("A", 10.0, 11.0, true), "Shop");

        assert_eq!(h.export_to_path(&path).unwrap(), 1);
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn export_to_unwritable_path_is_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = HistoryRecorder::new().export_to_path(dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::Export { .. }));
    }

    #[test]
    fn concurrent_records_are_all_kept() {
        let h = Arc::new(HistoryRecorder::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let h = h.clone();
                thread::spawn(move || {
                    for j in 0..50 {
                        h.record(&completed(&format!("P{i}-{j}"), 1.0, 1.0, true), "Shop");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(h.len(), 400);
    }
}
