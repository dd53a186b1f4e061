pub mod recorder;

pub use recorder::{CSV_HEADER, HistoryRecorder, PriceRecord, RecordStatus};
