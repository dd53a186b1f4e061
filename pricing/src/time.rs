use chrono::{DateTime, Local};

/// Layout of history row timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_local(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn local_timestamp() -> String {
    format_local(&Local::now())
}
