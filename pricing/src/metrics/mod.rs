pub mod counters;

pub use counters::{RunStatistics, StatsSnapshot};
