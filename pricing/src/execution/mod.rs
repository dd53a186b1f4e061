pub mod executor;
pub mod types;

pub use executor::TaskExecutor;
pub use types::{Merchant, PricingTask, TaskOutcome};
