pub mod config;
pub mod execution;
pub mod history;
pub mod journal;
pub mod market;
pub mod metrics;
pub mod scheduler;
pub mod strategy;

pub mod error;
pub mod logger;
pub mod time;
