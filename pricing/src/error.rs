use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a single strategy invocation did not produce a usable price.
///
/// These never cross a thread boundary as errors: the executor folds them
/// into a failed task.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("strategy rejected input: {0}")]
    Rejected(String),

    #[error("strategy produced invalid price: {0}")]
    InvalidPrice(f64),

    #[error("strategy panicked: {0}")]
    Panicked(String),
}

/// Infrastructure failures surfaced to the caller of the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to spawn execution unit: {0}")]
    Spawn(#[source] io::Error),

    #[error("failed to export price history to {}: {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
