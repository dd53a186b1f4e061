use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use pricing_engine::config::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Topology {
    /// One thread per merchant, products in merchant order
    PerMerchant,
    /// Fixed worker pool draining a shared task queue
    Pool,
}

#[derive(Debug, Parser)]
#[clap(name = "pricing-engine", version)]
pub struct Cli {
    /// How pricing tasks are spread over threads
    #[clap(long, value_enum, default_value_t = Topology::PerMerchant)]
    pub topology: Topology,

    /// Worker count for the pool topology
    #[clap(long)]
    pub workers: Option<usize>,

    /// Seed for simulated market data
    #[clap(long)]
    pub seed: Option<u64>,

    /// Operator log destination
    #[clap(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// CSV price-history destination
    #[clap(long)]
    pub export: Option<PathBuf>,

    /// Emit tracing and the final statistics as JSON
    #[clap(long)]
    pub json: bool,
}

impl Cli {
    /// Overlay explicit flags on top of the environment configuration.
    pub(crate) fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(w) = self.workers {
            config.worker_count = w.max(1);
        }
        if let Some(seed) = self.seed {
            config.market_seed = Some(seed);
        }
        if let Some(p) = &self.log_file {
            config.log_path = p.clone();
        }
        if let Some(p) = &self.export {
            config.export_path = p.clone();
        }
        config
    }
}
