use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Destination of the operator append log (one line per task).
    pub log_path: PathBuf,

    /// Destination of the CSV price-history export written at the end of a run.
    pub export_path: PathBuf,

    // =========================
    // Dispatcher configuration
    // =========================
    /// Number of workers started by the shared-queue topology.
    pub worker_count: usize,

    /// Bounds (inclusive, in milliseconds) of the simulated latency a
    /// per-merchant unit sleeps after each product.
    ///
    /// `0..=0` disables throttling entirely.
    pub throttle_ms: RangeInclusive<u64>,

    // =========================
    // Execution configuration
    // =========================
    /// Range a product's first price is drawn from when the table has no
    /// entry for it yet.
    pub base_price_range: RangeInclusive<f64>,

    /// Strategy calls slower than this are reported with a warning.
    ///
    /// There is no timeout: a strategy that hangs stalls its unit.
    pub slow_strategy_threshold: Duration,

    /// Seed for the simulated market data generator.
    /// `None` seeds from OS entropy.
    pub market_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("output/pricing.log"),
            export_path: PathBuf::from("output/price_trend.csv"),
            worker_count: 4,
            throttle_ms: 50..=200,
            base_price_range: 5_000.0..=15_000.0,
            slow_strategy_threshold: Duration::from_millis(100),
            market_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let log_path = std::env::var("PRICING_LOG_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.log_path);
        let export_path = std::env::var("PRICING_EXPORT_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.export_path);

        let throttle_min = env_or("PRICING_THROTTLE_MIN_MS", *defaults.throttle_ms.start());
        let throttle_max = env_or("PRICING_THROTTLE_MAX_MS", *defaults.throttle_ms.end());

        Self {
            log_path,
            export_path,
            worker_count: env_or("PRICING_WORKERS", defaults.worker_count).max(1),
            throttle_ms: throttle_min.min(throttle_max)..=throttle_max.max(throttle_min),
            base_price_range: defaults.base_price_range,
            slow_strategy_threshold: Duration::from_millis(env_or(
                "PRICING_SLOW_STRATEGY_MS",
                defaults.slow_strategy_threshold.as_millis() as u64,
            )),
            market_seed: std::env::var("PRICING_SEED")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }

    /// Configuration for tests and benchmarks: no throttling, fixed seed.
    pub fn unthrottled() -> Self {
        Self {
            throttle_ms: 0..=0,
            market_seed: Some(7),
            ..Self::default()
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparsable config value");
                default
            }
        },
        Err(_) => default,
    }
}
