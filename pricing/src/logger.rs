use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;
use tracing::{Span, field};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Correlation id shared by every execution unit of one run.
#[derive(Clone, Debug)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(json: bool) {
    TRACING_INIT.get_or_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let base = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_line_number(true)
            // Includes timing when the span closes
            .with_span_events(fmt::format::FmtSpan::CLOSE);

        let installed = if json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(base.json())
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(base)
                .try_init()
        };

        if installed.is_ok() {
            tracing::info!(json, "tracing initialized");
        }
    });
}

pub fn run_span(run_id: &RunId) -> Span {
    tracing::info_span!("run", run_id = %run_id)
}

/// Span for one execution unit (merchant thread or pool worker).
pub fn unit_span(run_id: &RunId, unit: &str) -> Span {
    tracing::info_span!(
        "unit",
        run_id = %run_id,
        unit = %unit,
        product_id = field::Empty
    )
}

pub fn annotate_product(product_id: &str) {
    Span::current().record("product_id", field::display(product_id));
}

pub fn warn_if_slow<F, T>(label: &'static str, max: Duration, f: F) -> T
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let out = f();
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            target: "performance",
            label = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}
