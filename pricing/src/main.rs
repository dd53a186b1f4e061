mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use pricing_engine::config::EngineConfig;
use pricing_engine::execution::{Merchant, PricingTask};
use pricing_engine::logger::init_tracing;
use pricing_engine::market::{SeededMarketData, SimulationProfile};
use pricing_engine::metrics::StatsSnapshot;
use pricing_engine::scheduler::Dispatcher;
use pricing_engine::strategy::{BlendedStrategy, PricingStrategy};
use pricing_engine::time::local_timestamp;

use crate::cli::{Cli, Topology};

fn demo_merchants() -> Vec<Merchant> {
    vec![
        Merchant::new(
            "Apple Store",
            ["iPhone-15-Pro", "iPhone-15-Pro-Max", "MacBook-Pro-14"],
            1,
        ),
        Merchant::new("JD Direct", ["iPhone-15-Pro", "MacBook-Pro-14", "RTX-4090"], 2),
        Merchant::new(
            "Tmall Flagship",
            ["iPhone-15-Pro-Max", "RTX-4090", "MacBook-Pro-16"],
            2,
        ),
        Merchant::new("Suning", ["MacBook-Pro-14", "MacBook-Pro-16", "RTX-4080"], 3),
        Merchant::new("Pinduoduo", ["iPhone-15-Pro", "RTX-4080", "RTX-4090"], 4),
    ]
}

fn print_statistics(stats: &StatsSnapshot, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }

    println!("tasks:           {}", stats.total);
    println!(
        "succeeded:       {} ({:.1}%)",
        stats.succeeded,
        stats.success_rate()
    );
    println!("failed:          {} ({:.1}%)", stats.failed, stats.failure_rate());
    println!("unique products: {}", stats.unique_products);
    if let (Some(lo), Some(hi)) = (stats.min_price, stats.max_price) {
        println!("price range:     {lo:.2} .. {hi:.2}");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = cli.apply(EngineConfig::from_env());
    info!(topology = ?cli.topology, ?config, "pricing run starting");

    let market = Arc::new(SeededMarketData::new(
        SimulationProfile {
            base_price: config.base_price_range.clone(),
            ..SimulationProfile::default()
        },
        config.market_seed,
    ));
    let strategy: Arc<dyn PricingStrategy> = Arc::new(BlendedStrategy);
    let dispatcher = Dispatcher::from_config(&config, market);

    match cli.topology {
        Topology::PerMerchant => {
            dispatcher
                .start_pricing(demo_merchants(), strategy)
                .context("failed to start merchant units")?;
            dispatcher.wait_all();
        }
        Topology::Pool => {
            dispatcher
                .start_workers(config.worker_count, strategy)
                .context("failed to start worker pool")?;
            for merchant in demo_merchants() {
                for product in &merchant.products {
                    dispatcher.add_task(PricingTask::pending(&merchant.name, product));
                }
            }
            dispatcher.stop_all();
            dispatcher.wait_all();
        }
    }

    let rows = dispatcher
        .export_history(&config.export_path)
        .context("failed to export price history")?;
    dispatcher.shutdown();

    info!(
        run_id = %dispatcher.run_id(),
        rows,
        finished_at = %local_timestamp(),
        log = %config.log_path.display(),
        export = %config.export_path.display(),
        "pricing run finished"
    );
    print_statistics(&dispatcher.statistics(), cli.json)
}
