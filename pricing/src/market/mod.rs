pub mod price_table;
pub mod provider;
pub mod sales;
pub mod types;

pub use price_table::SharedPriceTable;
pub use provider::{FixedMarketData, MarketDataProvider, SeededMarketData, SimulationProfile};
