//! Market Data Adapters
//!
//! Implementations of `PriceHistoryPort`:
//! - `YahooChartClient`: Yahoo Finance v8 chart API (daily or minute closes)
//! - `SyntheticOuHistory`: deterministic offline pair with an OU spread
//! - `CachedPriceHistory`: TTL memoization in front of either of the above

pub mod cache;
pub mod synthetic;
pub mod yahoo_chart;

pub use cache::{CacheStats, CachedPriceHistory};
pub use synthetic::{ou_path, SyntheticConfig, SyntheticOuHistory};
pub use yahoo_chart::{YahooChartClient, YahooConfig};
