//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Market Data: Yahoo chart client, synthetic OU pair, TTL cache
//! - CLI: Command-line interface handlers

pub mod cli;
pub mod market_data;

pub use cli::CliApp;
pub use market_data::{CachedPriceHistory, SyntheticOuHistory, YahooChartClient};
