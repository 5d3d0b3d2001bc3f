//! Ports Layer - Trait definitions for external dependencies
//!
//! The engine only sees closing-price series; where they come from
//! (Yahoo chart API, a synthetic generator, a canned table in tests)
//! is decided by the adapter plugged into `PriceHistoryPort`.

pub mod market_data;
pub mod mocks;

pub use market_data::{
    HistoryQuery, HistoryWindow, MarketDataError, PriceHistoryPort, SamplingMode,
};
pub use mocks::StaticPriceHistory;
