//! In-memory price history port that records calls and serves canned responses
//!
//! Used by integration tests and the demo pipeline where no network is wanted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::market_data::{HistoryQuery, MarketDataError, PriceHistoryPort};
use crate::domain::PriceSeries;

/// Static price history keyed by ticker
#[derive(Debug, Default, Clone)]
pub struct StaticPriceHistory {
    calls: Arc<Mutex<Vec<HistoryQuery>>>,
    responses: Arc<Mutex<HashMap<String, Result<PriceSeries, MarketDataError>>>>,
}

impl StaticPriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to serve a series for its ticker
    pub fn with_series(self, series: PriceSeries) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(series.ticker().to_string(), Ok(series));
        }
        self
    }

    /// Builder method to fail every request for a ticker
    pub fn with_error(self, ticker: &str, error: MarketDataError) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(ticker.to_string(), Err(error));
        }
        self
    }

    /// Get all recorded queries
    pub fn get_calls(&self) -> Vec<HistoryQuery> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PriceHistoryPort for StaticPriceHistory {
    async fn fetch_closes(&self, query: &HistoryQuery) -> Result<PriceSeries, MarketDataError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(query.clone());
        }
        self.responses
            .lock()
            .map_err(|_| MarketDataError::HttpError("response table poisoned".to_string()))?
            .get(&query.ticker)
            .cloned()
            .unwrap_or_else(|| Err(MarketDataError::NotFound(query.ticker.clone())))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
