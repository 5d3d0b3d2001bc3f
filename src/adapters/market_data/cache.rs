//! Price History Cache
//!
//! Memoizing decorator over any `PriceHistoryPort`. Entries are keyed by the
//! full query `(ticker, mode, window)` and expire after a fixed TTL; failed
//! fetches are never cached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::PriceSeries;
use crate::ports::market_data::{HistoryQuery, MarketDataError, PriceHistoryPort};

/// Cache entry with TTL tracking
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub series: PriceSeries,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(series: PriceSeries, ttl: Duration) -> Self {
        Self {
            series,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    /// Check if entry is still valid
    pub fn is_valid(&self) -> bool {
        self.inserted_at.elapsed() < self.ttl
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// TTL cache in front of a price history provider
#[derive(Debug)]
pub struct CachedPriceHistory<P> {
    inner: P,
    entries: RwLock<HashMap<HistoryQuery, CacheEntry>>,
    ttl: Duration,
    /// Maximum entries before cleanup
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<P: PriceHistoryPort> CachedPriceHistory<P> {
    /// Default TTL (1 hour)
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
    /// Default max cache entries
    pub const DEFAULT_MAX_ENTRIES: usize = 256;

    pub fn new(inner: P) -> Self {
        Self::with_config(inner, Self::DEFAULT_TTL, Self::DEFAULT_MAX_ENTRIES)
    }

    pub fn with_config(inner: P, ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Drop every entry, forcing the next fetch through to the provider
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Remove expired entries
    pub async fn cleanup(&self) {
        self.entries.write().await.retain(|_, entry| entry.is_valid());
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let total = entries.len();
        let valid = entries.values().filter(|e| e.is_valid()).count();
        CacheStats {
            total_entries: total,
            valid_entries: valid,
            expired_entries: total - valid,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    async fn lookup(&self, query: &HistoryQuery) -> Option<PriceSeries> {
        self.entries
            .read()
            .await
            .get(query)
            .filter(|entry| entry.is_valid())
            .map(|entry| entry.series.clone())
    }

    async fn insert(&self, query: HistoryQuery, series: PriceSeries) {
        let mut entries = self.entries.write().await;

        if entries.len() >= self.max_entries {
            entries.retain(|_, entry| entry.is_valid());
        }

        // Still at capacity after cleanup? Remove oldest entry
        if entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                entries.remove(&key);
            }
        }

        entries.insert(query, CacheEntry::new(series, self.ttl));
    }
}

#[async_trait]
impl<P: PriceHistoryPort> PriceHistoryPort for CachedPriceHistory<P> {
    async fn fetch_closes(&self, query: &HistoryQuery) -> Result<PriceSeries, MarketDataError> {
        if let Some(series) = self.lookup(query).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Cache hit for {} ({})", query.ticker, query.mode);
            return Ok(series);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let series = self.inner.fetch_closes(query).await?;
        self.insert(query.clone(), series.clone()).await;
        Ok(series)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PricePoint;
    use crate::ports::market_data::SamplingMode;
    use crate::ports::mocks::StaticPriceHistory;
    use chrono::{TimeZone, Utc};

    fn series(ticker: &str) -> PriceSeries {
        let ts = Utc.with_ymd_and_hms(2025, 2, 3, 0, 0, 0).unwrap();
        PriceSeries::new(ticker, vec![PricePoint::new(ts, 74.2)])
    }

    fn query(ticker: &str, mode: SamplingMode) -> HistoryQuery {
        let as_of = Utc.with_ymd_and_hms(2025, 2, 4, 0, 0, 0).unwrap();
        HistoryQuery::with_default_window(ticker, mode, as_of)
    }

    fn backing() -> StaticPriceHistory {
        StaticPriceHistory::new()
            .with_series(series("CL=F"))
            .with_series(series("BZ=F"))
            .with_series(series("NG=F"))
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let inner = backing();
        let cache = CachedPriceHistory::new(inner.clone());

        let first = cache.fetch_closes(&query("CL=F", SamplingMode::Daily)).await.unwrap();
        let second = cache.fetch_closes(&query("CL=F", SamplingMode::Daily)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.call_count(), 1);
        let stats = cache.stats().await;
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[tokio::test]
    async fn test_mode_is_part_of_the_key() {
        let inner = backing();
        let cache = CachedPriceHistory::new(inner.clone());

        cache.fetch_closes(&query("CL=F", SamplingMode::Daily)).await.unwrap();
        cache.fetch_closes(&query("CL=F", SamplingMode::Intraday)).await.unwrap();
        assert_eq!(inner.call_count(), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let inner = backing();
        let cache = CachedPriceHistory::new(inner.clone());

        assert!(cache.fetch_closes(&query("ZZZ", SamplingMode::Daily)).await.is_err());
        assert!(cache.fetch_closes(&query("ZZZ", SamplingMode::Daily)).await.is_err());
        assert_eq!(inner.call_count(), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_expiry() {
        let inner = backing();
        let cache = CachedPriceHistory::with_config(inner.clone(), Duration::from_millis(10), 16);

        cache.fetch_closes(&query("CL=F", SamplingMode::Daily)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.fetch_closes(&query("CL=F", SamplingMode::Daily)).await.unwrap();
        assert_eq!(inner.call_count(), 2);

        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.cleanup().await;
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_max_entries() {
        let cache = CachedPriceHistory::with_config(backing(), Duration::from_secs(60), 2);

        for ticker in ["CL=F", "BZ=F", "NG=F"] {
            cache.fetch_closes(&query(ticker, SamplingMode::Daily)).await.unwrap();
        }
        assert_eq!(cache.len().await, 2);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
