//! Synthetic OU price history
//!
//! Deterministic offline data source: the second leg is a Gaussian random
//! walk and the first leg is that walk plus a discretized OU spread, so the
//! spread of the pair is exactly `ou_path(k, mu, sigma, ..)`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::distribution::Normal;

use crate::domain::{PricePoint, PriceSeries};
use crate::ports::market_data::{HistoryQuery, MarketDataError, PriceHistoryPort, SamplingMode};

/// Euler-discretized OU path of `steps` values starting at `x0`
///
/// X[t+1] = X[t] + k (mu - X[t]) + sigma Z[t], Z ~ N(0, 1)
pub fn ou_path(k: f64, mu: f64, sigma: f64, x0: f64, steps: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::standard();

    let mut path = Vec::with_capacity(steps);
    let mut x = x0;
    for _ in 0..steps {
        path.push(x);
        x += k * (mu - x) + sigma * normal.sample(&mut rng);
    }
    path
}

/// Gaussian random walk of `steps` values starting at `start`
fn random_walk(start: f64, step_std: f64, steps: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::standard();

    let mut path = Vec::with_capacity(steps);
    let mut level = start;
    for _ in 0..steps {
        path.push(level);
        level += step_std * normal.sample(&mut rng);
    }
    path
}

/// Synthetic pair configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    pub ticker1: String,
    pub ticker2: String,
    /// Spread mean-reversion speed per step
    pub k: f64,
    /// Spread long-run mean
    pub mu: f64,
    /// Spread volatility per step
    pub sigma: f64,
    /// Observations per leg
    pub steps: usize,
    pub seed: u64,
    /// Starting level of the second leg
    pub base_price: f64,
    /// Per-step volatility of the second leg
    pub base_volatility: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            ticker1: "SYN1".to_string(),
            ticker2: "SYN2".to_string(),
            k: 0.2,
            mu: 1.5,
            sigma: 0.3,
            steps: 250,
            seed: 42,
            base_price: 100.0,
            base_volatility: 0.5,
        }
    }
}

/// Price history port serving a deterministic cointegrated pair
#[derive(Debug, Clone)]
pub struct SyntheticOuHistory {
    config: SyntheticConfig,
}

impl SyntheticOuHistory {
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    /// The spread the pair is built from
    pub fn spread_path(&self) -> Vec<f64> {
        let c = &self.config;
        ou_path(c.k, c.mu, c.sigma, c.mu, c.steps, c.seed)
    }

    fn base_path(&self) -> Vec<f64> {
        let c = &self.config;
        random_walk(c.base_price, c.base_volatility, c.steps, c.seed.wrapping_add(1))
    }

    /// Timestamps ending at `end`, one sampling interval apart
    fn timestamps(
        &self,
        end: DateTime<Utc>,
        mode: SamplingMode,
    ) -> Result<Vec<DateTime<Utc>>, MarketDataError> {
        let step = match mode {
            SamplingMode::Daily => Duration::days(1),
            SamplingMode::Intraday => Duration::minutes(1),
        };
        let n = self.config.steps;
        let mut stamps: Vec<DateTime<Utc>> =
            std::iter::successors(Some(end), |t| t.checked_sub_signed(step))
                .take(n)
                .collect();
        if stamps.len() < n {
            return Err(MarketDataError::ApiError {
                code: "Bad Request".to_string(),
                message: format!("{} synthetic closes do not fit before {}", n, end),
            });
        }
        stamps.reverse();
        Ok(stamps)
    }
}

#[async_trait]
impl PriceHistoryPort for SyntheticOuHistory {
    async fn fetch_closes(&self, query: &HistoryQuery) -> Result<PriceSeries, MarketDataError> {
        let closes = if query.ticker == self.config.ticker1 {
            self.base_path()
                .iter()
                .zip(self.spread_path())
                .map(|(base, spread)| base + spread)
                .collect::<Vec<_>>()
        } else if query.ticker == self.config.ticker2 {
            self.base_path()
        } else {
            return Err(MarketDataError::NotFound(query.ticker.clone()));
        };

        let points = self
            .timestamps(query.window.end, query.mode)?
            .into_iter()
            .zip(closes)
            .map(|(timestamp, close)| PricePoint::new(timestamp, close))
            .collect();

        tracing::debug!(
            "Generated {} synthetic closes for {}",
            self.config.steps,
            query.ticker
        );
        Ok(PriceSeries::new(query.ticker.clone(), points))
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
