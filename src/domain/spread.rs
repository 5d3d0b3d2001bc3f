//! Price and Spread Series
//!
//! A `PriceSeries` holds the closes of one ticker; `build_spread` inner-joins
//! two of them on timestamp and returns `price1 - price2` as a `SpreadSeries`.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::EngineError;

/// Single closing price observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self { timestamp, close }
    }
}

/// Chronologically ordered closes for one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from raw provider rows
    ///
    /// Rows are sorted by timestamp. Non-finite closes are dropped and for a
    /// repeated timestamp the last row wins.
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Self {
        let ticker = ticker.into();
        let raw_len = points.len();

        let by_time: BTreeMap<DateTime<Utc>, f64> = points
            .into_iter()
            .filter(|p| p.close.is_finite())
            .map(|p| (p.timestamp, p.close))
            .collect();

        let points: Vec<PricePoint> = by_time
            .into_iter()
            .map(|(timestamp, close)| PricePoint { timestamp, close })
            .collect();

        if points.len() != raw_len {
            tracing::debug!(
                "{}: dropped {} non-finite or duplicate rows",
                ticker,
                raw_len - points.len()
            );
        }

        Self { ticker, points }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Last close, if any
    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }
}

/// One spread observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Time-indexed spread with strictly increasing timestamps
///
/// Immutable once built; estimation and simulation only borrow it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl SpreadSeries {
    /// Validate and wrap spread points
    pub fn new(points: Vec<SpreadPoint>) -> Result<Self, EngineError> {
        if points.is_empty() {
            return Err(EngineError::EmptyData("spread has no observations".to_string()));
        }

        for (i, pair) in points.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(EngineError::InvalidSeries(format!(
                    "timestamp at index {} ({}) does not increase past {}",
                    i + 1,
                    pair[1].timestamp,
                    pair[0].timestamp
                )));
            }
        }

        if let Some(i) = points.iter().position(|p| !p.value.is_finite()) {
            return Err(EngineError::InvalidSeries(format!(
                "non-finite spread value at index {}",
                i
            )));
        }

        let (timestamps, values) = points.into_iter().map(|p| (p.timestamp, p.value)).unzip();
        Ok(Self { timestamps, values })
    }

    /// Build a series from bare values on a regular time grid
    pub fn from_values(
        values: &[f64],
        start: DateTime<Utc>,
        step: Duration,
    ) -> Result<Self, EngineError> {
        let grid: Vec<DateTime<Utc>> =
            std::iter::successors(Some(start), |t| t.checked_add_signed(step))
                .take(values.len())
                .collect();
        if grid.len() < values.len() {
            return Err(EngineError::InvalidSeries(format!(
                "time grid from {} runs out of range after {} of {} points",
                start,
                grid.len(),
                values.len()
            )));
        }

        let points = grid
            .into_iter()
            .zip(values)
            .map(|(timestamp, &value)| SpreadPoint { timestamp, value })
            .collect();
        Self::new(points)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = SpreadPoint> + '_ {
        self.timestamps
            .iter()
            .zip(self.values.iter())
            .map(|(&timestamp, &value)| SpreadPoint { timestamp, value })
    }
}

/// Inner-join two price series on timestamp and subtract
///
/// `spread[t] = first[t] - second[t]` for every timestamp present in both.
pub fn build_spread(first: &PriceSeries, second: &PriceSeries) -> Result<SpreadSeries, EngineError> {
    for series in [first, second] {
        if series.is_empty() {
            return Err(EngineError::EmptyData(format!(
                "no prices for ticker '{}'",
                series.ticker()
            )));
        }
    }

    let second_by_time: BTreeMap<DateTime<Utc>, f64> = second
        .points()
        .iter()
        .map(|p| (p.timestamp, p.close))
        .collect();

    let points: Vec<SpreadPoint> = first
        .points()
        .iter()
        .filter_map(|p| {
            second_by_time.get(&p.timestamp).map(|other| SpreadPoint {
                timestamp: p.timestamp,
                value: p.close - other,
            })
        })
        .collect();

    if points.is_empty() {
        return Err(EngineError::EmptyData(format!(
            "'{}' and '{}' share no timestamps",
            first.ticker(),
            second.ticker()
        )));
    }

    tracing::debug!(
        "Joined {} ({} rows) with {} ({} rows): {} shared timestamps",
        first.ticker(),
        first.len(),
        second.ticker(),
        second.len(),
        points.len()
    );

    SpreadSeries::new(points)
}
