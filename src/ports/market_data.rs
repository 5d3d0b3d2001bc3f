//! Price History Port
//!
//! Interface for fetching closing-price history for one ticker. The core
//! never calls a provider directly; adapters implement this trait and the
//! application layer passes the resulting `PriceSeries` into the engine.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PriceSeries;

/// Price history error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Provider error {code}: {message}")]
    ApiError { code: String, message: String },

    #[error("Data parsing error: {0}")]
    ParseError(String),

    #[error("No data for ticker '{0}'")]
    NotFound(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

impl MarketDataError {
    /// Check if the error suggests a bad ticker rather than a transient failure
    pub fn is_bad_ticker(&self) -> bool {
        matches!(self, MarketDataError::NotFound(_))
    }

    /// Check if the request may succeed when retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, MarketDataError::HttpError(_) | MarketDataError::Timeout)
    }
}

impl From<reqwest::Error> for MarketDataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MarketDataError::Timeout
        } else if err.is_decode() {
            MarketDataError::ParseError(err.to_string())
        } else {
            MarketDataError::HttpError(err.to_string())
        }
    }
}

/// Sampling frequency of the requested closes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMode {
    /// One close per trading day
    Daily,
    /// One close per minute
    Intraday,
}

impl SamplingMode {
    pub fn from_intraday_flag(intraday: bool) -> Self {
        if intraday {
            SamplingMode::Intraday
        } else {
            SamplingMode::Daily
        }
    }

    /// Provider interval code
    pub fn interval(&self) -> &'static str {
        match self {
            SamplingMode::Daily => "1d",
            SamplingMode::Intraday => "1m",
        }
    }

    /// Default trailing window: a year of days, or four days of minutes
    pub fn default_lookback(&self) -> Duration {
        match self {
            SamplingMode::Daily => Duration::days(365),
            SamplingMode::Intraday => Duration::days(4),
        }
    }

    /// Granularity the as-of time is truncated to, so repeated runs share a window
    fn as_of_resolution(&self) -> Duration {
        match self {
            SamplingMode::Daily => Duration::days(1),
            SamplingMode::Intraday => Duration::minutes(1),
        }
    }
}

impl fmt::Display for SamplingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingMode::Daily => write!(f, "daily"),
            SamplingMode::Intraday => write!(f, "intraday"),
        }
    }
}

/// Half-open time window [start, end)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Historical closes query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub ticker: String,
    pub mode: SamplingMode,
    pub window: HistoryWindow,
}

impl HistoryQuery {
    /// Window ending at `as_of` (truncated to the mode's resolution) and
    /// reaching back `lookback`
    pub fn trailing(
        ticker: impl Into<String>,
        mode: SamplingMode,
        as_of: DateTime<Utc>,
        lookback: Duration,
    ) -> Self {
        let end = as_of
            .duration_trunc(mode.as_of_resolution())
            .unwrap_or(as_of);
        Self {
            ticker: ticker.into(),
            mode,
            window: HistoryWindow {
                start: end - lookback,
                end,
            },
        }
    }

    /// Trailing window with the mode's default lookback
    pub fn with_default_window(
        ticker: impl Into<String>,
        mode: SamplingMode,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self::trailing(ticker, mode, as_of, mode.default_lookback())
    }
}

/// Price history port trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceHistoryPort: Send + Sync {
    /// Fetch closes for one ticker over the query window
    async fn fetch_closes(&self, query: &HistoryQuery) -> Result<PriceSeries, MarketDataError>;

    /// Short provider name for logs and reports
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sampling_mode() {
        assert_eq!(SamplingMode::from_intraday_flag(true), SamplingMode::Intraday);
        assert_eq!(SamplingMode::Daily.interval(), "1d");
        assert_eq!(SamplingMode::Intraday.interval(), "1m");
        assert_eq!(SamplingMode::Intraday.default_lookback(), Duration::days(4));
        assert_eq!(SamplingMode::Daily.to_string(), "daily");
    }

    #[test]
    fn test_trailing_window_truncates_as_of() {
        let as_of = Utc.with_ymd_and_hms(2025, 6, 10, 14, 37, 12).unwrap();

        let daily = HistoryQuery::with_default_window("RB=F", SamplingMode::Daily, as_of);
        assert_eq!(daily.window.end, Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap());
        assert_eq!(daily.window.end - daily.window.start, Duration::days(365));

        let minute = HistoryQuery::with_default_window("RB=F", SamplingMode::Intraday, as_of);
        assert_eq!(minute.window.end, Utc.with_ymd_and_hms(2025, 6, 10, 14, 37, 0).unwrap());
    }

    #[test]
    fn test_same_day_queries_are_equal() {
        let morning = Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2025, 6, 10, 21, 0, 0).unwrap();
        assert_eq!(
            HistoryQuery::with_default_window("HO=F", SamplingMode::Daily, morning),
            HistoryQuery::with_default_window("HO=F", SamplingMode::Daily, evening)
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(MarketDataError::NotFound("X".into()).is_bad_ticker());
        assert!(!MarketDataError::Timeout.is_bad_ticker());
        let rejected = MarketDataError::ApiError {
            code: "Bad Request".into(),
            message: "Invalid input - interval=1m is not supported".into(),
        };
        assert!(!rejected.is_bad_ticker());
        assert!(MarketDataError::Timeout.is_retryable());
        assert!(!MarketDataError::ParseError("bad".into()).is_retryable());
    }
}
