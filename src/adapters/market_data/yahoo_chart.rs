//! Yahoo Finance Chart Client
//!
//! HTTP client for the v8 chart endpoint. Returns auto-adjusted closes
//! (`adjclose` when the response carries it, plain `close` otherwise) with
//! null bars dropped.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::domain::{PricePoint, PriceSeries};
use crate::ports::market_data::{HistoryQuery, MarketDataError, PriceHistoryPort};

/// Desktop browser user agent; the chart endpoint rejects bare clients
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Yahoo chart client configuration
#[derive(Debug, Clone)]
pub struct YahooConfig {
    /// Base URL, e.g. https://query1.finance.yahoo.com
    pub api_base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Number of attempts per request
    pub max_retries: u32,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// Yahoo Finance chart API client
#[derive(Debug, Clone)]
pub struct YahooChartClient {
    config: YahooConfig,
    http: Client,
}

impl YahooChartClient {
    /// Create a client with default configuration
    pub fn new() -> Result<Self, MarketDataError> {
        Self::with_config(YahooConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: YahooConfig) -> Result<Self, MarketDataError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|e| MarketDataError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &YahooConfig {
        &self.config
    }

    fn chart_url(&self, ticker: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.config.api_base_url.trim_end_matches('/'),
            ticker
        )
    }

    fn query_params(query: &HistoryQuery) -> [(&'static str, String); 4] {
        [
            ("period1", query.window.start.timestamp().to_string()),
            ("period2", query.window.end.timestamp().to_string()),
            ("interval", query.mode.interval().to_string()),
            ("events", "history".to_string()),
        ]
    }

    /// Execute request with retry logic and rate limit handling
    async fn execute_with_retry<F, Fut>(&self, request_fn: F) -> Result<reqwest::Response, MarketDataError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, MarketDataError>>,
    {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    // Rate limited: exponential backoff 2s, 4s, 8s
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let backoff = Duration::from_secs(2u64.pow(attempt + 1));
                        tracing::warn!(
                            "Rate limited (429), backing off for {:?} (attempt {}/{})",
                            backoff, attempt + 1, attempts
                        );
                        last_error = Some(MarketDataError::HttpError("Rate limit exceeded".into()));
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    if status.is_server_error() {
                        tracing::warn!("Server error {} (attempt {}/{})", status, attempt + 1, attempts);
                        last_error = Some(MarketDataError::HttpError(format!("Server error: {}", status)));
                        tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1))).await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!("Request failed: {} (attempt {}/{})", e, attempt + 1, attempts);
                    last_error = Some(e);
                    tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1))).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(MarketDataError::MaxRetriesExceeded {
            attempts,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempts made".to_string()),
        })
    }
}

#[async_trait]
impl PriceHistoryPort for YahooChartClient {
    async fn fetch_closes(&self, query: &HistoryQuery) -> Result<PriceSeries, MarketDataError> {
        let url = self.chart_url(&query.ticker);
        let params = Self::query_params(query);

        tracing::debug!(
            "Fetching {} {} closes from {} to {}",
            query.ticker, query.mode, query.window.start, query.window.end
        );

        let response = self
            .execute_with_retry(|| async {
                self.http
                    .get(&url)
                    .query(&params)
                    .send()
                    .await
                    .map_err(MarketDataError::from)
            })
            .await?;

        let status = response.status();
        let body = response.text().await.map_err(MarketDataError::from)?;

        // Error payloads come back as chart JSON too, so parse before checking status
        let parsed: ChartResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if status == StatusCode::NOT_FOUND => {
                return Err(MarketDataError::NotFound(query.ticker.clone()));
            }
            Err(e) if status.is_success() => {
                return Err(MarketDataError::ParseError(format!("Failed to parse chart: {}", e)));
            }
            Err(_) => {
                return Err(MarketDataError::HttpError(format!("API error {}: {}", status, body)));
            }
        };

        let series = parse_chart(&query.ticker, parsed)?;
        tracing::info!("Fetched {} closes for {}", series.len(), query.ticker);
        Ok(series)
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
    #[serde(default)]
    adjclose: Option<Vec<AdjCloseBlock>>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseBlock {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Turn a chart payload into a price series
fn parse_chart(ticker: &str, response: ChartResponse) -> Result<PriceSeries, MarketDataError> {
    if let Some(err) = response.chart.error {
        if err.code.eq_ignore_ascii_case("Not Found") {
            return Err(MarketDataError::NotFound(ticker.to_string()));
        }
        return Err(MarketDataError::ApiError {
            code: err.code,
            message: err.description.unwrap_or_default(),
        });
    }

    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| MarketDataError::NotFound(ticker.to_string()))?;

    let adjusted = result
        .indicators
        .adjclose
        .and_then(|blocks| blocks.into_iter().next())
        .map(|b| b.adjclose)
        .filter(|closes| !closes.is_empty());
    let closes = match adjusted {
        Some(closes) => closes,
        None => result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default(),
    };

    if closes.len() != result.timestamp.len() {
        return Err(MarketDataError::ParseError(format!(
            "{} timestamps but {} closes for {}",
            result.timestamp.len(),
            closes.len(),
            ticker
        )));
    }

    let points: Vec<PricePoint> = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(&ts, close)| {
            let close = close?;
            let timestamp = Utc.timestamp_opt(ts, 0).single()?;
            Some(PricePoint::new(timestamp, close))
        })
        .collect();

    if points.is_empty() {
        return Err(MarketDataError::NotFound(ticker.to_string()));
    }

    Ok(PriceSeries::new(ticker, points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::market_data::SamplingMode;

    const CHART_FIXTURE: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"currency": "USD", "symbol": "RB=F"},
                "timestamp": [1717977600, 1718064000, 1718150400, 1718236800],
                "indicators": {
                    "quote": [{"close": [2.41, null, 2.45, 2.47], "open": [2.40, 2.42, null, 2.46]}],
                    "adjclose": [{"adjclose": [2.40, null, 2.44, 2.46]}]
                }
            }],
            "error": null
        }
    }"#;

    fn parse(body: &str) -> Result<PriceSeries, MarketDataError> {
        parse_chart("RB=F", serde_json::from_str(body).unwrap())
    }

    #[test]
    fn test_parse_prefers_adjclose_and_skips_nulls() {
        let series = parse(CHART_FIXTURE).unwrap();
        let closes: Vec<f64> = series.points().iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![2.40, 2.44, 2.46]);
        assert_eq!(series.points()[0].timestamp.timestamp(), 1717977600);
    }

    #[test]
    fn test_parse_falls_back_to_close() {
        let body = r#"{"chart": {"result": [{
            "timestamp": [1717977600, 1717977660],
            "indicators": {"quote": [{"close": [81.5, 81.6]}]}
        }], "error": null}}"#;
        let series = parse(body).unwrap();
        assert_eq!(series.last_close(), Some(81.6));
    }

    #[test]
    fn test_parse_not_found() {
        let body = r#"{"chart": {"result": null, "error": {
            "code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        assert_eq!(parse(body), Err(MarketDataError::NotFound("RB=F".to_string())));
    }

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"chart": {"result": null, "error": {
            "code": "Bad Request", "description": "Invalid input - interval=1m is not supported"}}}"#;
        let err = parse(body).unwrap_err();
        assert!(matches!(err, MarketDataError::ApiError { .. }));
        assert!(!err.is_bad_ticker());
    }

    #[test]
    fn test_parse_empty_result() {
        let body = r#"{"chart": {"result": [{"indicators": {"quote": [{}]}}], "error": null}}"#;
        assert!(parse(body).unwrap_err().is_bad_ticker());
    }

    #[test]
    fn test_parse_length_mismatch() {
        let body = r#"{"chart": {"result": [{
            "timestamp": [1717977600],
            "indicators": {"quote": [{"close": [1.0, 2.0]}]}
        }], "error": null}}"#;
        assert!(matches!(parse(body), Err(MarketDataError::ParseError(_))));
    }

    #[test]
    fn test_request_shape() {
        let client = YahooChartClient::with_config(YahooConfig {
            api_base_url: "http://localhost:9999/".to_string(),
            ..YahooConfig::default()
        })
        .unwrap();
        assert_eq!(client.chart_url("HO=F"), "http://localhost:9999/v8/finance/chart/HO=F");

        let as_of = Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap();
        let query = HistoryQuery::with_default_window("HO=F", SamplingMode::Intraday, as_of);
        let params = YahooChartClient::query_params(&query);
        assert_eq!(params[1], ("period2", as_of.timestamp().to_string()));
        assert_eq!(params[2], ("interval", "1m".to_string()));
        assert_eq!(params[3], ("events", "history".to_string()));
    }
}
