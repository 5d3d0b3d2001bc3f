//! Pair Analyzer
//!
//! Fetch both legs -> inner-join spread -> OLS OU fit -> optimal policy ->
//! wealth simulation -> report. Only the fetch is async; everything after
//! it is the pure strategy core.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use super::report::{AnalysisReport, DisplayParameters, FitDiagnostics, PairDescriptor};
use crate::domain::{build_spread, EngineError, ErrorKind, SpreadSeries};
use crate::ports::market_data::{HistoryQuery, MarketDataError, PriceHistoryPort, SamplingMode};
use crate::strategy::{
    AnalysisSettings, OptimalPolicy, OuEstimator, RiskPreference, SettingsError,
    TrajectorySummary, WealthSimulator,
};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Market data error for {ticker}: {source}")]
    MarketData {
        ticker: String,
        #[source]
        source: MarketDataError,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("No pair has been submitted yet")]
    NotSubmitted,
}

impl AnalysisError {
    /// Actionable message for the operator
    pub fn user_hint(&self) -> String {
        match self {
            AnalysisError::Settings(_) => {
                "Choose gamma in [-100, 0.9999] and initial wealth in [0.1, 1e8].".to_string()
            }
            AnalysisError::MarketData { ticker, source } if source.is_bad_ticker() => format!(
                "No data for '{}'. The tickers may be invalid; check the symbols.",
                ticker
            ),
            AnalysisError::MarketData {
                source: MarketDataError::ApiError { code, message },
                ..
            } => format!("The data provider rejected the request ({}: {}).", code, message),
            AnalysisError::MarketData { .. } => {
                "The data provider could not be reached. Try again later.".to_string()
            }
            AnalysisError::Engine(EngineError::EmptyData(_)) => {
                "The tickers may be invalid or share no timestamps.".to_string()
            }
            AnalysisError::Engine(EngineError::InsufficientData { .. }) => {
                "Too few overlapping observations; use daily data or a longer window.".to_string()
            }
            AnalysisError::Engine(EngineError::NotMeanReverting { .. }) => {
                "The spread trends instead of reverting; try another pair.".to_string()
            }
            AnalysisError::Engine(err) => match err.kind() {
                ErrorKind::NumericalDegeneracy => {
                    "The spread is too flat to estimate; try another pair.".to_string()
                }
                ErrorKind::ParameterValidity => "Gamma must be below 1.".to_string(),
                ErrorKind::Input => "Check the input data.".to_string(),
            },
            AnalysisError::NotSubmitted => "Submit a ticker pair first.".to_string(),
        }
    }
}

/// Which pair to analyze and at what frequency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairRequest {
    pub ticker1: String,
    pub ticker2: String,
    pub mode: SamplingMode,
}

impl PairRequest {
    pub fn new(ticker1: impl Into<String>, ticker2: impl Into<String>, mode: SamplingMode) -> Self {
        Self {
            ticker1: ticker1.into(),
            ticker2: ticker2.into(),
            mode,
        }
    }
}

/// Spread for a request, ready to be analyzed with any settings
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPair {
    pub request: PairRequest,
    pub provider: String,
    pub spread: SpreadSeries,
}

impl FetchedPair {
    fn descriptor(&self) -> PairDescriptor {
        PairDescriptor {
            ticker1: self.request.ticker1.clone(),
            ticker2: self.request.ticker2.clone(),
            mode: self.request.mode,
            provider: self.provider.clone(),
            first_timestamp: self.spread.first_timestamp(),
            last_timestamp: self.spread.last_timestamp(),
            observations: self.spread.len(),
        }
    }
}

/// Runs the estimate-then-simulate pipeline against one price provider
pub struct PairAnalyzer<P> {
    provider: P,
    daily_lookback: Duration,
    intraday_lookback: Duration,
}

impl<P: PriceHistoryPort> PairAnalyzer<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            daily_lookback: SamplingMode::Daily.default_lookback(),
            intraday_lookback: SamplingMode::Intraday.default_lookback(),
        }
    }

    pub fn with_lookbacks(mut self, daily: Duration, intraday: Duration) -> Self {
        self.daily_lookback = daily;
        self.intraday_lookback = intraday;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn lookback(&self, mode: SamplingMode) -> Duration {
        match mode {
            SamplingMode::Daily => self.daily_lookback,
            SamplingMode::Intraday => self.intraday_lookback,
        }
    }

    /// Fetch both legs concurrently and join them into a spread
    pub async fn fetch_pair(
        &self,
        request: &PairRequest,
        as_of: DateTime<Utc>,
    ) -> Result<FetchedPair, AnalysisError> {
        let lookback = self.lookback(request.mode);
        let q1 = HistoryQuery::trailing(&request.ticker1, request.mode, as_of, lookback);
        let q2 = HistoryQuery::trailing(&request.ticker2, request.mode, as_of, lookback);

        tracing::info!(
            "Fetching {} / {} ({}) from {}",
            request.ticker1,
            request.ticker2,
            request.mode,
            self.provider.name()
        );

        let (leg1, leg2) = tokio::try_join!(
            self.fetch_leg(&q1),
            self.fetch_leg(&q2),
        )?;

        let spread = build_spread(&leg1, &leg2)?;
        tracing::info!(
            "Spread {} - {}: {} aligned observations",
            request.ticker1,
            request.ticker2,
            spread.len()
        );

        Ok(FetchedPair {
            request: request.clone(),
            provider: self.provider.name().to_string(),
            spread,
        })
    }

    async fn fetch_leg(
        &self,
        query: &HistoryQuery,
    ) -> Result<crate::domain::PriceSeries, AnalysisError> {
        self.provider
            .fetch_closes(query)
            .await
            .map_err(|source| AnalysisError::MarketData {
                ticker: query.ticker.clone(),
                source,
            })
    }

    /// Fetch and analyze in one go, with the window ending now
    pub async fn analyze(
        &self,
        request: &PairRequest,
        settings: &AnalysisSettings,
    ) -> Result<AnalysisReport, AnalysisError> {
        settings.validate()?;
        let pair = self.fetch_pair(request, Utc::now()).await?;
        analyze_pair(&pair, settings)
    }
}

/// Estimate, size and simulate on an already fetched spread
pub fn analyze_pair(
    pair: &FetchedPair,
    settings: &AnalysisSettings,
) -> Result<AnalysisReport, AnalysisError> {
    settings.validate()?;

    let fit = OuEstimator::with_trend_policy(settings.trend_policy).fit(pair.spread.values())?;
    tracing::info!(
        "OU estimate: k = {:.6}, mu = {:.6}, sigma = {:.6}",
        fit.params.k,
        fit.params.mu,
        fit.params.sigma
    );

    let policy = OptimalPolicy::new(fit.params, RiskPreference::new(settings.gamma)?)?;
    let trajectory = WealthSimulator::with_wealth_floor(settings.wealth_floor).simulate(
        &pair.spread,
        &policy,
        settings.initial_wealth,
    )?;
    let summary = TrajectorySummary::from_trajectory(&trajectory, &policy);

    let current_z_score = pair
        .spread
        .values()
        .last()
        .and_then(|&x| fit.params.z_score(x));

    Ok(AnalysisReport {
        pair: pair.descriptor(),
        settings: *settings,
        params: fit.params,
        display: DisplayParameters::from(&fit.params),
        diagnostics: FitDiagnostics::from(&fit),
        summary,
        current_z_score,
        trajectory,
    })
}
