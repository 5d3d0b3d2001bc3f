//! Engine Error Types
//!
//! Typed failures for the spread / estimation / policy pipeline.
//! Every variant maps to one [`ErrorKind`] so callers can decide whether to
//! re-prompt for input, report an unsuitable pair, or reject a parameter.

use thiserror::Error;

/// Broad category of an engine failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty, misaligned or too-short input series
    Input,
    /// The pair does not fit the model assumptions (zero volatility, singular fit, ...)
    NumericalDegeneracy,
    /// A parameter outside its supported domain
    ParameterValidity,
}

/// Errors raised by the quantitative core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A price series or the joined spread has no observations
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Not enough observations to form the required differences
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Timestamps out of order, duplicated, or non-finite values
    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    /// Initial wealth must be finite and strictly positive
    #[error("Invalid initial wealth: {0} (must be finite and > 0)")]
    InvalidWealth(f64),

    /// Residual volatility is zero, so position sizing divides by zero
    #[error("Degenerate volatility: {0}")]
    DegenerateVolatility(String),

    /// Estimated mean-reversion speed is exactly zero; mu = a / k is undefined
    #[error("Mean-reversion speed is zero; long-run mean is undefined")]
    ZeroMeanReversion,

    /// The lagged spread has no variance, so the regression has no unique slope
    #[error("Singular regression: lagged spread variance {variance:e} is zero")]
    SingularRegression { variance: f64 },

    /// Estimated k <= 0 while trending spreads are rejected
    #[error("Spread is not mean-reverting: k = {k}")]
    NotMeanReverting { k: f64 },

    /// Risk aversion outside gamma < 1
    #[error("Invalid risk preference: gamma = {0} (must be < 1)")]
    InvalidRiskPreference(f64),

    /// NaN or infinity produced while estimating or sizing
    #[error("Non-finite value: {0}")]
    NonFiniteValue(&'static str),

    /// NaN or infinity produced during the wealth simulation
    #[error("Non-finite {quantity} at step {step}")]
    NonFinite { quantity: &'static str, step: usize },
}

impl EngineError {
    /// Category used by callers to pick a message or retry strategy
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::EmptyData(_)
            | EngineError::InsufficientData { .. }
            | EngineError::InvalidSeries(_)
            | EngineError::InvalidWealth(_) => ErrorKind::Input,
            EngineError::DegenerateVolatility(_)
            | EngineError::ZeroMeanReversion
            | EngineError::SingularRegression { .. }
            | EngineError::NotMeanReverting { .. }
            | EngineError::NonFiniteValue(_)
            | EngineError::NonFinite { .. } => ErrorKind::NumericalDegeneracy,
            EngineError::InvalidRiskPreference(_) => ErrorKind::ParameterValidity,
        }
    }

    /// Check if the error means the chosen pair does not fit the OU model
    pub fn is_degenerate(&self) -> bool {
        self.kind() == ErrorKind::NumericalDegeneracy
    }
}
