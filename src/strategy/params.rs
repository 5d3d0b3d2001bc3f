//! Analysis Parameters
//!
//! Operator-chosen inputs for one analysis run: risk aversion, starting
//! wealth, the positive wealth floor and how to treat trending spreads.
//! Defaults match the reference deployment (gamma = -16, W0 = 100).

use serde::{Deserialize, Serialize};

/// Lowest risk aversion accepted from an operator
pub const MIN_OPERATOR_GAMMA: f64 = -100.0;
/// Highest risk aversion accepted from an operator (power utility needs gamma < 1)
pub const MAX_OPERATOR_GAMMA: f64 = 0.9999;
/// Smallest starting wealth accepted from an operator
pub const MIN_INITIAL_WEALTH: f64 = 0.1;
/// Largest starting wealth accepted from an operator
pub const MAX_INITIAL_WEALTH: f64 = 100_000_000.0;
/// Wealth is clamped to this value whenever a step would take it to <= 0
pub const DEFAULT_WEALTH_FLOOR: f64 = 1e-6;

/// What to do when the estimated k is not positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendPolicy {
    /// Log a warning and keep going with the estimated parameters
    #[default]
    Warn,
    /// Fail with `EngineError::NotMeanReverting`
    Reject,
}

/// Inputs for one estimation + simulation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Power utility curvature (gamma < 1, 0 = log utility)
    pub gamma: f64,
    /// Starting wealth W0
    pub initial_wealth: f64,
    /// Strictly positive floor applied after each wealth update
    pub wealth_floor: f64,
    /// Handling of non-mean-reverting estimates
    pub trend_policy: TrendPolicy,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            gamma: -16.0,
            initial_wealth: 100.0,
            wealth_floor: DEFAULT_WEALTH_FLOOR,
            trend_policy: TrendPolicy::Warn,
        }
    }
}

impl AnalysisSettings {
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_initial_wealth(mut self, wealth: f64) -> Self {
        self.initial_wealth = wealth;
        self
    }

    pub fn with_trend_policy(mut self, policy: TrendPolicy) -> Self {
        self.trend_policy = policy;
        self
    }

    /// Validate against the operator-facing bounds
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(MIN_OPERATOR_GAMMA..=MAX_OPERATOR_GAMMA).contains(&self.gamma) {
            return Err(SettingsError::InvalidGamma(self.gamma));
        }
        if !(MIN_INITIAL_WEALTH..=MAX_INITIAL_WEALTH).contains(&self.initial_wealth) {
            return Err(SettingsError::InvalidInitialWealth(self.initial_wealth));
        }
        if !(self.wealth_floor > 0.0 && self.wealth_floor < self.initial_wealth) {
            return Err(SettingsError::InvalidWealthFloor(self.wealth_floor));
        }
        Ok(())
    }
}

/// Settings validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid gamma: {0} (must be -100 <= gamma <= 0.9999)")]
    InvalidGamma(f64),
    #[error("Invalid initial wealth: {0} (must be 0.1 <= W0 <= 1e8)")]
    InvalidInitialWealth(f64),
    #[error("Invalid wealth floor: {0} (must be 0 < floor < initial wealth)")]
    InvalidWealthFloor(f64),
}
