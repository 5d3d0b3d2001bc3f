//! Analysis Report
//!
//! Everything one run produces, in the shape the CLI prints and exports:
//! the estimated parameters (raw and rounded for display), regression
//! diagnostics, the full trajectory and its summary.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::domain::{Trajectory, TrajectoryPoint};
use crate::ports::market_data::SamplingMode;
use crate::strategy::{AnalysisSettings, OuFit, OuParameters, TrajectorySummary};

/// Decimal places shown for estimated parameters
pub const DISPLAY_DECIMALS: u32 = 6;

/// Round for display; non-finite values have no decimal form
fn round_for_display(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointNearestEven))
}

/// OU parameters rounded to six decimals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayParameters {
    pub k: Option<Decimal>,
    pub mu: Option<Decimal>,
    pub sigma: Option<Decimal>,
}

impl From<&OuParameters> for DisplayParameters {
    fn from(params: &OuParameters) -> Self {
        Self {
            k: round_for_display(params.k),
            mu: round_for_display(params.mu),
            sigma: round_for_display(params.sigma),
        }
    }
}

/// Regression diagnostics shown next to the parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitDiagnostics {
    pub intercept: f64,
    pub slope: f64,
    pub observations: usize,
    pub r_squared: f64,
    pub half_life: Option<f64>,
    pub stationary_std: Option<f64>,
}

impl From<&OuFit> for FitDiagnostics {
    fn from(fit: &OuFit) -> Self {
        Self {
            intercept: fit.intercept,
            slope: fit.slope,
            observations: fit.observations,
            r_squared: fit.r_squared,
            half_life: fit.params.half_life(),
            stationary_std: fit.params.stationary_std(),
        }
    }
}

/// Where the data came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairDescriptor {
    pub ticker1: String,
    pub ticker2: String,
    pub mode: SamplingMode,
    pub provider: String,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub observations: usize,
}

/// Result of one estimate-then-simulate run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub pair: PairDescriptor,
    pub settings: AnalysisSettings,
    pub params: OuParameters,
    pub display: DisplayParameters,
    pub diagnostics: FitDiagnostics,
    pub summary: TrajectorySummary,
    /// Latest z-score of the spread against the fitted stationary distribution
    pub current_z_score: Option<f64>,
    pub trajectory: Trajectory,
}

impl AnalysisReport {
    /// First `limit` trajectory rows
    pub fn head(&self, limit: usize) -> Vec<TrajectoryPoint> {
        self.trajectory.iter().take(limit).collect()
    }

    /// Last `limit` trajectory rows
    pub fn tail(&self, limit: usize) -> Vec<TrajectoryPoint> {
        let skip = self.trajectory.len().saturating_sub(limit);
        self.trajectory.iter().skip(skip).collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parameter block as printed by the CLI
    pub fn render_parameters(&self) -> String {
        let fmt = |d: Option<Decimal>| d.map(|d| d.to_string()).unwrap_or_else(|| "n/a".to_string());
        let mut out = String::new();
        out.push_str(&format!("Estimated Mean Reversion Speed (k): {}\n", fmt(self.display.k)));
        out.push_str(&format!("Estimated Long-term Mean (mu):      {}\n", fmt(self.display.mu)));
        out.push_str(&format!("Estimated Volatility (sigma):       {}\n", fmt(self.display.sigma)));
        if let Some(half_life) = self.diagnostics.half_life {
            out.push_str(&format!("Half-life (steps):                  {:.2}\n", half_life));
        }
        out.push_str(&format!("R-squared:                          {:.4}\n", self.diagnostics.r_squared));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_display_rounds_to_six_places() {
        let display = DisplayParameters::from(&OuParameters::new(1.7999999999999998, 1.05, 0.0670820393249937));
        assert_eq!(display.k, Some(dec!(1.8)));
        assert_eq!(display.mu, Some(dec!(1.05)));
        assert_eq!(display.sigma, Some(dec!(0.067082)));
        assert_eq!(display.sigma.map(|d| d.scale()), Some(6));
    }

    #[test]
    fn test_display_non_finite_is_none() {
        let display = DisplayParameters::from(&OuParameters::new(f64::NAN, 0.0, f64::INFINITY));
        assert_eq!(display.k, None);
        assert_eq!(display.mu, Some(dec!(0)));
        assert_eq!(display.sigma, None);
    }

    #[test]
    fn test_diagnostics_from_fit() {
        let fit = OuFit {
            params: OuParameters::new(0.5, 0.0, 1.0),
            intercept: 0.0,
            slope: -0.5,
            observations: 10,
            r_squared: 0.4,
        };
        let diag = FitDiagnostics::from(&fit);
        assert_eq!(diag.observations, 10);
        assert!((diag.half_life.unwrap() - std::f64::consts::LN_2 / 0.5).abs() < 1e-12);
        assert_eq!(diag.stationary_std, Some(1.0));
    }
}
