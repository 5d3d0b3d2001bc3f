//! Ornstein-Uhlenbeck Parameter Estimation
//!
//! Fits the discrete-time analogue of dX(t) = k(mu - X(t))dt + sigma*dW(t)
//! to a spread path by ordinary least squares, with dt = 1 per observation:
//!
//!   dX[i] = a + b * X[i] + e[i],   dX[i] = X[i+1] - X[i]
//!
//! Parameter mapping:
//! - k = -b (mean-reversion speed)
//! - mu = a / k (long-run mean)
//! - sigma = population std of the residuals e
//!
//! The caller resamples to the desired frequency (daily or minute bars)
//! before estimating; the estimator only sees unit steps.

use serde::{Deserialize, Serialize};

use crate::domain::{EngineError, SpreadSeries};
use super::params::TrendPolicy;

/// Lagged-spread variance below this fraction of sum(x^2) is treated as zero
const MIN_RELATIVE_VARIANCE: f64 = 1e-14;

/// OU process parameters estimated from a spread
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OuParameters {
    /// Mean reversion speed per observation step
    pub k: f64,
    /// Long-run equilibrium spread
    pub mu: f64,
    /// Residual volatility per observation step
    pub sigma: f64,
}

impl OuParameters {
    pub fn new(k: f64, mu: f64, sigma: f64) -> Self {
        Self { k, mu, sigma }
    }

    /// True when k > 0, i.e. the spread pulls back towards mu
    pub fn is_mean_reverting(&self) -> bool {
        self.k > 0.0
    }

    /// Steps for a displacement to halve: ln(2) / k
    pub fn half_life(&self) -> Option<f64> {
        self.is_mean_reverting().then(|| std::f64::consts::LN_2 / self.k)
    }

    /// Long-run standard deviation of the spread: sigma / sqrt(2k)
    pub fn stationary_std(&self) -> Option<f64> {
        self.is_mean_reverting().then(|| self.sigma / (2.0 * self.k).sqrt())
    }

    /// OU z-score of a spread value: (x - mu) / stationary_std
    pub fn z_score(&self, spread: f64) -> Option<f64> {
        let std = self.stationary_std()?;
        if std > 0.0 {
            Some((spread - self.mu) / std)
        } else {
            None
        }
    }
}

/// Estimated parameters plus regression diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OuFit {
    pub params: OuParameters,
    /// OLS intercept a
    pub intercept: f64,
    /// OLS slope b
    pub slope: f64,
    /// Number of (X_lag, dX) pairs used
    pub observations: usize,
    /// Coefficient of determination of the regression
    pub r_squared: f64,
}

/// OLS estimator for OU parameters
#[derive(Debug, Clone, Default)]
pub struct OuEstimator {
    trend_policy: TrendPolicy,
}

impl OuEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trend_policy(trend_policy: TrendPolicy) -> Self {
        Self { trend_policy }
    }

    /// Estimate OU parameters from a spread series
    pub fn estimate(&self, spread: &SpreadSeries) -> Result<OuParameters, EngineError> {
        self.fit(spread.values()).map(|fit| fit.params)
    }

    /// Run the full regression on raw spread values
    pub fn fit(&self, values: &[f64]) -> Result<OuFit, EngineError> {
        let n = values.len();
        if n < 2 {
            return Err(EngineError::InsufficientData { required: 2, actual: n });
        }

        let x_lag = &values[..n - 1];
        let dx: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        let m = dx.len() as f64;

        let mean_x = x_lag.iter().sum::<f64>() / m;
        let mean_y = dx.iter().sum::<f64>() / m;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        let mut syy = 0.0;
        let mut sum_sq = 0.0;
        for (&x, &y) in x_lag.iter().zip(dx.iter()) {
            let cx = x - mean_x;
            let cy = y - mean_y;
            sxx += cx * cx;
            sxy += cx * cy;
            syy += cy * cy;
            sum_sq += x * x;
        }

        if sxx <= MIN_RELATIVE_VARIANCE * sum_sq {
            // Flat lagged spread: no slope can be identified
            if dx.iter().all(|&d| d == 0.0) {
                return Err(EngineError::DegenerateVolatility(
                    "spread is constant; residual volatility is zero".to_string(),
                ));
            }
            return Err(EngineError::SingularRegression { variance: sxx / m });
        }

        let b = sxy / sxx;
        let a = mean_y - b * mean_x;
        if !a.is_finite() || !b.is_finite() {
            return Err(EngineError::NonFiniteValue("regression coefficients"));
        }

        let k = -b;
        if k == 0.0 {
            return Err(EngineError::ZeroMeanReversion);
        }
        if k < 0.0 {
            match self.trend_policy {
                TrendPolicy::Reject => return Err(EngineError::NotMeanReverting { k }),
                TrendPolicy::Warn => tracing::warn!(
                    "Estimated k = {:.6} <= 0: spread looks trending, not mean-reverting",
                    k
                ),
            }
        }

        let mu = a / k;
        if !mu.is_finite() {
            return Err(EngineError::NonFiniteValue("mu"));
        }

        let residuals: Vec<f64> = x_lag
            .iter()
            .zip(dx.iter())
            .map(|(&x, &y)| y - (a + b * x))
            .collect();
        let sigma = population_std(&residuals);
        if !sigma.is_finite() {
            return Err(EngineError::NonFiniteValue("sigma"));
        }

        let ss_res: f64 = residuals.iter().map(|e| e * e).sum();
        let r_squared = if syy > 0.0 { 1.0 - ss_res / syy } else { 1.0 };

        tracing::debug!(
            "OU fit over {} steps: a = {:.6}, b = {:.6}, k = {:.6}, mu = {:.6}, sigma = {:.6}",
            dx.len(),
            a,
            b,
            k,
            mu,
            sigma
        );

        Ok(OuFit {
            params: OuParameters { k, mu, sigma },
            intercept: a,
            slope: b,
            observations: dx.len(),
            r_squared,
        })
    }
}

/// Standard deviation dividing by the sample count (numpy's default `std`)
fn population_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
