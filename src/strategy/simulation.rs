//! Wealth Simulation
//!
//! Marks the optimal position to the realized spread path:
//! at step i the policy sizes a position from the current wealth and spread,
//! the next spread move is applied, and wealth is clamped to a positive floor.
//! The horizon is the index of the last observation, so the time remaining at
//! step i is T - i.

use serde::Serialize;

use crate::domain::{EngineError, SpreadSeries, Trajectory, TrajectoryPoint};
use super::params::DEFAULT_WEALTH_FLOOR;
use super::policy::OptimalPolicy;

/// Wealth carried between simulation steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyState {
    wealth: f64,
}

impl PolicyState {
    pub fn new(initial_wealth: f64) -> Result<Self, EngineError> {
        if !initial_wealth.is_finite() || initial_wealth <= 0.0 {
            return Err(EngineError::InvalidWealth(initial_wealth));
        }
        Ok(Self {
            wealth: initial_wealth,
        })
    }

    pub fn wealth(&self) -> f64 {
        self.wealth
    }

    /// Apply the P&L of holding `position` over a spread move `dx`
    ///
    /// Returns true when the new wealth was clamped to `floor`. A non-finite
    /// update is an error at `step` and leaves the state untouched.
    fn apply(
        &mut self,
        position: f64,
        dx: f64,
        floor: f64,
        step: usize,
    ) -> Result<bool, EngineError> {
        let next = self.wealth + position * dx;
        if !next.is_finite() {
            return Err(EngineError::NonFinite { quantity: "wealth", step });
        }
        if next <= 0.0 {
            self.wealth = floor;
            Ok(true)
        } else {
            self.wealth = next;
            Ok(false)
        }
    }
}

/// Summary statistics for a finished run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajectorySummary {
    pub steps: usize,
    pub initial_wealth: f64,
    pub final_wealth: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub floor_hits: usize,
    /// Power utility of the final wealth
    pub terminal_utility: f64,
}

impl TrajectorySummary {
    pub fn from_trajectory(trajectory: &Trajectory, policy: &OptimalPolicy) -> Self {
        Self {
            steps: trajectory.len(),
            initial_wealth: trajectory.initial_wealth(),
            final_wealth: trajectory.final_wealth(),
            total_return: trajectory.total_return(),
            max_drawdown: trajectory.max_drawdown(),
            floor_hits: trajectory.floor_hits(),
            terminal_utility: policy.preference().utility(trajectory.final_wealth()),
        }
    }
}

/// Runs the optimal policy through a realized spread path
#[derive(Debug, Clone, Copy)]
pub struct WealthSimulator {
    wealth_floor: f64,
}

impl Default for WealthSimulator {
    fn default() -> Self {
        Self {
            wealth_floor: DEFAULT_WEALTH_FLOOR,
        }
    }
}

impl WealthSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different positive floor; non-positive values keep the default
    pub fn with_wealth_floor(wealth_floor: f64) -> Self {
        if wealth_floor > 0.0 && wealth_floor.is_finite() {
            Self { wealth_floor }
        } else {
            tracing::warn!(
                "Ignoring wealth floor {}; using {}",
                wealth_floor,
                DEFAULT_WEALTH_FLOOR
            );
            Self::default()
        }
    }

    pub fn wealth_floor(&self) -> f64 {
        self.wealth_floor
    }

    /// Simulate wealth from `initial_wealth` along `spread`
    ///
    /// The trajectory has one row per forward difference, i.e. `spread.len() - 1` rows.
    pub fn simulate(
        &self,
        spread: &SpreadSeries,
        policy: &OptimalPolicy,
        initial_wealth: f64,
    ) -> Result<Trajectory, EngineError> {
        let values = spread.values();
        let timestamps = spread.timestamps();
        let n = values.len();
        if n < 2 {
            return Err(EngineError::InsufficientData { required: 2, actual: n });
        }

        let mut state = PolicyState::new(initial_wealth)?;
        let horizon = n - 1;
        let mut trajectory = Trajectory::with_capacity(horizon, initial_wealth);

        for i in 0..horizon {
            let x = values[i];
            let tau = horizon.saturating_sub(i) as f64;

            let position = policy.position(state.wealth(), x, tau);
            if !position.is_finite() {
                return Err(EngineError::NonFinite { quantity: "position", step: i });
            }

            let dx = values[i + 1] - x;
            let clamped = state.apply(position, dx, self.wealth_floor, i)?;
            if clamped {
                trajectory.record_floor_hit();
                tracing::debug!(
                    "Step {}: wealth went non-positive, clamped to {}",
                    i,
                    self.wealth_floor
                );
            }

            trajectory.push(TrajectoryPoint {
                timestamp: timestamps[i],
                spread: x,
                position,
                wealth: state.wealth(),
            });
        }

        tracing::info!(
            "Simulated {} steps: wealth {:.4} -> {:.4} ({} floor clamps)",
            trajectory.len(),
            initial_wealth,
            trajectory.final_wealth(),
            trajectory.floor_hits()
        );

        Ok(trajectory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ou_estimator::{OuEstimator, OuParameters};
    use crate::strategy::policy::{alpha, RiskPreference};
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn series(values: &[f64]) -> SpreadSeries {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        SpreadSeries::from_values(values, start, Duration::days(1)).unwrap()
    }

    fn policy(k: f64, sigma: f64, gamma: f64) -> OptimalPolicy {
        OptimalPolicy::new(
            OuParameters::new(k, 0.0, sigma),
            RiskPreference::new(gamma).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_trajectory_length() {
        let spread = series(&[1.0, 1.2, 0.9, 1.1, 1.0]);
        let t = WealthSimulator::new()
            .simulate(&spread, &policy(0.5, 1.0, -1.0), 100.0)
            .unwrap();
        assert_eq!(t.len(), spread.len() - 1);
        assert_eq!(t.timestamps(), &spread.timestamps()[..4]);
        assert_eq!(t.spread(), &spread.values()[..4]);
    }

    #[test]
    fn test_steps_follow_alpha() {
        let values = [1.0, 1.2, 0.9, 1.1, 1.0];
        let spread = series(&values);
        let fit = OuEstimator::new().fit(&values).unwrap();
        let (k, sigma, gamma) = (fit.params.k, fit.params.sigma, -16.0);
        let p = OptimalPolicy::new(fit.params, RiskPreference::new(gamma).unwrap()).unwrap();

        let t = WealthSimulator::new().simulate(&spread, &p, 100.0).unwrap();

        // Replay the loop by hand
        let mut w = 100.0;
        let horizon = (values.len() - 1) as f64;
        for i in 0..values.len() - 1 {
            let a = alpha(w, values[i], horizon - i as f64, k, gamma, sigma).unwrap();
            w += a * (values[i + 1] - values[i]);
            if w <= 0.0 {
                w = 1e-6;
            }
            assert_relative_eq!(t.positions()[i], a, max_relative = 1e-12);
            assert_relative_eq!(t.wealth()[i], w, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_wealth_floor() {
        // A huge position against a big adverse move wipes out wealth
        let spread = series(&[1.0, 3.0, -2.0, 4.0]);
        let t = WealthSimulator::new()
            .simulate(&spread, &policy(1.0, 0.01, 0.0), 10.0)
            .unwrap();

        assert!(t.floor_hits() > 0);
        assert!(t.wealth().iter().all(|&w| w > 0.0));
        assert_eq!(t.wealth()[0], 1e-6);
    }

    #[test]
    fn test_custom_floor() {
        let spread = series(&[1.0, 3.0]);
        let t = WealthSimulator::with_wealth_floor(0.5)
            .simulate(&spread, &policy(1.0, 0.01, 0.0), 10.0)
            .unwrap();
        assert_eq!(t.wealth(), &[0.5]);

        assert_eq!(WealthSimulator::with_wealth_floor(-1.0).wealth_floor(), 1e-6);
    }

    #[test]
    fn test_zero_spread_holds_wealth() {
        let spread = series(&[0.0, 0.5, 0.0]);
        let t = WealthSimulator::new()
            .simulate(&spread, &policy(0.3, 0.2, -1.0), 100.0)
            .unwrap();
        assert_eq!(t.positions()[0], 0.0);
        assert_eq!(t.wealth()[0], 100.0);
    }

    #[test]
    fn test_invalid_inputs() {
        let p = policy(0.5, 1.0, -1.0);

        let short = series(&[1.0]);
        assert!(matches!(
            WealthSimulator::new().simulate(&short, &p, 100.0),
            Err(EngineError::InsufficientData { required: 2, actual: 1 })
        ));

        let spread = series(&[1.0, 2.0]);
        assert!(matches!(
            WealthSimulator::new().simulate(&spread, &p, 0.0),
            Err(EngineError::InvalidWealth(_))
        ));
        assert!(matches!(
            WealthSimulator::new().simulate(&spread, &p, f64::INFINITY),
            Err(EngineError::InvalidWealth(_))
        ));
    }

    #[test]
    fn test_non_finite_position_is_reported() {
        let spread = series(&[1e10, 2e10, 1e10]);
        let err = WealthSimulator::new()
            .simulate(&spread, &policy(1.0, 0.01, 0.0), 1e300)
            .unwrap_err();
        assert_eq!(err, EngineError::NonFinite { quantity: "position", step: 0 });
    }

    #[test]
    fn test_overflowing_wealth_is_reported_not_clamped() {
        // Finite position, but the P&L of the move overflows to -inf
        let spread = series(&[1e300, 1.7e308]);
        let err = WealthSimulator::new()
            .simulate(&spread, &policy(1.0, 0.01, 0.0), 1.0)
            .unwrap_err();
        assert_eq!(err, EngineError::NonFinite { quantity: "wealth", step: 0 });
    }

    #[test]
    fn test_apply_keeps_state_on_overflow() {
        let mut state = PolicyState::new(1.0).unwrap();
        assert!(state.apply(-1e304, 1.7e308, 1e-6, 3).is_err());
        assert_eq!(state.wealth(), 1.0);
        assert_eq!(state.apply(-2.0, 1.0, 1e-6, 4), Ok(true));
        assert_eq!(state.wealth(), 1e-6);
    }

    #[test]
    fn test_summary() {
        let spread = series(&[1.0, 1.2, 0.9, 1.1, 1.0]);
        let p = policy(0.5, 1.0, 0.0);
        let t = WealthSimulator::new().simulate(&spread, &p, 100.0).unwrap();
        let summary = TrajectorySummary::from_trajectory(&t, &p);

        assert_eq!(summary.steps, 4);
        assert_eq!(summary.initial_wealth, 100.0);
        assert_eq!(summary.final_wealth, t.final_wealth());
        assert_relative_eq!(summary.terminal_utility, t.final_wealth().ln(), epsilon = 1e-12);
    }
}
