//! Strategy Layer - OU Estimation and Optimal Position Sizing
//!
//! The quantitative core, pure and synchronous:
//! - `ou_estimator`: OLS fit of AR(1) dynamics to a spread -> (k, mu, sigma)
//! - `policy`: closed-form power-utility position alpha(W, X, tau)
//! - `simulation`: marks the policy to a realized spread path
//! - `params`: operator inputs (gamma, initial wealth, floor, trend handling)

pub mod params;
pub mod ou_estimator;
pub mod policy;
pub mod simulation;

pub use params::{AnalysisSettings, SettingsError, TrendPolicy, DEFAULT_WEALTH_FLOOR};
pub use ou_estimator::{OuEstimator, OuFit, OuParameters};
pub use policy::{alpha, riccati_c, riccati_c_prime, OptimalPolicy, RiskPreference};
pub use simulation::{PolicyState, TrajectorySummary, WealthSimulator};
