//! Optimal Position Sizing under Power Utility
//!
//! Closed-form solution of the HJB equation for power utility
//! U(W) = W^gamma / gamma (log utility at gamma = 0) when the traded spread
//! follows an OU process. The Riccati reduction gives, with
//! nu = 1 / sqrt(1 - gamma) and normalized time-to-horizon t = tau * k:
//!
//!   C(t)  = cosh(nu t) + nu sinh(nu t)
//!   C'(t) = nu sinh(nu t) + nu^2 cosh(nu t)
//!   D(t)  = C'(t) / C(t)            (D = 1 for log utility)
//!
//! and the optimal holding of the spread is
//!
//!   alpha(W, X, tau) = -W * X * (k / sigma^2) * D(tau * k)
//!
//! D is evaluated as nu (tanh(nu t) + nu) / (1 + nu tanh(nu t)), which equals
//! C'/C but does not overflow for large nu * t.

use serde::Serialize;

use crate::domain::EngineError;
use super::ou_estimator::OuParameters;

/// Power-utility risk preference (gamma < 1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskPreference {
    gamma: f64,
}

impl RiskPreference {
    /// Validate gamma; power utility is undefined at gamma = 1 and the
    /// closed form assumes gamma < 1
    pub fn new(gamma: f64) -> Result<Self, EngineError> {
        if !(gamma < 1.0) {
            return Err(EngineError::InvalidRiskPreference(gamma));
        }
        Ok(Self { gamma })
    }

    /// Log utility, the gamma -> 0 limit
    pub fn log_utility() -> Self {
        Self { gamma: 0.0 }
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn is_log_utility(&self) -> bool {
        self.gamma == 0.0
    }

    /// nu = 1 / sqrt(1 - gamma)
    pub fn nu(&self) -> f64 {
        1.0 / (1.0 - self.gamma).sqrt()
    }

    /// Position scaling factor D at normalized time-to-horizon `tau_norm`
    pub fn scaling_factor(&self, tau_norm: f64) -> f64 {
        if self.is_log_utility() {
            return 1.0;
        }
        let nu = self.nu();
        let t = (nu * tau_norm).tanh();
        nu * (t + nu) / (1.0 + nu * t)
    }

    /// D at zero remaining time: nu^2 = 1 / (1 - gamma), the myopic factor
    pub fn myopic_scaling(&self) -> f64 {
        if self.is_log_utility() {
            1.0
        } else {
            self.nu().powi(2)
        }
    }

    /// Power utility of wealth: ln W for gamma = 0, W^gamma / gamma otherwise
    pub fn utility(&self, wealth: f64) -> f64 {
        if self.is_log_utility() {
            wealth.ln()
        } else {
            wealth.powf(self.gamma) / self.gamma
        }
    }
}

/// C(t) = cosh(nu t) + nu sinh(nu t)
pub fn riccati_c(tau_norm: f64, nu: f64) -> f64 {
    (nu * tau_norm).cosh() + nu * (nu * tau_norm).sinh()
}

/// C'(t) = nu sinh(nu t) + nu^2 cosh(nu t)
pub fn riccati_c_prime(tau_norm: f64, nu: f64) -> f64 {
    nu * (nu * tau_norm).sinh() + nu.powi(2) * (nu * tau_norm).cosh()
}

/// Optimal position policy for one parameter set
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptimalPolicy {
    params: OuParameters,
    preference: RiskPreference,
    /// k / sigma^2
    intensity: f64,
}

impl OptimalPolicy {
    /// Build a policy, rejecting zero or non-finite volatility
    pub fn new(params: OuParameters, preference: RiskPreference) -> Result<Self, EngineError> {
        if !params.sigma.is_finite() || params.sigma <= 0.0 {
            return Err(EngineError::DegenerateVolatility(format!(
                "sigma = {} cannot size positions",
                params.sigma
            )));
        }
        if !params.k.is_finite() {
            return Err(EngineError::NonFiniteValue("k"));
        }

        let intensity = params.k / params.sigma.powi(2);
        if !intensity.is_finite() {
            return Err(EngineError::DegenerateVolatility(format!(
                "sigma = {:e} is too small; k / sigma^2 overflows",
                params.sigma
            )));
        }

        Ok(Self {
            params,
            preference,
            intensity,
        })
    }

    pub fn params(&self) -> &OuParameters {
        &self.params
    }

    pub fn preference(&self) -> &RiskPreference {
        &self.preference
    }

    /// D(tau * k) for a remaining time `tau` in observation steps
    pub fn scaling_factor(&self, tau: f64) -> f64 {
        self.preference.scaling_factor(tau * self.params.k)
    }

    /// Units of spread to hold at wealth `wealth`, spread `spread`, `tau` steps before the horizon
    ///
    /// The result can be non-finite for a trending estimate (k < 0); callers
    /// check before using it.
    pub fn position(&self, wealth: f64, spread: f64, tau: f64) -> f64 {
        -wealth * spread * self.intensity * self.scaling_factor(tau)
    }
}

/// Optimal position alpha(W, X, tau, k, gamma, sigma)
pub fn alpha(
    wealth: f64,
    spread: f64,
    tau: f64,
    k: f64,
    gamma: f64,
    sigma: f64,
) -> Result<f64, EngineError> {
    let preference = RiskPreference::new(gamma)?;
    let policy = OptimalPolicy::new(OuParameters::new(k, 0.0, sigma), preference)?;
    let position = policy.position(wealth, spread, tau);
    if !position.is_finite() {
        return Err(EngineError::NonFiniteValue("position"));
    }
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const GAMMAS: [f64; 4] = [0.0, 0.5, -1.0, -16.0];

    #[test]
    fn test_risk_preference_validation() {
        assert!(RiskPreference::new(0.9999).is_ok());
        assert!(RiskPreference::new(-100.0).is_ok());
        assert_eq!(
            RiskPreference::new(1.0),
            Err(EngineError::InvalidRiskPreference(1.0))
        );
        assert!(RiskPreference::new(2.5).is_err());
        assert!(RiskPreference::new(f64::NAN).is_err());
    }

    #[test]
    fn test_nu() {
        assert_relative_eq!(RiskPreference::new(0.0).unwrap().nu(), 1.0);
        assert_relative_eq!(RiskPreference::new(0.5).unwrap().nu(), 2.0_f64.sqrt());
        assert_relative_eq!(RiskPreference::new(-3.0).unwrap().nu(), 0.5);
    }

    #[test]
    fn test_scaling_at_zero_time() {
        for gamma in GAMMAS {
            let pref = RiskPreference::new(gamma).unwrap();
            let d0 = pref.scaling_factor(0.0);
            assert_relative_eq!(d0 / pref.myopic_scaling(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(d0, 1.0 / (1.0 - gamma), epsilon = 1e-12);
        }
        assert_eq!(RiskPreference::log_utility().scaling_factor(0.0), 1.0);
    }

    #[test]
    fn test_log_utility_is_flat() {
        let pref = RiskPreference::log_utility();
        for tau in [0.0, 0.3, 5.0, 1e9] {
            assert_eq!(pref.scaling_factor(tau), 1.0);
        }
        // The general formula agrees with the log case since nu = 1
        for tau in [0.0, 0.3, 5.0] {
            assert_relative_eq!(riccati_c_prime(tau, 1.0) / riccati_c(tau, 1.0), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_tanh_form_matches_riccati_ratio() {
        for gamma in [0.5, -1.0, -16.0] {
            let pref = RiskPreference::new(gamma).unwrap();
            let nu = pref.nu();
            for tau in [0.0, 0.1, 0.5, 2.0, 10.0] {
                let direct = riccati_c_prime(tau, nu) / riccati_c(tau, nu);
                assert_relative_eq!(pref.scaling_factor(tau), direct, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_large_horizon_does_not_overflow() {
        let pref = RiskPreference::new(-16.0).unwrap();
        let nu = pref.nu();
        let direct = riccati_c_prime(1e6, nu) / riccati_c(1e6, nu);
        assert!(direct.is_nan());

        let d = pref.scaling_factor(1e6);
        assert!(d.is_finite());
        assert_relative_eq!(d, nu, epsilon = 1e-12);
    }

    #[test]
    fn test_alpha_formula() {
        // gamma = 0: alpha = -W X k / sigma^2
        let a = alpha(100.0, 0.5, 10.0, 0.2, 0.0, 0.1).unwrap();
        assert_relative_eq!(a, -100.0 * 0.5 * 0.2 / 0.01, epsilon = 1e-9);

        // At tau = 0 the factor is 1 / (1 - gamma)
        let a = alpha(100.0, 0.5, 0.0, 0.2, -1.0, 0.1).unwrap();
        assert_relative_eq!(a, -100.0 * 0.5 * 20.0 * 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_alpha_linear_in_wealth() {
        for gamma in GAMMAS {
            let one = alpha(50.0, -0.3, 7.0, 0.15, gamma, 0.2).unwrap();
            let two = alpha(100.0, -0.3, 7.0, 0.15, gamma, 0.2).unwrap();
            assert_relative_eq!(two, 2.0 * one, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_alpha_zero_at_zero_spread() {
        for gamma in GAMMAS {
            for tau in [0.0, 1.0, 250.0] {
                assert_eq!(alpha(1e4, 0.0, tau, 0.3, gamma, 0.5).unwrap(), 0.0);
            }
        }
    }

    #[test]
    fn test_alpha_sign_opposes_spread() {
        assert!(alpha(100.0, 1.0, 5.0, 0.2, -16.0, 0.3).unwrap() < 0.0);
        assert!(alpha(100.0, -1.0, 5.0, 0.2, -16.0, 0.3).unwrap() > 0.0);
    }

    #[test]
    fn test_alpha_failures() {
        assert!(matches!(
            alpha(100.0, 1.0, 5.0, 0.2, -1.0, 0.0),
            Err(EngineError::DegenerateVolatility(_))
        ));
        assert!(matches!(
            alpha(100.0, 1.0, 5.0, 0.2, 1.0, 0.3),
            Err(EngineError::InvalidRiskPreference(_))
        ));
        assert!(matches!(
            alpha(100.0, 1.0, 5.0, 0.2, -1.0, 1e-200),
            Err(EngineError::DegenerateVolatility(_))
        ));
    }

    #[test]
    fn test_policy_scaling_uses_normalized_time() {
        let params = OuParameters::new(0.25, 0.0, 0.1);
        let policy = OptimalPolicy::new(params, RiskPreference::new(-1.0).unwrap()).unwrap();
        assert_relative_eq!(
            policy.scaling_factor(8.0),
            policy.preference().scaling_factor(2.0),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_utility() {
        let log = RiskPreference::log_utility();
        assert_relative_eq!(log.utility(std::f64::consts::E), 1.0, epsilon = 1e-12);

        let power = RiskPreference::new(-1.0).unwrap();
        assert_relative_eq!(power.utility(2.0), -0.5, epsilon = 1e-12);

        let half = RiskPreference::new(0.5).unwrap();
        assert_relative_eq!(half.utility(4.0), 4.0, epsilon = 1e-12);
    }
}
