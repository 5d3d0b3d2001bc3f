//! Configuration Loader
//!
//! Loads and validates configuration from TOML files. Every section is
//! optional; missing keys take the defaults of the reference deployment.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::adapters::market_data::YahooConfig;
use crate::ports::market_data::SamplingMode;
use crate::strategy::params::{AnalysisSettings, TrendPolicy, DEFAULT_WEALTH_FLOOR};

/// Environment variable overriding `data.api_url`
pub const DATA_URL_ENV: &str = "OU_PAIRS_DATA_URL";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisSection,
    pub data: DataSection,
    pub pair: PairSection,
    pub logging: LoggingSection,
}

/// Estimation and simulation inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    /// Power utility curvature, -100 <= gamma <= 0.9999 (0 = log utility)
    pub gamma: f64,
    /// Starting wealth W0, 0.1 <= W0 <= 1e8
    pub initial_wealth: f64,
    /// Positive floor wealth is clamped to after a wipe-out step
    pub wealth_floor: f64,
    /// "warn" or "reject" when the estimated k is not positive
    pub trend_policy: TrendPolicy,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        let settings = AnalysisSettings::default();
        Self {
            gamma: settings.gamma,
            initial_wealth: settings.initial_wealth,
            wealth_floor: DEFAULT_WEALTH_FLOOR,
            trend_policy: settings.trend_policy,
        }
    }
}

/// Price data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataProvider {
    #[default]
    Yahoo,
    Synthetic,
}

/// Market data configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub provider: DataProvider,
    /// Chart API base URL
    pub api_url: String,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// Attempts per request (429 and 5xx are retried)
    pub max_retries: u32,
    /// How long fetched series stay cached, in seconds
    pub cache_ttl_secs: u64,
    /// Trailing window for daily closes
    pub daily_lookback_days: i64,
    /// Trailing window for minute closes
    pub intraday_lookback_days: i64,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            provider: DataProvider::Yahoo,
            api_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            cache_ttl_secs: 3600,
            daily_lookback_days: 365,
            intraday_lookback_days: 4,
        }
    }
}

impl DataSection {
    /// Get API URL with environment variable override
    /// Checks OU_PAIRS_DATA_URL env var first, falls back to config value
    pub fn get_api_url(&self) -> String {
        std::env::var(DATA_URL_ENV).unwrap_or_else(|_| self.api_url.clone())
    }

    pub fn yahoo_config(&self) -> YahooConfig {
        YahooConfig {
            api_base_url: self.get_api_url(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Trailing window length for a sampling mode
    pub fn lookback(&self, mode: SamplingMode) -> chrono::Duration {
        match mode {
            SamplingMode::Daily => chrono::Duration::days(self.daily_lookback_days),
            SamplingMode::Intraday => chrono::Duration::days(self.intraday_lookback_days),
        }
    }
}

/// Default pair: RBOB gasoline vs heating oil futures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairSection {
    pub ticker1: String,
    pub ticker2: String,
    /// Minute closes over a few days instead of daily closes over a year
    pub intraday: bool,
}

impl Default for PairSection {
    fn default() -> Self {
        Self {
            ticker1: "RB=F".to_string(),
            ticker2: "HO=F".to_string(),
            intraday: false,
        }
    }
}

impl PairSection {
    pub fn mode(&self) -> SamplingMode {
        SamplingMode::from_intraday_flag(self.intraday)
    }
}

/// Logging configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file (`~` is expanded)
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let raw = path.as_ref().to_string_lossy();
    let expanded = shellexpand::tilde(&raw).to_string();
    let content = std::fs::read_to_string(expanded)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        AnalysisSettings::from(self)
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        // Validate data section
        if self.data.api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "api_url cannot be empty".to_string(),
            ));
        }

        if self.data.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        if self.data.max_retries == 0 {
            return Err(ConfigError::ValidationError(
                "max_retries must be >= 1".to_string(),
            ));
        }

        if self.data.daily_lookback_days <= 0 || self.data.intraday_lookback_days <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "lookback days must be > 0, got daily={} intraday={}",
                self.data.daily_lookback_days, self.data.intraday_lookback_days
            )));
        }

        // Validate pair
        if self.pair.ticker1.trim().is_empty() || self.pair.ticker2.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "tickers cannot be empty".to_string(),
            ));
        }

        if self.pair.ticker1 == self.pair.ticker2 {
            return Err(ConfigError::ValidationError(format!(
                "ticker1 and ticker2 must differ, both are {}",
                self.pair.ticker1
            )));
        }

        Ok(())
    }
}

// Conversion from Config to AnalysisSettings
impl From<&Config> for AnalysisSettings {
    fn from(config: &Config) -> Self {
        AnalysisSettings {
            gamma: config.analysis.gamma,
            initial_wealth: config.analysis.initial_wealth,
            wealth_floor: config.analysis.wealth_floor,
            trend_policy: config.analysis.trend_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> String {
        r#"
[analysis]
gamma = -4.0
initial_wealth = 250.0
wealth_floor = 1e-6
trend_policy = "reject"

[data]
provider = "yahoo"
api_url = "https://query2.finance.yahoo.com"
timeout_secs = 10
max_retries = 5
cache_ttl_secs = 600
daily_lookback_days = 180
intraday_lookback_days = 2

[pair]
ticker1 = "CL=F"
ticker2 = "BZ=F"
intraday = true

[logging]
level = "info"
"#
        .to_string()
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(&create_valid_config());
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.analysis.gamma, -4.0);
        assert_eq!(config.analysis.trend_policy, TrendPolicy::Reject);
        assert_eq!(config.data.max_retries, 5);
        assert_eq!(config.data.lookback(SamplingMode::Intraday), chrono::Duration::days(2));
        assert_eq!(config.pair.ticker1, "CL=F");
        assert_eq!(config.pair.mode(), SamplingMode::Intraday);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.analysis.gamma, -16.0);
        assert_eq!(config.analysis.initial_wealth, 100.0);
        assert_eq!(config.pair.ticker1, "RB=F");
        assert_eq!(config.pair.ticker2, "HO=F");
        assert_eq!(config.data.provider, DataProvider::Yahoo);
        assert_eq!(config.data.lookback(SamplingMode::Daily), chrono::Duration::days(365));
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let file = write_config("[analysis]\ngamma = 0.0\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.analysis.gamma, 0.0);
        assert_eq!(config.analysis.initial_wealth, 100.0);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::IoError(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let file = write_config("[analysis\ngamma = ");
        assert!(matches!(load_config(file.path()), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_invalid_gamma() {
        let file = write_config("[analysis]\ngamma = 1.0\n");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::ValidationError(_))
        ));

        let file = write_config("[analysis]\ngamma = -150.0\n");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_invalid_wealth() {
        let file = write_config("[analysis]\ninitial_wealth = 0.01\n");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_invalid_data_section() {
        let mut config = Config::default();
        config.data.max_retries = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.data.daily_lookback_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_identical_tickers_rejected() {
        let mut config = Config::default();
        config.pair.ticker2 = config.pair.ticker1.clone();
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_config_to_settings() {
        let file = write_config(&create_valid_config());
        let config = load_config(file.path()).unwrap();
        let settings = AnalysisSettings::from(&config);

        assert_eq!(settings.gamma, -4.0);
        assert_eq!(settings.initial_wealth, 250.0);
        assert_eq!(settings.trend_policy, TrendPolicy::Reject);
    }

    #[test]
    fn test_api_url_env_override() {
        let section = DataSection::default();
        std::env::set_var(DATA_URL_ENV, "http://127.0.0.1:8080");
        assert_eq!(section.get_api_url(), "http://127.0.0.1:8080");
        assert_eq!(section.yahoo_config().api_base_url, "http://127.0.0.1:8080");
        std::env::remove_var(DATA_URL_ENV);
        assert_eq!(section.get_api_url(), "https://query1.finance.yahoo.com");
    }
}
