//! OU Pairs - Spread Mean-Reversion Analyzer Library
//!
//! Estimates Ornstein-Uhlenbeck dynamics for the spread between two price
//! series and sizes the closed-form optimal position of a power-utility
//! investor, replayed along the realized spread.
//!
//! # Modules
//!
//! - `domain`: Core data types (PriceSeries, SpreadSeries, Trajectory, EngineError)
//! - `ports`: Trait abstractions (PriceHistoryPort)
//! - `strategy`: OU estimation, optimal policy and wealth simulation
//! - `adapters`: External implementations (Yahoo chart API, synthetic data, cache, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Pair analyzer, interactive session and reports

pub mod domain;
pub mod ports;
pub mod strategy;
pub mod adapters;
pub mod config;
pub mod application;
