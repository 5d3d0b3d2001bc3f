//! Domain Layer - Core data types for the pairs spread engine
//!
//! Pure types with no I/O:
//! - `spread`: price series, spread series and the inner-join spread builder
//! - `trajectory`: read-only output of a wealth simulation
//! - `error`: typed engine failures and their categories

pub mod error;
pub mod spread;
pub mod trajectory;

pub use error::{EngineError, ErrorKind};
pub use spread::{build_spread, PricePoint, PriceSeries, SpreadPoint, SpreadSeries};
pub use trajectory::{Trajectory, TrajectoryPoint};
