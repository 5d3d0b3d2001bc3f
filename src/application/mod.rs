//! Application Layer - Use cases wiring ports to the strategy core
//!
//! - `analyzer`: fetch a pair, estimate, size and simulate
//! - `session`: interactive form state with refetch-on-submit only
//! - `report`: the printable / exportable result of a run

pub mod analyzer;
pub mod report;
pub mod session;

pub use analyzer::{analyze_pair, AnalysisError, FetchedPair, PairAnalyzer, PairRequest};
pub use report::{AnalysisReport, DisplayParameters, FitDiagnostics, PairDescriptor};
pub use session::{AnalysisSession, PairForm};
