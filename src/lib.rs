// Library interface for lapcoach
// This allows integration tests and benches to access internal modules

pub mod analysis;
pub mod config;
pub mod errors;
pub mod telemetry;

// Re-export commonly used types
pub use analysis::{
    CarClass, DrivingStyle, RaceAnalysisResult, StyleMetrics, analyze, analyze_with_config,
};
pub use config::AnalyzerConfig;
pub use errors::LapCoachError;
pub use telemetry::{RawTelemetrySample, TelemetrySample};
