// Error types for lapcoach
//
// The analysis engine itself never fails, these only cover the I/O around it.

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum LapCoachError {
    // Errors while loading telemetry
    #[snafu(display("Invalid telemetry file: {path}"))]
    InvalidTelemetryFile { path: String },
    #[snafu(display("Error loading telemetry file"))]
    TelemetryLoaderError { source: io::Error },
    #[snafu(display("Error parsing telemetry file"))]
    TelemetryParseError { source: serde_json::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error reading or writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Report output errors
    #[snafu(display("Error serializing analysis report"))]
    ReportSerializeError { source: serde_json::Error },
}
