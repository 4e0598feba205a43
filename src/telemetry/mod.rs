pub mod laps;
pub mod loader;

pub use laps::split_laps;
pub use loader::{load_samples, load_samples_json, load_samples_jsonl};

use serde::{Deserialize, Serialize};

/// One physics snapshot of the car during a lap.
///
/// This is the strict record the analysis engine consumes. Values are not
/// trusted to be finite or in range, the normalizer takes care of that.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Seconds since the start of the session
    pub timestamp: f64,
    /// Speed in m/s
    pub speed: f64,
    /// Engine RPM
    pub rpm: f64,
    /// Current gear, encoding is up to the source
    pub gear: i32,
    /// Steering wheel rotation in degrees, sign gives the direction
    pub steer: f64,
    /// Throttle use. 0=off throttle to 1=full throttle
    pub throttle: f64,
    /// Brake use. 0=brake released to 1=max pedal force
    pub brake: f64,
    /// Normalized position around the lap, wraps at the start/finish line
    pub spline: f64,
}

/// Loosely shaped sample as it comes off the wire or out of a file.
///
/// Every field is optional and unknown keys are ignored. Converting it into a
/// [`TelemetrySample`] marks missing values as NaN so that the normalizer is the
/// single place where defaults are decided.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTelemetrySample {
    pub timestamp: Option<f64>,
    pub speed: Option<f64>,
    pub rpm: Option<f64>,
    pub gear: Option<f64>,
    pub steer: Option<f64>,
    pub throttle: Option<f64>,
    pub brake: Option<f64>,
    pub spline: Option<f64>,
}

impl From<RawTelemetrySample> for TelemetrySample {
    fn from(raw: RawTelemetrySample) -> Self {
        Self {
            timestamp: raw.timestamp.unwrap_or(f64::NAN),
            speed: raw.speed.unwrap_or(f64::NAN),
            rpm: raw.rpm.unwrap_or(f64::NAN),
            // saturating cast, gear is opaque to the engine anyway
            gear: raw
                .gear
                .filter(|gear| gear.is_finite())
                .map(|gear| gear as i32)
                .unwrap_or(0),
            steer: raw.steer.unwrap_or(f64::NAN),
            throttle: raw.throttle.unwrap_or(f64::NAN),
            brake: raw.brake.unwrap_or(f64::NAN),
            spline: raw.spline.unwrap_or(f64::NAN),
        }
    }
}
