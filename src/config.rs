use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::LapCoachError;

const CONFIG_DIR_NAME: &str = "lapcoach";
const CONFIG_FILE_NAME: &str = "config.json";

/// Calibration constants for the whole analysis pipeline.
///
/// Every threshold the engine compares against lives here so it can be tuned
/// against real telemetry without touching the algorithms. Each section is
/// `#[serde(default)]`, a config file only has to name the keys it overrides.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub normalizer: NormalizerConfig,
    pub features: FeatureConfig,
    pub classifier: ClassifierConfig,
    pub scoring: ScoringConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Fewer samples than this are not analyzed at all
    pub min_samples: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { min_samples: 40 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FeatureConfig {
    /// Throttle on/off boundary used to count binary throttle transitions
    pub throttle_on_threshold: f64,
    /// Throttle below this is considered lifted
    pub throttle_lift_threshold: f64,
    /// Brake above this is considered applied
    pub brake_onset_threshold: f64,
    /// Lift-to-brake gaps longer than this are coasting, not a pedal transition
    pub max_pedal_transition_s: f64,
    /// Steering changes smaller than this (degrees) are sensor noise
    pub steer_deadband_deg: f64,
    /// Two steering reversals closer than this are a micro-correction
    pub micro_correction_window_s: f64,
    /// Multiplier turning throttle travel per second into jerk units
    pub jerk_scale: f64,
    /// Brake onsets closer than this along the lap (spline units) are the same braking zone
    pub brake_zone_tolerance: f64,
    /// Upper bound of brake consistency, also reported when there are not enough
    /// brake events to measure it
    pub brake_consistency_ceiling_s: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            throttle_on_threshold: 0.5,
            throttle_lift_threshold: 0.1,
            brake_onset_threshold: 0.1,
            max_pedal_transition_s: 2.0,
            steer_deadband_deg: 0.5,
            micro_correction_window_s: 0.5,
            jerk_scale: 5.0,
            brake_zone_tolerance: 0.02,
            brake_consistency_ceiling_s: 1.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub monoplaza_min_rpm: f64,
    pub monoplaza_rpm_weight: f64,
    /// m/s
    pub monoplaza_min_speed: f64,
    pub monoplaza_speed_weight: f64,

    /// Degrees of steering wheel rotation
    pub drift_min_steer_deg: f64,
    pub drift_steer_weight: f64,
    /// Slow laps with a lot of lock also hint at drifting
    pub drift_max_speed: f64,
    pub drift_assist_steer_deg: f64,
    pub drift_assist_weight: f64,

    pub gt3_min_rpm: f64,
    pub gt3_max_rpm: f64,
    pub gt3_rpm_weight: f64,
    pub gt3_min_speed: f64,
    pub gt3_max_speed: f64,
    pub gt3_speed_weight: f64,

    pub street_min_rpm: f64,
    pub street_max_rpm: f64,
    pub street_rpm_weight: f64,
    pub street_min_speed: f64,
    pub street_max_speed: f64,
    pub street_speed_weight: f64,

    /// Winning weight below this is not enough evidence to name a class
    pub min_evidence: f64,
    /// Top two classes closer than this are a tie
    pub tie_epsilon: f64,
    /// Confidence reported alongside an UNKNOWN verdict never exceeds this
    pub max_unknown_confidence: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            monoplaza_min_rpm: 8500.,
            monoplaza_rpm_weight: 0.8,
            monoplaza_min_speed: 75.,
            monoplaza_speed_weight: 0.4,

            drift_min_steer_deg: 400.,
            drift_steer_weight: 1.0,
            drift_max_speed: 40.,
            drift_assist_steer_deg: 200.,
            drift_assist_weight: 0.2,

            gt3_min_rpm: 6000.,
            gt3_max_rpm: 8500.,
            gt3_rpm_weight: 0.5,
            gt3_min_speed: 50.,
            gt3_max_speed: 75.,
            gt3_speed_weight: 0.3,

            street_min_rpm: 1000.,
            street_max_rpm: 6000.,
            street_rpm_weight: 0.4,
            street_min_speed: 5.,
            street_max_speed: 50.,
            street_speed_weight: 0.2,

            min_evidence: 0.3,
            tie_epsilon: 0.05,
            max_unknown_confidence: 0.3,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Seconds
    pub reaction_time_limit: f64,
    /// Seconds (standard deviation)
    pub brake_consistency_limit: f64,
    /// Corrections per second
    pub micro_corrections_limit: f64,
    pub throttle_jerk_limit: f64,
    /// Drift laps counter-steer constantly, their micro-correction limit is scaled by this
    pub drift_micro_corrections_factor: f64,
    /// At or below `excellent_ratio * limit` a metric is a highlight
    pub excellent_ratio: f64,
    /// Above `warning_ratio * limit` a metric is a warning
    pub warning_ratio: f64,
    /// Points lost per unit of ratio above the limit
    pub penalty_scale: f64,
    pub max_penalty_per_metric: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            reaction_time_limit: 0.3,
            brake_consistency_limit: 0.1,
            micro_corrections_limit: 1.0,
            throttle_jerk_limit: 5.0,
            drift_micro_corrections_factor: 3.0,
            excellent_ratio: 0.8,
            warning_ratio: 1.5,
            penalty_scale: 20.,
            max_penalty_per_metric: 30.,
        }
    }
}

impl AnalyzerConfig {
    pub fn local_file_path() -> Option<PathBuf> {
        Some(
            dirs::config_dir()?
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        )
    }

    pub fn from_file(path: &Path) -> Result<Self, LapCoachError> {
        let file =
            std::fs::File::open(path).map_err(|e| LapCoachError::ConfigIOError { source: e })?;
        serde_json::from_reader(file).map_err(|e| LapCoachError::ConfigSerializeError { source: e })
    }

    /// Loads the config saved in the user's config directory, `Ok(None)` when there isn't one.
    pub fn from_local_file() -> Result<Option<Self>, LapCoachError> {
        let Some(config_path) = Self::local_file_path() else {
            return Ok(None);
        };

        if config_path.exists() {
            debug!("Loading analyzer config from {:?}", config_path);
            Self::from_file(&config_path).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), LapCoachError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| LapCoachError::ConfigIOError { source: e })?;
            }
        }

        let file =
            std::fs::File::create(path).map_err(|e| LapCoachError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| LapCoachError::ConfigSerializeError { source: e })
    }

    pub fn save_local(&self) -> Result<(), LapCoachError> {
        let config_path = Self::local_file_path().ok_or(LapCoachError::NoConfigDir)?;
        self.save(&config_path)
    }
}
