use log::debug;
use serde::{Deserialize, Serialize};

use super::features::LapFeatures;
use crate::config::FeatureConfig;

/// The four driving-quality metrics. Lower is better for all of them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleMetrics {
    /// Mean seconds from lifting off the throttle to braking
    pub reaction_time: f64,
    /// Standard deviation in seconds of where braking starts, lap over lap, or of
    /// the lift-to-brake timing when no braking zone was driven twice
    pub brake_consistency: f64,
    /// Steering micro-corrections per second
    pub micro_corrections: f64,
    /// Abruptness of throttle inputs per second, unitless
    pub throttle_jerk: f64,
}

/// How much evidence backs each metric, scoring skips metrics without it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetricEvidence {
    pub pedal_transitions: usize,
    pub repeated_brake_zones: usize,
}

impl MetricEvidence {
    pub fn from_features(features: &LapFeatures) -> Self {
        Self {
            pedal_transitions: features.pedal_transitions_s.len(),
            repeated_brake_zones: features.brake_zone_spreads_s.len(),
        }
    }

    pub fn has_reaction_time(&self) -> bool {
        self.pedal_transitions >= 1
    }

    pub fn has_brake_consistency(&self) -> bool {
        self.repeated_brake_zones >= 1 || self.pedal_transitions >= 2
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population standard deviation, `None` with fewer than two values.
fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

pub fn compute(features: &LapFeatures, config: &FeatureConfig) -> StyleMetrics {
    // braking points compared across laps beat lift-to-brake timing within a lap
    let brake_consistency = mean(&features.brake_zone_spreads_s)
        .or_else(|| std_dev(&features.pedal_transitions_s))
        .unwrap_or(config.brake_consistency_ceiling_s)
        .min(config.brake_consistency_ceiling_s);
    let metrics = StyleMetrics {
        reaction_time: mean(&features.pedal_transitions_s).unwrap_or(0.),
        brake_consistency,
        micro_corrections: features.per_second(features.micro_corrections),
        throttle_jerk: config.jerk_scale * features.throttle_travel_per_second(),
    };
    debug!("Style metrics: {:?}", metrics);
    metrics
}
