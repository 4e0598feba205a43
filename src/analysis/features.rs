use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use simple_moving_average::{SMA, SumTreeSMA};

use crate::config::FeatureConfig;
use crate::telemetry::TelemetrySample;
use crate::telemetry::laps::is_lap_wrap;

/// Number of samples averaged to de-noise steering before looking for reversals
const STEER_SMOOTHING_WINDOW: usize = 3;

/// Moment the brake pedal went from released to applied.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrakeOnset {
    pub timestamp: f64,
    pub spline: f64,
    /// Laps completed before this onset, 0 for the first lap in the session
    pub lap: usize,
    /// Spline units per second when the brake was hit, 0 if unknown
    pub spline_rate: f64,
}

/// Scalar and derived signals reduced from a normalized lap.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LapFeatures {
    pub sample_count: usize,
    /// Seconds between the first and last sample
    pub duration_s: f64,
    /// Start/finish crossings inside the session
    pub lap_wraps: usize,
    pub max_rpm: f64,
    /// m/s
    pub max_speed: f64,
    /// Degrees
    pub max_steer_abs: f64,
    /// Samples where the throttle crossed the on/off boundary
    pub throttle_transitions: usize,
    /// `throttle[i] - throttle[i - 1]` for every consecutive pair
    pub throttle_deltas: Vec<f64>,
    pub brake_onsets: Vec<BrakeOnset>,
    /// Brake-onset timing spread in seconds of every braking zone hit on more than one lap
    pub brake_zone_spreads_s: Vec<f64>,
    /// Seconds from lifting off the throttle to the following brake onset
    pub pedal_transitions_s: Vec<f64>,
    pub steering_reversals: usize,
    /// Steering reversals that quickly follow a previous reversal
    pub micro_corrections: usize,
}

impl LapFeatures {
    /// Converts an amount into a per-second rate over the session.
    ///
    /// A session without a measurable length has no rates, they are 0.
    pub fn rate(&self, amount: f64) -> f64 {
        let rate = amount / self.duration_s;
        if self.duration_s > 0. && rate.is_finite() {
            rate
        } else {
            0.
        }
    }

    pub fn per_second(&self, count: usize) -> f64 {
        self.rate(count as f64)
    }

    /// Total throttle pedal travel per second, independent of the sampling rate.
    pub fn throttle_travel_per_second(&self) -> f64 {
        self.rate(self.throttle_deltas.iter().map(|delta| delta.abs()).sum())
    }
}

/// Pairs each throttle lift with the brake onset that follows it.
struct PedalTransitionTracker {
    lift_threshold: f64,
    brake_threshold: f64,
    max_transition_s: f64,
    pending_lift: Option<f64>,
}

impl PedalTransitionTracker {
    fn new(config: &FeatureConfig) -> Self {
        Self {
            lift_threshold: config.throttle_lift_threshold,
            brake_threshold: config.brake_onset_threshold,
            max_transition_s: config.max_pedal_transition_s,
            pending_lift: None,
        }
    }

    fn update(
        &mut self,
        prev: &TelemetrySample,
        cur: &TelemetrySample,
        features: &mut LapFeatures,
    ) {
        if cur.throttle >= self.lift_threshold {
            // throttle (re)applied, any earlier lift was not followed by braking
            self.pending_lift = None;
        } else if prev.throttle >= self.lift_threshold {
            self.pending_lift = Some(cur.timestamp);
        }

        if cur.brake > self.brake_threshold && prev.brake <= self.brake_threshold {
            features.brake_onsets.push(BrakeOnset {
                timestamp: cur.timestamp,
                spline: cur.spline,
                lap: features.lap_wraps,
                spline_rate: spline_rate(prev, cur),
            });
            if let Some(lift_ts) = self.pending_lift.take() {
                let transition = cur.timestamp - lift_ts;
                if transition <= self.max_transition_s {
                    features.pedal_transitions_s.push(transition);
                }
            }
        }
    }
}

fn spline_rate(prev: &TelemetrySample, cur: &TelemetrySample) -> f64 {
    let dt = cur.timestamp - prev.timestamp;
    let rate = (cur.spline - prev.spline) / dt;
    if dt > 0. && rate.is_finite() && !is_lap_wrap(prev, cur) {
        rate.max(0.)
    } else {
        0.
    }
}

/// Standard deviation of the braking point in a zone, in seconds at the mean
/// approach speed along the lap.
fn zone_spread_s(zone: &[BrakeOnset]) -> Option<f64> {
    if zone.len() < 2 {
        return None;
    }
    let n = zone.len() as f64;
    let mean_spline = zone.iter().map(|onset| onset.spline).sum::<f64>() / n;
    let mean_rate = zone.iter().map(|onset| onset.spline_rate).sum::<f64>() / n;
    let variance = zone
        .iter()
        .map(|onset| (onset.spline - mean_spline).powi(2))
        .sum::<f64>()
        / n;
    let spread = variance.sqrt() / mean_rate;
    (mean_rate > 0. && spread.is_finite()).then_some(spread)
}

/// Groups brake onsets into braking zones by track position and measures how
/// far the braking point moved from lap to lap.
///
/// Only the first onset of each lap counts in a zone, pumping the brake is one
/// braking. Zones visited on a single lap have nothing to compare and are left out.
fn braking_zone_spreads(onsets: &[BrakeOnset], config: &FeatureConfig) -> Vec<f64> {
    let mut by_position = onsets.to_vec();
    by_position.sort_by(|a, b| a.spline.total_cmp(&b.spline));

    let mut zones: Vec<Vec<BrakeOnset>> = Vec::new();
    for onset in by_position {
        let same_zone = |zone: &&mut Vec<BrakeOnset>| {
            zone.last()
                .is_some_and(|last| onset.spline - last.spline <= config.brake_zone_tolerance)
        };
        if let Some(zone) = zones.last_mut().filter(same_zone) {
            zone.push(onset);
        } else {
            zones.push(vec![onset]);
        }
    }

    zones
        .into_iter()
        .filter_map(|mut zone| {
            zone.sort_by(|a, b| a.lap.cmp(&b.lap).then(a.timestamp.total_cmp(&b.timestamp)));
            zone.dedup_by_key(|onset| onset.lap);
            zone_spread_s(&zone).map(|spread| spread.min(config.brake_consistency_ceiling_s))
        })
        .collect()
}

/// Counts steering direction reversals on a smoothed steering trace.
///
/// Direction only changes once the wheel has moved more than the deadband away
/// from the last point a direction was established, so slow sweeps through a
/// corner and sensor jitter don't register as reversals.
struct SteeringReversalTracker<const WINDOW_SIZE: usize> {
    smoothed: SumTreeSMA<f64, f64, WINDOW_SIZE>,
    deadband: f64,
    micro_correction_window_s: f64,
    anchor: Option<f64>,
    direction: f64,
    last_reversal_ts: Option<f64>,
}

impl<const WINDOW_SIZE: usize> SteeringReversalTracker<WINDOW_SIZE> {
    fn new(config: &FeatureConfig) -> Self {
        Self {
            smoothed: SumTreeSMA::new(),
            deadband: config.steer_deadband_deg,
            micro_correction_window_s: config.micro_correction_window_s,
            anchor: None,
            direction: 0.,
            last_reversal_ts: None,
        }
    }

    fn update(&mut self, sample: &TelemetrySample, features: &mut LapFeatures) {
        self.smoothed.add_sample(sample.steer);
        let steer = self.smoothed.get_average();

        let Some(anchor) = self.anchor else {
            self.anchor = Some(steer);
            return;
        };
        let delta = steer - anchor;
        if delta.abs() <= self.deadband {
            return;
        }

        let direction = delta.signum();
        if self.direction != 0. && direction != self.direction {
            features.steering_reversals += 1;
            if let Some(last_ts) = self.last_reversal_ts {
                if sample.timestamp - last_ts <= self.micro_correction_window_s {
                    features.micro_corrections += 1;
                }
            }
            self.last_reversal_ts = Some(sample.timestamp);
        }
        self.direction = direction;
        self.anchor = Some(steer);
    }
}

/// Reduces a normalized, time-ordered lap into [`LapFeatures`].
///
/// Everything is computed in a single pass over consecutive sample pairs. The
/// result is always finite for finite input.
pub fn extract(samples: &[TelemetrySample], config: &FeatureConfig) -> LapFeatures {
    let mut features = LapFeatures {
        sample_count: samples.len(),
        ..Default::default()
    };
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return features;
    };

    features.duration_s = (last.timestamp - first.timestamp).max(0.);
    for sample in samples {
        features.max_rpm = features.max_rpm.max(sample.rpm);
        features.max_speed = features.max_speed.max(sample.speed);
        features.max_steer_abs = features.max_steer_abs.max(sample.steer.abs());
    }

    let mut pedals = PedalTransitionTracker::new(config);
    let mut steering = SteeringReversalTracker::<STEER_SMOOTHING_WINDOW>::new(config);
    features.throttle_deltas.reserve(samples.len().saturating_sub(1));

    steering.update(first, &mut features);
    for (prev, cur) in samples.iter().tuple_windows() {
        features.throttle_deltas.push(cur.throttle - prev.throttle);
        let was_on = prev.throttle >= config.throttle_on_threshold;
        let is_on = cur.throttle >= config.throttle_on_threshold;
        if was_on != is_on {
            features.throttle_transitions += 1;
        }

        if is_lap_wrap(prev, cur) {
            features.lap_wraps += 1;
        }
        pedals.update(prev, cur, &mut features);
        steering.update(cur, &mut features);
    }
    features.brake_zone_spreads_s = braking_zone_spreads(&features.brake_onsets, config);

    debug!(
        "Features: {} samples over {:.2}s, max rpm {:.0}, max speed {:.1}m/s, max steer {:.0}°, {} throttle transitions, {} brake onsets over {} lap wraps, {} repeated braking zones, {} micro-corrections",
        features.sample_count,
        features.duration_s,
        features.max_rpm,
        features.max_speed,
        features.max_steer_abs,
        features.throttle_transitions,
        features.brake_onsets.len(),
        features.lap_wraps,
        features.brake_zone_spreads_s.len(),
        features.micro_corrections
    );
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 0.05;

    fn lap(len: usize, f: impl Fn(usize, f64) -> TelemetrySample) -> Vec<TelemetrySample> {
        (0..len).map(|i| f(i, i as f64 * DT)).collect()
    }

    #[test]
    fn test_maxima() {
        let samples = lap(50, |i, t| TelemetrySample {
            timestamp: t,
            rpm: 5000. + i as f64 * 10.,
            speed: 30. + i as f64,
            steer: if i == 10 { -420. } else { 90. },
            ..Default::default()
        });
        let features = extract(&samples, &FeatureConfig::default());
        assert_eq!(features.sample_count, 50);
        assert_eq!(features.max_rpm, 5490.);
        assert_eq!(features.max_speed, 79.);
        assert_eq!(features.max_steer_abs, 420.);
        assert!((features.duration_s - 49. * DT).abs() < 1e-9);
    }

    #[test]
    fn test_throttle_transitions_and_deltas() {
        // on for 5 samples, off for 5 samples
        let samples = lap(40, |i, t| TelemetrySample {
            timestamp: t,
            throttle: if (i / 5) % 2 == 0 { 1. } else { 0. },
            ..Default::default()
        });
        let features = extract(&samples, &FeatureConfig::default());
        assert_eq!(features.throttle_transitions, 7);
        assert_eq!(features.throttle_deltas.len(), 39);
        assert!((features.throttle_travel_per_second() - 7. / (39. * DT)).abs() < 1e-9);
    }

    #[test]
    fn test_brake_onsets_and_pedal_transitions() {
        // full throttle, lift at sample 10, brake at sample 14, release brake at 20,
        // throttle at 25, lift at 30, brake at 32
        let samples = lap(45, |i, t| {
            let (throttle, brake) = match i {
                0..10 => (1., 0.),
                10..14 => (0., 0.),
                14..20 => (0., 0.8),
                20..25 => (0., 0.),
                25..30 => (1., 0.),
                30..32 => (0., 0.),
                32..38 => (0., 0.6),
                _ => (1., 0.),
            };
            TelemetrySample {
                timestamp: t,
                throttle,
                brake,
                spline: i as f64 / 45.,
                ..Default::default()
            }
        });
        let features = extract(&samples, &FeatureConfig::default());
        assert_eq!(features.brake_onsets.len(), 2);
        assert!((features.brake_onsets[0].timestamp - 14. * DT).abs() < 1e-9);
        assert!((features.brake_onsets[1].spline - 32. / 45.).abs() < 1e-9);
        assert_eq!(features.pedal_transitions_s.len(), 2);
        assert!((features.pedal_transitions_s[0] - 4. * DT).abs() < 1e-9);
        assert!((features.pedal_transitions_s[1] - 2. * DT).abs() < 1e-9);
    }

    #[test]
    fn test_brake_without_lift_has_no_transition() {
        // left foot braking while still on throttle
        let samples = lap(40, |i, t| TelemetrySample {
            timestamp: t,
            throttle: 1.,
            brake: if (10..20).contains(&i) { 0.5 } else { 0. },
            ..Default::default()
        });
        let features = extract(&samples, &FeatureConfig::default());
        assert_eq!(features.brake_onsets.len(), 1);
        assert!(features.pedal_transitions_s.is_empty());
    }

    #[test]
    fn test_long_coast_is_not_a_pedal_transition() {
        let samples = lap(100, |i, t| TelemetrySample {
            timestamp: t,
            throttle: if i < 10 { 1. } else { 0. },
            brake: if i >= 80 { 0.5 } else { 0. },
            ..Default::default()
        });
        let features = extract(&samples, &FeatureConfig::default());
        assert_eq!(features.brake_onsets.len(), 1);
        assert!(features.pedal_transitions_s.is_empty());
    }

    /// Two 100-sample laps braking for 10 samples from the given lap positions
    fn two_lap_session(brake_from: [usize; 2]) -> Vec<TelemetrySample> {
        lap(200, |i, t| {
            let (lap, pos) = (i / 100, i % 100);
            TelemetrySample {
                timestamp: t,
                spline: pos as f64 / 100.,
                brake: if (brake_from[lap]..brake_from[lap] + 10).contains(&pos) {
                    0.8
                } else {
                    0.
                },
                ..Default::default()
            }
        })
    }

    #[test]
    fn test_braking_zone_spread_across_laps() {
        let features = extract(&two_lap_session([50, 51]), &FeatureConfig::default());
        assert_eq!(features.lap_wraps, 1);
        assert_eq!(features.brake_onsets.len(), 2);
        assert_eq!(features.brake_onsets[0].lap, 0);
        assert_eq!(features.brake_onsets[1].lap, 1);
        // 0.01 spline per sample every 0.05s
        assert!((features.brake_onsets[0].spline_rate - 0.2).abs() < 1e-6);
        assert_eq!(features.brake_zone_spreads_s.len(), 1);
        // stddev of {0.50, 0.51} at 0.2 spline/s
        assert!((features.brake_zone_spreads_s[0] - 0.025).abs() < 1e-6);
    }

    #[test]
    fn test_same_braking_point_every_lap() {
        let features = extract(&two_lap_session([30, 30]), &FeatureConfig::default());
        assert_eq!(features.brake_zone_spreads_s.len(), 1);
        assert!(features.brake_zone_spreads_s[0] < 1e-9);
    }

    #[test]
    fn test_different_zones_are_not_compared() {
        let features = extract(&two_lap_session([20, 60]), &FeatureConfig::default());
        assert_eq!(features.brake_onsets.len(), 2);
        assert!(features.brake_zone_spreads_s.is_empty());
    }

    #[test]
    fn test_single_lap_has_no_braking_zones_to_compare() {
        let samples = two_lap_session([40, 40]);
        let features = extract(&samples[..100], &FeatureConfig::default());
        assert_eq!(features.lap_wraps, 0);
        assert_eq!(features.brake_onsets.len(), 1);
        assert!(features.brake_zone_spreads_s.is_empty());
    }

    #[test]
    fn test_smooth_steering_has_no_micro_corrections() {
        let samples = lap(200, |_, t| TelemetrySample {
            timestamp: t,
            steer: 90. * (2. * std::f64::consts::PI * 0.2 * t).sin(),
            ..Default::default()
        });
        let features = extract(&samples, &FeatureConfig::default());
        assert!(features.steering_reversals >= 3);
        assert_eq!(features.micro_corrections, 0);
    }

    #[test]
    fn test_sawing_steering_is_micro_corrections() {
        let samples = lap(200, |i, t| TelemetrySample {
            timestamp: t,
            steer: if (i / 2) % 2 == 0 { 5. } else { -5. },
            ..Default::default()
        });
        let features = extract(&samples, &FeatureConfig::default());
        assert!(features.micro_corrections > 50);
        assert!(features.per_second(features.micro_corrections) > 5.);
    }

    #[test]
    fn test_zero_duration_rates() {
        let samples = vec![TelemetrySample::default(); 50];
        let features = extract(&samples, &FeatureConfig::default());
        assert_eq!(features.duration_s, 0.);
        assert_eq!(features.per_second(10), 0.);
    }

    #[test]
    fn test_empty_input() {
        let features = extract(&[], &FeatureConfig::default());
        assert_eq!(features, LapFeatures::default());
        assert_eq!(features.throttle_travel_per_second(), 0.);
    }
}
