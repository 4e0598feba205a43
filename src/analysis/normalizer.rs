use std::cmp::Ordering;

use log::{debug, trace};

use crate::config::NormalizerConfig;
use crate::telemetry::TelemetrySample;

/// Outcome of normalizing a raw sample sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// No samples at all
    Empty,
    /// Some samples, but fewer than the configured minimum
    Insufficient { samples: usize },
    /// Sanitized and time-ordered samples, at least the configured minimum
    Ready(Vec<TelemetrySample>),
}

/// Sanitizes and time-orders a sample sequence without touching the input.
///
/// Non-finite values become 0, pedals are clamped into [0, 1] and negative
/// speed/rpm into 0. The sort is stable so samples sharing a timestamp keep
/// their relative order.
pub fn normalize(samples: &[TelemetrySample], config: &NormalizerConfig) -> Normalized {
    if samples.is_empty() {
        return Normalized::Empty;
    }
    if samples.len() < config.min_samples {
        debug!(
            "Only {} samples, need at least {} to analyze",
            samples.len(),
            config.min_samples
        );
        return Normalized::Insufficient {
            samples: samples.len(),
        };
    }

    let mut coerced = 0;
    let mut normalized: Vec<TelemetrySample> = samples
        .iter()
        .map(|sample| {
            let clean = sanitize(sample);
            if clean != *sample {
                coerced += 1;
            }
            clean
        })
        .collect();
    if coerced > 0 {
        debug!("Coerced invalid fields in {} samples", coerced);
    }

    let sorted = normalized
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp);
    if !sorted {
        trace!("Samples were not time-ordered, sorting");
        normalized.sort_by(|a, b| {
            a.timestamp
                .partial_cmp(&b.timestamp)
                .unwrap_or(Ordering::Equal)
        });
    }

    Normalized::Ready(normalized)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0. }
}

fn sanitize(sample: &TelemetrySample) -> TelemetrySample {
    TelemetrySample {
        timestamp: finite_or_zero(sample.timestamp),
        speed: finite_or_zero(sample.speed).max(0.),
        rpm: finite_or_zero(sample.rpm).max(0.),
        gear: sample.gear,
        steer: finite_or_zero(sample.steer),
        throttle: finite_or_zero(sample.throttle).clamp(0., 1.),
        brake: finite_or_zero(sample.brake).clamp(0., 1.),
        spline: finite_or_zero(sample.spline),
    }
}
