use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::classifier::{CarClass, Classification};
use super::features::LapFeatures;
use super::metrics::{MetricEvidence, StyleMetrics};
use crate::config::ScoringConfig;

pub(crate) const INSUFFICIENT_DATA_WARNING: &str = "Datos insuficientes";
const CLEAN_LAP_HIGHLIGHT: &str = "Vuelta limpia, sin puntos críticos";

/// Qualitative label summarizing how a lap was driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrivingStyle {
    #[serde(rename = "No Data")]
    NoData,
    /// Not enough samples to say anything
    #[serde(rename = "Desconocido")]
    Unclassified,
    #[serde(rename = "Preciso")]
    Precise,
    #[serde(rename = "Balanceado")]
    Balanced,
    /// Abrupt throttle and busy steering
    #[serde(rename = "Agresivo")]
    Aggressive,
    /// Slow to get from throttle to brake
    #[serde(rename = "Conservador")]
    Conservative,
    /// Brake timing all over the place
    #[serde(rename = "Irregular")]
    Inconsistent,
}

impl std::fmt::Display for DrivingStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrivingStyle::NoData => write!(f, "No Data"),
            DrivingStyle::Unclassified => write!(f, "Desconocido"),
            DrivingStyle::Precise => write!(f, "Preciso"),
            DrivingStyle::Balanced => write!(f, "Balanceado"),
            DrivingStyle::Aggressive => write!(f, "Agresivo"),
            DrivingStyle::Conservative => write!(f, "Conservador"),
            DrivingStyle::Inconsistent => write!(f, "Irregular"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    ReactionTime,
    BrakeConsistency,
    MicroCorrections,
    ThrottleJerk,
}

impl Metric {
    const ALL: [Metric; 4] = [
        Metric::ReactionTime,
        Metric::BrakeConsistency,
        Metric::MicroCorrections,
        Metric::ThrottleJerk,
    ];

    fn label(&self) -> &'static str {
        match self {
            Metric::ReactionTime => "tiempo de reacción",
            Metric::BrakeConsistency => "consistencia de frenada",
            Metric::MicroCorrections => "micro-correcciones de volante",
            Metric::ThrottleJerk => "suavidad del acelerador",
        }
    }

    fn tip(&self) -> &'static str {
        match self {
            Metric::ReactionTime => {
                "Reduce el tiempo entre soltar el acelerador y pisar el freno"
            }
            Metric::BrakeConsistency => "Busca referencias de frenada repetibles en cada curva",
            Metric::MicroCorrections => {
                "Gira el volante una sola vez hacia el vértice, evita correcciones cortas"
            }
            Metric::ThrottleJerk => {
                "Aplica el acelerador de forma progresiva en lugar de todo o nada"
            }
        }
    }

    fn value(&self, metrics: &StyleMetrics) -> f64 {
        match self {
            Metric::ReactionTime => metrics.reaction_time,
            Metric::BrakeConsistency => metrics.brake_consistency,
            Metric::MicroCorrections => metrics.micro_corrections,
            Metric::ThrottleJerk => metrics.throttle_jerk,
        }
    }

    fn format_value(&self, value: f64) -> String {
        match self {
            Metric::ReactionTime | Metric::BrakeConsistency => format!("{:.2} s", value),
            Metric::MicroCorrections => format!("{:.1}/s", value),
            Metric::ThrottleJerk => format!("{:.1}", value),
        }
    }

    fn is_scored(&self, evidence: &MetricEvidence) -> bool {
        match self {
            Metric::ReactionTime => evidence.has_reaction_time(),
            Metric::BrakeConsistency => evidence.has_brake_consistency(),
            Metric::MicroCorrections | Metric::ThrottleJerk => true,
        }
    }

    fn limit(&self, config: &ScoringConfig, car_class: CarClass) -> f64 {
        match self {
            Metric::ReactionTime => config.reaction_time_limit,
            Metric::BrakeConsistency => config.brake_consistency_limit,
            // counter-steering is part of drifting
            Metric::MicroCorrections if car_class == CarClass::Drift => {
                config.micro_corrections_limit * config.drift_micro_corrections_factor
            }
            Metric::MicroCorrections => config.micro_corrections_limit,
            Metric::ThrottleJerk => config.throttle_jerk_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Excellent,
    Acceptable,
    NeedsWork,
}

fn tier(ratio: f64, config: &ScoringConfig) -> Tier {
    if ratio <= config.excellent_ratio {
        Tier::Excellent
    } else if ratio <= config.warning_ratio {
        Tier::Acceptable
    } else {
        Tier::NeedsWork
    }
}

/// Value over its good-limit. A broken limit never penalizes.
fn ratio(value: f64, limit: f64) -> f64 {
    let ratio = value / limit;
    if limit > 0. && ratio.is_finite() {
        ratio.max(0.)
    } else {
        0.
    }
}

fn penalty(ratio: f64, config: &ScoringConfig) -> f64 {
    if ratio <= 1. {
        return 0.;
    }
    (config.penalty_scale * (ratio - 1.)).clamp(0., config.max_penalty_per_metric)
}

/// Score, style and feedback for one lap.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub score: u8,
    pub style: DrivingStyle,
    pub highlights: Vec<String>,
    pub warnings: Vec<String>,
    pub tips: Vec<String>,
}

fn style(scored: &[(Metric, f64)], config: &ScoringConfig) -> DrivingStyle {
    if scored.iter().all(|(_, ratio)| *ratio <= config.excellent_ratio) {
        return DrivingStyle::Precise;
    }

    let mut worst: Option<(Metric, f64)> = None;
    for &(metric, ratio) in scored {
        if worst.is_none_or(|(_, worst_ratio)| ratio > worst_ratio) {
            worst = Some((metric, ratio));
        }
    }
    match worst {
        Some((_, ratio)) if ratio <= 1. => DrivingStyle::Balanced,
        Some((Metric::ThrottleJerk | Metric::MicroCorrections, _)) => DrivingStyle::Aggressive,
        Some((Metric::ReactionTime, _)) => DrivingStyle::Conservative,
        Some((Metric::BrakeConsistency, _)) => DrivingStyle::Inconsistent,
        None => DrivingStyle::Balanced,
    }
}

/// Turns metrics into a bounded score, a style label and written feedback.
///
/// Each metric is compared against its good-limit. Metrics without enough
/// evidence behind them (no pedal transitions to time, a single brake event)
/// are left out instead of being punished.
pub fn score(
    metrics: &StyleMetrics,
    features: &LapFeatures,
    classification: &Classification,
    config: &ScoringConfig,
) -> ScoreCard {
    let evidence = MetricEvidence::from_features(features);
    let mut highlights = Vec::new();
    let mut warnings = Vec::new();
    let mut tips = Vec::new();
    let mut total_penalty = 0.;
    let mut scored = Vec::new();

    for metric in Metric::ALL {
        if !metric.is_scored(&evidence) {
            trace!("Skipping {} for lack of evidence", metric.label());
            continue;
        }
        let value = metric.value(metrics);
        let ratio = ratio(value, metric.limit(config, classification.car_class));
        let metric_penalty = penalty(ratio, config);
        trace!(
            "{}: value {:.3}, ratio {:.2}, penalty {:.1}",
            metric.label(),
            value,
            ratio,
            metric_penalty
        );
        total_penalty += metric_penalty;
        scored.push((metric, ratio));

        match tier(ratio, config) {
            Tier::Excellent => highlights.push(format!(
                "Excelente {}: {}",
                metric.label(),
                metric.format_value(value)
            )),
            Tier::Acceptable => tips.push(metric.tip().to_string()),
            Tier::NeedsWork => {
                let mut warning = format!(
                    "Mejorable {}: {}",
                    metric.label(),
                    metric.format_value(value)
                );
                if metric == Metric::ThrottleJerk && features.throttle_transitions > 0 {
                    warning.push_str(&format!(
                        " ({} cambios todo/nada)",
                        features.throttle_transitions
                    ));
                }
                if metric == Metric::MicroCorrections && features.steering_reversals > 0 {
                    warning.push_str(&format!(
                        " ({} de {} cambios de dirección)",
                        features.micro_corrections, features.steering_reversals
                    ));
                }
                warnings.push(warning);
                tips.push(metric.tip().to_string());
            }
        }
    }

    if warnings.is_empty() {
        highlights.push(CLEAN_LAP_HIGHLIGHT.to_string());
    }

    let score = (100. - total_penalty).clamp(0., 100.).round() as u8;
    let style = style(&scored, config);
    debug!(
        "Score {} ({:.1} penalty points), style {}",
        score, total_penalty, style
    );

    ScoreCard {
        score,
        style,
        highlights,
        warnings,
        tips,
    }
}
