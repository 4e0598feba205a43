//! Lap telemetry analysis engine.
//!
//! A lap goes through five stages, each a pure function of the previous one:
//! normalize → extract features → classify the car → compute style metrics →
//! score and write feedback. Nothing is cached between calls, so the same
//! samples always produce the same [`RaceAnalysisResult`].

pub mod classifier;
pub mod features;
pub mod metrics;
pub mod normalizer;
pub mod scoring;

use log::debug;
use serde::{Deserialize, Serialize};

pub use classifier::{CarClass, Classification, VehicleClassifier};
pub use features::{BrakeOnset, LapFeatures};
pub use metrics::StyleMetrics;
pub use normalizer::Normalized;
pub use scoring::DrivingStyle;

use crate::config::AnalyzerConfig;
use crate::telemetry::TelemetrySample;

/// Everything the engine has to say about a lap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceAnalysisResult {
    pub car_class: CarClass,
    /// Evidence backing `car_class`, in [0, 1]
    pub confidence: f64,
    pub style: DrivingStyle,
    /// 0 to 100, penalties are taken off a perfect 100. A lap that could not be
    /// analyzed keeps 100, check `style` before showing it.
    pub score: u8,
    pub highlights: Vec<String>,
    pub warnings: Vec<String>,
    pub tips: Vec<String>,
    pub metrics: StyleMetrics,
}

impl RaceAnalysisResult {
    fn no_data() -> Self {
        Self {
            car_class: CarClass::Unknown,
            confidence: 0.,
            style: DrivingStyle::NoData,
            score: 100,
            highlights: Vec::new(),
            warnings: Vec::new(),
            tips: Vec::new(),
            metrics: StyleMetrics::default(),
        }
    }

    fn insufficient_data() -> Self {
        Self {
            style: DrivingStyle::Unclassified,
            warnings: vec![scoring::INSUFFICIENT_DATA_WARNING.to_string()],
            ..Self::no_data()
        }
    }
}

/// Analyzes a lap with the default calibration.
pub fn analyze(samples: &[TelemetrySample]) -> RaceAnalysisResult {
    analyze_with_config(samples, &AnalyzerConfig::default())
}

/// Analyzes a lap. Never fails: missing data is reported in the result itself.
pub fn analyze_with_config(
    samples: &[TelemetrySample],
    config: &AnalyzerConfig,
) -> RaceAnalysisResult {
    let samples = match normalizer::normalize(samples, &config.normalizer) {
        Normalized::Empty => {
            debug!("No samples to analyze");
            return RaceAnalysisResult::no_data();
        }
        Normalized::Insufficient { .. } => return RaceAnalysisResult::insufficient_data(),
        Normalized::Ready(samples) => samples,
    };

    let features = features::extract(&samples, &config.features);
    let classification = VehicleClassifier::new(&config.classifier).classify(&features);
    let metrics = metrics::compute(&features, &config.features);
    let card = scoring::score(&metrics, &features, &classification, &config.scoring);

    RaceAnalysisResult {
        car_class: classification.car_class,
        confidence: classification.confidence,
        style: card.style,
        score: card.score,
        highlights: card.highlights,
        warnings: card.warnings,
        tips: card.tips,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cruising_lap(len: usize) -> Vec<TelemetrySample> {
        (0..len)
            .map(|i| TelemetrySample {
                timestamp: i as f64 * 0.05,
                speed: 40.,
                rpm: 7000.,
                gear: 4,
                steer: 30.,
                throttle: 0.7,
                brake: 0.,
                spline: i as f64 / len as f64,
            })
            .collect()
    }

    #[test]
    fn test_no_data() {
        let result = analyze(&[]);
        assert_eq!(result.car_class, CarClass::Unknown);
        assert_eq!(result.style, DrivingStyle::NoData);
        assert_eq!(result.confidence, 0.);
        assert_eq!(result.score, 100);
        assert!(result.warnings.is_empty());
        assert!(result.highlights.is_empty());
    }

    #[test]
    fn test_insufficient_data() {
        let result = analyze(&cruising_lap(10));
        assert_eq!(result.car_class, CarClass::Unknown);
        assert_eq!(result.confidence, 0.);
        assert_eq!(result.style, DrivingStyle::Unclassified);
        assert_eq!(result.warnings, vec!["Datos insuficientes".to_string()]);
        assert_eq!(result.score, 100);
        assert!(result.tips.is_empty());
    }

    #[test]
    fn test_threshold_is_configurable() {
        let mut config = AnalyzerConfig::default();
        config.normalizer.min_samples = 5;
        let result = analyze_with_config(&cruising_lap(10), &config);
        assert_ne!(result.style, DrivingStyle::Unclassified);
        assert!(!result.warnings.iter().any(|w| w == "Datos insuficientes"));
    }

    #[test]
    fn test_cruising_lap_is_clean() {
        let result = analyze(&cruising_lap(100));
        assert_eq!(result.car_class, CarClass::Gt3);
        assert_eq!(result.score, 100);
        assert_eq!(result.style, DrivingStyle::Precise);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let json = serde_json::to_value(analyze(&cruising_lap(100))).unwrap();
        assert_eq!(json["carClass"], "GT3");
        assert_eq!(json["style"], "Preciso");
        assert!(json["metrics"]["throttleJerk"].is_number());
    }
}
