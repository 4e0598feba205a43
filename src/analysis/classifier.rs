use std::collections::HashMap;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::features::LapFeatures;
use crate::config::ClassifierConfig;

/// Vehicle categories a driving signature can be attributed to.
///
/// New categories come with new rules in [`rules`], nothing else keys off the
/// variant list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CarClass {
    #[default]
    Unknown,
    /// Open wheel single seaters
    Monoplaza,
    Gt3,
    Drift,
    /// Road cars
    Street,
}

impl std::fmt::Display for CarClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CarClass::Unknown => write!(f, "UNKNOWN"),
            CarClass::Monoplaza => write!(f, "MONOPLAZA"),
            CarClass::Gt3 => write!(f, "GT3"),
            CarClass::Drift => write!(f, "DRIFT"),
            CarClass::Street => write!(f, "STREET"),
        }
    }
}

/// A single piece of evidence: when `predicate` holds, `class` gains `weight`.
pub struct ClassifierRule {
    pub class: CarClass,
    pub weight: f64,
    pub description: &'static str,
    predicate: Box<dyn Fn(&LapFeatures) -> bool>,
}

impl ClassifierRule {
    fn new(
        class: CarClass,
        weight: f64,
        description: &'static str,
        predicate: impl Fn(&LapFeatures) -> bool + 'static,
    ) -> Self {
        Self {
            class,
            weight,
            description,
            predicate: Box::new(predicate),
        }
    }

    pub fn applies(&self, features: &LapFeatures) -> bool {
        (self.predicate)(features)
    }
}

/// Builds the evidence table from the calibration constants.
pub fn rules(config: &ClassifierConfig) -> Vec<ClassifierRule> {
    let c = config.clone();
    vec![
        ClassifierRule::new(
            CarClass::Monoplaza,
            c.monoplaza_rpm_weight,
            "rpm above single seater threshold",
            move |f| f.max_rpm > c.monoplaza_min_rpm,
        ),
        ClassifierRule::new(
            CarClass::Monoplaza,
            c.monoplaza_speed_weight,
            "top speed above single seater threshold",
            move |f| f.max_speed > c.monoplaza_min_speed,
        ),
        ClassifierRule::new(
            CarClass::Drift,
            c.drift_steer_weight,
            "steering lock beyond drift threshold",
            move |f| f.max_steer_abs > c.drift_min_steer_deg,
        ),
        ClassifierRule::new(
            CarClass::Drift,
            c.drift_assist_weight,
            "large steering lock at low speed",
            move |f| f.max_steer_abs > c.drift_assist_steer_deg && f.max_speed < c.drift_max_speed,
        ),
        ClassifierRule::new(
            CarClass::Gt3,
            c.gt3_rpm_weight,
            "rpm within GT3 band",
            move |f| (c.gt3_min_rpm..=c.gt3_max_rpm).contains(&f.max_rpm),
        ),
        ClassifierRule::new(
            CarClass::Gt3,
            c.gt3_speed_weight,
            "top speed within GT3 band",
            move |f| (c.gt3_min_speed..=c.gt3_max_speed).contains(&f.max_speed),
        ),
        ClassifierRule::new(
            CarClass::Street,
            c.street_rpm_weight,
            "rpm within road car band",
            move |f| f.max_rpm > c.street_min_rpm && f.max_rpm < c.street_max_rpm,
        ),
        ClassifierRule::new(
            CarClass::Street,
            c.street_speed_weight,
            "top speed within road car band",
            move |f| f.max_speed > c.street_min_speed && f.max_speed < c.street_max_speed,
        ),
    ]
}

/// Verdict of the classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub car_class: CarClass,
    /// Evidence backing `car_class`, in [0, 1]
    pub confidence: f64,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            car_class: CarClass::Unknown,
            confidence: 0.,
        }
    }
}

/// Additive weighted-evidence classifier.
pub struct VehicleClassifier {
    rules: Vec<ClassifierRule>,
    min_evidence: f64,
    tie_epsilon: f64,
    max_unknown_confidence: f64,
}

impl VehicleClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            rules: rules(config),
            min_evidence: config.min_evidence,
            tie_epsilon: config.tie_epsilon,
            max_unknown_confidence: config.max_unknown_confidence,
        }
    }

    /// Sum of the weights of every rule voting for `class`.
    fn max_weight(&self, class: CarClass) -> f64 {
        self.rules
            .iter()
            .filter(|rule| rule.class == class)
            .map(|rule| rule.weight)
            .sum()
    }

    fn normalized(&self, class: CarClass, weight: f64) -> f64 {
        let max_weight = self.max_weight(class);
        if max_weight > 0. {
            (weight / max_weight).clamp(0., 1.)
        } else {
            0.
        }
    }

    pub fn classify(&self, features: &LapFeatures) -> Classification {
        let mut votes: HashMap<CarClass, f64> = HashMap::new();
        for rule in &self.rules {
            if rule.applies(features) {
                trace!(
                    "{} +{:.2} ({})",
                    rule.class, rule.weight, rule.description
                );
                *votes.entry(rule.class).or_insert(0.) += rule.weight;
            }
        }

        // sort by weight then by class so the outcome never depends on hash order
        let mut ranked: Vec<(CarClass, f64)> = votes.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let Some(&(top_class, top_weight)) = ranked.first() else {
            debug!("No classifier rule matched");
            return Classification::unknown();
        };
        let top_confidence = self.normalized(top_class, top_weight);

        let tied = ranked
            .get(1)
            .is_some_and(|&(_, runner_up)| top_weight - runner_up < self.tie_epsilon);
        if tied || top_weight < self.min_evidence {
            debug!(
                "Ambiguous classification: {} with weight {:.2} (tied: {})",
                top_class, top_weight, tied
            );
            return Classification {
                car_class: CarClass::Unknown,
                confidence: top_confidence.min(self.max_unknown_confidence),
            };
        }

        debug!(
            "Classified as {} with weight {:.2}, confidence {:.2}",
            top_class, top_weight, top_confidence
        );
        Classification {
            car_class: top_class,
            confidence: top_confidence,
        }
    }
}
