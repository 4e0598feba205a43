use super::TelemetrySample;

/// A drop in spline position larger than this between two samples is a lap boundary
const LAP_WRAP_THRESHOLD: f64 = 0.5;

/// Splits a time-ordered session into laps at the start/finish line.
///
/// The spline position wraps from ~1 back to ~0 when a lap is completed, that
/// drop is where a new lap starts. Samples with a non-finite spline never start a lap.
pub fn split_laps(samples: &[TelemetrySample]) -> Vec<Vec<TelemetrySample>> {
    let mut laps = Vec::new();
    let mut cur_lap: Vec<TelemetrySample> = Vec::new();

    for sample in samples {
        if let Some(prev) = cur_lap.last() {
            if is_lap_wrap(prev, sample) {
                laps.push(std::mem::take(&mut cur_lap));
            }
        }
        cur_lap.push(*sample);
    }
    if !cur_lap.is_empty() {
        laps.push(cur_lap);
    }
    laps
}

/// Whether the start/finish line was crossed between two consecutive samples.
pub fn is_lap_wrap(prev: &TelemetrySample, cur: &TelemetrySample) -> bool {
    prev.spline - cur.spline > LAP_WRAP_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_spline(timestamp: f64, spline: f64) -> TelemetrySample {
        TelemetrySample {
            timestamp,
            spline,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_lap() {
        let samples: Vec<_> = (0..10).map(|i| at_spline(i as f64, i as f64 / 10.)).collect();
        let laps = split_laps(&samples);
        assert_eq!(laps.len(), 1);
        assert_eq!(laps[0].len(), 10);
    }

    #[test]
    fn test_splits_on_wrap() {
        let samples = vec![
            at_spline(0., 0.8),
            at_spline(1., 0.95),
            at_spline(2., 0.02),
            at_spline(3., 0.5),
            at_spline(4., 0.99),
            at_spline(5., 0.01),
        ];
        let laps = split_laps(&samples);
        assert_eq!(laps.len(), 3);
        assert_eq!(laps[0].len(), 2);
        assert_eq!(laps[1].len(), 3);
        assert_eq!(laps[2].len(), 1);
        assert!(is_lap_wrap(&samples[1], &samples[2]));
        assert!(!is_lap_wrap(&samples[2], &samples[3]));
    }

    #[test]
    fn test_small_backwards_jitter_is_not_a_lap() {
        let samples = vec![at_spline(0., 0.5), at_spline(1., 0.49), at_spline(2., 0.51)];
        assert_eq!(split_laps(&samples).len(), 1);
    }

    #[test]
    fn test_empty() {
        assert!(split_laps(&[]).is_empty());
    }
}
