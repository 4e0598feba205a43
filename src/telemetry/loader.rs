use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::info;

use super::{RawTelemetrySample, TelemetrySample};
use crate::LapCoachError;

/// Loads samples from a file, picking the format from the extension.
///
/// `.jsonl` files hold one raw sample per line, anything else is read as a
/// single JSON array of raw samples.
pub fn load_samples(source_file: &Path) -> Result<Vec<TelemetrySample>, LapCoachError> {
    if !source_file.is_file() {
        return Err(LapCoachError::InvalidTelemetryFile {
            path: format!("{:?}", source_file),
        });
    }

    match source_file.extension().and_then(|ext| ext.to_str()) {
        Some("jsonl") => load_samples_jsonl(source_file),
        _ => load_samples_json(source_file),
    }
}

pub fn load_samples_jsonl(source_file: &Path) -> Result<Vec<TelemetrySample>, LapCoachError> {
    let raw_samples = serde_jsonlines::json_lines(source_file)
        .map_err(|e| LapCoachError::TelemetryLoaderError { source: e })?
        .collect::<Result<Vec<RawTelemetrySample>, std::io::Error>>()
        .map_err(|e| LapCoachError::TelemetryLoaderError { source: e })?;

    info!(
        "Loaded {} telemetry samples from {:?}",
        raw_samples.len(),
        source_file
    );
    Ok(raw_samples.into_iter().map(TelemetrySample::from).collect())
}

pub fn load_samples_json(source_file: &Path) -> Result<Vec<TelemetrySample>, LapCoachError> {
    let file =
        File::open(source_file).map_err(|e| LapCoachError::TelemetryLoaderError { source: e })?;
    let raw_samples: Vec<RawTelemetrySample> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| LapCoachError::TelemetryParseError { source: e })?;

    info!(
        "Loaded {} telemetry samples from {:?}",
        raw_samples.len(),
        source_file
    );
    Ok(raw_samples.into_iter().map(TelemetrySample::from).collect())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_jsonl() {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(file, r#"{{"timestamp": 0.0, "speed": 10.0, "throttle": 1.0}}"#).unwrap();
        writeln!(file, r#"{{"timestamp": 0.1, "speed": 11.0, "extra": "ignored"}}"#).unwrap();
        file.flush().unwrap();

        let samples = load_samples(file.path()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].throttle, 1.0);
        assert_eq!(samples[1].speed, 11.0);
        assert!(samples[1].throttle.is_nan());
    }

    #[test]
    fn test_load_json_array() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"timestamp": 0.0, "rpm": 7000.0}}, {{"timestamp": 0.1, "rpm": null}}]"#
        )
        .unwrap();
        file.flush().unwrap();

        let samples = load_samples(file.path()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].rpm, 7000.0);
        assert!(samples[1].rpm.is_nan());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_samples(&dir.path().join("nope.jsonl"));
        assert!(matches!(
            result,
            Err(LapCoachError::InvalidTelemetryFile { .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "not json").unwrap();
        file.flush().unwrap();

        let result = load_samples(file.path());
        assert!(matches!(
            result,
            Err(LapCoachError::TelemetryParseError { .. })
        ));
    }
}
