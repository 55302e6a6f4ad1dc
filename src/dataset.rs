//! Recorded sensor logs
//!
//! CSV with a header row and the columns `t`, `gyro`, `accel_angle` and an
//! optional `encoder`. Column order does not matter. An empty or NaN encoder
//! cell means no encoder reading for that sample.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::info;

use crate::pipeline::Sample;
use crate::rate::encoder_reading;
use crate::{FusionError, Result};

const ENCODER_COLUMN: &str = "encoder";

/// A loaded sensor log
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub t: Vec<f64>,
    /// Median sample interval [s]
    pub dt: f64,
    pub gyro: Vec<f64>,
    pub accel_angle: Vec<f64>,
    pub encoder: Vec<Option<f64>>,
}

impl Dataset {
    pub fn load_csv(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let dataset = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            samples = dataset.len(),
            dt = dataset.dt,
            "loaded sensor log"
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();

        let required = |name: &str| {
            column(&headers, name).ok_or_else(|| FusionError::Dataset {
                line: 1,
                message: format!("missing required column: {name}"),
            })
        };
        let t_idx = required("t")?;
        let gyro_idx = required("gyro")?;
        let accel_idx = required("accel_angle")?;
        let encoder_idx = column(&headers, ENCODER_COLUMN);

        let mut t = Vec::new();
        let mut gyro = Vec::new();
        let mut accel_angle = Vec::new();
        let mut encoder = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            // +1 for the header, +1 for 1-based lines
            let line = row + 2;
            let record = result.map_err(|e| FusionError::Dataset {
                line,
                message: format!("CSV error: {e}"),
            })?;

            t.push(parse_finite(&record, t_idx, "t", line)?);
            gyro.push(parse_finite(&record, gyro_idx, "gyro", line)?);
            accel_angle.push(parse_finite(&record, accel_idx, "accel_angle", line)?);
            encoder.push(match encoder_idx {
                Some(idx) => parse_optional(&record, idx, line)?,
                None => None,
            });
        }

        if t.is_empty() {
            return Err(FusionError::Dataset {
                line: 0,
                message: "CSV is empty".to_string(),
            });
        }
        if t.len() < 2 {
            return Err(FusionError::Dataset {
                line: 0,
                message: "need at least 2 time samples".to_string(),
            });
        }
        for (i, pair) in t.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(FusionError::Dataset {
                    line: i + 3,
                    message: format!("t must be strictly increasing ({} after {})", pair[1], pair[0]),
                });
            }
        }

        let dt = median_step(&t);
        Ok(Self {
            t,
            dt,
            gyro,
            accel_angle,
            encoder,
        })
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn has_encoder(&self) -> bool {
        self.encoder.iter().any(Option::is_some)
    }

    /// Samples for the pipeline, all stepped by the median interval.
    pub fn samples(&self) -> Vec<Sample> {
        (0..self.len())
            .map(|i| Sample {
                t: self.t[i],
                dt: self.dt,
                gyro_rate: self.gyro[i],
                accel_angle: self.accel_angle[i],
                encoder_rate: self.encoder[i],
            })
            .collect()
    }
}

fn column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn parse_finite(record: &StringRecord, idx: usize, name: &str, line: usize) -> Result<f64> {
    let raw = record.get(idx).unwrap_or("");
    let value: f64 = raw.parse().map_err(|e| FusionError::Dataset {
        line,
        message: format!("invalid {name} '{raw}': {e}"),
    })?;
    if !value.is_finite() {
        return Err(FusionError::Dataset {
            line,
            message: format!("{name} must be finite, got {raw}"),
        });
    }
    Ok(value)
}

fn parse_optional(record: &StringRecord, idx: usize, line: usize) -> Result<Option<f64>> {
    let raw = record.get(idx).unwrap_or("");
    if raw.is_empty() {
        return Ok(None);
    }
    let value: f64 = raw.parse().map_err(|e| FusionError::Dataset {
        line,
        message: format!("invalid encoder '{raw}': {e}"),
    })?;
    Ok(encoder_reading(value))
}

/// Median of the successive differences of `t` (requires `t.len() >= 2`).
fn median_step(t: &[f64]) -> f64 {
    let mut diffs: Vec<f64> = t.windows(2).map(|w| w[1] - w[0]).collect();
    diffs.sort_by(|a, b| a.total_cmp(b));
    let mid = diffs.len() / 2;
    if diffs.len() % 2 == 0 {
        0.5 * (diffs[mid - 1] + diffs[mid])
    } else {
        diffs[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_with_encoder() {
        let data = "t,gyro,accel_angle,encoder\n0.0,0.1,0.0,0.09\n0.01,0.1,0.001,NaN\n0.02,0.1,0.002,\n";
        let ds = Dataset::from_reader(data.as_bytes()).unwrap();

        assert_eq!(ds.len(), 3);
        assert!((ds.dt - 0.01).abs() < 1e-12);
        assert_eq!(ds.encoder, vec![Some(0.09), None, None]);
        assert!(ds.has_encoder());
    }

    #[test]
    fn test_encoder_column_optional() {
        let data = "accel_angle,t,gyro\n0.0,0.0,0.5\n0.1,0.02,0.5\n";
        let ds = Dataset::from_reader(data.as_bytes()).unwrap();

        assert_eq!(ds.t, vec![0.0, 0.02]);
        assert_eq!(ds.gyro, vec![0.5, 0.5]);
        assert_eq!(ds.accel_angle, vec![0.0, 0.1]);
        assert_eq!(ds.encoder, vec![None, None]);
        assert!(!ds.has_encoder());
    }

    #[test]
    fn test_missing_required_column() {
        let data = "t,gyro\n0.0,0.1\n0.01,0.1\n";
        let err = Dataset::from_reader(data.as_bytes()).unwrap_err();
        match err {
            FusionError::Dataset { message, .. } => assert!(message.contains("accel_angle")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_too_few_rows() {
        let empty = "t,gyro,accel_angle\n";
        assert!(Dataset::from_reader(empty.as_bytes()).is_err());

        let single = "t,gyro,accel_angle\n0.0,0.1,0.0\n";
        assert!(Dataset::from_reader(single.as_bytes()).is_err());
    }

    #[test]
    fn test_invalid_number_reports_line() {
        let data = "t,gyro,accel_angle\n0.0,0.1,0.0\n0.01,abc,0.0\n";
        match Dataset::from_reader(data.as_bytes()).unwrap_err() {
            FusionError::Dataset { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_increasing_time_rejected() {
        let data = "t,gyro,accel_angle\n0.0,0.1,0.0\n0.0,0.1,0.0\n";
        assert!(Dataset::from_reader(data.as_bytes()).is_err());
    }

    #[test]
    fn test_median_step_ignores_gap() {
        let t = [0.0, 0.01, 0.02, 0.5, 0.51];
        assert!((median_step(&t) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_load_csv_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "t,gyro,accel_angle,encoder").unwrap();
        for i in 0..10 {
            writeln!(file, "{},{},{},{}", i as f64 * 0.01, 0.2, 0.0, 0.2).unwrap();
        }
        file.flush().unwrap();

        let ds = Dataset::load_csv(file.path()).unwrap();
        let samples = ds.samples();
        assert_eq!(samples.len(), 10);
        assert_eq!(samples[3].encoder_rate, Some(0.2));
        assert!((samples[3].dt - 0.01).abs() < 1e-12);
    }
}
