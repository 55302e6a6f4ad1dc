//! Error metrics against ground truth

use serde::Serialize;

use crate::pipeline::EstimateStreams;
use crate::{FusionError, Result};

/// Root-mean-square error between a truth and an estimate sequence
pub fn rmse(truth: &[f64], estimate: &[f64]) -> Result<f64> {
    if truth.len() != estimate.len() {
        return Err(FusionError::LengthMismatch {
            context: "rmse",
            expected: truth.len(),
            got: estimate.len(),
        });
    }
    if truth.is_empty() {
        return Err(FusionError::InvalidConfig(
            "rmse needs at least one sample".to_string(),
        ));
    }

    let errors: Vec<f64> = truth.iter().zip(estimate).map(|(t, e)| t - e).collect();
    Ok(rms_error(&errors))
}

/// Calculate RMS of an error sequence
pub fn rms_error(errors: &[f64]) -> f64 {
    let sum_sq: f64 = errors.iter().map(|&e| e * e).sum();
    (sum_sq / errors.len() as f64).sqrt()
}

/// Peak absolute error between truth and estimate
pub fn peak_error(truth: &[f64], estimate: &[f64]) -> f64 {
    truth
        .iter()
        .zip(estimate)
        .map(|(t, e)| (t - e).abs())
        .fold(0.0f64, f64::max)
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterMetrics {
    pub rmse: f64,
    pub peak_error: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub samples: usize,
    pub kalman: FilterMetrics,
    pub complementary: FilterMetrics,
    pub final_bias: f64,
}

impl RunSummary {
    /// Metrics for both filters. Fails when the streams carry no truth.
    pub fn from_streams(streams: &EstimateStreams) -> Result<Self> {
        let truth = streams.truth.as_deref().ok_or_else(|| {
            FusionError::InvalidConfig("metrics require a ground-truth stream".to_string())
        })?;

        Ok(Self {
            samples: streams.len(),
            kalman: FilterMetrics {
                rmse: rmse(truth, &streams.kalman)?,
                peak_error: peak_error(truth, &streams.kalman),
            },
            complementary: FilterMetrics {
                rmse: rmse(truth, &streams.complementary)?,
                peak_error: peak_error(truth, &streams.complementary),
            },
            final_bias: streams.kalman_bias.last().copied().unwrap_or(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Estimate;

    #[test]
    fn test_rms_error() {
        let errors = vec![0.1, 0.2, 0.3];
        let rms = rms_error(&errors);
        let expected = ((0.01_f64 + 0.04 + 0.09) / 3.0).sqrt();
        assert!((rms - expected).abs() < 1e-10);
    }

    #[test]
    fn test_rmse_identical_is_zero() {
        let x = [0.1, -0.4, 2.0];
        assert_eq!(rmse(&x, &x).unwrap(), 0.0);
    }

    #[test]
    fn test_rmse_errors() {
        assert!(matches!(
            rmse(&[1.0, 2.0], &[1.0]),
            Err(FusionError::LengthMismatch { expected: 2, got: 1, .. })
        ));
        assert!(rmse(&[], &[]).is_err());
    }

    #[test]
    fn test_summary_requires_truth() {
        let mut streams = EstimateStreams::default();
        let estimate = Estimate {
            complementary: 0.5,
            kalman: 1.0,
            bias: 0.01,
        };
        streams.push(0.0, estimate);
        assert!(RunSummary::from_streams(&streams).is_err());

        streams.truth = Some(vec![1.0]);
        let summary = RunSummary::from_streams(&streams).unwrap();
        assert_eq!(summary.kalman.rmse, 0.0);
        assert_eq!(summary.complementary.peak_error, 0.5);
        assert_eq!(summary.final_bias, 0.01);
    }
}
