//! Per-sample estimation pipeline
//!
//! Fuses the rates, then runs the complementary filter and the Kalman filter
//! on the same sample. Samples must arrive in increasing time order.

use tracing::{debug, info, warn};

use crate::complementary::ComplementaryFilter;
use crate::kalman::KalmanEstimator;
use crate::params::FilterParams;
use crate::rate::fuse_rate;
use crate::{FusionError, Result};

/// One timestamped sensor sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Sample time [s]
    pub t: f64,
    /// Step since the previous sample [s]
    pub dt: f64,
    /// Gyro rate [rad/s]
    pub gyro_rate: f64,
    /// Accelerometer-derived angle [rad]
    pub accel_angle: f64,
    /// Encoder rate [rad/s], `None` when not available
    pub encoder_rate: Option<f64>,
}

/// Both filter outputs for one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub complementary: f64,
    pub kalman: f64,
    pub bias: f64,
}

/// Estimate sequences, time-aligned with the input samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EstimateStreams {
    pub t: Vec<f64>,
    pub complementary: Vec<f64>,
    pub kalman: Vec<f64>,
    pub kalman_bias: Vec<f64>,
    /// Ground-truth angle, simulation runs only
    pub truth: Option<Vec<f64>>,
}

impl EstimateStreams {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            t: Vec::with_capacity(n),
            complementary: Vec::with_capacity(n),
            kalman: Vec::with_capacity(n),
            kalman_bias: Vec::with_capacity(n),
            truth: None,
        }
    }

    pub fn push(&mut self, t: f64, estimate: Estimate) {
        self.t.push(t);
        self.complementary.push(estimate.complementary);
        self.kalman.push(estimate.kalman);
        self.kalman_bias.push(estimate.bias);
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

pub struct FusionPipeline {
    params: FilterParams,
    complementary: ComplementaryFilter,
    kalman: KalmanEstimator,
    last_t: Option<f64>,
    /// Set by a numerical failure; cleared by `reset`
    halted: bool,
}

impl FusionPipeline {
    /// Validates `params` and builds both filters from the zero state.
    pub fn new(params: &FilterParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params: *params,
            complementary: ComplementaryFilter::new(params.alpha, 0.0),
            kalman: KalmanEstimator::from_params(params)?,
            last_t: None,
            halted: false,
        })
    }

    /// Process one sample.
    ///
    /// A numerical failure halts the pipeline: every later call fails with
    /// `FusionError::Numerical` until `reset` is called.
    ///
    /// # Returns
    /// The complementary and Kalman angle estimates after this sample
    pub fn step(&mut self, sample: &Sample) -> Result<Estimate> {
        if self.halted {
            return Err(FusionError::Numerical(
                "pipeline halted after a numerical failure; reset() required".to_string(),
            ));
        }
        if !sample.t.is_finite() {
            return Err(FusionError::InvalidTimestamp(sample.t));
        }
        if let Some(last) = self.last_t {
            if sample.t <= last {
                return Err(FusionError::OutOfOrder { t: sample.t, last });
            }
        }

        let rate = fuse_rate(sample.gyro_rate, sample.encoder_rate, self.params.w_gyro);
        let kalman = match self.kalman.step(rate, sample.accel_angle, sample.dt) {
            Ok(theta) => theta,
            Err(err) => {
                if matches!(err, FusionError::Numerical(_)) {
                    warn!(t = sample.t, error = %err, "halting pipeline");
                    self.halted = true;
                }
                return Err(err);
            }
        };
        let complementary = self.complementary.step(rate, sample.accel_angle, sample.dt);
        self.last_t = Some(sample.t);

        debug!(
            t = sample.t,
            rate,
            complementary,
            kalman,
            bias = self.kalman.bias(),
            "pipeline step"
        );

        Ok(Estimate {
            complementary,
            kalman,
            bias: self.kalman.bias(),
        })
    }

    /// Return both filters to their initial state.
    pub fn reset(&mut self) {
        self.complementary.reset(0.0);
        self.kalman.reset();
        self.last_t = None;
        self.halted = false;
    }

    pub fn kalman(&self) -> &KalmanEstimator {
        &self.kalman
    }

    pub fn complementary(&self) -> &ComplementaryFilter {
        &self.complementary
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }
}

/// Run the pipeline over a whole sample sequence.
pub fn run_pipeline(params: &FilterParams, samples: &[Sample]) -> Result<EstimateStreams> {
    let mut pipeline = FusionPipeline::new(params)?;
    let mut streams = EstimateStreams::with_capacity(samples.len());

    for sample in samples {
        let estimate = pipeline.step(sample)?;
        streams.push(sample.t, estimate);
    }

    info!(samples = streams.len(), "pipeline run complete");
    Ok(streams)
}
