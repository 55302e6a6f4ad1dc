//! Simulation harness
//!
//! Generates a smooth tilt trajectory, samples it through the noisy sensor
//! models and runs both filters against the known truth.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::params::FilterParams;
use crate::pipeline::{EstimateStreams, FusionPipeline, Sample};
use crate::sensors::{SensorNoise, SensorSuite};
use crate::{FusionError, Result};

/// Ground-truth tilt trajectory
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    pub t: Vec<f64>,
    pub theta: Vec<f64>,
    pub omega: Vec<f64>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Run length [s]
    pub t_final: f64,
    /// Sample interval [s]
    pub dt: f64,
    /// Constant gyro bias [rad/s]
    pub gyro_bias: f64,
    /// Gyro noise standard deviation [rad/s]
    pub gyro_noise: f64,
    /// Accelerometer angle noise standard deviation [rad]
    pub accel_noise: f64,
    /// Encoder noise standard deviation [rad/s]
    pub encoder_noise: f64,
    /// Feed an encoder channel into the rate fusion
    pub use_encoder: bool,
    /// RNG seed for reproducibility
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            t_final: 12.0,
            dt: 0.01,
            gyro_bias: 0.02,
            gyro_noise: 0.01,
            accel_noise: 0.05,
            encoder_noise: 0.02,
            use_encoder: false,
            seed: 42,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(FusionError::InvalidConfig("dt must be > 0".to_string()));
        }
        if !self.t_final.is_finite() || self.t_final <= self.dt {
            return Err(FusionError::InvalidConfig(
                "t_final must be > dt".to_string(),
            ));
        }
        for (name, sigma) in [
            ("gyro_noise", self.gyro_noise),
            ("accel_noise", self.accel_noise),
            ("encoder_noise", self.encoder_noise),
        ] {
            if !sigma.is_finite() || sigma < 0.0 {
                return Err(FusionError::InvalidConfig(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        if !self.gyro_bias.is_finite() {
            return Err(FusionError::InvalidConfig(
                "gyro_bias must be finite".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sensor_noise(&self) -> SensorNoise {
        SensorNoise {
            gyro_bias: self.gyro_bias,
            gyro_std: self.gyro_noise,
            accel_std: self.accel_noise,
            encoder_std: self.encoder_noise,
        }
    }
}

/// Tilt angle at time `t`: two superposed sinusoids
pub fn true_angle(t: f64) -> f64 {
    0.8 * (0.6 * t).sin() + 0.3 * (1.8 * t).sin()
}

/// Sample the reference trajectory on `[0, t_final)` at `dt`.
///
/// The rate is the numerical gradient of the sampled angle: central
/// differences inside, one-sided differences at both ends.
pub fn generate_trajectory(t_final: f64, dt: f64) -> Trajectory {
    let steps = (t_final / dt).ceil() as usize;
    let t: Vec<f64> = (0..steps)
        .map(|i| i as f64 * dt)
        .filter(|&ti| ti < t_final)
        .collect();
    let theta: Vec<f64> = t.iter().map(|&ti| true_angle(ti)).collect();
    let omega = gradient(&theta, dt);

    Trajectory { t, theta, omega }
}

fn gradient(values: &[f64], dt: f64) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let mut out = Vec::with_capacity(n);
    out.push((values[1] - values[0]) / dt);
    for i in 1..n - 1 {
        out.push((values[i + 1] - values[i - 1]) / (2.0 * dt));
    }
    out.push((values[n - 1] - values[n - 2]) / dt);
    out
}

/// Run the simulated sensors and both filters over the reference trajectory.
pub fn run_simulation(config: &SimConfig, params: &FilterParams) -> Result<EstimateStreams> {
    config.validate()?;

    let trajectory = generate_trajectory(config.t_final, config.dt);
    let mut sensors = SensorSuite::new(config.sensor_noise(), config.use_encoder, config.seed);
    let mut pipeline = FusionPipeline::new(params)?;

    let mut streams = EstimateStreams::with_capacity(trajectory.len());
    for i in 0..trajectory.len() {
        let reading = sensors.measure(trajectory.theta[i], trajectory.omega[i]);
        let sample = Sample {
            t: trajectory.t[i],
            dt: config.dt,
            gyro_rate: reading.gyro_rate,
            accel_angle: reading.accel_angle,
            encoder_rate: reading.encoder_rate,
        };
        let estimate = pipeline.step(&sample)?;
        streams.push(sample.t, estimate);
    }
    streams.truth = Some(trajectory.theta);

    info!(
        samples = streams.len(),
        seed = config.seed,
        use_encoder = config.use_encoder,
        "simulation complete"
    );
    Ok(streams)
}
