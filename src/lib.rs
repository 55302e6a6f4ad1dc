//! tiltfuse - 1-D tilt angle estimation
//!
//! Fuses a rate gyroscope, an accelerometer-derived angle and an optional
//! encoder rate into an angle estimate. Two estimators run side by side:
//! a complementary filter and a two-state (angle, gyro bias) Kalman filter.

pub mod complementary;
pub mod dataset;
pub mod kalman;
pub mod metrics;
pub mod output;
pub mod params;
pub mod pipeline;
pub mod rate;
pub mod sensors;
pub mod sim;
pub mod state;

use thiserror::Error;

// Re-export main types
pub use complementary::{complementary_step, ComplementaryFilter};
pub use dataset::Dataset;
pub use kalman::{KalmanEstimator, KalmanNoise};
pub use params::{FilterParams, RunConfig};
pub use pipeline::{run_pipeline, Estimate, EstimateStreams, FusionPipeline, Sample};
pub use rate::fuse_rate;
pub use sim::SimConfig;
pub use state::KalmanState;

#[derive(Debug, Error)]
pub enum FusionError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("numerical failure: {0}")]
    Numerical(String),
    #[error("invalid time step: dt = {0} (must be finite and > 0)")]
    InvalidTimeStep(f64),
    #[error("sample time must be finite, got t = {0}")]
    InvalidTimestamp(f64),
    #[error("sample at t = {t} does not follow t = {last}")]
    OutOfOrder { t: f64, last: f64 },
    #[error("dataset error at line {line}: {message}")]
    Dataset { line: usize, message: String },
    #[error("{context} length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("plot error: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, FusionError>;
