//! Filter parameters
//!
//! Tuning constants for rate fusion, the complementary filter and the
//! Kalman filter, plus the combined run configuration loaded from TOML.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::sim::SimConfig;
use crate::{FusionError, Result};

/// Parameters shared by the estimation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Complementary blend weight on the integrated rate, in [0, 1]
    pub alpha: f64,
    /// Gyro weight in the gyro/encoder rate blend, in [0, 1]
    pub w_gyro: f64,
    /// Angle process-noise variance
    pub q_theta: f64,
    /// Bias process-noise variance
    pub q_bias: f64,
    /// Accelerometer angle measurement-noise variance
    pub r_accel: f64,
}

impl FilterParams {
    /// Create new filter parameters
    pub fn new(alpha: f64, w_gyro: f64, q_theta: f64, q_bias: f64, r_accel: f64) -> Self {
        Self {
            alpha,
            w_gyro,
            q_theta,
            q_bias,
            r_accel,
        }
    }

    /// Parameters tuned for the bundled tilt simulation
    pub fn default_params() -> Self {
        Self {
            alpha: 0.98,
            w_gyro: 0.7,
            q_theta: 1e-3,
            q_bias: 1e-5,
            r_accel: 3e-2,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(FusionError::InvalidConfig(format!(
                "alpha must be in [0, 1], got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.w_gyro) {
            return Err(FusionError::InvalidConfig(format!(
                "w_gyro must be in [0, 1], got {}",
                self.w_gyro
            )));
        }
        validate_noise(self.q_theta, self.q_bias, self.r_accel)
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self::default_params()
    }
}

/// Checks the Kalman noise magnitudes. `r_accel` must be strictly positive so
/// the innovation covariance can never reach zero.
pub(crate) fn validate_noise(q_theta: f64, q_bias: f64, r_accel: f64) -> Result<()> {
    if !q_theta.is_finite() || q_theta < 0.0 {
        return Err(FusionError::InvalidConfig(format!(
            "q_theta must be finite and >= 0, got {q_theta}"
        )));
    }
    if !q_bias.is_finite() || q_bias < 0.0 {
        return Err(FusionError::InvalidConfig(format!(
            "q_bias must be finite and >= 0, got {q_bias}"
        )));
    }
    if !r_accel.is_finite() || r_accel <= 0.0 {
        return Err(FusionError::InvalidConfig(format!(
            "r_accel must be finite and > 0, got {r_accel}"
        )));
    }
    Ok(())
}

/// Everything a run needs: filter tuning plus the simulation setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub filter: FilterParams,
    pub sim: SimConfig,
}

impl RunConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let cfg: RunConfig = toml::from_str(&raw)?;
        cfg.validate()?;
        info!(path = %path.display(), "loaded run configuration");
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.filter.validate()?;
        self.sim.validate()
    }
}
