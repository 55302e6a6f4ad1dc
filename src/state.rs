//! Kalman state representation
//!
//! The estimator tracks two quantities:
//! - theta: tilt angle
//! - bias: additive gyro bias

use nalgebra::{Matrix2, Vector2};

/// Initial variance on both angle and bias
pub const INITIAL_VARIANCE: f64 = 0.1;

/// Mean and covariance of the angle/bias estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanState {
    /// State mean `[theta, bias]`
    pub x: Vector2<f64>,
    /// State covariance, symmetric positive semi-definite
    pub p: Matrix2<f64>,
}

impl KalmanState {
    pub fn new(x: Vector2<f64>, p: Matrix2<f64>) -> Self {
        Self { x, p }
    }

    /// Zero mean with `INITIAL_VARIANCE` on the diagonal
    pub fn initial() -> Self {
        Self {
            x: Vector2::zeros(),
            p: Matrix2::identity() * INITIAL_VARIANCE,
        }
    }

    pub fn theta(&self) -> f64 {
        self.x[0]
    }

    pub fn bias(&self) -> f64 {
        self.x[1]
    }

    pub fn is_finite(&self) -> bool {
        self.x.iter().all(|v| v.is_finite()) && self.p.iter().all(|v| v.is_finite())
    }

    /// Largest absolute difference between the off-diagonal entries
    pub fn asymmetry(&self) -> f64 {
        (self.p[(0, 1)] - self.p[(1, 0)]).abs()
    }
}

impl Default for KalmanState {
    fn default() -> Self {
        Self::initial()
    }
}
