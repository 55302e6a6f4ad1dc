//! Angle/bias Kalman filter
//!
//! Two-state linear Kalman filter over `x = [theta, bias]`. The gyro rate
//! drives the prediction (`theta += (rate - bias) * dt`), the accelerometer
//! angle corrects it through `H = [1, 0]`. The bias follows a random walk.
//!
//! ```text
//! predict:  F = [[1, -dt], [0, 1]],  u = [rate*dt, 0]
//!           x = F x + u
//!           P = F P Fᵀ + Q
//! update:   y = z - H x
//!           S = H P Hᵀ + R
//!           K = P Hᵀ S⁻¹
//!           x = x + K y
//!           P = (I - K H) P
//! ```

use nalgebra::{Matrix2, RowVector2, Vector2};
use tracing::{trace, warn};

use crate::params::{validate_noise, FilterParams};
use crate::state::KalmanState;
use crate::{FusionError, Result};

/// Noise variances the estimator was built with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanNoise {
    pub q_theta: f64,
    pub q_bias: f64,
    pub r_accel: f64,
}

/// Angle + gyro-bias Kalman estimator
#[derive(Debug, Clone)]
pub struct KalmanEstimator {
    /// Current mean and covariance
    state: KalmanState,
    /// Process noise, `diag(q_theta, q_bias)`
    q: Matrix2<f64>,
    /// Accelerometer angle measurement noise
    r: f64,
    /// Observation row, selects theta
    h: RowVector2<f64>,
}

impl KalmanEstimator {
    /// Create a new estimator. `r_accel` must be > 0 and the process noise
    /// variances must be >= 0.
    pub fn new(q_theta: f64, q_bias: f64, r_accel: f64) -> Result<Self> {
        validate_noise(q_theta, q_bias, r_accel)?;
        Ok(Self {
            state: KalmanState::initial(),
            q: Matrix2::new(q_theta, 0.0, 0.0, q_bias),
            r: r_accel,
            h: RowVector2::new(1.0, 0.0),
        })
    }

    pub fn from_params(params: &FilterParams) -> Result<Self> {
        Self::new(params.q_theta, params.q_bias, params.r_accel)
    }

    /// Seed the estimator with a prior mean and covariance
    pub fn init(&mut self, initial_state: KalmanState) {
        self.state = initial_state;
    }

    /// Back to `x = [0, 0]`, `P = 0.1 I`. Required after a numerical failure.
    pub fn reset(&mut self) {
        self.state = KalmanState::initial();
    }

    /// Propagate the state by `dt` using the measured rate.
    pub fn predict(&mut self, rate: f64, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(FusionError::InvalidTimeStep(dt));
        }

        let f = Matrix2::new(1.0, -dt, 0.0, 1.0);
        let u = Vector2::new(rate * dt, 0.0);

        let x = f * self.state.x + u;
        let p = symmetrize(f * self.state.p * f.transpose() + self.q);

        let predicted = KalmanState::new(x, p);
        if !predicted.is_finite() {
            warn!(rate, dt, "kalman prediction produced a non-finite state");
            return Err(FusionError::Numerical(format!(
                "non-finite state after predict (rate = {rate}, dt = {dt})"
            )));
        }

        self.state = predicted;
        Ok(())
    }

    /// Correct the state with an accelerometer angle.
    ///
    /// On error the state is left as it was before the call.
    pub fn update(&mut self, accel_angle: f64) -> Result<()> {
        let x = self.state.x;
        let p = self.state.p;

        let innovation = accel_angle - (self.h * x)[0];
        let s = (self.h * p * self.h.transpose())[0] + self.r;
        if !s.is_finite() || s <= 0.0 {
            warn!(s, "innovation covariance is not invertible");
            return Err(FusionError::Numerical(format!(
                "innovation covariance must be finite and > 0, got {s}"
            )));
        }

        let k: Vector2<f64> = p * self.h.transpose() / s;
        let x = x + k * innovation;
        let p = symmetrize((Matrix2::identity() - k * self.h) * p);

        let corrected = KalmanState::new(x, p);
        if !corrected.is_finite() {
            warn!(accel_angle, "kalman update produced a non-finite state");
            return Err(FusionError::Numerical(format!(
                "non-finite state after update (accel_angle = {accel_angle})"
            )));
        }
        if p[(0, 0)] < 0.0 || p[(1, 1)] < 0.0 {
            warn!(p00 = p[(0, 0)], p11 = p[(1, 1)], "covariance lost positive semi-definiteness");
            return Err(FusionError::Numerical(
                "covariance has a negative diagonal entry".to_string(),
            ));
        }

        trace!(innovation, s, theta = x[0], bias = x[1], "kalman update");
        self.state = corrected;
        Ok(())
    }

    /// Predict with `rate` over `dt`, then correct with `accel_angle`.
    ///
    /// The cycle commits as a whole: if either half fails the estimator is
    /// left exactly as it was before the call.
    ///
    /// # Returns
    /// The corrected angle
    pub fn step(&mut self, rate: f64, accel_angle: f64, dt: f64) -> Result<f64> {
        let prior = self.state;
        self.predict(rate, dt)?;
        if let Err(err) = self.update(accel_angle) {
            self.state = prior;
            return Err(err);
        }
        Ok(self.theta())
    }

    pub fn theta(&self) -> f64 {
        self.state.theta()
    }

    pub fn bias(&self) -> f64 {
        self.state.bias()
    }

    pub fn state(&self) -> KalmanState {
        self.state
    }

    pub fn covariance(&self) -> Matrix2<f64> {
        self.state.p
    }

    pub fn params(&self) -> KalmanNoise {
        KalmanNoise {
            q_theta: self.q[(0, 0)],
            q_bias: self.q[(1, 1)],
            r_accel: self.r,
        }
    }
}

fn symmetrize(p: Matrix2<f64>) -> Matrix2<f64> {
    let off = 0.5 * (p[(0, 1)] + p[(1, 0)]);
    Matrix2::new(p[(0, 0)], off, off, p[(1, 1)])
}
