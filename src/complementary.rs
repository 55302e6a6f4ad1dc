//! Complementary filter
//!
//! Integrates the rate for the short-term angle and leans on the
//! accelerometer angle for the long-term reference.

/// One complementary-filter step.
///
/// `alpha` near 1 trusts the integrated rate, near 0 the accelerometer.
/// `dt <= 0` is not rejected; it just integrates backwards or not at all.
pub fn complementary_step(theta_prev: f64, rate: f64, accel_angle: f64, dt: f64, alpha: f64) -> f64 {
    let predicted = theta_prev + rate * dt;
    alpha * predicted + (1.0 - alpha) * accel_angle
}

/// Complementary filter holding its own angle between steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplementaryFilter {
    theta: f64,
    alpha: f64,
}

impl ComplementaryFilter {
    pub fn new(alpha: f64, theta0: f64) -> Self {
        Self {
            theta: theta0,
            alpha,
        }
    }

    pub fn step(&mut self, rate: f64, accel_angle: f64, dt: f64) -> f64 {
        self.theta = complementary_step(self.theta, rate, accel_angle, dt, self.alpha);
        self.theta
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn reset(&mut self, theta0: f64) {
        self.theta = theta0;
    }
}
