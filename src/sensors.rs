//! Simulated tilt sensors
//!
//! Gyro, accelerometer-angle and encoder models driven by a seeded RNG so
//! every simulated run is reproducible.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// Noise and bias settings for the simulated sensors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorNoise {
    /// Constant additive gyro bias [rad/s]
    pub gyro_bias: f64,
    /// Gyro white-noise standard deviation [rad/s]
    pub gyro_std: f64,
    /// Accelerometer angle noise standard deviation [rad]
    pub accel_std: f64,
    /// Encoder rate noise standard deviation [rad/s]
    pub encoder_std: f64,
}

/// One time step worth of simulated readings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub gyro_rate: f64,
    pub accel_angle: f64,
    pub encoder_rate: Option<f64>,
}

pub struct SensorSuite {
    noise: SensorNoise,
    use_encoder: bool,
    rng: ChaCha8Rng,
}

impl SensorSuite {
    pub fn new(noise: SensorNoise, use_encoder: bool, seed: u64) -> Self {
        Self {
            noise,
            use_encoder,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Gyro: true rate + constant bias + noise
    pub fn gyro(&mut self, true_rate: f64) -> f64 {
        true_rate + self.noise.gyro_bias + self.gaussian(self.noise.gyro_std)
    }

    /// Accelerometer: true angle + noise
    pub fn accel(&mut self, true_angle: f64) -> f64 {
        true_angle + self.gaussian(self.noise.accel_std)
    }

    /// Encoder: true rate + noise
    pub fn encoder(&mut self, true_rate: f64) -> f64 {
        true_rate + self.gaussian(self.noise.encoder_std)
    }

    pub fn measure(&mut self, true_angle: f64, true_rate: f64) -> SensorReading {
        let gyro_rate = self.gyro(true_rate);
        let accel_angle = self.accel(true_angle);
        let encoder_rate = if self.use_encoder {
            Some(self.encoder(true_rate))
        } else {
            None
        };

        SensorReading {
            gyro_rate,
            accel_angle,
            encoder_rate,
        }
    }

    fn gaussian(&mut self, sigma: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        sigma * z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise() -> SensorNoise {
        SensorNoise {
            gyro_bias: 0.02,
            gyro_std: 0.01,
            accel_std: 0.05,
            encoder_std: 0.02,
        }
    }

    #[test]
    fn test_same_seed_same_readings() {
        let mut a = SensorSuite::new(noise(), true, 42);
        let mut b = SensorSuite::new(noise(), true, 42);
        for i in 0..50 {
            let t = i as f64 * 0.01;
            assert_eq!(a.measure(t.sin(), t.cos()), b.measure(t.sin(), t.cos()));
        }
    }

    #[test]
    fn test_noiseless_gyro_carries_bias() {
        let quiet = SensorNoise {
            gyro_bias: 0.02,
            gyro_std: 0.0,
            accel_std: 0.0,
            encoder_std: 0.0,
        };
        let mut suite = SensorSuite::new(quiet, false, 1);
        let reading = suite.measure(0.3, 1.0);
        assert!((reading.gyro_rate - 1.02).abs() < 1e-12);
        assert_eq!(reading.accel_angle, 0.3);
        assert_eq!(reading.encoder_rate, None);
    }

    #[test]
    fn test_gyro_mean_matches_bias() {
        let mut suite = SensorSuite::new(noise(), false, 7);
        let n = 20_000;
        let mean = (0..n).map(|_| suite.gyro(0.0)).sum::<f64>() / n as f64;
        assert!((mean - 0.02).abs() < 1e-3);
    }
}
