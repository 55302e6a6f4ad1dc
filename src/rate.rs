//! Gyro/encoder rate fusion
//!
//! Blends two independent angular-rate readings. The encoder is optional:
//! when it is missing or NaN the gyro rate passes through untouched.

/// Fuse a gyro rate with an optional encoder rate.
///
/// Returns `w_gyro * gyro_rate + (1 - w_gyro) * encoder_rate`, or `gyro_rate`
/// when the encoder reading is absent or NaN. `w_gyro` is not range checked
/// here; values outside [0, 1] extrapolate.
pub fn fuse_rate(gyro_rate: f64, encoder_rate: Option<f64>, w_gyro: f64) -> f64 {
    match encoder_rate {
        Some(enc) if !enc.is_nan() => w_gyro * gyro_rate + (1.0 - w_gyro) * enc,
        _ => gyro_rate,
    }
}

/// Map a raw reading where NaN marks a missing value onto `Option`.
pub fn encoder_reading(raw: f64) -> Option<f64> {
    if raw.is_nan() {
        None
    } else {
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_missing_encoder_falls_back_to_gyro() {
        assert_eq!(fuse_rate(0.42, None, 0.7), 0.42);
        assert_eq!(fuse_rate(0.42, Some(f64::NAN), 0.7), 0.42);
    }

    #[test]
    fn test_weighted_blend() {
        let fused = fuse_rate(1.0, Some(2.0), 0.7);
        assert!((fused - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_encoder_reading() {
        assert_eq!(encoder_reading(f64::NAN), None);
        assert_eq!(encoder_reading(0.5), Some(0.5));
    }

    proptest! {
        #[test]
        fn fallback_ignores_weight(gyro in -100.0f64..100.0, w in -2.0f64..2.0) {
            prop_assert_eq!(fuse_rate(gyro, None, w), gyro);
            prop_assert_eq!(fuse_rate(gyro, Some(f64::NAN), w), gyro);
        }

        #[test]
        fn unit_weight_selects_gyro(gyro in -100.0f64..100.0, enc in -100.0f64..100.0) {
            prop_assert_eq!(fuse_rate(gyro, Some(enc), 1.0), gyro);
        }

        #[test]
        fn zero_weight_selects_encoder(gyro in -100.0f64..100.0, enc in -100.0f64..100.0) {
            prop_assert_eq!(fuse_rate(gyro, Some(enc), 0.0), enc);
        }
    }
}
