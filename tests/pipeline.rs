use std::io::Write;

use approx::assert_relative_eq;
use tempfile::NamedTempFile;
use tiltfuse::metrics::rmse;
use tiltfuse::sim::{generate_trajectory, run_simulation, SimConfig};
use tiltfuse::{
    complementary_step, fuse_rate, run_pipeline, Dataset, FilterParams, FusionError,
    KalmanEstimator, Sample,
};

#[test]
fn csv_log_runs_through_pipeline() {
    let traj = generate_trajectory(2.0, 0.01);

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "t,gyro,accel_angle,encoder").unwrap();
    for i in 0..traj.len() {
        // encoder drops out every fifth sample
        let encoder = if i % 5 == 0 {
            "nan".to_string()
        } else {
            traj.omega[i].to_string()
        };
        writeln!(
            file,
            "{},{},{},{}",
            traj.t[i],
            traj.omega[i] + 0.02,
            traj.theta[i],
            encoder
        )
        .unwrap();
    }
    file.flush().unwrap();

    let dataset = Dataset::load_csv(file.path()).unwrap();
    assert_eq!(dataset.len(), traj.len());
    assert_relative_eq!(dataset.dt, 0.01, epsilon = 1e-9);
    assert_eq!(dataset.encoder[0], None);
    assert!(dataset.encoder[1].is_some());

    let streams = run_pipeline(&FilterParams::default(), &dataset.samples()).unwrap();
    assert_eq!(streams.len(), traj.len());
    assert!(streams.truth.is_none());

    let kalman_rmse = rmse(&traj.theta, &streams.kalman).unwrap();
    assert!(kalman_rmse < 0.05);
}

#[test]
fn pipeline_matches_hand_threaded_filters() {
    let params = FilterParams::default();
    let samples: Vec<Sample> = (0..50)
        .map(|i| {
            let t = i as f64 * 0.02;
            Sample {
                t,
                dt: 0.02,
                gyro_rate: 0.3,
                accel_angle: 0.3 * t,
                encoder_rate: if i % 2 == 0 { Some(0.28) } else { None },
            }
        })
        .collect();

    let streams = run_pipeline(&params, &samples).unwrap();

    let mut theta = 0.0;
    let mut kf = KalmanEstimator::from_params(&params).unwrap();
    for (i, s) in samples.iter().enumerate() {
        let rate = fuse_rate(s.gyro_rate, s.encoder_rate, params.w_gyro);
        theta = complementary_step(theta, rate, s.accel_angle, s.dt, params.alpha);
        let kalman = kf.step(rate, s.accel_angle, s.dt).unwrap();

        assert_relative_eq!(streams.complementary[i], theta, epsilon = 1e-12);
        assert_relative_eq!(streams.kalman[i], kalman, epsilon = 1e-12);
    }
}

#[test]
fn encoder_channel_keeps_simulation_on_track() {
    let config = SimConfig {
        use_encoder: true,
        ..SimConfig::default()
    };

    let streams = run_simulation(&config, &FilterParams::default()).unwrap();
    let truth = streams.truth.as_deref().unwrap();

    assert!(rmse(truth, &streams.kalman).unwrap() < config.accel_noise);
    assert!(rmse(truth, &streams.complementary).unwrap() < config.accel_noise);
    assert!(streams.kalman_bias.iter().all(|b| b.is_finite()));
}

#[test]
fn invalid_measurement_noise_rejected_up_front() {
    let params = FilterParams {
        r_accel: -0.03,
        ..Default::default()
    };
    let samples = [Sample {
        t: 0.0,
        dt: 0.01,
        gyro_rate: 0.0,
        accel_angle: 0.0,
        encoder_rate: None,
    }];
    assert!(matches!(
        run_pipeline(&params, &samples),
        Err(FusionError::InvalidConfig(_))
    ));
}
