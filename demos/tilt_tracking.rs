//! Tilt Tracking Example
//!
//! Runs the simulated tilt trajectory with and without an encoder channel and
//! compares the complementary filter against the Kalman filter.

use tiltfuse::metrics::RunSummary;
use tiltfuse::output::write_csv;
use tiltfuse::sim::{run_simulation, SimConfig};
use tiltfuse::FilterParams;
use std::fs;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Running tilt tracking simulation...\n");

    fs::create_dir_all("out")?;

    let params = FilterParams::new(
        0.98, // alpha
        0.7,  // w_gyro
        1e-3, // q_theta
        1e-5, // q_bias
        3e-2, // r_accel
    );

    for use_encoder in [false, true] {
        let config = SimConfig {
            t_final: 12.0,
            dt: 0.01,
            gyro_bias: 0.02,
            gyro_noise: 0.01,
            accel_noise: 0.05,
            encoder_noise: 0.02,
            use_encoder,
            seed: 42,
        };

        let streams = run_simulation(&config, &params)?;
        let summary = RunSummary::from_streams(&streams)?;

        println!("Encoder: {}", if use_encoder { "on" } else { "off" });
        println!("  Samples:              {}", summary.samples);
        println!("  Kalman RMSE:          {:.6}", summary.kalman.rmse);
        println!("  Kalman peak error:    {:.6}", summary.kalman.peak_error);
        println!("  Complementary RMSE:   {:.6}", summary.complementary.rmse);
        println!("  Complementary peak:   {:.6}", summary.complementary.peak_error);
        println!("  Final bias estimate:  {:.6} (true {})", summary.final_bias, config.gyro_bias);
        println!();

        let name = if use_encoder { "sim_encoder.csv" } else { "sim.csv" };
        let csv_path = Path::new("out").join(name);
        write_csv(&csv_path, &streams)?;
        println!("CSV output written to: {}\n", csv_path.display());
    }

    println!("Done!");
    Ok(())
}
