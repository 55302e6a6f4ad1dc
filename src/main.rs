use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tiltfuse::dataset::Dataset;
use tiltfuse::metrics::RunSummary;
use tiltfuse::output::{plot_estimates, write_csv, write_summary, OutputFiles};
use tiltfuse::pipeline::{run_pipeline, EstimateStreams};
use tiltfuse::sim::run_simulation;
use tiltfuse::RunConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Synthetic trajectory with simulated sensors
    Sim,
    /// Recorded CSV log
    Csv,
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Sensor fusion demo (complementary + Kalman)")]
struct Cli {
    #[arg(long, value_enum, default_value_t = Mode::Sim)]
    mode: Mode,

    /// CSV path when using --mode csv
    #[arg(long)]
    csv: Option<PathBuf>,

    /// TOML run configuration; command-line values override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for estimates.csv, summary.json and estimates.png
    #[arg(long, default_value = "results")]
    out: PathBuf,

    /// Skip writing the PNG plot
    #[arg(long, default_value_t = false)]
    no_plot: bool,

    /// Simulated run length [s]
    #[arg(long)]
    t_final: Option<f64>,

    /// Simulated sample interval [s]
    #[arg(long)]
    dt: Option<f64>,

    #[arg(long)]
    gyro_bias: Option<f64>,

    #[arg(long)]
    gyro_noise: Option<f64>,

    #[arg(long)]
    accel_noise: Option<f64>,

    #[arg(long)]
    encoder_noise: Option<f64>,

    /// Simulate an encoder channel
    #[arg(long, default_value_t = false)]
    use_encoder: bool,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Complementary blend weight
    #[arg(long)]
    alpha: Option<f64>,

    /// Gyro weight in the gyro/encoder blend
    #[arg(long)]
    w_gyro: Option<f64>,

    #[arg(long)]
    q_theta: Option<f64>,

    #[arg(long)]
    q_bias: Option<f64>,

    #[arg(long)]
    r_accel: Option<f64>,
}

impl Cli {
    fn run_config(&self) -> anyhow::Result<RunConfig> {
        let mut cfg = match &self.config {
            Some(path) => RunConfig::from_toml_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(v) = self.t_final {
            cfg.sim.t_final = v;
        }
        if let Some(v) = self.dt {
            cfg.sim.dt = v;
        }
        if let Some(v) = self.gyro_bias {
            cfg.sim.gyro_bias = v;
        }
        if let Some(v) = self.gyro_noise {
            cfg.sim.gyro_noise = v;
        }
        if let Some(v) = self.accel_noise {
            cfg.sim.accel_noise = v;
        }
        if let Some(v) = self.encoder_noise {
            cfg.sim.encoder_noise = v;
        }
        if self.use_encoder {
            cfg.sim.use_encoder = true;
        }
        if let Some(v) = self.seed {
            cfg.sim.seed = v;
        }
        if let Some(v) = self.alpha {
            cfg.filter.alpha = v;
        }
        if let Some(v) = self.w_gyro {
            cfg.filter.w_gyro = v;
        }
        if let Some(v) = self.q_theta {
            cfg.filter.q_theta = v;
        }
        if let Some(v) = self.q_bias {
            cfg.filter.q_bias = v;
        }
        if let Some(v) = self.r_accel {
            cfg.filter.r_accel = v;
        }

        cfg.validate().context("invalid run configuration")?;
        Ok(cfg)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = cli.run_config()?;

    let streams: EstimateStreams = match cli.mode {
        Mode::Sim => run_simulation(&cfg.sim, &cfg.filter).context("simulation failed")?,
        Mode::Csv => {
            let Some(path) = cli.csv.as_ref() else {
                bail!("in csv mode, you must provide --csv path/to/file.csv");
            };
            let dataset = Dataset::load_csv(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            run_pipeline(&cfg.filter, &dataset.samples()).context("estimation failed")?
        }
    };

    let files = OutputFiles::in_dir(&cli.out);
    write_csv(&files.csv_path, &streams)?;

    if streams.truth.is_some() {
        let summary = RunSummary::from_streams(&streams)?;
        println!("RMSE (Kalman vs True):        {:.6}", summary.kalman.rmse);
        println!("RMSE (Complementary vs True): {:.6}", summary.complementary.rmse);
        println!("Estimated gyro bias:          {:.6}", summary.final_bias);
        write_summary(&files.summary_path, &summary)?;
    } else {
        println!("CSV mode complete (no ground truth).");
    }

    if !cli.no_plot {
        plot_estimates(&streams, &files.plot_path)?;
    }

    info!(output_dir = %files.output_dir.display(), "run complete");
    Ok(())
}
