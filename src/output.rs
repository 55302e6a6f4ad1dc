//! Run outputs
//!
//! Per-sample estimates as CSV, the metric summary as JSON and an
//! angle-vs-time PNG.

use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::metrics::RunSummary;
use crate::pipeline::EstimateStreams;
use crate::{FusionError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct EstimateRecord {
    pub t: f64,
    pub truth: Option<f64>,
    pub complementary: f64,
    pub kalman: f64,
    pub kalman_bias: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputFiles {
    pub output_dir: PathBuf,
    pub csv_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: PathBuf,
}

impl OutputFiles {
    pub fn in_dir(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            csv_path: output_dir.join("estimates.csv"),
            summary_path: output_dir.join("summary.json"),
            plot_path: output_dir.join("estimates.png"),
        }
    }
}

pub fn records(streams: &EstimateStreams) -> Vec<EstimateRecord> {
    (0..streams.len())
        .map(|i| EstimateRecord {
            t: streams.t[i],
            truth: streams.truth.as_ref().and_then(|truth| truth.get(i).copied()),
            complementary: streams.complementary[i],
            kalman: streams.kalman[i],
            kalman_bias: streams.kalman_bias[i],
        })
        .collect()
}

pub fn write_csv(path: &Path, streams: &EstimateStreams) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for record in records(streams) {
        writer.serialize(record)?;
    }

    writer.flush()?;
    info!(path = %path.display(), rows = streams.len(), "wrote estimates");
    Ok(())
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = serde_json::to_string_pretty(summary)?;
    fs::write(path, data)?;
    Ok(())
}

fn plot_err<E: std::fmt::Display>(err: E) -> FusionError {
    FusionError::Plot(err.to_string())
}

/// Angle vs time for truth (when present), complementary and Kalman.
pub fn plot_estimates(streams: &EstimateStreams, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let root = BitMapBackend::new(path, (1280, 720)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let t_min = streams.t.first().copied().unwrap_or(0.0);
    let t_max = streams.t.last().copied().unwrap_or(1.0).max(t_min + 1e-9);

    let truth = streams.truth.as_deref().unwrap_or(&[]);
    let (y_min, y_max) = streams
        .complementary
        .iter()
        .chain(&streams.kalman)
        .chain(truth)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let (y_min, y_max) = if y_min.is_finite() && y_max > y_min {
        let pad = 0.05 * (y_max - y_min);
        (y_min - pad, y_max + pad)
    } else {
        (-1.0, 1.0)
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Sensor Fusion: Complementary vs Kalman",
            ("sans-serif", 34).into_font(),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(t_min..t_max, y_min..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Time [s]")
        .y_desc("Angle [rad]")
        .draw()
        .map_err(plot_err)?;

    if !truth.is_empty() {
        chart
            .draw_series(LineSeries::new(
                streams.t.iter().copied().zip(truth.iter().copied()),
                &BLACK,
            ))
            .map_err(plot_err)?
            .label("True angle")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 25, y)], BLACK.stroke_width(3)));
    }

    chart
        .draw_series(LineSeries::new(
            streams.t.iter().copied().zip(streams.complementary.iter().copied()),
            &BLUE,
        ))
        .map_err(plot_err)?
        .label("Complementary")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 25, y)], BLUE.stroke_width(3)));

    chart
        .draw_series(LineSeries::new(
            streams.t.iter().copied().zip(streams.kalman.iter().copied()),
            &RED,
        ))
        .map_err(plot_err)?
        .label("Kalman")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 25, y)], RED.stroke_width(3)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    info!(path = %path.display(), "wrote plot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Estimate;

    fn streams() -> EstimateStreams {
        let mut s = EstimateStreams::default();
        for i in 0..3 {
            s.push(
                i as f64 * 0.01,
                Estimate {
                    complementary: 0.1 * i as f64,
                    kalman: 0.2 * i as f64,
                    bias: 0.0,
                },
            );
        }
        s
    }

    #[test]
    fn test_records_without_truth() {
        let rows = records(&streams());
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.truth.is_none()));
        assert_eq!(rows[2].kalman, 0.4);
    }

    #[test]
    fn test_write_csv_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let files = OutputFiles::in_dir(dir.path());

        let mut s = streams();
        s.truth = Some(vec![0.0, 0.1, 0.2]);
        write_csv(&files.csv_path, &s).unwrap();

        let text = fs::read_to_string(&files.csv_path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("t,truth,complementary,kalman,kalman_bias")
        );
        assert_eq!(lines.count(), 3);

        let summary = RunSummary::from_streams(&s).unwrap();
        write_summary(&files.summary_path, &summary).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&files.summary_path).unwrap()).unwrap();
        assert_eq!(json["samples"], 3);
    }
}
