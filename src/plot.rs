//! Chart rendering
//!
//! Black-box renderer collaborator: each function takes data plus a
//! destination path and writes a PNG. Callers treat rendering failures as
//! warnings, never as run failures.

use crate::cache::ModelScore;
use crate::error::{AutoRegressError, Result};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

const ACCENT: RGBColor = RGBColor(251, 113, 133);
const POINT: RGBColor = RGBColor(70, 130, 180);

fn plot_err<E: std::fmt::Display>(e: E) -> AutoRegressError {
    AutoRegressError::PlotError(e.to_string())
}

/// Bar chart of per-model R² scores
pub fn render_model_comparison(scores: &BTreeMap<String, ModelScore>, path: &Path) -> Result<()> {
    if scores.is_empty() {
        return Err(AutoRegressError::PlotError("no scores to plot".to_string()));
    }

    let names: Vec<&String> = scores.keys().collect();
    let r2s: Vec<f64> = scores.values().map(|s| s.metrics.r2).collect();
    let min_r2 = r2s.iter().cloned().fold(f64::INFINITY, f64::min);
    let y_min = (min_r2 - 0.05).min(-1.0).max(-5.0);

    let root = BitMapBackend::new(path, (900, 460)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Model Comparison (R²)", ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..names.len() as f64, y_min..1.0f64)
        .map_err(plot_err)?;

    let label_names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    chart
        .configure_mesh()
        .x_labels(names.len())
        .x_label_formatter(&move |x| {
            let idx = x.floor() as usize;
            label_names.get(idx).cloned().unwrap_or_default()
        })
        .y_desc("R²")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(r2s.iter().enumerate().map(|(i, &r2)| {
            Rectangle::new(
                [(i as f64 + 0.15, 0.0), (i as f64 + 0.85, r2)],
                POINT.filled(),
            )
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Parity scatter: true vs. predicted with the identity diagonal
pub fn render_parity(y_true: &[f64], y_pred: &[f64], title: &str, path: &Path) -> Result<()> {
    let (lo, hi) = joint_range(y_true, y_pred)?;

    let root = BitMapBackend::new(path, (520, 520)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(lo..hi, lo..hi)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("True")
        .y_desc("Predicted")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(
            y_true
                .iter()
                .zip(y_pred.iter())
                .map(|(&t, &p)| Circle::new((t, p), 3, POINT.mix(0.7).filled())),
        )
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(vec![(lo, lo), (hi, hi)], ACCENT.stroke_width(2)))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Residuals vs. predicted with a zero reference line
pub fn render_residuals(y_true: &[f64], y_pred: &[f64], title: &str, path: &Path) -> Result<()> {
    let residuals: Vec<f64> = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| t - p)
        .collect();
    let (x_lo, x_hi) = value_range(y_pred)?;
    let (r_lo, r_hi) = value_range(&residuals)?;
    let pad = ((r_hi - r_lo) * 0.05).max(1e-9);

    let root = BitMapBackend::new(path, (640, 480)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_lo..x_hi, (r_lo - pad)..(r_hi + pad))
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Predicted")
        .y_desc("Residual")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(
            y_pred
                .iter()
                .zip(residuals.iter())
                .map(|(&p, &r)| Circle::new((p, r), 3, POINT.mix(0.7).filled())),
        )
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            vec![(x_lo, 0.0), (x_hi, 0.0)],
            ACCENT.stroke_width(2),
        ))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Histogram of residuals
pub fn render_residual_distribution(
    y_true: &[f64],
    y_pred: &[f64],
    title: &str,
    path: &Path,
) -> Result<()> {
    let residuals: Vec<f64> = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| t - p)
        .collect();
    render_histogram(&residuals, title, "Residual", path)
}

/// Histogram of predicted values
pub fn render_prediction_distribution(y_pred: &[f64], path: &Path) -> Result<()> {
    render_histogram(y_pred, "Prediction Distribution", "Predicted", path)
}

fn render_histogram(values: &[f64], title: &str, x_desc: &str, path: &Path) -> Result<()> {
    let (lo, hi) = value_range(values)?;
    let span = (hi - lo).max(1e-9);
    let n_bins = 30usize;
    let bin_width = span / n_bins as f64;

    let mut counts = vec![0usize; n_bins];
    for &v in values {
        let idx = (((v - lo) / bin_width) as usize).min(n_bins - 1);
        counts[idx] += 1;
    }
    let max_count = *counts.iter().max().unwrap_or(&1) as f64;

    let root = BitMapBackend::new(path, (640, 400)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(lo..(lo + span), 0f64..(max_count * 1.1))
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("Count")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(i, &c)| {
            let x0 = lo + i as f64 * bin_width;
            Rectangle::new([(x0, 0.0), (x0 + bin_width, c as f64)], POINT.filled())
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

fn value_range(values: &[f64]) -> Result<(f64, f64)> {
    if values.is_empty() {
        return Err(AutoRegressError::PlotError("no values to plot".to_string()));
    }
    let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        // Degenerate span; widen so the axis is drawable
        return Ok((lo - 0.5, hi + 0.5));
    }
    Ok((lo, hi))
}

fn joint_range(a: &[f64], b: &[f64]) -> Result<(f64, f64)> {
    let (a_lo, a_hi) = value_range(a)?;
    let (b_lo, b_hi) = value_range(b)?;
    Ok((a_lo.min(b_lo), a_hi.max(b_hi)))
}
