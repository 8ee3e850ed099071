//! Tab-separated writers for fitting results.
use super::{FitReport, GompertzCoefs, PolynomialLatency, Prediction};
use crate::error::{InfestError, Result};
use crate::image::io::ensure_parent_dir;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const COEFFICIENT_HEADER: &str = "sample\tU\tL\tkG\tTi\tslope\tyintercept\tsd\tstatistic";
pub const LATENCY_HEADER: &str = "sample\ta1\ta2\ta3\ta4\ta5\tresiduals\tLDT\tlatency";
pub const PREDICTION_HEADER: &str = "sample\tx\ty\tyhat\tderivative\tstatistic";

pub fn format_coefficients(rows: &[GompertzCoefs]) -> String {
    let mut out = format!("{COEFFICIENT_HEADER}\n");
    for r in rows {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.sample, r.u, r.l, r.kg, r.ti, r.slope, r.yintercept, r.sd, r.statistic
        );
    }
    out
}

pub fn format_latency(rows: &[PolynomialLatency]) -> String {
    let mut out = format!("{LATENCY_HEADER}\n");
    for r in rows {
        let a = &r.coefficients;
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.sample, a[0], a[1], a[2], a[3], a[4], r.residuals, r.latency.ldt, r.latency.latency
        );
    }
    out
}

pub fn format_predictions(rows: &[Prediction]) -> String {
    let mut out = format!("{PREDICTION_HEADER}\n");
    for r in rows {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            r.sample, r.x, r.y, r.yhat, r.derivative, r.statistic
        );
    }
    out
}

fn write_text(path: &Path, text: String) -> Result<()> {
    ensure_parent_dir(path)?;
    fs::write(path, text).map_err(|e| InfestError::io(path, e))
}

pub fn write_coefficients(path: &Path, rows: &[GompertzCoefs]) -> Result<()> {
    write_text(path, format_coefficients(rows))
}

pub fn write_latency(path: &Path, rows: &[PolynomialLatency]) -> Result<()> {
    write_text(path, format_latency(rows))
}

pub fn write_predictions(path: &Path, rows: &[Prediction]) -> Result<()> {
    write_text(path, format_predictions(rows))
}

/// `{prefix}-{suffix}` as a path.
pub fn prefixed(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(format!("-{suffix}"));
    PathBuf::from(name)
}

/// Write the three result tables next to `prefix` and return their paths.
pub fn write_report(prefix: &Path, report: &FitReport) -> Result<[PathBuf; 3]> {
    let coef = prefixed(prefix, "coef.tsv");
    let preds = prefixed(prefix, "preds.tsv");
    let latency = prefixed(prefix, "latency.tsv");
    write_coefficients(&coef, &report.gompertz)?;
    write_predictions(&preds, &report.predictions)?;
    write_latency(&latency, &report.latency)?;
    Ok([coef, preds, latency])
}
