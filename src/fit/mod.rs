//! Growth-curve fitting of per-leaf time series.
//!
//! Every sample gets two Gompertz fits (lesion area and ichloro sum) and one
//! degree-4 polynomial with latency metrics. A sample without enough disease
//! signal is reported with zeroed values and a warning; it never fails the run.
pub mod gompertz;
pub mod polynomial;
pub mod report;

pub use gompertz::{fit_gompertz, Gompertz, GompertzFit, LmParams};
pub use polynomial::{latency_from_curve, polyfit, polyval, Latency};
pub use report::write_report;

use crate::types::LeafStats;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Column a Gompertz fit was made on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    LesionArea,
    IchloroSum,
}

impl Statistic {
    pub fn as_str(self) -> &'static str {
        match self {
            Statistic::LesionArea => "lesion_area",
            Statistic::IchloroSum => "ichloro_sum",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the coefficient table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GompertzCoefs {
    pub sample: String,
    #[serde(rename = "U")]
    pub u: f64,
    #[serde(rename = "L")]
    pub l: f64,
    #[serde(rename = "kG")]
    pub kg: f64,
    #[serde(rename = "Ti")]
    pub ti: f64,
    pub slope: f64,
    pub yintercept: f64,
    pub sd: f64,
    pub statistic: Statistic,
}

impl GompertzCoefs {
    /// Zeroed row for a series that was not fitted.
    pub fn zeroed(sample: &str, statistic: Statistic) -> Self {
        Self::from_fit(sample, statistic, None)
    }

    fn from_fit(sample: &str, statistic: Statistic, fit: Option<&GompertzFit>) -> Self {
        let fit = fit.copied().unwrap_or(GompertzFit {
            model: Gompertz::default(),
            sd: 0.0,
            slope: 0.0,
            yintercept: 0.0,
        });
        Self {
            sample: sample.to_string(),
            u: fit.model.u,
            l: fit.model.l,
            kg: fit.model.kg,
            ti: fit.model.ti,
            slope: fit.slope,
            yintercept: fit.yintercept,
            sd: fit.sd,
            statistic,
        }
    }
}

/// One row of the latency table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolynomialLatency {
    pub sample: String,
    /// Degree-4 coefficients, highest power first.
    pub coefficients: [f64; 5],
    /// Residual sum of squares.
    pub residuals: f64,
    #[serde(flatten)]
    pub latency: Latency,
}

impl PolynomialLatency {
    pub fn zeroed(sample: &str) -> Self {
        Self {
            sample: sample.to_string(),
            coefficients: [0.0; 5],
            residuals: 0.0,
            latency: Latency::default(),
        }
    }
}

/// Observed vs. fitted value for one time point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub sample: String,
    pub x: f64,
    pub y: f64,
    pub yhat: f64,
    pub derivative: f64,
    pub statistic: Statistic,
}

/// Minimum disease signal for a series to be worth fitting: more than
/// `min_points` observations must exceed `min_signal`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalGate {
    pub min_signal: f64,
    pub min_points: usize,
}

impl Default for SignalGate {
    fn default() -> Self {
        Self {
            min_signal: 300.0,
            min_points: 10,
        }
    }
}

impl SignalGate {
    pub fn passes(&self, lesion: &[f64]) -> bool {
        lesion.iter().filter(|&&v| v > self.min_signal).count() > self.min_points
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitParams {
    /// First latency threshold `ft`; the second one is `2·ft`.
    pub threshold: f64,
    pub gate: SignalGate,
    /// Apply the gate to the Gompertz fits too; on by default.
    pub gate_gompertz: bool,
    /// Multiplies frame indices before the polynomial fit.
    pub time_scale: f64,
    pub lm: LmParams,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            threshold: 300.0,
            gate: SignalGate::default(),
            gate_gompertz: true,
            time_scale: 1.0,
            lm: LmParams::default(),
        }
    }
}

/// Time series of one sample, sorted by time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Series {
    pub sample: String,
    pub time: Vec<f64>,
    pub lesion_area: Vec<f64>,
    pub ichloro_sum: Vec<f64>,
}

impl Series {
    fn values(&self, statistic: Statistic) -> &[f64] {
        match statistic {
            Statistic::LesionArea => &self.lesion_area,
            Statistic::IchloroSum => &self.ichloro_sum,
        }
    }
}

/// Split a quantification table into per-sample series ordered by id.
/// Rows without a time are skipped.
pub fn group_series(rows: &[LeafStats]) -> Vec<Series> {
    let mut by_id: BTreeMap<&str, Vec<&LeafStats>> = BTreeMap::new();
    let mut untimed = 0usize;
    for row in rows {
        if row.time.is_some() {
            by_id.entry(row.id.as_str()).or_default().push(row);
        } else {
            untimed += 1;
        }
    }
    if untimed > 0 {
        warn!("{untimed} row(s) without a time index ignored for fitting");
    }
    by_id
        .into_iter()
        .map(|(id, mut rows)| {
            rows.sort_by_key(|r| r.time);
            Series {
                sample: id.to_string(),
                time: rows.iter().filter_map(|r| r.time).map(|t| t as f64).collect(),
                lesion_area: rows.iter().map(|r| r.lesion_area as f64).collect(),
                ichloro_sum: rows.iter().map(|r| r.ichloro_sum).collect(),
            }
        })
        .collect()
}

/// Everything fitted for one sample.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleFit {
    pub gompertz: Vec<GompertzCoefs>,
    pub latency: PolynomialLatency,
    pub predictions: Vec<Prediction>,
}

pub fn fit_series(series: &Series, params: &FitParams) -> SampleFit {
    let has_signal = params.gate.passes(&series.lesion_area);
    let mut gompertz = Vec::with_capacity(2);
    let mut predictions = Vec::new();
    for statistic in [Statistic::LesionArea, Statistic::IchloroSum] {
        let y = series.values(statistic);
        let fit = if params.gate_gompertz && !has_signal {
            None
        } else {
            fit_gompertz(&series.time, y, &params.lm)
        };
        match &fit {
            Some(fit) => predictions.extend(series.time.iter().zip(y).map(|(&x, &y)| Prediction {
                sample: series.sample.clone(),
                x,
                y,
                yhat: fit.model.predict(x),
                derivative: fit.model.derivative(x),
                statistic,
            })),
            None => warn!(
                "sample {}: Gompertz fit of {statistic} not attempted or failed; reporting zeros",
                series.sample
            ),
        }
        gompertz.push(GompertzCoefs::from_fit(&series.sample, statistic, fit.as_ref()));
    }

    let latency = if has_signal {
        fit_latency(series, params)
    } else {
        warn!(
            "sample {}: not enough lesion signal (need more than {} points above {}); reporting zeros",
            series.sample, params.gate.min_points, params.gate.min_signal
        );
        PolynomialLatency::zeroed(&series.sample)
    };

    SampleFit {
        gompertz,
        latency,
        predictions,
    }
}

fn fit_latency(series: &Series, params: &FitParams) -> PolynomialLatency {
    let t: Vec<f64> = series.time.iter().map(|v| v * params.time_scale).collect();
    let Some((coefs, residuals)) = polyfit(&t, &series.lesion_area, polynomial::DEGREE) else {
        warn!("sample {}: polynomial fit failed; reporting zeros", series.sample);
        return PolynomialLatency::zeroed(&series.sample);
    };
    let t_end = t.last().copied().unwrap_or(0.0);
    let latency = latency_from_curve(|x| polyval(&coefs, x), t_end, params.threshold);
    let mut coefficients = [0.0; 5];
    coefficients.copy_from_slice(&coefs);
    PolynomialLatency {
        sample: series.sample.clone(),
        coefficients,
        residuals,
        latency,
    }
}

/// Fit results for a whole table, in sample order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitReport {
    pub gompertz: Vec<GompertzCoefs>,
    pub latency: Vec<PolynomialLatency>,
    pub predictions: Vec<Prediction>,
}

/// Fit every series. Samples are independent and run on the rayon pool when
/// the `parallel` feature is on.
pub fn fit_all(series: &[Series], params: &FitParams) -> FitReport {
    #[cfg(feature = "parallel")]
    let fits: Vec<SampleFit> = series.par_iter().map(|s| fit_series(s, params)).collect();
    #[cfg(not(feature = "parallel"))]
    let fits: Vec<SampleFit> = series.iter().map(|s| fit_series(s, params)).collect();

    let mut report = FitReport::default();
    for fit in fits {
        report.gompertz.extend(fit.gompertz);
        report.latency.push(fit.latency);
        report.predictions.extend(fit.predictions);
    }
    info!(
        "fitted {} samples ({} with latency metrics)",
        series.len(),
        report.latency.iter().filter(|l| l.latency.latency > 0.0).count()
    );
    report
}
