//! Offline hedge-ratio research for a candidate pair.
//!
//! Estimates the hedge ratio by ordinary least squares of `y` on `x` and
//! checks the resulting spread for mean reversion with a lag-0
//! Dickey–Fuller regression. The backtest itself never calls into this
//! module; its output is meant to be pasted into a strategy config.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::mean;

/// 5% asymptotic critical value for the Dickey–Fuller test with constant.
pub const DF_CRITICAL_5PCT: f64 = -2.86;

/// Minimum observations for a regression with two parameters and one
/// residual degree of freedom.
const MIN_OBSERVATIONS: usize = 3;

#[derive(Debug, Error, PartialEq)]
pub enum HedgeError {
    #[error("series lengths differ: x has {x}, y has {y}")]
    LengthMismatch { x: usize, y: usize },

    #[error("need at least {need} observations, got {got}")]
    TooFewObservations { need: usize, got: usize },

    #[error("regressor has zero variance")]
    ZeroVariance,

    #[error("series contains a non-finite value at index {0}")]
    NonFinite(usize),
}

/// Least-squares fit `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgeFit {
    /// Hedge ratio.
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub observations: usize,
}

/// Dickey–Fuller regression `Δs_t = α + β·s_{t-1}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DickeyFuller {
    pub beta: f64,
    pub t_stat: f64,
    /// `t_stat` is below [`DF_CRITICAL_5PCT`].
    pub stationary: bool,
    pub observations: usize,
}

/// Hedge fit plus the stationarity check of its spread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairDiagnostics {
    pub fit: HedgeFit,
    pub dickey_fuller: DickeyFuller,
    pub spread_mean: f64,
}

/// Ordinary least squares of `y` on `x` with intercept.
pub fn estimate_hedge_ratio(x: &[f64], y: &[f64]) -> Result<HedgeFit, HedgeError> {
    if x.len() != y.len() {
        return Err(HedgeError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    check_finite(x)?;
    check_finite(y)?;
    let line = fit_line(x, y)?;

    let y_mean = mean(y);
    let ss_tot: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let r_squared = if ss_tot == 0.0 {
        1.0
    } else {
        1.0 - line.ss_res / ss_tot
    };

    Ok(HedgeFit {
        slope: line.slope,
        intercept: line.intercept,
        r_squared,
        observations: x.len(),
    })
}

/// Lag-0 Dickey–Fuller test on `series`.
///
/// A perfect fit yields an infinite t-statistic carrying the sign of β.
pub fn dickey_fuller(series: &[f64]) -> Result<DickeyFuller, HedgeError> {
    check_finite(series)?;
    if series.len() < MIN_OBSERVATIONS + 1 {
        return Err(HedgeError::TooFewObservations {
            need: MIN_OBSERVATIONS + 1,
            got: series.len(),
        });
    }

    let lagged = &series[..series.len() - 1];
    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
    let line = fit_line(lagged, &diffs)?;

    let n = lagged.len() as f64;
    let sigma2 = line.ss_res / (n - 2.0);
    let se = (sigma2 / line.sxx).sqrt();
    let t_stat = if se > 0.0 {
        line.slope / se
    } else if line.slope == 0.0 {
        0.0
    } else {
        line.slope.signum() * f64::INFINITY
    };

    Ok(DickeyFuller {
        beta: line.slope,
        t_stat,
        stationary: t_stat < DF_CRITICAL_5PCT,
        observations: lagged.len(),
    })
}

/// Element-wise `y - hedge_ratio * x`, truncated to the shorter input.
pub fn spread_series(x: &[f64], y: &[f64], hedge_ratio: f64) -> Vec<f64> {
    x.iter()
        .zip(y)
        .map(|(xv, yv)| yv - hedge_ratio * xv)
        .collect()
}

/// Fit the hedge ratio, then test the resulting spread.
pub fn analyze_pair(x: &[f64], y: &[f64]) -> Result<PairDiagnostics, HedgeError> {
    let fit = estimate_hedge_ratio(x, y)?;
    let spread = spread_series(x, y, fit.slope);
    let dickey_fuller = dickey_fuller(&spread)?;
    Ok(PairDiagnostics {
        fit,
        dickey_fuller,
        spread_mean: mean(&spread),
    })
}

struct Line {
    slope: f64,
    intercept: f64,
    ss_res: f64,
    sxx: f64,
}

fn fit_line(x: &[f64], y: &[f64]) -> Result<Line, HedgeError> {
    if x.len() < MIN_OBSERVATIONS {
        return Err(HedgeError::TooFewObservations {
            need: MIN_OBSERVATIONS,
            got: x.len(),
        });
    }
    let x_mean = mean(x);
    let y_mean = mean(y);

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (xv, yv) in x.iter().zip(y) {
        sxx += (xv - x_mean).powi(2);
        sxy += (xv - x_mean) * (yv - y_mean);
    }
    if sxx == 0.0 {
        return Err(HedgeError::ZeroVariance);
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let ss_res = x
        .iter()
        .zip(y)
        .map(|(xv, yv)| (yv - intercept - slope * xv).powi(2))
        .sum();

    Ok(Line {
        slope,
        intercept,
        ss_res,
        sxx,
    })
}

fn check_finite(values: &[f64]) -> Result<(), HedgeError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(HedgeError::NonFinite(i)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::assert_approx;

    #[test]
    fn exact_line_recovers_slope_and_intercept() {
        let x: Vec<f64> = (0..10).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 + 2.0 * v).collect();
        let fit = estimate_hedge_ratio(&x, &y).unwrap();
        assert_approx(fit.slope, 2.0, 1e-12);
        assert_approx(fit.intercept, 3.0, 1e-12);
        assert_approx(fit.r_squared, 1.0, 1e-12);
        assert_eq!(fit.observations, 10);
    }

    #[test]
    fn noisy_line_is_close() {
        let x: Vec<f64> = (0..50).map(|i| 40.0 + f64::from(i)).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 1.5 * v + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        let fit = estimate_hedge_ratio(&x, &y).unwrap();
        assert!((fit.slope - 1.5).abs() < 0.01);
        assert!(fit.r_squared > 0.99 && fit.r_squared < 1.0);
    }

    #[test]
    fn rejects_bad_inputs() {
        assert_eq!(
            estimate_hedge_ratio(&[1.0, 2.0], &[1.0]),
            Err(HedgeError::LengthMismatch { x: 2, y: 1 })
        );
        assert_eq!(
            estimate_hedge_ratio(&[1.0, 2.0], &[1.0, 2.0]),
            Err(HedgeError::TooFewObservations { need: 3, got: 2 })
        );
        assert_eq!(
            estimate_hedge_ratio(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]),
            Err(HedgeError::ZeroVariance)
        );
        assert_eq!(
            estimate_hedge_ratio(&[1.0, f64::NAN, 3.0], &[1.0, 2.0, 3.0]),
            Err(HedgeError::NonFinite(1))
        );
    }

    #[test]
    fn oscillating_spread_is_stationary() {
        let series: Vec<f64> = (0..100)
            .map(|t| {
                let sign = if t % 2 == 0 { 1.0 } else { -1.0 };
                sign * (1.0 + 0.1 * (t % 5) as f64)
            })
            .collect();
        let df = dickey_fuller(&series).unwrap();
        assert!(df.beta < -1.0);
        assert!(df.stationary, "t = {}", df.t_stat);
        assert_eq!(df.observations, 99);
    }

    #[test]
    fn trending_spread_is_not_stationary() {
        let series: Vec<f64> = (0..100).map(|t| (t * t) as f64 / 100.0).collect();
        let df = dickey_fuller(&series).unwrap();
        assert!(df.t_stat > DF_CRITICAL_5PCT);
        assert!(!df.stationary);
    }

    #[test]
    fn linear_drift_has_zero_beta() {
        let series: Vec<f64> = (0..20).map(f64::from).collect();
        let df = dickey_fuller(&series).unwrap();
        assert_approx(df.beta, 0.0, 1e-12);
        assert_eq!(df.t_stat, 0.0);
        assert!(!df.stationary);
    }

    #[test]
    fn dickey_fuller_needs_four_points() {
        assert_eq!(
            dickey_fuller(&[1.0, 2.0, 1.0]),
            Err(HedgeError::TooFewObservations { need: 4, got: 3 })
        );
    }

    #[test]
    fn spread_series_applies_hedge_ratio() {
        let spread = spread_series(&[10.0, 20.0, 30.0], &[12.0, 21.0], 1.1);
        assert_eq!(spread.len(), 2);
        assert_approx(spread[0], 1.0, 1e-12);
        assert_approx(spread[1], -1.0, 1e-12);
    }

    #[test]
    fn cointegrated_pair_passes_analysis() {
        let x: Vec<f64> = (0..120)
            .map(|t| 50.0 + 0.2 * f64::from(t) + (f64::from(t) * 0.3).sin())
            .collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 1.055 * v + 2.0 + if i % 2 == 0 { 0.05 } else { -0.05 })
            .collect();
        let report = analyze_pair(&x, &y).unwrap();
        assert!((report.fit.slope - 1.055).abs() < 0.01);
        assert!(report.dickey_fuller.stationary);
        assert_approx(report.spread_mean, report.fit.intercept, 1e-9);
    }
}
