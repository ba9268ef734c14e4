//! Performance metrics — pure functions over the holdings-total curve.
//!
//! The curve starts at the initial capital and then carries one total per
//! tick, so the first return is measured against the money put in.

use serde::{Deserialize, Serialize};

use pairlab_core::engine::RunResult;
use pairlab_core::stats::{mean, population_std};

/// Bars per year for annualisation.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub max_drawdown: f64,
    pub final_equity: f64,
    pub fill_count: usize,
    pub total_commission: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from a finished run.
    pub fn compute(result: &RunResult) -> Self {
        let curve = equity_curve(result);
        let bars = curve.len().saturating_sub(1);
        Self {
            total_return: total_return(&curve),
            cagr: cagr(&curve, bars),
            sharpe: sharpe_ratio(&curve),
            sortino: sortino_ratio(&curve),
            calmar: calmar_ratio(&curve, bars),
            max_drawdown: max_drawdown(&curve),
            final_equity: result.final_total,
            fill_count: result.fills.len(),
            total_commission: result.total_commission(),
        }
    }
}

/// Initial capital followed by every snapshot total.
pub fn equity_curve(result: &RunResult) -> Vec<f64> {
    std::iter::once(result.initial_capital)
        .chain(result.snapshots.iter().map(|s| s.total))
        .collect()
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&last)) if equity_curve.len() >= 2 && initial > 0.0 => {
            (last - initial) / initial
        }
        _ => 0.0,
    }
}

/// Compound annual growth rate over `bars` periods of 1/252 year.
pub fn cagr(equity_curve: &[f64], bars: usize) -> f64 {
    let (Some(&initial), Some(&last)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    if bars == 0 || initial <= 0.0 || last <= 0.0 {
        return 0.0;
    }
    let years = bars as f64 / TRADING_DAYS_PER_YEAR;
    (last / initial).powf(1.0 / years) - 1.0
}

/// Annualised Sharpe ratio of per-bar returns, zero risk-free rate.
///
/// Returns 0.0 if variance is zero or there are fewer than two returns.
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns = bar_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = population_std(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean(&returns) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualised Sortino ratio (downside deviation only).
pub fn sortino_ratio(equity_curve: &[f64]) -> f64 {
    let returns = bar_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let downside: f64 = returns.iter().filter(|r| **r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean(&returns) / downside_std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// CAGR / |max drawdown|; 0.0 without a drawdown or with non-positive CAGR.
pub fn calmar_ratio(equity_curve: &[f64], bars: usize) -> f64 {
    let c = cagr(equity_curve, bars);
    let dd = max_drawdown(equity_curve);
    if dd >= 0.0 || c <= 0.0 {
        return 0.0;
    }
    c / dd.abs()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Simple per-bar returns. Bars following a non-positive value are skipped.
pub fn bar_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn total_return_basic() {
        assert!(approx(total_return(&[100.0, 110.0, 121.0]), 0.21));
        assert_eq!(total_return(&[100.0]), 0.0);
        assert_eq!(total_return(&[]), 0.0);
        assert_eq!(total_return(&[0.0, 10.0]), 0.0);
    }

    #[test]
    fn cagr_one_year_doubles() {
        let mut curve = vec![100.0; 252];
        curve.push(200.0);
        assert!(approx(cagr(&curve, 252), 1.0));
        assert_eq!(cagr(&curve, 0), 0.0);
    }

    #[test]
    fn max_drawdown_finds_deepest_trough() {
        let curve = [100.0, 120.0, 90.0, 130.0, 117.0];
        assert!(approx(max_drawdown(&curve), -0.25));
        assert_eq!(max_drawdown(&[100.0, 101.0, 102.0]), 0.0);
    }

    #[test]
    fn sharpe_zero_for_flat_curve() {
        assert_eq!(sharpe_ratio(&[100.0; 10]), 0.0);
        assert_eq!(sortino_ratio(&[100.0; 10]), 0.0);
    }

    #[test]
    fn sharpe_positive_for_noisy_uptrend() {
        let curve: Vec<f64> = (0..50)
            .map(|i| 100.0 + i as f64 + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        assert!(sharpe_ratio(&curve) > 0.0);
        assert!(sortino_ratio(&curve) > 0.0);
    }

    #[test]
    fn calmar_requires_drawdown() {
        assert_eq!(calmar_ratio(&[100.0, 110.0], 1), 0.0);
        let curve = [100.0, 120.0, 110.0, 130.0];
        let expected = cagr(&curve, 3) / (10.0 / 120.0);
        assert!(approx(calmar_ratio(&curve, 3), expected));
    }

    #[test]
    fn bar_returns_skip_non_positive_base() {
        let returns = bar_returns(&[0.0, 100.0, 110.0]);
        assert_eq!(returns.len(), 1);
        assert!(approx(returns[0], 0.1));
    }
}
