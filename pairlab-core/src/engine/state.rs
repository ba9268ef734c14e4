//! Run counters and the result of a complete backtest.

use serde::{Deserialize, Serialize};

use crate::domain::FillEvent;
use crate::portfolio::HoldingsSnapshot;

/// Event counts accumulated while the loop runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCounters {
    /// Ticks processed (one per `MarketAdvance`).
    pub ticks: usize,
    pub signals: usize,
    pub orders: usize,
    pub fills: usize,
}

/// Result of a complete backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub strategy: String,
    pub initial_capital: f64,
    /// Total from the last recorded snapshot.
    ///
    /// Fills applied after the last mark-to-market are reflected in
    /// `final_cash` but not here.
    pub final_total: f64,
    /// Live cash balance after the last fill.
    pub final_cash: f64,
    /// One snapshot per tick.
    pub snapshots: Vec<HoldingsSnapshot>,
    /// Every fill, in execution order, with its price filled in.
    pub fills: Vec<FillEvent>,
    /// Spread per tick where both legs were priced (pairs strategies only).
    pub spread_history: Vec<f64>,
    pub counters: EngineCounters,
}

impl RunResult {
    /// Snapshot totals in tick order.
    pub fn equity_curve(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.total).collect()
    }

    /// Commission paid across all fills.
    pub fn total_commission(&self) -> f64 {
        self.fills.iter().map(|f| f.commission).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderSide;
    use chrono::NaiveDate;

    fn result() -> RunResult {
        let day = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        let mut snapshot = HoldingsSnapshot::initial(&["A".to_string()], 1_000.0);
        snapshot.date = Some(day);
        RunResult {
            strategy: "buy_and_hold".into(),
            initial_capital: 1_000.0,
            final_total: 1_000.0,
            final_cash: 898.7,
            snapshots: vec![snapshot.clone(), snapshot],
            fills: vec![FillEvent::new(day, "A", "SIM", 100.0, OrderSide::Buy, Some(1.0), None)],
            spread_history: Vec::new(),
            counters: EngineCounters {
                ticks: 2,
                signals: 1,
                orders: 1,
                fills: 1,
            },
        }
    }

    #[test]
    fn equity_curve_follows_snapshots() {
        assert_eq!(result().equity_curve(), vec![1_000.0, 1_000.0]);
    }

    #[test]
    fn total_commission_sums_fills() {
        assert_eq!(result().total_commission(), 1.30);
    }

    #[test]
    fn serializes_to_json() {
        let json = serde_json::to_string(&result()).unwrap();
        assert!(json.contains("\"strategy\":\"buy_and_hold\""));
        let back: RunResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.counters.fills, 1);
    }
}
