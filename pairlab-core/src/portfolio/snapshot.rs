use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Holdings at one tick: per-instrument market value, cash, and total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingsSnapshot {
    /// Latest bar date seen when the snapshot was taken.
    pub date: Option<NaiveDate>,
    /// `(symbol, position * last close)` in instrument order.
    pub market_values: Vec<(String, f64)>,
    pub cash: f64,
    pub total: f64,
}

impl HoldingsSnapshot {
    /// Flat holdings: every instrument at zero, total equal to cash.
    pub fn initial(symbols: &[String], cash: f64) -> Self {
        Self {
            date: None,
            market_values: symbols.iter().map(|s| (s.clone(), 0.0)).collect(),
            cash,
            total: cash,
        }
    }

    pub fn value_of(&self, symbol: &str) -> Option<f64> {
        self.market_values
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, v)| *v)
    }

    /// Sum of per-instrument market values.
    pub fn positions_value(&self) -> f64 {
        self.market_values.iter().map(|(_, v)| v).sum()
    }

    /// Whether `total == cash + positions_value` within `epsilon`.
    pub fn is_consistent(&self, epsilon: f64) -> bool {
        (self.total - (self.cash + self.positions_value())).abs() <= epsilon
    }
}
