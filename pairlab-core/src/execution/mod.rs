//! Execution — turns orders into fills.
//!
//! The engine relies on one guarantee: every order produces exactly one fill,
//! on the same tick, with the order's symbol, side, and quantity. A venue may
//! price the fill itself or leave `price` empty for the engine to backfill
//! from the latest close.

use chrono::NaiveDate;

use crate::domain::{FillEvent, OrderEvent};

/// Default venue label for simulated fills.
pub const SIMULATED_VENUE: &str = "SIM";

/// Trait for execution handlers.
pub trait ExecutionHandler {
    /// Venue label stamped on fills.
    fn venue(&self) -> &str;

    /// Execute `order` on `date`, producing exactly one fill.
    fn execute(&mut self, order: &OrderEvent, date: NaiveDate) -> FillEvent;
}

/// Fills every order in full, unpriced, with an optional flat commission.
///
/// With `commission: None` each fill falls back to the default commission
/// schedule `max(1.30, 0.01 × quantity)`.
#[derive(Debug, Clone)]
pub struct SimulatedExecution {
    venue: String,
    commission: Option<f64>,
}

impl Default for SimulatedExecution {
    fn default() -> Self {
        Self {
            venue: SIMULATED_VENUE.to_string(),
            commission: None,
        }
    }
}

impl SimulatedExecution {
    pub fn new(venue: impl Into<String>) -> Self {
        Self {
            venue: venue.into(),
            commission: None,
        }
    }

    /// Charge a flat `commission` per fill instead of the default schedule.
    pub fn with_commission(mut self, commission: f64) -> Self {
        self.commission = Some(commission);
        self
    }
}

impl ExecutionHandler for SimulatedExecution {
    fn venue(&self) -> &str {
        &self.venue
    }

    fn execute(&mut self, order: &OrderEvent, date: NaiveDate) -> FillEvent {
        FillEvent::new(
            date,
            order.symbol.clone(),
            self.venue.clone(),
            order.quantity,
            order.side,
            None,
            self.commission,
        )
    }
}
