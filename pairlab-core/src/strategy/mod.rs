//! Strategies — react to market advances and emit trade signals.
//!
//! A strategy reads the latest bars from the `BarSource` and pushes
//! `Signal` events into the queue. It never sees the ledger: sizing and
//! order generation happen downstream.

pub mod buy_and_hold;
pub mod pairs;

pub use buy_and_hold::BuyAndHold;
pub use pairs::{PairsConfig, PairsStatArb};

use thiserror::Error;

use crate::data::{BarSource, DataError};
use crate::engine::EventQueue;

/// Errors from strategy construction and evaluation.
#[derive(Debug, Error, PartialEq)]
pub enum StrategyError {
    #[error("invalid strategy parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Trait for strategies.
pub trait Strategy {
    /// Human-readable name (e.g., "pairs_stat_arb").
    fn name(&self) -> &str;

    /// React to one `MarketAdvance`. Signals go into `events`.
    ///
    /// Missing bars and warm-up windows are silent no-ops. Errors are reserved
    /// for configuration mistakes such as an instrument the source does not track.
    fn on_market_advance(
        &mut self,
        bars: &dyn BarSource,
        events: &mut EventQueue,
    ) -> Result<(), StrategyError>;

    /// Spread values computed so far; empty for strategies without a spread.
    fn spread_history(&self) -> &[f64] {
        &[]
    }
}
