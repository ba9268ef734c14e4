//! Bar sources — replay time-ordered bars one tick at a time.
//!
//! A source tracks an ordered instrument list and, per instrument, the bars
//! "seen" so far. `advance()` reveals the next bar of every instrument that
//! still has data and announces the tick with a single `MarketAdvance` event.

pub mod historic;

pub use historic::HistoricBarSource;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::Bar;
use crate::engine::EventQueue;

/// Errors from bar source construction and lookup.
#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("unknown instrument '{0}'")]
    UnknownInstrument(String),

    #[error("instrument '{0}' listed more than once")]
    DuplicateInstrument(String),

    #[error("bars for '{symbol}' are not time-ordered: {previous} followed by {next}")]
    OutOfOrder {
        symbol: String,
        previous: NaiveDate,
        next: NaiveDate,
    },

    #[error("bar at {date} belongs to '{found}', expected '{expected}'")]
    SymbolMismatch {
        expected: String,
        found: String,
        date: NaiveDate,
    },
}

/// Trait for bar sources.
///
/// Exhaustion is not an error: `advance` returns `false` once no instrument
/// has unseen bars. Asking for an instrument the source does not track is a
/// configuration error and fails loudly.
pub trait BarSource {
    /// Tracked instruments, in construction order.
    fn symbols(&self) -> &[String];

    /// Reveal the next bar of every instrument that still has data.
    ///
    /// Pushes exactly one `MarketAdvance` and returns `true` if at least one
    /// bar was revealed; otherwise pushes nothing and returns `false`.
    fn advance(&mut self, events: &mut EventQueue) -> bool;

    /// Most recently revealed bar for `symbol`, `Ok(None)` before its first bar.
    fn latest_bar(&self, symbol: &str) -> Result<Option<&Bar>, DataError>;

    /// Whether any instrument still has unseen bars.
    fn has_remaining(&self) -> bool;

    /// Latest date revealed across all instruments.
    fn current_date(&self) -> Option<NaiveDate> {
        self.symbols()
            .iter()
            .filter_map(|s| self.latest_bar(s).ok().flatten())
            .map(|bar| bar.date)
            .max()
    }
}
