//! Buy-and-hold baseline: go long once per instrument, then never trade again.

use std::collections::HashSet;

use super::{Strategy, StrategyError};
use crate::data::BarSource;
use crate::domain::{Event, SignalDirection, SignalEvent};
use crate::engine::EventQueue;

/// Emits one `Long` signal per instrument, on the first tick where that
/// instrument has a bar.
#[derive(Debug, Default)]
pub struct BuyAndHold {
    bought: HashSet<String>,
}

impl BuyAndHold {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the entry signal for `symbol` has been emitted.
    pub fn has_bought(&self, symbol: &str) -> bool {
        self.bought.contains(symbol)
    }
}

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn on_market_advance(
        &mut self,
        bars: &dyn BarSource,
        events: &mut EventQueue,
    ) -> Result<(), StrategyError> {
        for symbol in bars.symbols() {
            if self.bought.contains(symbol) {
                continue;
            }
            if let Some(bar) = bars.latest_bar(symbol)? {
                events.push(Event::Signal(SignalEvent::new(
                    symbol.clone(),
                    bar.date,
                    SignalDirection::Long,
                )));
                self.bought.insert(symbol.clone());
            }
        }
        Ok(())
    }
}
