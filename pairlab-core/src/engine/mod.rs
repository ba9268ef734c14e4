//! Backtesting engine — the single-threaded event loop.
//!
//! Each tick:
//! 1. Advance the bar source (pushes one `MarketAdvance`)
//! 2. Drain the queue in FIFO order until empty:
//!    - `MarketAdvance` → strategy, then ledger mark-to-market
//!    - `Signal` → ledger sizes an order
//!    - `Order` → execution produces a fill
//!    - `Fill` → price backfilled if missing, then applied to the ledger
//!
//! The loop ends when the bar source reports no more data.

pub mod queue;
pub mod state;

pub use queue::EventQueue;
pub use state::{EngineCounters, RunResult};

use thiserror::Error;
use tracing::{debug, info};

use crate::data::{BarSource, DataError};
use crate::domain::{Event, FillEvent};
use crate::execution::ExecutionHandler;
use crate::portfolio::{LedgerError, Portfolio};
use crate::strategy::{Strategy, StrategyError};

/// Errors that abort a run.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("no market data for '{0}' to price the fill")]
    NoMarketData(String),

    #[error("ledger instrument '{0}' is not tracked by the bar source")]
    UntrackedInstrument(String),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Wires a bar source, strategy, ledger, and execution handler together.
pub struct Engine {
    source: Box<dyn BarSource>,
    strategy: Box<dyn Strategy>,
    portfolio: Portfolio,
    execution: Box<dyn ExecutionHandler>,
    queue: EventQueue,
    fills: Vec<FillEvent>,
    counters: EngineCounters,
}

impl Engine {
    /// Every ledger instrument must be tracked by the source.
    pub fn new(
        source: Box<dyn BarSource>,
        strategy: Box<dyn Strategy>,
        portfolio: Portfolio,
        execution: Box<dyn ExecutionHandler>,
    ) -> Result<Self, EngineError> {
        for symbol in portfolio.symbols() {
            if !source.symbols().contains(symbol) {
                return Err(EngineError::UntrackedInstrument(symbol.clone()));
            }
        }
        Ok(Self {
            source,
            strategy,
            portfolio,
            execution,
            queue: EventQueue::new(),
            fills: Vec::new(),
            counters: EngineCounters::default(),
        })
    }

    /// Run until the bar source is exhausted.
    pub fn run(mut self) -> Result<RunResult, EngineError> {
        info!(
            strategy = self.strategy.name(),
            instruments = self.source.symbols().len(),
            initial_capital = self.portfolio.initial_capital(),
            "backtest started"
        );

        while self.step()? {}

        info!(
            ticks = self.counters.ticks,
            fills = self.counters.fills,
            final_total = self.portfolio.total(),
            "backtest complete"
        );

        Ok(RunResult {
            strategy: self.strategy.name().to_string(),
            initial_capital: self.portfolio.initial_capital(),
            final_total: self.portfolio.total(),
            final_cash: self.portfolio.cash(),
            snapshots: self.portfolio.history().to_vec(),
            fills: self.fills,
            spread_history: self.strategy.spread_history().to_vec(),
            counters: self.counters,
        })
    }

    /// Advance one tick and drain its event cascade.
    ///
    /// Returns `false` once the source is exhausted.
    pub fn step(&mut self) -> Result<bool, EngineError> {
        if !self.source.advance(&mut self.queue) {
            return Ok(false);
        }
        self.counters.ticks += 1;

        while let Some(event) = self.queue.pop() {
            self.dispatch(event)?;
        }
        Ok(true)
    }

    fn dispatch(&mut self, event: Event) -> Result<(), EngineError> {
        debug!(event = event.kind(), pending = self.queue.len(), "dispatch");
        match event {
            Event::MarketAdvance => {
                self.strategy
                    .on_market_advance(self.source.as_ref(), &mut self.queue)?;
                self.portfolio.update_on_advance(self.source.as_ref())?;
            }
            Event::Signal(signal) => {
                self.counters.signals += 1;
                let order = self.portfolio.on_signal(&signal)?;
                self.queue.push(Event::Order(order));
            }
            Event::Order(order) => {
                self.counters.orders += 1;
                let bar = self
                    .source
                    .latest_bar(&order.symbol)?
                    .ok_or_else(|| EngineError::NoMarketData(order.symbol.clone()))?;
                let fill = self.execution.execute(&order, bar.date);
                self.queue.push(Event::Fill(fill));
            }
            Event::Fill(mut fill) => {
                if fill.price.is_none() {
                    let bar = self
                        .source
                        .latest_bar(&fill.symbol)?
                        .ok_or_else(|| EngineError::NoMarketData(fill.symbol.clone()))?;
                    fill.price = Some(bar.close);
                }
                self.portfolio.on_fill(&fill)?;
                debug!(
                    symbol = %fill.symbol,
                    side = ?fill.side,
                    quantity = fill.quantity,
                    price = fill.price,
                    "trade executed"
                );
                self.counters.fills += 1;
                self.fills.push(fill);
            }
        }
        Ok(())
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    pub fn counters(&self) -> &EngineCounters {
        &self.counters
    }

    pub fn fills(&self) -> &[FillEvent] {
        &self.fills
    }
}
