//! Portfolio ledger — positions, cash, and the holdings history.
//!
//! The ledger turns signals into fixed-size market orders, applies fills to
//! positions and cash, and marks every instrument to market once per tick.
//! The accounting identity must hold at every recorded snapshot:
//! `total == cash + sum(position * last close)`.

pub mod snapshot;

pub use snapshot::HoldingsSnapshot;

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::data::{BarSource, DataError};
use crate::domain::{FillEvent, OrderEvent, OrderSide, OrderType, SignalEvent};

/// Units per order under the fixed-size sizing policy.
pub const DEFAULT_ORDER_QUANTITY: f64 = 100.0;

/// Errors from ledger construction and updates.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("unknown instrument '{0}'")]
    UnknownInstrument(String),

    #[error("fill for '{0}' has no price")]
    UnpricedFill(String),

    #[error("initial capital must be non-negative, got {0}")]
    InvalidCapital(f64),

    #[error("order quantity must be positive, got {0}")]
    InvalidQuantity(f64),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Position and cash ledger for a fixed instrument list.
#[derive(Debug, Clone)]
pub struct Portfolio {
    symbols: Vec<String>,
    initial_capital: f64,
    cash: f64,
    positions: HashMap<String, f64>,
    order_quantity: f64,
    total_commission: f64,
    current: HoldingsSnapshot,
    history: Vec<HoldingsSnapshot>,
}

impl Portfolio {
    pub fn new(symbols: Vec<String>, initial_capital: f64) -> Result<Self, LedgerError> {
        Self::with_order_quantity(symbols, initial_capital, DEFAULT_ORDER_QUANTITY)
    }

    /// Ledger with a custom fixed order size.
    pub fn with_order_quantity(
        symbols: Vec<String>,
        initial_capital: f64,
        order_quantity: f64,
    ) -> Result<Self, LedgerError> {
        if !(initial_capital.is_finite() && initial_capital >= 0.0) {
            return Err(LedgerError::InvalidCapital(initial_capital));
        }
        if !(order_quantity.is_finite() && order_quantity > 0.0) {
            return Err(LedgerError::InvalidQuantity(order_quantity));
        }
        let positions = symbols.iter().map(|s| (s.clone(), 0.0)).collect();
        let current = HoldingsSnapshot::initial(&symbols, initial_capital);
        Ok(Self {
            symbols,
            initial_capital,
            cash: initial_capital,
            positions,
            order_quantity,
            total_commission: 0.0,
            current,
            history: Vec::new(),
        })
    }

    /// Mark every instrument to market and append a snapshot.
    ///
    /// Runs once per `MarketAdvance`, after the strategy has seen the tick.
    /// Instruments without a position or without a price contribute zero.
    pub fn update_on_advance(&mut self, bars: &dyn BarSource) -> Result<(), LedgerError> {
        let mut snapshot = HoldingsSnapshot::initial(&self.symbols, self.cash);
        snapshot.date = bars.current_date();

        for (i, symbol) in self.symbols.iter().enumerate() {
            let quantity = self.positions[symbol];
            if quantity == 0.0 {
                continue;
            }
            if let Some(bar) = bars.latest_bar(symbol)? {
                let value = quantity * bar.close;
                snapshot.market_values[i].1 = value;
                snapshot.total += value;
            }
        }

        self.current = snapshot.clone();
        self.history.push(snapshot);
        Ok(())
    }

    /// Size a signal into a market order: `Long` buys, `Short` sells.
    ///
    /// Every order carries the fixed quantity regardless of cash or exposure.
    pub fn on_signal(&self, signal: &SignalEvent) -> Result<OrderEvent, LedgerError> {
        self.require_known(&signal.symbol)?;
        Ok(OrderEvent {
            symbol: signal.symbol.clone(),
            order_type: OrderType::Market,
            quantity: self.order_quantity,
            side: OrderSide::from(signal.direction),
        })
    }

    /// Apply a priced fill to the position and cash.
    ///
    /// A buy costs `price * quantity + commission`; a sell returns
    /// `price * quantity - commission`.
    pub fn on_fill(&mut self, fill: &FillEvent) -> Result<(), LedgerError> {
        self.require_known(&fill.symbol)?;
        let price = fill
            .price
            .ok_or_else(|| LedgerError::UnpricedFill(fill.symbol.clone()))?;

        let signed = fill.signed_quantity();
        if let Some(position) = self.positions.get_mut(&fill.symbol) {
            *position += signed;
        }
        self.cash -= signed * price + fill.commission;
        self.total_commission += fill.commission;

        debug!(
            symbol = %fill.symbol,
            side = ?fill.side,
            quantity = fill.quantity,
            price,
            commission = fill.commission,
            cash = self.cash,
            "fill applied"
        );
        Ok(())
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    /// Live cash balance, including fills applied since the last snapshot.
    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Signed position in `symbol`.
    pub fn position(&self, symbol: &str) -> Result<f64, LedgerError> {
        self.positions
            .get(symbol)
            .copied()
            .ok_or_else(|| LedgerError::UnknownInstrument(symbol.to_string()))
    }

    pub fn order_quantity(&self) -> f64 {
        self.order_quantity
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }

    /// Most recent snapshot (the initial one before the first tick).
    pub fn current_holdings(&self) -> &HoldingsSnapshot {
        &self.current
    }

    /// Total holdings value as of the most recent snapshot.
    pub fn total(&self) -> f64 {
        self.current.total
    }

    /// Snapshot per processed `MarketAdvance`, in order.
    pub fn history(&self) -> &[HoldingsSnapshot] {
        &self.history
    }

    fn require_known(&self, symbol: &str) -> Result<(), LedgerError> {
        if self.positions.contains_key(symbol) {
            Ok(())
        } else {
            Err(LedgerError::UnknownInstrument(symbol.to_string()))
        }
    }
}
