//! Events exchanged between pipeline stages.
//!
//! Each event is created by exactly one stage and consumed by exactly one
//! downstream stage within the same tick:
//!
//! - `MarketAdvance`: bar source → strategy + ledger
//! - `Signal`: strategy → ledger
//! - `Order`: ledger → execution
//! - `Fill`: execution → ledger
//!
//! Events are never mutated after creation, with one exception: the engine
//! may set `FillEvent::price` when the execution stage left it empty.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Commission floor applied when the execution stage supplies none.
pub const MIN_COMMISSION: f64 = 1.30;

/// Per-unit commission applied when the execution stage supplies none.
pub const COMMISSION_PER_UNIT: f64 = 0.01;

/// Directional intent of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalDirection {
    Long,
    Short,
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// +1.0 for buys, -1.0 for sells.
    pub fn sign(self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }
}

impl From<SignalDirection> for OrderSide {
    fn from(direction: SignalDirection) -> Self {
        match direction {
            SignalDirection::Long => Self::Buy,
            SignalDirection::Short => Self::Sell,
        }
    }
}

/// Order kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

/// A trade signal emitted by a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub symbol: String,
    pub date: NaiveDate,
    pub direction: SignalDirection,
}

impl SignalEvent {
    pub fn new(symbol: impl Into<String>, date: NaiveDate, direction: SignalDirection) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            direction,
        }
    }
}

/// An order request produced by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub symbol: String,
    pub order_type: OrderType,
    pub quantity: f64,
    pub side: OrderSide,
}

/// A completed (simulated) execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub date: NaiveDate,
    pub symbol: String,
    pub venue: String,
    pub quantity: f64,
    pub side: OrderSide,
    /// Execution price. `None` until priced by the venue or backfilled by the engine.
    pub price: Option<f64>,
    pub commission: f64,
}

impl FillEvent {
    /// Build a fill; a missing commission resolves to `default_commission(quantity)`.
    pub fn new(
        date: NaiveDate,
        symbol: impl Into<String>,
        venue: impl Into<String>,
        quantity: f64,
        side: OrderSide,
        price: Option<f64>,
        commission: Option<f64>,
    ) -> Self {
        Self {
            date,
            symbol: symbol.into(),
            venue: venue.into(),
            quantity,
            side,
            price,
            commission: commission.unwrap_or_else(|| default_commission(quantity)),
        }
    }

    /// Signed quantity: positive for buys, negative for sells.
    pub fn signed_quantity(&self) -> f64 {
        self.side.sign() * self.quantity
    }
}

/// Broker-style minimum commission: `max(1.30, 0.01 × quantity)`.
pub fn default_commission(quantity: f64) -> f64 {
    MIN_COMMISSION.max(COMMISSION_PER_UNIT * quantity)
}

/// Tagged event envelope carried by the engine's queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    MarketAdvance,
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

impl Event {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MarketAdvance => "market_advance",
            Self::Signal(_) => "signal",
            Self::Order(_) => "order",
            Self::Fill(_) => "fill",
        }
    }
}
