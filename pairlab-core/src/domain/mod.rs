//! Domain types for PairLab

pub mod bar;
pub mod event;

pub use bar::Bar;
pub use event::{
    Event, FillEvent, OrderEvent, OrderSide, OrderType, SignalDirection, SignalEvent,
};

/// Symbol type alias
pub type Symbol = String;
