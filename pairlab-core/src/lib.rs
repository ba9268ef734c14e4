//! PairLab Core — event-driven backtesting kernel.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars and the four event kinds)
//! - Bar sources that replay history one tick at a time
//! - Strategies (buy-and-hold, pairs statistical arbitrage)
//! - Portfolio ledger with per-tick holdings snapshots
//! - Simulated execution
//! - The FIFO event queue and the engine loop that drains it
//! - Offline hedge-ratio research helpers

pub mod data;
pub mod domain;
pub mod engine;
pub mod execution;
pub mod hedge;
pub mod portfolio;
pub mod stats;
pub mod strategy;

pub use engine::{Engine, EngineError, RunResult};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: value types crossing thread boundaries are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Event>();
        require_sync::<domain::Event>();
        require_send::<domain::FillEvent>();
        require_sync::<domain::FillEvent>();

        require_send::<data::HistoricBarSource>();
        require_sync::<data::HistoricBarSource>();
        require_send::<portfolio::Portfolio>();
        require_sync::<portfolio::Portfolio>();
        require_send::<portfolio::HoldingsSnapshot>();
        require_sync::<portfolio::HoldingsSnapshot>();

        require_send::<strategy::BuyAndHold>();
        require_sync::<strategy::BuyAndHold>();
        require_send::<strategy::PairsStatArb>();
        require_sync::<strategy::PairsStatArb>();

        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();
        require_send::<engine::EventQueue>();
        require_sync::<engine::EventQueue>();
        require_send::<EngineError>();
        require_sync::<EngineError>();
    }

    /// Strategies decide from market data alone; the trait has no ledger parameter.
    #[test]
    fn strategy_trait_has_no_portfolio_parameter() {
        fn _check_trait_object_builds(
            strategy: &mut dyn strategy::Strategy,
            bars: &dyn data::BarSource,
            queue: &mut engine::EventQueue,
        ) -> Result<(), strategy::StrategyError> {
            strategy.on_market_advance(bars, queue)
        }
    }
}
