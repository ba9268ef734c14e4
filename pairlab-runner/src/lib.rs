//! PairLab Runner — backtest orchestration, data loading, metrics, export.
//!
//! This crate builds on `pairlab-core` to provide:
//! - TOML configuration with a content-addressed run id
//! - Bar loading from CSV with a seeded synthetic fallback
//! - Single-backtest runner with metrics
//! - JSON and CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, RunId, StrategySection};
pub use data_loader::{load_bars, DataOrigin, LoadError, LoadOptions, LoadedData, PairLink};
pub use export::save_artifacts;
pub use metrics::PerformanceMetrics;
pub use runner::{run_backtest_from_data, run_single_backtest, BacktestResult, RunError};
