//! Backtest runner — wires config, loaded bars, engine, and metrics.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads bars per the config, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded bars. No I/O.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use pairlab_core::data::{DataError, HistoricBarSource};
use pairlab_core::engine::{Engine, EngineError, RunResult};
use pairlab_core::execution::SimulatedExecution;
use pairlab_core::portfolio::{LedgerError, Portfolio};
use pairlab_core::strategy::{BuyAndHold, PairsStatArb, Strategy, StrategyError};

use crate::config::{BacktestConfig, ConfigError, RunId, StrategySection};
use crate::data_loader::{load_bars, DataOrigin, LoadError, LoadOptions, LoadedData, PairLink};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("bar source error: {0}")]
    Source(#[from] DataError),
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: BacktestConfig,
    pub metrics: PerformanceMetrics,
    pub run: RunResult,
    pub symbols: Vec<String>,
    pub origins: Vec<(String, DataOrigin)>,
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn final_total(&self) -> f64 {
        self.run.final_total
    }

    pub fn total_return(&self) -> f64 {
        self.metrics.total_return
    }
}

/// Loader options derived from the `[data]` and `[strategy]` sections.
pub fn load_options(config: &BacktestConfig) -> LoadOptions {
    let pair = match &config.strategy {
        StrategySection::Pairs { x, y, hedge_ratio, .. } => Some(PairLink {
            x: x.clone(),
            y: y.clone(),
            hedge_ratio: *hedge_ratio,
        }),
        StrategySection::BuyAndHold => None,
    };
    LoadOptions {
        dir: config.data.dir.clone(),
        synthetic: config.data.synthetic,
        synthetic_bars: config.data.synthetic_bars,
        seed: config.data.seed,
        synthetic_start: config.data.synthetic_start,
        pair,
    }
}

/// Instantiate the configured strategy.
pub fn build_strategy(section: &StrategySection) -> Result<Box<dyn Strategy>, StrategyError> {
    match section {
        StrategySection::BuyAndHold => Ok(Box::new(BuyAndHold::new())),
        StrategySection::Pairs { x, y, .. } => {
            let params = section.pairs_config().unwrap_or_default();
            Ok(Box::new(PairsStatArb::new(x.clone(), y.clone(), params)?))
        }
    }
}

/// Run a single backtest from a config, loading bars from disk or synthetic.
pub fn run_single_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let loaded = load_bars(&config.data.symbols, &load_options(config))?;
    run_backtest_from_data(config, loaded)
}

/// Run a backtest with pre-loaded bars — no I/O.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    loaded: LoadedData,
) -> Result<BacktestResult, RunError> {
    let run_id = config.run_id()?;
    let symbols: Vec<String> = loaded.feeds.iter().map(|(s, _)| s.clone()).collect();

    info!(
        run_id = %run_id,
        strategy = config.strategy.name(),
        symbols = ?symbols,
        synthetic = loaded.has_synthetic,
        "starting backtest"
    );

    let source = HistoricBarSource::new(loaded.feeds)?;
    let strategy = build_strategy(&config.strategy)?;
    let portfolio = Portfolio::with_order_quantity(
        symbols.clone(),
        config.backtest.initial_capital,
        config.backtest.order_quantity,
    )?;
    let mut execution = SimulatedExecution::new(config.backtest.venue.clone());
    if let Some(commission) = config.backtest.commission {
        execution = execution.with_commission(commission);
    }

    let run = Engine::new(Box::new(source), strategy, portfolio, Box::new(execution))?.run()?;
    let metrics = PerformanceMetrics::compute(&run);

    info!(
        run_id = %run_id,
        final_total = run.final_total,
        total_return = metrics.total_return,
        fills = metrics.fill_count,
        "backtest finished"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        metrics,
        run,
        symbols,
        origins: loaded.origins,
        dataset_hash: loaded.dataset_hash,
        has_synthetic: loaded.has_synthetic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pairlab_core::domain::Bar;

    fn buy_and_hold_config() -> BacktestConfig {
        BacktestConfig::from_toml(
            r#"
            [data]
            symbols = ["ABBV"]

            [strategy]
            type = "buy_and_hold"
            "#,
        )
        .unwrap()
    }

    fn loaded(closes: &[f64]) -> LoadedData {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::from_close("ABBV", start + chrono::Duration::days(i as i64), c))
            .collect();
        LoadedData {
            feeds: vec![("ABBV".into(), bars)],
            origins: vec![("ABBV".into(), DataOrigin::Csv)],
            dataset_hash: "test".into(),
            has_synthetic: false,
        }
    }

    #[test]
    fn runs_buy_and_hold_from_data() {
        let config = buy_and_hold_config();
        let result = run_backtest_from_data(&config, loaded(&[70.0, 75.0])).unwrap();

        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.run_id, config.run_id().unwrap());
        assert_eq!(result.run.fills.len(), 1);
        let expected = 100_000.0 - 7_001.30 + 7_500.0;
        assert!((result.final_total() - expected).abs() < 1e-6);
        assert!((result.total_return() - (expected / 100_000.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn flat_commission_from_config_is_charged() {
        let mut config = buy_and_hold_config();
        config.backtest.commission = Some(5.0);
        config.backtest.venue = "ARCA".into();
        let result = run_backtest_from_data(&config, loaded(&[70.0])).unwrap();
        assert_eq!(result.run.fills[0].commission, 5.0);
        assert_eq!(result.run.fills[0].venue, "ARCA");
        assert_eq!(result.metrics.total_commission, 5.0);
    }

    #[test]
    fn builds_configured_strategies() {
        assert_eq!(
            build_strategy(&StrategySection::BuyAndHold).unwrap().name(),
            "buy_and_hold"
        );
        let pairs = StrategySection::Pairs {
            x: "XOM".into(),
            y: "CVX".into(),
            hedge_ratio: 1.055,
            window: 30,
            entry_z: 2.0,
            exit_z: 0.5,
        };
        assert_eq!(build_strategy(&pairs).unwrap().name(), "pairs_stat_arb");

        let same_legs = StrategySection::Pairs {
            x: "XOM".into(),
            y: "XOM".into(),
            hedge_ratio: 1.0,
            window: 30,
            entry_z: 2.0,
            exit_z: 0.5,
        };
        assert!(build_strategy(&same_legs).is_err());
    }

    #[test]
    fn out_of_order_bars_are_rejected() {
        let config = buy_and_hold_config();
        let mut data = loaded(&[1.0, 2.0]);
        data.feeds[0].1.reverse();
        assert!(matches!(
            run_backtest_from_data(&config, data),
            Err(RunError::Source(DataError::OutOfOrder { .. }))
        ));
    }
}
