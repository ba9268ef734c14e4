//! Pairs statistical arbitrage on a fixed hedge ratio.
//!
//! Each tick computes `spread = close(Y) - h * close(X)` and standardises it
//! against the trailing `window` spreads:
//!
//! - `z < -entry_z`: spread is cheap, go long the spread (buy Y, sell X)
//! - `z > +entry_z`: spread is rich, go short the spread (sell Y, buy X)
//! - `|z| < exit_z` while exposed: flatten with the opposite pair of signals
//!
//! The three branches are one decision; a tick can enter or exit, never both.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Strategy, StrategyError};
use crate::data::BarSource;
use crate::domain::{Event, SignalDirection, SignalEvent};
use crate::engine::EventQueue;
use crate::stats::trailing_mean_std;

/// OLS hedge ratio of CVX on XOM.
pub const DEFAULT_HEDGE_RATIO: f64 = 1.055;
pub const DEFAULT_WINDOW: usize = 30;
pub const DEFAULT_ENTRY_Z: f64 = 2.0;
pub const DEFAULT_EXIT_Z: f64 = 0.5;

/// Pairs strategy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairsConfig {
    pub hedge_ratio: f64,
    pub window: usize,
    pub entry_z: f64,
    pub exit_z: f64,
}

impl Default for PairsConfig {
    fn default() -> Self {
        Self {
            hedge_ratio: DEFAULT_HEDGE_RATIO,
            window: DEFAULT_WINDOW,
            entry_z: DEFAULT_ENTRY_Z,
            exit_z: DEFAULT_EXIT_Z,
        }
    }
}

impl PairsConfig {
    pub fn with_hedge_ratio(hedge_ratio: f64) -> Self {
        Self {
            hedge_ratio,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), StrategyError> {
        if !(self.hedge_ratio.is_finite() && self.hedge_ratio > 0.0) {
            return Err(invalid("hedge_ratio", format!("must be positive, got {}", self.hedge_ratio)));
        }
        if self.window == 0 {
            return Err(invalid("window", "must be at least 1".into()));
        }
        if !(self.entry_z.is_finite() && self.entry_z > 0.0) {
            return Err(invalid("entry_z", format!("must be positive, got {}", self.entry_z)));
        }
        if !(self.exit_z.is_finite() && self.exit_z >= 0.0) {
            return Err(invalid("exit_z", format!("must be non-negative, got {}", self.exit_z)));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: String) -> StrategyError {
    StrategyError::InvalidParameter { name, reason }
}

/// Current directional exposure to the spread.
///
/// Holding this as one enum keeps "long spread" and "short spread" mutually
/// exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpreadExposure {
    #[default]
    Flat,
    Long,
    Short,
}

/// Pairs stat-arb strategy over instruments X (hedge leg) and Y.
#[derive(Debug, Clone)]
pub struct PairsStatArb {
    x: String,
    y: String,
    config: PairsConfig,
    spread_history: Vec<f64>,
    exposure: SpreadExposure,
    last_z: Option<f64>,
}

impl PairsStatArb {
    pub fn new(
        x: impl Into<String>,
        y: impl Into<String>,
        config: PairsConfig,
    ) -> Result<Self, StrategyError> {
        let x = x.into();
        let y = y.into();
        if x == y {
            return Err(invalid("instruments", format!("X and Y must differ, both are '{x}'")));
        }
        config.validate()?;
        Ok(Self {
            x,
            y,
            config,
            spread_history: Vec::new(),
            exposure: SpreadExposure::Flat,
            last_z: None,
        })
    }

    pub fn config(&self) -> &PairsConfig {
        &self.config
    }

    pub fn exposure(&self) -> SpreadExposure {
        self.exposure
    }

    pub fn is_long_spread(&self) -> bool {
        self.exposure == SpreadExposure::Long
    }

    pub fn is_short_spread(&self) -> bool {
        self.exposure == SpreadExposure::Short
    }

    /// Z-score of the most recent tick that had a full, non-degenerate window.
    pub fn last_z_score(&self) -> Option<f64> {
        self.last_z
    }

    fn push_pair(
        &self,
        events: &mut EventQueue,
        date: chrono::NaiveDate,
        y_direction: SignalDirection,
        x_direction: SignalDirection,
    ) {
        events.push(Event::Signal(SignalEvent::new(self.y.clone(), date, y_direction)));
        events.push(Event::Signal(SignalEvent::new(self.x.clone(), date, x_direction)));
    }
}

impl Strategy for PairsStatArb {
    fn name(&self) -> &str {
        "pairs_stat_arb"
    }

    fn on_market_advance(
        &mut self,
        bars: &dyn BarSource,
        events: &mut EventQueue,
    ) -> Result<(), StrategyError> {
        let (x_bar, y_bar) = match (bars.latest_bar(&self.x)?, bars.latest_bar(&self.y)?) {
            (Some(x), Some(y)) => (x, y),
            _ => return Ok(()),
        };
        let date = x_bar.date;

        let spread = y_bar.close - self.config.hedge_ratio * x_bar.close;
        self.spread_history.push(spread);

        let Some((mean, std)) = trailing_mean_std(&self.spread_history, self.config.window) else {
            return Ok(());
        };
        if std == 0.0 {
            return Ok(());
        }

        let z = (spread - mean) / std;
        self.last_z = Some(z);

        use SignalDirection::{Long, Short};
        if z < -self.config.entry_z && self.exposure != SpreadExposure::Long {
            info!(%date, z, "entry long spread");
            self.push_pair(events, date, Long, Short);
            self.exposure = SpreadExposure::Long;
        } else if z > self.config.entry_z && self.exposure != SpreadExposure::Short {
            info!(%date, z, "entry short spread");
            self.push_pair(events, date, Short, Long);
            self.exposure = SpreadExposure::Short;
        } else if z.abs() < self.config.exit_z {
            match self.exposure {
                SpreadExposure::Long => {
                    info!(%date, z, "exit long spread");
                    self.push_pair(events, date, Short, Long);
                    self.exposure = SpreadExposure::Flat;
                }
                SpreadExposure::Short => {
                    info!(%date, z, "exit short spread");
                    self.push_pair(events, date, Long, Short);
                    self.exposure = SpreadExposure::Flat;
                }
                SpreadExposure::Flat => {}
            }
        }
        Ok(())
    }

    fn spread_history(&self) -> &[f64] {
        &self.spread_history
    }
}
