//! Serializable backtest configuration, loaded from TOML.
//!
//! ```toml
//! [backtest]
//! initial_capital = 100000.0
//!
//! [data]
//! dir = "data"
//! symbols = ["XOM", "CVX"]
//!
//! [strategy]
//! type = "pairs"
//! x = "XOM"
//! y = "CVX"
//! hedge_ratio = 1.0552
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pairlab_core::execution::SIMULATED_VENUE;
use pairlab_core::portfolio::DEFAULT_ORDER_QUANTITY;
use pairlab_core::strategy::pairs::{
    DEFAULT_ENTRY_Z, DEFAULT_EXIT_Z, DEFAULT_HEDGE_RATIO, DEFAULT_WINDOW,
};
use pairlab_core::strategy::PairsConfig;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Full configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default)]
    pub backtest: BacktestSection,
    pub data: DataSection,
    pub strategy: StrategySection,
}

/// Capital, sizing, and venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub initial_capital: f64,
    pub order_quantity: f64,
    pub venue: String,
    /// Flat commission per fill; the default schedule applies when absent.
    pub commission: Option<f64>,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            order_quantity: DEFAULT_ORDER_QUANTITY,
            venue: SIMULATED_VENUE.to_string(),
            commission: None,
        }
    }
}

/// Where bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
    /// Instrument list; order is the replay and ledger order.
    pub symbols: Vec<String>,
    /// Generate bars for instruments whose CSV file is missing.
    #[serde(default)]
    pub synthetic: bool,
    #[serde(default = "default_synthetic_bars")]
    pub synthetic_bars: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_synthetic_start")]
    pub synthetic_start: NaiveDate,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Two years of daily bars.
pub fn default_synthetic_bars() -> usize {
    504
}

fn default_seed() -> u64 {
    42
}

/// First date of generated synthetic bars.
pub fn default_synthetic_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 2).unwrap_or(NaiveDate::MIN)
}

/// Strategy selection, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategySection {
    BuyAndHold,
    Pairs {
        x: String,
        y: String,
        #[serde(default = "default_hedge_ratio")]
        hedge_ratio: f64,
        #[serde(default = "default_window")]
        window: usize,
        #[serde(default = "default_entry_z")]
        entry_z: f64,
        #[serde(default = "default_exit_z")]
        exit_z: f64,
    },
}

fn default_hedge_ratio() -> f64 {
    DEFAULT_HEDGE_RATIO
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}

fn default_entry_z() -> f64 {
    DEFAULT_ENTRY_Z
}

fn default_exit_z() -> f64 {
    DEFAULT_EXIT_Z
}

impl StrategySection {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BuyAndHold => "buy_and_hold",
            Self::Pairs { .. } => "pairs",
        }
    }

    /// Pair parameters, when this is a pairs strategy.
    pub fn pairs_config(&self) -> Option<PairsConfig> {
        match self {
            Self::BuyAndHold => None,
            Self::Pairs {
                hedge_ratio,
                window,
                entry_z,
                exit_z,
                ..
            } => Some(PairsConfig {
                hedge_ratio: *hedge_ratio,
                window: *window,
                entry_z: *entry_z,
                exit_z: *exit_z,
            }),
        }
    }
}

impl BacktestConfig {
    /// Read and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.symbols.is_empty() {
            return Err(ConfigError::Invalid("data.symbols must not be empty".into()));
        }
        let capital = self.backtest.initial_capital;
        if !(capital.is_finite() && capital >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "backtest.initial_capital must be non-negative, got {capital}"
            )));
        }
        let quantity = self.backtest.order_quantity;
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "backtest.order_quantity must be positive, got {quantity}"
            )));
        }
        if let Some(commission) = self.backtest.commission {
            if !(commission.is_finite() && commission >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "backtest.commission must be non-negative, got {commission}"
                )));
            }
        }
        if let StrategySection::Pairs { x, y, .. } = &self.strategy {
            for leg in [x, y] {
                if !self.data.symbols.contains(leg) {
                    return Err(ConfigError::Invalid(format!(
                        "pair leg '{leg}' is not listed in data.symbols"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Deterministic hash of the canonical JSON form of this config.
    ///
    /// Two runs with identical configs share a `RunId`.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        let hash = blake3::hash(json.as_bytes());
        Ok(hash.to_hex().to_string())
    }
}
