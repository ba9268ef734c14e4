//! Bar loading for the runner.
//!
//! Each instrument is read from `<dir>/<SYMBOL>.csv`. When a file is missing:
//! 1. If synthetic data is enabled → generate a seeded random walk (tagged)
//! 2. Otherwise → fail with a clear error
//!
//! For a pair, a missing second leg is generated as a cointegrated copy of
//! the first leg (`y = h·x + c + noise`) so the pairs strategy has something
//! mean-reverting to trade.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use pairlab_core::domain::Bar;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no data file for '{symbol}' at {} (set data.synthetic = true for synthetic data)", path.display())]
    MissingFile { symbol: String, path: PathBuf },

    #[error("failed to read '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("'{symbol}' row {row}: close must be a positive number, got {close}")]
    InvalidClose { symbol: String, row: usize, close: f64 },

    #[error("'{0}' has no rows")]
    Empty(String),
}

/// The pair whose second leg may be synthesised from the first.
#[derive(Debug, Clone, PartialEq)]
pub struct PairLink {
    pub x: String,
    pub y: String,
    pub hedge_ratio: f64,
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub dir: PathBuf,
    /// Generate bars for instruments whose file is missing.
    pub synthetic: bool,
    pub synthetic_bars: usize,
    pub seed: u64,
    pub synthetic_start: NaiveDate,
    pub pair: Option<PairLink>,
}

/// Where an instrument's bars came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Csv,
    Synthetic,
}

/// Result of loading bars, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    /// `(symbol, bars)` in the requested instrument order.
    pub feeds: Vec<(String, Vec<Bar>)>,
    pub origins: Vec<(String, DataOrigin)>,
    /// BLAKE3 over every bar, in instrument order.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

impl LoadedData {
    pub fn closes(&self, symbol: &str) -> Option<Vec<f64>> {
        self.feeds
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, bars)| bars.iter().map(|b| b.close).collect())
    }
}

/// One CSV row. Headers are matched case-insensitively for the common forms.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date", alias = "date")]
    date: NaiveDate,
    #[serde(rename = "Open", alias = "open")]
    open: f64,
    #[serde(rename = "High", alias = "high")]
    high: f64,
    #[serde(rename = "Low", alias = "low")]
    low: f64,
    #[serde(rename = "Close", alias = "close")]
    close: f64,
    #[serde(rename = "Volume", alias = "volume", default)]
    volume: f64,
}

/// Path of the CSV file for `symbol` under `dir`.
pub fn csv_path(dir: &Path, symbol: &str) -> PathBuf {
    dir.join(format!("{symbol}.csv"))
}

/// Load bars for every symbol, in order.
pub fn load_bars(symbols: &[String], opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let mut feeds: Vec<(String, Option<Vec<Bar>>)> = Vec::with_capacity(symbols.len());
    let mut origins = Vec::with_capacity(symbols.len());
    let mut has_synthetic = false;

    for symbol in symbols {
        let path = csv_path(&opts.dir, symbol);
        if path.exists() {
            let bars = read_csv_bars(symbol, &path)?;
            debug!(%symbol, bars = bars.len(), "loaded csv");
            feeds.push((symbol.clone(), Some(bars)));
            origins.push((symbol.clone(), DataOrigin::Csv));
            continue;
        }

        if !opts.synthetic {
            return Err(LoadError::MissingFile {
                symbol: symbol.clone(),
                path,
            });
        }

        warn!(%symbol, "no data file; generating synthetic bars, results will be tagged as synthetic");
        has_synthetic = true;
        origins.push((symbol.clone(), DataOrigin::Synthetic));

        let is_second_leg = opts.pair.as_ref().is_some_and(|p| &p.y == symbol);
        if is_second_leg {
            // Filled in once the first leg is available.
            feeds.push((symbol.clone(), None));
        } else {
            let bars = random_walk(symbol, opts);
            feeds.push((symbol.clone(), Some(bars)));
        }
    }

    let mut resolved = Vec::with_capacity(feeds.len());
    for (symbol, bars) in &feeds {
        let bars = match bars {
            Some(bars) => bars.clone(),
            None => cointegrated_leg(symbol, &feeds, opts),
        };
        resolved.push((symbol.clone(), bars));
    }

    let dataset_hash = compute_dataset_hash(&resolved);
    Ok(LoadedData {
        feeds: resolved,
        origins,
        dataset_hash,
        has_synthetic,
    })
}

/// Parse one instrument's CSV file. Rows are kept in file order.
pub fn read_csv_bars(symbol: &str, path: &Path) -> Result<Vec<Bar>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;

    let mut bars = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(csv_err)?;
        if !(row.close.is_finite() && row.close > 0.0) {
            return Err(LoadError::InvalidClose {
                symbol: symbol.to_string(),
                row: i + 1,
                close: row.close,
            });
        }
        let bar = Bar {
            symbol: symbol.to_string(),
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume.max(0.0) as u64,
        };
        if !bar.is_sane() {
            warn!(%symbol, date = %bar.date, "bar fails OHLC sanity check");
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(LoadError::Empty(symbol.to_string()));
    }
    Ok(bars)
}

/// Closes of `x` and `y` on the dates both series share, in date order.
///
/// Both inputs must be date-ordered; the join walks them in step.
pub fn aligned_closes(x: &[Bar], y: &[Bar]) -> (Vec<f64>, Vec<f64>) {
    let (mut i, mut j) = (0, 0);
    let (mut xs, mut ys) = (Vec::new(), Vec::new());
    while i < x.len() && j < y.len() {
        match x[i].date.cmp(&y[j].date) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                xs.push(x[i].close);
                ys.push(y[j].close);
                i += 1;
                j += 1;
            }
        }
    }
    (xs, ys)
}

/// Compute a deterministic BLAKE3 hash over all bar data.
fn compute_dataset_hash(feeds: &[(String, Vec<Bar>)]) -> String {
    let mut hasher = blake3::Hasher::new();
    for (symbol, bars) in feeds {
        hasher.update(symbol.as_bytes());
        for bar in bars {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// RNG seeded from the configured seed and the symbol name.
fn symbol_rng(symbol: &str, seed: u64) -> StdRng {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(symbol.as_bytes());
    StdRng::from_seed(*hasher.finalize().as_bytes())
}

/// Consecutive weekdays starting at `start`.
fn trading_days(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(n);
    let mut current = start;
    while days.len() < n {
        let weekday = current.weekday();
        if weekday != chrono::Weekday::Sat && weekday != chrono::Weekday::Sun {
            days.push(current);
        }
        current += chrono::Duration::days(1);
    }
    days
}

/// Random walk from 100.0 with daily returns in ±2%.
fn random_walk(symbol: &str, opts: &LoadOptions) -> Vec<Bar> {
    let mut rng = symbol_rng(symbol, opts.seed);
    let mut price = 100.0_f64;

    trading_days(opts.synthetic_start, opts.synthetic_bars)
        .into_iter()
        .map(|date| {
            let open = price;
            let close = price * (1.0 + rng.gen_range(-0.02..0.02));
            price = close;
            synthetic_bar(symbol, date, open, close, &mut rng)
        })
        .collect()
}

/// Second leg tracking `h·x + 5` with AR(1) noise, on the first leg's dates.
fn cointegrated_leg(
    symbol: &str,
    feeds: &[(String, Option<Vec<Bar>>)],
    opts: &LoadOptions,
) -> Vec<Bar> {
    let first_leg = opts.pair.as_ref().and_then(|pair| {
        feeds
            .iter()
            .find(|(s, _)| s == &pair.x)
            .and_then(|(_, bars)| bars.as_ref())
            .map(|bars| (pair.hedge_ratio, bars))
    });
    let Some((hedge_ratio, x_bars)) = first_leg else {
        return random_walk(symbol, opts);
    };

    let mut rng = symbol_rng(symbol, opts.seed);
    let mut noise = 0.0_f64;
    let mut previous: Option<f64> = None;

    x_bars
        .iter()
        .map(|x| {
            noise = 0.8 * noise + rng.gen_range(-0.5..0.5);
            let close = (hedge_ratio * x.close + 5.0 + noise).max(0.01);
            let open = previous.unwrap_or(close);
            previous = Some(close);
            synthetic_bar(symbol, x.date, open, close, &mut rng)
        })
        .collect()
}

fn synthetic_bar(symbol: &str, date: NaiveDate, open: f64, close: f64, rng: &mut StdRng) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        date,
        open,
        high: open.max(close) * (1.0 + rng.gen_range(0.0..0.01)),
        low: open.min(close) * (1.0 - rng.gen_range(0.0..0.01)),
        close,
        volume: rng.gen_range(500_000..5_000_000u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn opts(dir: &Path, synthetic: bool) -> LoadOptions {
        LoadOptions {
            dir: dir.to_path_buf(),
            synthetic,
            synthetic_bars: 60,
            seed: 7,
            synthetic_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            pair: None,
        }
    }

    fn write_csv(dir: &Path, symbol: &str, body: &str) {
        let mut file = std::fs::File::create(csv_path(dir, symbol)).unwrap();
        file.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn reads_csv_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            "XOM",
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-02,100,102,99,101,1000\n\
             2024-01-03,101,103,100,102,1100\n",
        );
        let loaded = load_bars(&["XOM".to_string()], &opts(dir.path(), false)).unwrap();

        assert!(!loaded.has_synthetic);
        assert_eq!(loaded.origins, vec![("XOM".to_string(), DataOrigin::Csv)]);
        let bars = &loaded.feeds[0].1;
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].symbol, "XOM");
        assert_eq!(bars[1].close, 102.0);
        assert_eq!(bars[1].volume, 1100);
    }

    #[test]
    fn accepts_lowercase_headers_and_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            "CVX",
            "date,open,high,low,close,adj_close,volume\n2024-01-02,10,11,9,10.5,10.4,5\n",
        );
        let bars = read_csv_bars("CVX", &csv_path(dir.path(), "CVX")).unwrap();
        assert_eq!(bars[0].close, 10.5);
        assert_eq!(bars[0].volume, 5);
    }

    #[test]
    fn missing_file_without_synthetic_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_bars(&["NOPE".to_string()], &opts(dir.path(), false)).unwrap_err();
        assert!(matches!(err, LoadError::MissingFile { symbol, .. } if symbol == "NOPE"));
    }

    #[test]
    fn rejects_non_positive_close() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            "BAD",
            "Date,Open,High,Low,Close,Volume\n2024-01-02,1,1,1,0,1\n",
        );
        let err = load_bars(&["BAD".to_string()], &opts(dir.path(), false)).unwrap_err();
        assert!(matches!(err, LoadError::InvalidClose { row: 1, .. }));
    }

    #[test]
    fn header_only_file_is_empty_error() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "E", "Date,Open,High,Low,Close,Volume\n");
        assert!(matches!(
            load_bars(&["E".to_string()], &opts(dir.path(), false)),
            Err(LoadError::Empty(_))
        ));
    }

    #[test]
    fn aligned_closes_inner_joins_on_date() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let x = vec![
            Bar::from_close("X", d(2), 1.0),
            Bar::from_close("X", d(3), 2.0),
            Bar::from_close("X", d(5), 3.0),
        ];
        let y = vec![
            Bar::from_close("Y", d(3), 20.0),
            Bar::from_close("Y", d(4), 25.0),
            Bar::from_close("Y", d(5), 30.0),
        ];
        let (xs, ys) = aligned_closes(&x, &y);
        assert_eq!(xs, vec![2.0, 3.0]);
        assert_eq!(ys, vec![20.0, 30.0]);
    }

    #[test]
    fn synthetic_bars_are_deterministic_weekdays() {
        let dir = tempfile::tempdir().unwrap();
        let symbols = vec!["AAA".to_string()];
        let a = load_bars(&symbols, &opts(dir.path(), true)).unwrap();
        let b = load_bars(&symbols, &opts(dir.path(), true)).unwrap();

        assert!(a.has_synthetic);
        assert_eq!(a.feeds, b.feeds);
        assert_eq!(a.dataset_hash, b.dataset_hash);
        let bars = &a.feeds[0].1;
        assert_eq!(bars.len(), 60);
        assert!(bars.iter().all(|bar| bar.is_sane()));
        assert!(bars
            .iter()
            .all(|bar| !matches!(bar.date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)));
        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn seed_changes_synthetic_data() {
        let dir = tempfile::tempdir().unwrap();
        let symbols = vec!["AAA".to_string()];
        let mut other = opts(dir.path(), true);
        other.seed = 8;
        let a = load_bars(&symbols, &opts(dir.path(), true)).unwrap();
        let b = load_bars(&symbols, &other).unwrap();
        assert_ne!(a.dataset_hash, b.dataset_hash);
    }

    #[test]
    fn synthetic_second_leg_tracks_first_leg() {
        let dir = tempfile::tempdir().unwrap();
        let symbols = vec!["CVX".to_string(), "XOM".to_string()];
        let mut options = opts(dir.path(), true);
        options.pair = Some(PairLink {
            x: "XOM".into(),
            y: "CVX".into(),
            hedge_ratio: 1.055,
        });
        let loaded = load_bars(&symbols, &options).unwrap();

        // Order preserved even though the second leg was generated last.
        assert_eq!(loaded.feeds[0].0, "CVX");
        let y = loaded.closes("CVX").unwrap();
        let x = loaded.closes("XOM").unwrap();
        assert_eq!(x.len(), y.len());
        for (xv, yv) in x.iter().zip(&y) {
            let residual = yv - 1.055 * xv - 5.0;
            assert!(residual.abs() < 2.5, "residual {residual} too large");
        }
        let x_dates: Vec<NaiveDate> = loaded.feeds[1].1.iter().map(|b| b.date).collect();
        let y_dates: Vec<NaiveDate> = loaded.feeds[0].1.iter().map(|b| b.date).collect();
        assert_eq!(x_dates, y_dates);
    }
}
