//! Artifact export — JSON and CSV files for a finished run.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: holdings snapshots, spread history, and the fill tape
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use pairlab_core::domain::FillEvent;
use pairlab_core::portfolio::HoldingsSnapshot;

use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Holdings history as CSV.
///
/// Columns: date, one market-value column per instrument (ledger order),
/// cash, total.
pub fn export_snapshots_csv(symbols: &[String], snapshots: &[HoldingsSnapshot]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["date".to_string()];
    header.extend(symbols.iter().cloned());
    header.push("cash".into());
    header.push("total".into());
    wtr.write_record(&header)?;

    for s in snapshots {
        let mut row = vec![s.date.map(|d| d.to_string()).unwrap_or_default()];
        for symbol in symbols {
            row.push(format!("{:.2}", s.value_of(symbol).unwrap_or(0.0)));
        }
        row.push(format!("{:.2}", s.cash));
        row.push(format!("{:.2}", s.total));
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Spread history as CSV with index and spread columns.
pub fn export_spread_csv(spread_history: &[f64]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["index", "spread"])?;
    for (i, spread) in spread_history.iter().enumerate() {
        wtr.write_record([i.to_string(), format!("{spread:.6}")])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Fill tape as CSV.
///
/// Columns: date, symbol, side, quantity, price, commission, venue
pub fn export_fills_csv(fills: &[FillEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "symbol",
        "side",
        "quantity",
        "price",
        "commission",
        "venue",
    ])?;
    for f in fills {
        wtr.write_record([
            &f.date.to_string(),
            &f.symbol,
            &format!("{:?}", f.side),
            &format!("{:.6}", f.quantity),
            &f.price.map(|p| format!("{p:.6}")).unwrap_or_default(),
            &format!("{:.2}", f.commission),
            &f.venue,
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates a directory named `{strategy}_{run_id prefix}/` under `output_dir`
/// containing:
/// - `result.json` — the full `BacktestResult`
/// - `snapshots.csv` — per-tick holdings
/// - `spread.csv` — spread history (header only for non-pairs runs)
/// - `fills.csv` — fill tape
///
/// Returns the path to the created directory.
pub fn save_artifacts(output_dir: &Path, result: &BacktestResult) -> Result<PathBuf> {
    let prefix: String = result.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("{}_{prefix}", result.config.strategy.name()));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let files = [
        ("result.json", export_json(result)?),
        (
            "snapshots.csv",
            export_snapshots_csv(&result.symbols, &result.run.snapshots)?,
        ),
        ("spread.csv", export_spread_csv(&result.run.spread_history)?),
        ("fills.csv", export_fills_csv(&result.run.fills)?),
    ];
    for (name, content) in &files {
        let path = run_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(run_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pairlab_core::domain::{Bar, OrderSide};

    use crate::config::BacktestConfig;
    use crate::data_loader::{DataOrigin, LoadedData};
    use crate::runner::run_backtest_from_data;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    #[test]
    fn snapshots_csv_has_one_column_per_instrument() {
        let symbols = vec!["XOM".to_string(), "CVX".to_string()];
        let mut snapshot = HoldingsSnapshot::initial(&symbols, 1_000.0);
        snapshot.date = Some(day());
        snapshot.market_values[1].1 = 250.0;
        snapshot.total = 1_250.0;

        let csv = export_snapshots_csv(&symbols, &[snapshot]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,XOM,CVX,cash,total");
        assert_eq!(lines[1], "2024-01-02,0.00,250.00,1000.00,1250.00");
    }

    #[test]
    fn spread_csv_indexes_rows() {
        let csv = export_spread_csv(&[0.5, -1.25]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec!["index,spread", "0,0.500000", "1,-1.250000"]);
    }

    #[test]
    fn fills_csv_lists_every_fill() {
        let fills = vec![FillEvent::new(day(), "XOM", "SIM", 100.0, OrderSide::Sell, Some(101.5), None)];
        let csv = export_fills_csv(&fills).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "2024-01-02,XOM,Sell,100.000000,101.500000,1.30,SIM");
    }

    fn sample_result() -> BacktestResult {
        let config = BacktestConfig::from_toml(
            r#"
            [data]
            symbols = ["XOM"]

            [strategy]
            type = "buy_and_hold"
            "#,
        )
        .unwrap();
        let bars = [100.0, 101.0, 99.5]
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::from_close("XOM", day() + chrono::Duration::days(i as i64), c))
            .collect();
        let loaded = LoadedData {
            feeds: vec![("XOM".into(), bars)],
            origins: vec![("XOM".into(), DataOrigin::Csv)],
            dataset_hash: "fixture".into(),
            has_synthetic: false,
        };
        run_backtest_from_data(&config, loaded).unwrap()
    }

    #[test]
    fn import_accepts_current_schema() {
        let result = sample_result();
        let json = export_json(&result).unwrap();
        assert_eq!(import_json(&json).unwrap(), result);
    }

    #[test]
    fn import_rejects_newer_schema() {
        let mut result = sample_result();
        result.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&result).unwrap();

        let err = import_json(&json).unwrap_err();
        assert!(
            err.to_string().contains("unsupported schema version"),
            "unexpected error: {err}"
        );
    }
}
