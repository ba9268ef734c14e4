//! In-memory historic bar source.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use super::{BarSource, DataError};
use crate::domain::{Bar, Event};
use crate::engine::EventQueue;

/// Per-instrument series with a replay cursor.
///
/// `bars[..cursor]` is the "seen" buffer. The cursor only moves forward.
#[derive(Debug, Clone)]
struct BarSeries {
    bars: Vec<Bar>,
    cursor: usize,
}

impl BarSeries {
    fn latest(&self) -> Option<&Bar> {
        self.cursor.checked_sub(1).map(|i| &self.bars[i])
    }

    fn has_remaining(&self) -> bool {
        self.cursor < self.bars.len()
    }
}

/// Replays preloaded, time-ordered bars for an ordered instrument list.
///
/// Instruments advance independently: when one series runs out, the others
/// keep advancing until every series is exhausted.
#[derive(Debug, Clone)]
pub struct HistoricBarSource {
    symbols: Vec<String>,
    series: Vec<BarSeries>,
    index: HashMap<String, usize>,
}

impl HistoricBarSource {
    /// Build a source from `(symbol, bars)` feeds, preserving feed order.
    ///
    /// Rejects duplicate symbols, bars whose symbol differs from the feed's,
    /// and feeds that are not strictly increasing in date.
    pub fn new(feeds: Vec<(String, Vec<Bar>)>) -> Result<Self, DataError> {
        let mut symbols = Vec::with_capacity(feeds.len());
        let mut series = Vec::with_capacity(feeds.len());
        let mut index = HashMap::with_capacity(feeds.len());

        for (symbol, bars) in feeds {
            if index.contains_key(&symbol) {
                return Err(DataError::DuplicateInstrument(symbol));
            }
            validate_series(&symbol, &bars)?;
            index.insert(symbol.clone(), symbols.len());
            symbols.push(symbol);
            series.push(BarSeries { bars, cursor: 0 });
        }

        Ok(Self {
            symbols,
            series,
            index,
        })
    }

    /// Build a source from close-only series on consecutive calendar days.
    pub fn from_closes(start: NaiveDate, closes: &[(&str, &[f64])]) -> Result<Self, DataError> {
        let feeds = closes
            .iter()
            .map(|(symbol, values)| {
                let bars = values
                    .iter()
                    .enumerate()
                    .map(|(i, &close)| {
                        Bar::from_close(*symbol, start + Duration::days(i as i64), close)
                    })
                    .collect();
                (symbol.to_string(), bars)
            })
            .collect();
        Self::new(feeds)
    }

    /// All bars revealed so far for `symbol`.
    pub fn seen(&self, symbol: &str) -> Result<&[Bar], DataError> {
        let series = self.series_for(symbol)?;
        Ok(&series.bars[..series.cursor])
    }

    fn series_for(&self, symbol: &str) -> Result<&BarSeries, DataError> {
        self.index
            .get(symbol)
            .map(|&i| &self.series[i])
            .ok_or_else(|| DataError::UnknownInstrument(symbol.to_string()))
    }
}

fn validate_series(symbol: &str, bars: &[Bar]) -> Result<(), DataError> {
    for bar in bars {
        if bar.symbol != symbol {
            return Err(DataError::SymbolMismatch {
                expected: symbol.to_string(),
                found: bar.symbol.clone(),
                date: bar.date,
            });
        }
    }
    for pair in bars.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(DataError::OutOfOrder {
                symbol: symbol.to_string(),
                previous: pair[0].date,
                next: pair[1].date,
            });
        }
    }
    Ok(())
}

impl BarSource for HistoricBarSource {
    fn symbols(&self) -> &[String] {
        &self.symbols
    }

    fn advance(&mut self, events: &mut EventQueue) -> bool {
        let mut revealed = false;
        for series in &mut self.series {
            if series.has_remaining() {
                series.cursor += 1;
                revealed = true;
            }
        }
        if revealed {
            events.push(Event::MarketAdvance);
        }
        revealed
    }

    fn latest_bar(&self, symbol: &str) -> Result<Option<&Bar>, DataError> {
        Ok(self.series_for(symbol)?.latest())
    }

    fn has_remaining(&self) -> bool {
        self.series.iter().any(BarSeries::has_remaining)
    }
}
