//! Price histories read from `date,close` CSV files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use foresight_core::domain::{PricePoint, PriceSeries, SeriesError};
use foresight_core::provider::{window_series, BarInterval, DataError, PriceHistoryProvider};

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Close")]
    close: f64,
}

/// Read a whole CSV file into a series. Rows must be in strictly increasing
/// date order; an out-of-order or repeated date is reported as
/// [`DataError::InvalidSeries`]. Extra columns are ignored.
pub fn read_series(path: &Path) -> Result<PriceSeries, DataError> {
    let file = std::fs::File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut points = Vec::new();
    for (line, row) in reader.deserialize::<Row>().enumerate() {
        let row = row.map_err(|e| DataError::Parse(format!("{}: row {}: {e}", path.display(), line + 1)))?;
        points.push(PricePoint::new(row.date, row.close));
    }
    debug!(path = %path.display(), rows = points.len(), "csv loaded");

    PriceSeries::new(points).map_err(|source| {
        let symbol = path.display().to_string();
        match source {
            SeriesError::Empty => DataError::EmptyHistory { symbol },
            source => DataError::InvalidSeries { symbol, source },
        }
    })
}

/// Serves each registered symbol from its own CSV file.
#[derive(Debug, Default)]
pub struct CsvPriceProvider {
    files: HashMap<String, PathBuf>,
}

impl CsvPriceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, symbol: &str, path: impl Into<PathBuf>) -> Self {
        self.files.insert(symbol.to_string(), path.into());
        self
    }
}

impl PriceHistoryProvider for CsvPriceProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn price_history(
        &self,
        symbol: &str,
        lookback_days: u32,
        interval: BarInterval,
    ) -> Result<PriceSeries, DataError> {
        let path = self.files.get(symbol).ok_or_else(|| DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        })?;
        let series = read_series(path)?;
        window_series(&series, lookback_days, interval).map_err(|source| match source {
            SeriesError::Empty => DataError::EmptyHistory {
                symbol: symbol.to_string(),
            },
            source => DataError::InvalidSeries {
                symbol: symbol.to_string(),
                source,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_rows_in_file_order() {
        let file = write_csv("date,close,volume\n2024-01-02,10.0,200\n2024-01-03,11.5,100\n");
        let series = read_series(file.path()).unwrap();
        assert_eq!(series.closes(), &[10.0, 11.5]);
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn out_of_order_dates_are_an_invalid_series() {
        let file = write_csv("date,close\n2024-01-03,11.5\n2024-01-02,10.0\n");
        assert!(matches!(
            read_series(file.path()),
            Err(DataError::InvalidSeries {
                source: SeriesError::NonMonotonicDate { index: 1, .. },
                ..
            })
        ));
    }

    #[test]
    fn repeated_date_is_an_invalid_series() {
        let file = write_csv("date,close\n2024-01-02,10.0\n2024-01-02,10.5\n");
        assert!(matches!(
            read_series(file.path()),
            Err(DataError::InvalidSeries {
                source: SeriesError::NonMonotonicDate { .. },
                ..
            })
        ));
    }

    #[test]
    fn accepts_capitalized_headers() {
        let file = write_csv("Date,Close\n2024-01-02,10.0\n");
        assert_eq!(read_series(file.path()).unwrap().len(), 1);
    }

    #[test]
    fn header_only_file_is_empty_history() {
        let file = write_csv("date,close\n");
        assert!(matches!(
            read_series(file.path()),
            Err(DataError::EmptyHistory { .. })
        ));
    }

    #[test]
    fn bad_number_is_a_parse_error() {
        let file = write_csv("date,close\n2024-01-02,abc\n");
        assert!(matches!(read_series(file.path()), Err(DataError::Parse(_))));
    }

    #[test]
    fn zero_close_is_an_invalid_series() {
        let file = write_csv("date,close\n2024-01-02,0.0\n");
        assert!(matches!(
            read_series(file.path()),
            Err(DataError::InvalidSeries { .. })
        ));
    }

    #[test]
    fn provider_windows_and_reports_unknown_symbols() {
        let mut body = String::from("date,close\n");
        for day in 1..=20 {
            body.push_str(&format!("2024-02-{day:02},{}\n", 100 + day));
        }
        let file = write_csv(&body);
        let provider = CsvPriceProvider::new().with_file("ACME", file.path());

        let series = provider.price_history("ACME", 5, BarInterval::Daily).unwrap();
        assert_eq!(series.len(), 5);
        assert_eq!(series.last_price(), 120.0);

        assert!(matches!(
            provider.price_history("NOPE", 5, BarInterval::Daily),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let provider = CsvPriceProvider::new().with_file("GONE", "/nonexistent/gone.csv");
        assert!(matches!(
            provider.price_history("GONE", 30, BarInterval::Daily),
            Err(DataError::Io(_))
        ));
    }
}
