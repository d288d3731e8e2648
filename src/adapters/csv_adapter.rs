//! CSV directory series store.
//!
//! One file per instrument, `<series_dir>/<id>.csv`. Columns are located by
//! header name, case-insensitively: a timestamp column (`Datetime`, `Date` or
//! `Timestamp`) plus `Open`, `High`, `Low` and `Close`. Other columns, such as
//! `Volume` or `Dividends`, are ignored.

use crate::domain::error::ForecastGameError;
use crate::domain::series::{OhlcRow, SeriesRecord};
use crate::ports::series_port::SeriesStore;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const TIMESTAMP_COLUMNS: [&str; 3] = ["datetime", "date", "timestamp"];

pub struct CsvSeriesStore {
    base_path: PathBuf,
}

struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
}

impl CsvSeriesStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn csv_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", id))
    }
}

fn unavailable(id: &str, reason: impl Into<String>) -> ForecastGameError {
    ForecastGameError::SeriesUnavailable {
        series_id: id.to_string(),
        reason: reason.into(),
    }
}

fn locate_columns(id: &str, headers: &csv::StringRecord) -> Result<Columns, ForecastGameError> {
    let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let find = |wanted: &str| names.iter().position(|n| n == wanted);
    let require = |wanted: &str| {
        find(wanted).ok_or_else(|| unavailable(id, format!("missing {} column", wanted)))
    };

    let timestamp = TIMESTAMP_COLUMNS
        .iter()
        .find_map(|&c| find(c))
        .ok_or_else(|| unavailable(id, "missing datetime column"))?;

    Ok(Columns {
        timestamp,
        open: require("open")?,
        high: require("high")?,
        low: require("low")?,
        close: require("close")?,
    })
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS±HH:MM`, naive datetimes (taken as
/// UTC) and plain dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(ts) = DateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

fn parse_price(
    id: &str,
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    line: usize,
) -> Result<f64, ForecastGameError> {
    let raw = record
        .get(index)
        .ok_or_else(|| unavailable(id, format!("missing {} value on line {}", name, line)))?;
    raw.trim()
        .parse()
        .map_err(|e| unavailable(id, format!("invalid {} value on line {}: {}", name, line, e)))
}

impl SeriesStore for CsvSeriesStore {
    fn list_ids(&self) -> Result<BTreeSet<String>, ForecastGameError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("failed to read directory {}: {}", self.base_path.display(), e),
            )
        })?;

        let mut ids = BTreeSet::new();
        for entry in entries {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.insert(stem.to_string());
            }
        }

        tracing::debug!(dir = %self.base_path.display(), count = ids.len(), "listed series");
        Ok(ids)
    }

    fn load(&self, id: &str) -> Result<SeriesRecord, ForecastGameError> {
        let path = self.csv_path(id);
        let content = fs::read_to_string(&path)
            .map_err(|e| unavailable(id, format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| unavailable(id, format!("CSV header error: {}", e)))?
            .clone();
        let cols = locate_columns(id, &headers)?;

        let mut rows = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            // header is line 1
            let line = i + 2;
            let record = result.map_err(|e| unavailable(id, format!("CSV parse error: {}", e)))?;

            let raw_ts = record.get(cols.timestamp).unwrap_or_default();
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| {
                unavailable(id, format!("invalid timestamp '{}' on line {}", raw_ts, line))
            })?;

            rows.push(OhlcRow {
                timestamp,
                open: parse_price(id, &record, cols.open, "open", line)?,
                high: parse_price(id, &record, cols.high, "high", line)?,
                low: parse_price(id, &record, cols.low, "low", line)?,
                close: parse_price(id, &record, cols.close, "close", line)?,
            });
        }

        rows.sort_by_key(|r| r.timestamp);
        tracing::debug!(series_id = id, rows = rows.len(), "loaded series");
        SeriesRecord::new(id, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let hourly = "Datetime,Open,High,Low,Close,Volume,Dividends,Stock Splits\n\
            2024-01-02 09:30:00-05:00,187.15,188.44,185.83,186.04,14155264,0.0,0.0\n\
            2024-01-02 10:30:00-05:00,186.03,186.40,184.35,185.22,10234124,0.0,0.0\n\
            2024-01-02 11:30:00-05:00,185.22,185.88,184.90,185.61,6623112,0.0,0.0\n";
        fs::write(path.join("AAPL.csv"), hourly).unwrap();

        let daily = "date,close,open,low,high\n\
            2024-01-03,11.0,10.5,10.0,11.5\n\
            2024-01-02,10.5,10.0,9.5,10.8\n";
        fs::write(path.join("BHP.csv"), daily).unwrap();

        fs::write(path.join("notes.txt"), "not a series").unwrap();
        fs::create_dir(path.join("nested.csv")).unwrap();

        (dir, path)
    }

    #[test]
    fn list_ids_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let store = CsvSeriesStore::new(path);
        let ids: Vec<String> = store.list_ids().unwrap().into_iter().collect();
        assert_eq!(ids, vec!["AAPL", "BHP"]);
    }

    #[test]
    fn list_ids_fails_for_missing_directory() {
        let store = CsvSeriesStore::new("/nonexistent/series/dir");
        assert!(matches!(store.list_ids(), Err(ForecastGameError::Io(_))));
    }

    #[test]
    fn load_reads_hourly_download_layout() {
        let (_dir, path) = setup_test_data();
        let series = CsvSeriesStore::new(path).load("AAPL").unwrap();

        assert_eq!(series.id(), "AAPL");
        assert_eq!(series.len(), 3);
        let first = &series.rows()[0];
        assert_eq!(first.open, 187.15);
        assert_eq!(first.high, 188.44);
        assert_eq!(first.low, 185.83);
        assert_eq!(first.close, 186.04);
        assert_eq!(first.timestamp.hour(), 9);
        assert_eq!(first.timestamp.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn load_matches_headers_by_name_and_sorts() {
        let (_dir, path) = setup_test_data();
        let series = CsvSeriesStore::new(path).load("BHP").unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.rows()[0].timestamp.day(), 2);
        assert_eq!(series.rows()[0].close, 10.5);
        assert_eq!(series.rows()[0].high, 10.8);
        assert_eq!(series.rows()[1].close, 11.0);
    }

    #[test]
    fn load_missing_file_is_unavailable() {
        let (_dir, path) = setup_test_data();
        let err = CsvSeriesStore::new(path).load("XYZ").unwrap_err();
        assert!(matches!(err, ForecastGameError::SeriesUnavailable { ref series_id, .. } if series_id == "XYZ"));
    }

    #[test]
    fn load_rejects_missing_close_column() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("X.csv"), "Date,Open,High,Low\n2024-01-02,1,2,0.5\n").unwrap();
        let err = CsvSeriesStore::new(dir.path()).load("X").unwrap_err();
        assert!(err.to_string().contains("missing close column"));
    }

    #[test]
    fn load_reports_bad_price_with_line_number() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("X.csv"),
            "Date,Open,High,Low,Close\n2024-01-02,1,2,0.5,1.5\n2024-01-03,1,2,0.5,abc\n",
        )
        .unwrap();
        let err = CsvSeriesStore::new(dir.path()).load("X").unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn load_rejects_duplicate_timestamps() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("X.csv"),
            "Date,Open,High,Low,Close\n2024-01-02,1,2,0.5,1.5\n2024-01-02,1,2,0.5,1.6\n",
        )
        .unwrap();
        let err = CsvSeriesStore::new(dir.path()).load("X").unwrap_err();
        assert!(matches!(err, ForecastGameError::SeriesUnavailable { .. }));
    }

    #[test]
    fn parse_timestamp_formats() {
        let rfc = parse_timestamp("2024-03-01T14:30:00+10:00").unwrap();
        assert_eq!(rfc.offset().local_minus_utc(), 10 * 3600);

        let spaced = parse_timestamp("2024-03-01 14:30:00+00:00").unwrap();
        assert_eq!(spaced.hour(), 14);

        let naive = parse_timestamp("2024-03-01 14:30:00").unwrap();
        assert_eq!(naive.offset().local_minus_utc(), 0);
        assert_eq!(naive.minute(), 30);

        let date = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(date.hour(), 0);
        assert_eq!(date.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        assert!(parse_timestamp("01/03/2024").is_none());
    }
}
