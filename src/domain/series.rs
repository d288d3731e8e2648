//! Price series records.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;

use crate::domain::error::ForecastGameError;

/// One OHLC row. Timestamps keep the offset they were recorded with so the
/// calendar date shown to players matches the exchange's local date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OhlcRow {
    pub timestamp: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl OhlcRow {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// An instrument's full price history, strictly increasing by timestamp.
#[derive(Debug, Clone)]
pub struct SeriesRecord {
    id: String,
    rows: Vec<OhlcRow>,
}

impl SeriesRecord {
    /// Builds a record, rejecting out-of-order or duplicate timestamps and
    /// non-finite prices.
    pub fn new(id: impl Into<String>, rows: Vec<OhlcRow>) -> Result<Self, ForecastGameError> {
        let id = id.into();

        for (i, row) in rows.iter().enumerate() {
            if ![row.open, row.high, row.low, row.close]
                .iter()
                .all(|v| v.is_finite())
            {
                return Err(ForecastGameError::SeriesUnavailable {
                    series_id: id,
                    reason: format!("non-finite price at row {}", i),
                });
            }
        }

        if let Some(i) = rows
            .windows(2)
            .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(ForecastGameError::SeriesUnavailable {
                series_id: id,
                reason: format!(
                    "timestamps not strictly increasing at row {} ({} after {})",
                    i + 1,
                    rows[i + 1].timestamp,
                    rows[i].timestamp
                ),
            });
        }

        Ok(Self { id, rows })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rows(&self) -> &[OhlcRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First and last calendar dates, if any rows exist.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.rows.first()?.date(), self.rows.last()?.date()))
    }
}
