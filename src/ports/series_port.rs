//! Series storage port trait.

use std::collections::BTreeSet;

use crate::domain::error::ForecastGameError;
use crate::domain::series::SeriesRecord;

/// Read-only access to the pool of instrument price histories.
pub trait SeriesStore {
    /// Every series identifier the store can serve.
    fn list_ids(&self) -> Result<BTreeSet<String>, ForecastGameError>;

    /// Loads one series. Fails with `SeriesUnavailable` when the backing rows
    /// cannot be read or parsed.
    fn load(&self, id: &str) -> Result<SeriesRecord, ForecastGameError>;
}
