//! Round engine: series, sampling, windows, models, scoring and sessions.

pub mod config_validation;
pub mod error;
pub mod forecast;
pub mod pool;
pub mod scorer;
pub mod series;
pub mod session;
pub mod window;
