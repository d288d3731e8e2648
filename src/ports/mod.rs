//! Port traits at the engine's I/O seams.

pub mod config_port;
pub mod forecast_port;
pub mod series_port;
