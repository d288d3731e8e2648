//! Configuration validation.
//!
//! Checks every game setting before a session is built, so that a bad file
//! fails with the offending section and key instead of mid-round.

use crate::domain::error::ForecastGameError;
use crate::domain::forecast::ModelKind;
use crate::domain::forecast::arima::InformationCriterion;
use crate::domain::window::{DEFAULT_TRAIN_LENGTH, DEFAULT_WINDOW_LENGTH};
use crate::ports::config_port::ConfigPort;

pub fn validate_game_config(config: &dyn ConfigPort) -> Result<(), ForecastGameError> {
    validate_series_dir(config)?;
    validate_round(config)?;
    validate_model(config)?;
    validate_web(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ForecastGameError {
    ForecastGameError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Reads an optional non-negative integer. Present but unparsable values are
/// errors rather than silently falling back to the default.
fn optional_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<usize>, ForecastGameError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("{} must be a non-negative integer", key))),
    }
}

fn validate_series_dir(config: &dyn ConfigPort) -> Result<(), ForecastGameError> {
    match config.get_string("data", "series_dir") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(ForecastGameError::ConfigMissing {
            section: "data".to_string(),
            key: "series_dir".to_string(),
        }),
    }
}

fn validate_round(config: &dyn ConfigPort) -> Result<(), ForecastGameError> {
    let window = optional_usize(config, "round", "window_length")?.unwrap_or(DEFAULT_WINDOW_LENGTH);
    let train = optional_usize(config, "round", "train_length")?.unwrap_or(DEFAULT_TRAIN_LENGTH);

    if window == 0 {
        return Err(invalid("round", "window_length", "window_length must be positive"));
    }
    if train == 0 {
        return Err(invalid("round", "train_length", "train_length must be positive"));
    }
    if train >= window {
        return Err(invalid(
            "round",
            "train_length",
            "train_length must be less than window_length",
        ));
    }

    if optional_usize(config, "round", "max_draw_attempts")? == Some(0) {
        return Err(invalid(
            "round",
            "max_draw_attempts",
            "max_draw_attempts must be at least 1",
        ));
    }

    if let Some(seed) = config.get_string("round", "seed") {
        if seed.trim().parse::<u64>().is_err() {
            return Err(invalid("round", "seed", "seed must be an unsigned integer"));
        }
    }
    Ok(())
}

fn validate_model(config: &dyn ConfigPort) -> Result<(), ForecastGameError> {
    if let Some(kind) = config.get_string("model", "kind") {
        kind.parse::<ModelKind>()
            .map_err(|reason| invalid("model", "kind", reason))?;
    }
    if let Some(ic) = config.get_string("model", "information_criterion") {
        ic.parse::<InformationCriterion>()
            .map_err(|reason| invalid("model", "information_criterion", reason))?;
    }
    if let Some(raw) = config.get_string("model", "stepwise") {
        if !matches!(
            raw.trim().to_lowercase().as_str(),
            "true" | "false" | "yes" | "no" | "1" | "0"
        ) {
            return Err(invalid("model", "stepwise", "stepwise must be true or false"));
        }
    }

    for key in ["max_p", "max_d", "max_q", "max_order", "start_p", "start_q"] {
        optional_usize(config, "model", key)?;
    }
    if optional_usize(config, "model", "max_steps")? == Some(0) {
        return Err(invalid("model", "max_steps", "max_steps must be at least 1"));
    }
    Ok(())
}

fn validate_web(config: &dyn ConfigPort) -> Result<(), ForecastGameError> {
    if let Some(listen) = config.get_string("web", "listen") {
        if listen.trim().parse::<std::net::SocketAddr>().is_err() {
            return Err(invalid(
                "web",
                "listen",
                "listen must be a socket address such as 127.0.0.1:5000",
            ));
        }
    }
    if optional_usize(config, "web", "fit_timeout_secs")? == Some(0) {
        return Err(invalid(
            "web",
            "fit_timeout_secs",
            "fit_timeout_secs must be at least 1",
        ));
    }
    Ok(())
}
