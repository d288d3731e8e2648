//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter::CsvSeriesStore;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::validate_game_config;
use crate::domain::error::ForecastGameError;
use crate::domain::forecast::arima::InformationCriterion;
use crate::domain::forecast::{AutoArimaConfig, ModelKind, build_model};
use crate::domain::session::{
    DEFAULT_MAX_DRAW_ATTEMPTS, RoundConfig, RoundSession, ScoreState, SubmitResult, Winner,
    shared_pool,
};
use crate::domain::window::{DEFAULT_TRAIN_LENGTH, DEFAULT_WINDOW_LENGTH, WindowConfig};
use crate::ports::config_port::ConfigPort;
use crate::ports::series_port::SeriesStore;

/// Training values shown before the player is asked for a forecast.
const SHOWN_TRAIN_TAIL: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "forecast-duel", about = "Out-forecast an ARIMA model on real price history")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play rounds in the terminal
    Play {
        #[arg(short, long)]
        config: PathBuf,
        /// Stop after this many resolved rounds
        #[arg(long)]
        rounds: Option<u64>,
    },
    /// List series in the data directory
    ListSeries {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a game configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Start the web server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Play { config, rounds } => run_play(&config, rounds),
        Command::ListSeries { config } => run_list_series(&config),
        Command::Validate { config } => run_validate(&config),
        Command::Serve { config } => run_serve(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn fail(err: &ForecastGameError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn series_dir(config: &dyn ConfigPort) -> Result<PathBuf, ForecastGameError> {
    config
        .get_string("data", "series_dir")
        .map(PathBuf::from)
        .ok_or_else(|| ForecastGameError::ConfigMissing {
            section: "data".into(),
            key: "series_dir".into(),
        })
}

/// Expects a config that already passed `validate_game_config`.
pub fn build_round_config(config: &dyn ConfigPort) -> RoundConfig {
    RoundConfig {
        window: WindowConfig {
            window_length: config.get_int("round", "window_length", DEFAULT_WINDOW_LENGTH as i64)
                as usize,
            train_length: config.get_int("round", "train_length", DEFAULT_TRAIN_LENGTH as i64)
                as usize,
        },
        max_draw_attempts: config.get_int(
            "round",
            "max_draw_attempts",
            DEFAULT_MAX_DRAW_ATTEMPTS as i64,
        ) as usize,
        seed: config
            .get_string("round", "seed")
            .and_then(|s| s.parse().ok()),
    }
}

pub fn build_model_kind(config: &dyn ConfigPort) -> Result<ModelKind, ForecastGameError> {
    match config.get_string("model", "kind") {
        None => Ok(ModelKind::Arima),
        Some(raw) => raw.parse().map_err(|reason| ForecastGameError::ConfigInvalid {
            section: "model".into(),
            key: "kind".into(),
            reason,
        }),
    }
}

pub fn build_arima_config(config: &dyn ConfigPort) -> Result<AutoArimaConfig, ForecastGameError> {
    let defaults = AutoArimaConfig::default();
    let order = |key: &str, default: usize| config.get_int("model", key, default as i64) as usize;

    let criterion = match config.get_string("model", "information_criterion") {
        None => defaults.criterion,
        Some(raw) => raw
            .parse::<InformationCriterion>()
            .map_err(|reason| ForecastGameError::ConfigInvalid {
                section: "model".into(),
                key: "information_criterion".into(),
                reason,
            })?,
    };

    Ok(AutoArimaConfig {
        max_p: order("max_p", defaults.max_p),
        max_d: order("max_d", defaults.max_d),
        max_q: order("max_q", defaults.max_q),
        max_order: order("max_order", defaults.max_order),
        start_p: order("start_p", defaults.start_p),
        start_q: order("start_q", defaults.start_q),
        max_steps: order("max_steps", defaults.max_steps),
        stepwise: config.get_bool("model", "stepwise", defaults.stepwise),
        criterion,
    })
}

/// Validates `config` and builds a session over its CSV directory with round 0
/// ready.
pub fn build_session(config: &dyn ConfigPort) -> Result<RoundSession, ForecastGameError> {
    validate_game_config(config)?;
    let store = Arc::new(CsvSeriesStore::new(series_dir(config)?));
    let pool = shared_pool(store.as_ref())?;
    let model = build_model(build_model_kind(config)?, build_arima_config(config)?);
    tracing::info!(
        dir = %store.base_path().display(),
        series = pool.lock().map(|p| p.all_ids().len()).unwrap_or_default(),
        model = model.name(),
        "starting session"
    );
    RoundSession::start(store, model, pool, build_round_config(config))
}

/// Parses a comma-separated forecast. Length is checked by the session.
pub fn parse_forecast_input(line: &str) -> Result<Vec<f64>, String> {
    line.split(',')
        .map(str::trim)
        .enumerate()
        .map(|(i, raw)| match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(format!("value {} ('{}') is not a finite number", i + 1, raw)),
        })
        .collect()
}

fn format_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{:.2}", v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_round<W: Write>(session: &RoundSession, out: &mut W) -> io::Result<()> {
    let snap = session.snapshot(false);
    let tail_start = snap.train_segment.len().saturating_sub(SHOWN_TRAIN_TAIL);

    writeln!(out)?;
    writeln!(
        out,
        "Round {}: {} ({} to {})",
        snap.round_number + 1,
        snap.instrument_id,
        snap.start_date,
        snap.end_date
    )?;
    writeln!(
        out,
        "  Last {} closes:  {}",
        snap.train_segment.len() - tail_start,
        format_values(&snap.train_segment[tail_start..])
    )?;
    writeln!(
        out,
        "  {} forecast:  {}",
        snap.model_label,
        format_values(&snap.model_forecast)
    )?;
    writeln!(
        out,
        "Enter {} comma-separated values (q to quit)",
        snap.model_forecast.len()
    )
}

fn print_result<W: Write>(result: &SubmitResult, out: &mut W) -> io::Result<()> {
    writeln!(out, "  Actual:       {}", format_values(&result.eval_segment))?;
    writeln!(out, "  Your MSE:     {:.4}", result.mse_player)?;
    writeln!(out, "  Model MSE:    {:.4}", result.mse_model)?;
    match result.winner {
        Winner::Player => writeln!(out, "  You win this round!")?,
        Winner::Model => writeln!(out, "  The model wins this round.")?,
    }
    writeln!(
        out,
        "  Score: you {} - model {}",
        result.scores.wins_player, result.scores.wins_model
    )
}

/// Drives the terminal game over `input` until EOF, `q`, or `rounds` resolved
/// rounds. Invalid input is reported and re-prompted on the same round.
pub fn play_rounds<R: BufRead, W: Write>(
    session: &mut RoundSession,
    mut input: R,
    out: &mut W,
    rounds: Option<u64>,
) -> Result<ScoreState, ForecastGameError> {
    let mut played = 0;
    loop {
        print_round(session, out)?;

        let result = loop {
            write!(out, "forecast> ")?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Ok(session.scores());
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line, "q" | "quit" | "exit") {
                return Ok(session.scores());
            }

            let values = match parse_forecast_input(line) {
                Ok(v) => v,
                Err(reason) => {
                    writeln!(out, "  invalid forecast: {}", reason)?;
                    continue;
                }
            };
            match session.submit(&values) {
                Ok(result) => break result,
                Err(e @ ForecastGameError::LengthMismatch { .. }) => {
                    writeln!(out, "  {}", e)?;
                }
                Err(e) => return Err(e),
            }
        };

        print_result(&result, out)?;
        played += 1;
        if rounds.is_some_and(|n| played >= n) {
            return Ok(session.scores());
        }
        session.new_round()?;
    }
}

fn run_play(config_path: &Path, rounds: Option<u64>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let mut session = match build_session(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    match play_rounds(&mut session, stdin.lock(), &mut stdout, rounds) {
        Ok(scores) => {
            eprintln!(
                "\nFinal score after {} rounds: you {} - model {}",
                scores.rounds_played(),
                scores.wins_player,
                scores.wins_model
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_list_series(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let dir = match series_dir(&config) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };

    let store = CsvSeriesStore::new(dir);
    let ids = match store.list_ids() {
        Ok(ids) => ids,
        Err(e) => return fail(&e),
    };

    let mut readable = 0;
    for id in &ids {
        match store.load(id) {
            Ok(series) => {
                readable += 1;
                match series.date_range() {
                    Some((start, end)) => {
                        println!("{}: {} rows, {} to {}", id, series.len(), start, end)
                    }
                    None => println!("{}: no rows", id),
                }
            }
            Err(e) => eprintln!("{}: unreadable ({})", id, e),
        }
    }
    eprintln!("{} series found, {} readable", ids.len(), readable);
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = validate_game_config(&config) {
        return fail(&e);
    }

    let round = build_round_config(&config);
    let kind = match build_model_kind(&config) {
        Ok(k) => k,
        Err(e) => return fail(&e),
    };
    eprintln!(
        "  window: {} points, {} to train, {} to forecast",
        round.window.window_length,
        round.window.train_length,
        round.window.horizon()
    );
    eprintln!("  model:  {}", kind);
    match round.seed {
        Some(seed) => eprintln!("  seed:   {}", seed),
        None => eprintln!("  seed:   random"),
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_serve(config_path: &Path) -> ExitCode {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, build_router};
        use crate::domain::session::SharedSession;
        use std::net::SocketAddr;
        use std::time::Duration;

        eprintln!("Loading config from {}", config_path.display());
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(code) => return code,
        };

        let session = match build_session(&config) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };

        // validate_game_config has already checked the address
        let addr: SocketAddr = match config
            .get_string("web", "listen")
            .unwrap_or_else(|| "127.0.0.1:5000".to_string())
            .parse()
        {
            Ok(a) => a,
            Err(e) => {
                eprintln!("error: invalid listen address: {e}");
                return ExitCode::from(2);
            }
        };
        let static_dir = config
            .get_string("web", "static_dir")
            .unwrap_or_else(|| "static".to_string());

        let mut state = AppState::new(SharedSession::new(session));
        state.fit_timeout =
            Duration::from_secs(config.get_int("web", "fit_timeout_secs", 30).max(1) as u64);
        let router = build_router(state, Path::new(&static_dir));

        let runtime = match tokio::runtime::Runtime::new() {
            Ok(r) => r,
            Err(e) => return fail(&ForecastGameError::Io(e)),
        };

        eprintln!("Starting web server on {}", addr);
        let served = runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, router).await
        });

        match served {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(&ForecastGameError::Io(e)),
        }
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        eprintln!("error: web feature is required for serve");
        ExitCode::from(1)
    }
}
