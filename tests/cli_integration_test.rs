//! CLI integration tests.
//!
//! Tests cover:
//! - Config building (build_round_config, build_arima_config, build_model_kind)
//! - Session construction from INI files and CSV directories on disk
//! - The terminal play loop, including re-prompting on bad input

mod common;

use common::*;
use forecast_duel::adapters::file_config_adapter::FileConfigAdapter;
use forecast_duel::cli;
use forecast_duel::domain::error::ForecastGameError;
use forecast_duel::domain::forecast::ModelKind;
use forecast_duel::domain::forecast::arima::InformationCriterion;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[data]
series_dir = stock_data

[round]
window_length = 80
train_length = 70
max_draw_attempts = 3
seed = 7

[model]
kind = arima
information_criterion = aicc
stepwise = true
max_p = 4
max_d = 1
max_q = 3
max_order = 6
start_p = 1
start_q = 1
max_steps = 40

[web]
listen = 0.0.0.0:8080
fit_timeout_secs = 10
static_dir = public
"#;

/// Series directory with two playable instruments and a config pointing at it.
fn game_fixture(kind: &str) -> (TempDir, FileConfigAdapter) {
    let dir = TempDir::new().unwrap();
    let series = dir.path().join("series");
    std::fs::create_dir(&series).unwrap();
    write_series_csv(&series, "AAPL", &generate_rows(150, 180.0));
    write_series_csv(&series, "MSFT", &generate_rows(150, 370.0));

    let ini = format!(
        "[data]\nseries_dir = {}\n\n[round]\nseed = 99\n\n[model]\nkind = {}\n",
        series.display(),
        kind
    );
    let config = FileConfigAdapter::from_string(&ini).unwrap();
    (dir, config)
}

fn zeros_line(n: usize) -> String {
    vec!["0"; n].join(",")
}

mod config_building {
    use super::*;

    #[test]
    fn round_config_from_full_ini() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let round = cli::build_round_config(&adapter);

        assert_eq!(round.window.window_length, 80);
        assert_eq!(round.window.train_length, 70);
        assert_eq!(round.window.horizon(), 10);
        assert_eq!(round.max_draw_attempts, 3);
        assert_eq!(round.seed, Some(7));
    }

    #[test]
    fn arima_config_from_full_ini() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let arima = cli::build_arima_config(&adapter).unwrap();

        assert_eq!(arima.criterion, InformationCriterion::Aicc);
        assert!(arima.stepwise);
        assert_eq!(arima.max_p, 4);
        assert_eq!(arima.max_d, 1);
        assert_eq!(arima.max_q, 3);
        assert_eq!(arima.max_order, 6);
        assert_eq!(arima.start_p, 1);
        assert_eq!(arima.start_q, 1);
        assert_eq!(arima.max_steps, 40);
    }

    #[test]
    fn unknown_criterion_is_config_invalid() {
        let adapter =
            FileConfigAdapter::from_string("[model]\ninformation_criterion = hqic\n").unwrap();
        let err = cli::build_arima_config(&adapter).unwrap_err();
        assert!(
            matches!(err, ForecastGameError::ConfigInvalid { key, .. } if key == "information_criterion")
        );
    }

    #[test]
    fn model_kind_variants() {
        let naive = FileConfigAdapter::from_string("[model]\nkind = naive\n").unwrap();
        assert_eq!(cli::build_model_kind(&naive).unwrap(), ModelKind::Naive);

        let bad = FileConfigAdapter::from_string("[model]\nkind = prophet\n").unwrap();
        assert!(matches!(
            cli::build_model_kind(&bad).unwrap_err(),
            ForecastGameError::ConfigInvalid { .. }
        ));
    }

    #[test]
    fn series_dir_is_required() {
        let adapter = FileConfigAdapter::from_string("[round]\nseed = 1\n").unwrap();
        assert!(matches!(
            cli::series_dir(&adapter).unwrap_err(),
            ForecastGameError::ConfigMissing { key, .. } if key == "series_dir"
        ));
    }

    #[test]
    fn load_config_from_disk() {
        let file = write_temp_ini(VALID_INI);
        let adapter = cli::load_config(file.path()).unwrap();
        assert_eq!(cli::build_round_config(&adapter).seed, Some(7));
    }

    #[test]
    fn load_config_missing_file_fails() {
        assert!(cli::load_config(Path::new("/nonexistent/game.ini")).is_err());
    }
}

mod session_building {
    use super::*;

    #[test]
    fn build_session_over_csv_directory() {
        let (_dir, config) = game_fixture("naive");
        let session = cli::build_session(&config).unwrap();

        assert_eq!(session.round_number(), 0);
        assert_eq!(session.model_name(), "naive");
        assert!(["AAPL", "MSFT"].contains(&session.window().series_id.as_str()));
        assert_eq!(session.window().train_segment.len(), 90);
    }

    #[test]
    fn build_session_rejects_invalid_config() {
        let config = FileConfigAdapter::from_string(
            "[data]\nseries_dir = somewhere\n[round]\nwindow_length = 10\ntrain_length = 20\n",
        )
        .unwrap();
        let err = cli::build_session(&config).err().unwrap();
        assert!(matches!(err, ForecastGameError::ConfigInvalid { .. }));
    }

    #[test]
    fn build_session_with_missing_directory_is_io_error() {
        let config =
            FileConfigAdapter::from_string("[data]\nseries_dir = /nonexistent/series\n").unwrap();
        let err = cli::build_session(&config).err().unwrap();
        assert!(matches!(err, ForecastGameError::Io(_)));
    }

    #[test]
    fn build_session_with_empty_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let ini = format!("[data]\nseries_dir = {}\n", dir.path().display());
        let config = FileConfigAdapter::from_string(&ini).unwrap();
        let err = cli::build_session(&config).err().unwrap();
        assert!(matches!(err, ForecastGameError::PoolExhaustedPermanently));
    }
}

mod play_loop {
    use super::*;

    #[test]
    fn bad_input_is_reprompted_on_the_same_round() {
        let (_dir, config) = game_fixture("naive");
        let mut session = cli::build_session(&config).unwrap();
        let series = session.window().series_id.clone();

        let input = format!("1,2\nabc\n\n{}\n", zeros_line(10));
        let mut out = Vec::new();
        let scores =
            cli::play_rounds(&mut session, Cursor::new(input), &mut out, Some(1)).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("expected 10 values, got 2"));
        assert!(out.contains("invalid forecast"));
        assert!(out.contains("The model wins this round."));
        assert_eq!(scores.wins_model, 1);
        assert_eq!(scores.wins_player, 0);
        assert_eq!(session.window().series_id, series);
        assert_eq!(session.round_number(), 0);
    }

    #[test]
    fn plays_until_end_of_input() {
        let (_dir, config) = game_fixture("naive");
        let mut session = cli::build_session(&config).unwrap();

        let input = format!("{0}\n{0}\n", zeros_line(10));
        let mut out = Vec::new();
        let scores = cli::play_rounds(&mut session, Cursor::new(input), &mut out, None).unwrap();

        assert_eq!(scores.rounds_played(), 2);
        // a third round was dealt and left unanswered
        assert_eq!(session.round_number(), 2);
        assert!(!session.is_resolved());
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Round 3:"));
    }

    #[test]
    fn quit_stops_without_scoring() {
        let (_dir, config) = game_fixture("naive");
        let mut session = cli::build_session(&config).unwrap();

        let mut out = Vec::new();
        let scores =
            cli::play_rounds(&mut session, Cursor::new("q\n"), &mut out, None).unwrap();
        assert_eq!(scores.rounds_played(), 0);
        assert!(!session.is_resolved());
    }

    #[test]
    fn exact_answer_wins() {
        let (_dir, config) = game_fixture("naive");
        let mut session = cli::build_session(&config).unwrap();
        let answer = session
            .window()
            .eval_segment
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let mut out = Vec::new();
        let scores = cli::play_rounds(
            &mut session,
            Cursor::new(format!("{}\n", answer)),
            &mut out,
            Some(1),
        )
        .unwrap();
        assert_eq!(scores.wins_player, 1);
        assert!(String::from_utf8(out).unwrap().contains("You win this round!"));
    }

    #[test]
    fn arima_session_plays_a_round() {
        let (_dir, config) = game_fixture("arima");
        let mut session = cli::build_session(&config).unwrap();
        assert!(session.model_forecast().label.starts_with("ARIMA("));

        let mut out = Vec::new();
        let scores = cli::play_rounds(
            &mut session,
            Cursor::new(format!("{}\n", zeros_line(10))),
            &mut out,
            Some(1),
        )
        .unwrap();
        assert_eq!(scores.wins_model, 1);
    }
}
