use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;
use thiserror::Error;

use leo_handover::batch::{predict_all, BatchError};
use leo_handover::config::{parse_duration, Config, ConfigError};
use leo_handover::ephemeris::{GeoLocation, TleEphemeris};
use leo_handover::events::{corroborate, EventError, EventTriggerEngine, RecordedSeries};
use leo_handover::handover::{
    PredictError, PredictionRecord, PredictionRequest, TwoPointPredictor,
};
use leo_handover::records::{JsonLinesRecorder, RecordError};

#[derive(Parser)]
#[command(name = "leo-handover")]
#[command(about = "LEO satellite handover prediction and event detection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and its TLE folder
    Validate { config: String },
    /// Predict the next handover for one UE
    Predict {
        #[arg(long)]
        config: String,
        #[arg(long)]
        ue: String,
        /// RFC 3339 start time, defaults to now
        #[arg(long)]
        t0: Option<String>,
        /// Prediction horizon, e.g. "5s"
        #[arg(long)]
        delta_t: Option<String>,
        /// Bisection precision, e.g. "100ms"
        #[arg(long)]
        precision: Option<String>,
        /// UE position as "lat, lon", defaults to the configured observer
        #[arg(long)]
        coordinates: Option<String>,
    },
    /// Run many prediction requests concurrently
    Batch {
        #[arg(long)]
        config: String,
        /// YAML list of prediction requests
        #[arg(long)]
        requests: String,
    },
    /// Detect A4/A5 events in recorded measurement history
    Detect {
        #[arg(long)]
        config: String,
        /// JSON list of per-satellite measurement series
        #[arg(long)]
        series: String,
        /// Saved prediction record to corroborate against the events
        #[arg(long)]
        record: Option<String>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Predict(#[from] PredictError),
    #[error("{0}")]
    Events(#[from] EventError),
    #[error("{0}")]
    Records(#[from] RecordError),
    #[error("{0}")]
    Batch(#[from] BatchError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{0}")]
    Usage(String),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Predict {
            config,
            ue,
            t0,
            delta_t,
            precision,
            coordinates,
        } => predict(
            &config,
            ue,
            t0.as_deref(),
            delta_t.as_deref(),
            precision.as_deref(),
            coordinates.as_deref(),
        ),
        Commands::Batch { config, requests } => batch(&config, &requests),
        Commands::Detect {
            config,
            series,
            record,
        } => detect(&config, &series, record.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn config_dir(path: &str) -> PathBuf {
    Path::new(path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

fn validate(path: &str) -> Result<(), CliError> {
    let config = Config::from_file(path)?;
    let ephemeris = config.tle_ephemeris(&config_dir(path))?;
    let location = config.location()?;
    let profile = config.profile()?;

    println!("Configuration is valid");
    println!(
        "  observer: {:.4}, {:.4} ({} m)",
        location.latitude_deg, location.longitude_deg, location.altitude_m
    );
    println!(
        "  constellation: {} ({} km, {} GHz)",
        profile.name, profile.altitude_km, profile.frequency_ghz
    );
    println!("  propagation: {}", config.propagation.mode);
    println!("  satellites loaded: {}", ephemeris.catalog().len());
    println!(
        "  A4: {}, A5: {}",
        if config.events.a4.is_some() { "on" } else { "off" },
        if config.events.a5.is_some() { "on" } else { "off" }
    );
    Ok(())
}

fn build_predictor(
    path: &str,
    config: &Config,
) -> Result<TwoPointPredictor<TleEphemeris>, CliError> {
    let ephemeris = config.tle_ephemeris(&config_dir(path))?;
    let predictor = TwoPointPredictor::new(config.selector(ephemeris)?);
    Ok(match &config.records {
        Some(records) => {
            let recorder = JsonLinesRecorder::open(config_dir(path).join(&records.path))?;
            log::info!("Recording predictions to {}", recorder.path().display());
            predictor.with_hook(Arc::new(recorder))
        }
        None => predictor,
    })
}

fn predict(
    path: &str,
    ue_id: String,
    t0: Option<&str>,
    delta_t: Option<&str>,
    precision: Option<&str>,
    coordinates: Option<&str>,
) -> Result<(), CliError> {
    let config = Config::from_file(path)?;

    let t0 = match t0 {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| CliError::Usage(format!("--t0: {}", e)))?,
        None => Utc::now(),
    };
    let delta_t = match delta_t {
        Some(s) => parse_duration(s).map_err(|e| CliError::Usage(format!("--delta-t: {}", e)))?,
        None => config.delta_t()?,
    };
    let precision_threshold = match precision {
        Some(s) => {
            parse_duration(s).map_err(|e| CliError::Usage(format!("--precision: {}", e)))?
        }
        None => config.precision()?,
    };
    let location = match coordinates {
        Some(s) => GeoLocation::from_coordinates(s, None)
            .ok_or_else(|| CliError::Usage(format!("--coordinates: cannot parse {:?}", s)))?,
        None => config.location()?,
    };

    let predictor = build_predictor(path, &config)?;
    let record = predictor.predict(&PredictionRequest {
        ue_id,
        location,
        t0,
        delta_t,
        precision_threshold,
    })?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn batch(path: &str, requests_path: &str) -> Result<(), CliError> {
    let config = Config::from_file(path)?;
    let requests: Vec<PredictionRequest> =
        serde_yaml::from_str(&fs::read_to_string(requests_path)?)?;
    let predictor = Arc::new(build_predictor(path, &config)?);

    let runtime = tokio::runtime::Runtime::new()?;
    let outcomes = runtime.block_on(predict_all(predictor, requests))?;

    let report: Vec<_> = outcomes
        .into_iter()
        .map(|outcome| match outcome.result {
            Ok(record) => json!({ "ue_id": outcome.ue_id, "record": record }),
            Err(e) => json!({ "ue_id": outcome.ue_id, "error": e.to_string() }),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn detect(path: &str, series_path: &str, record_path: Option<&str>) -> Result<(), CliError> {
    let config = Config::from_file(path)?;
    if config.events.a4.is_none() && config.events.a5.is_none() {
        return Err(CliError::Usage(
            "no A4 or A5 rule configured under events".to_string(),
        ));
    }

    let recorded: Vec<RecordedSeries> = serde_json::from_str(&fs::read_to_string(series_path)?)?;
    let engine = EventTriggerEngine::new();

    let mut events = Vec::new();
    for entry in recorded {
        let (satellite_id, series) = entry.into_series()?;
        events.extend(engine.detect_events(
            &satellite_id,
            &series,
            config.events.a4.as_ref(),
            config.events.a5.as_ref(),
        )?);
    }
    events.sort_by_key(|e| e.trigger_time);

    let corroboration = match record_path {
        Some(p) => {
            let record: PredictionRecord = serde_json::from_str(&fs::read_to_string(p)?)?;
            Some(corroborate(
                &record,
                &events,
                config.corroboration_tolerance()?,
            ))
        }
        None => None,
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "events": events,
            "corroboration": corroboration,
        }))?
    );
    Ok(())
}
