//! Afrigrow: Fertilizer recommendation CLI
//!
//! Main entry point for single and batch recommendations.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use afrigrow::application::{BatchRunner, DefaultRecommender};
use afrigrow::config::{LogMode, Settings};
use afrigrow::domain::{CategoricalField, MeasurementInput};
use afrigrow::ports::CategoryEncoder;

/// Fertilizer recommendation from soil and climate measurements
#[derive(Parser, Debug)]
#[command(name = "afrigrow")]
#[command(version)]
#[command(about = "Recommend a fertilizer for a crop and soil", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Directory holding the exported artifacts (overrides AFRIGROW_MODEL_DIR)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Refuse to load artifacts without a matching manifest.json
    #[arg(long, global = true, default_value = "false")]
    require_manifest: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Recommend a fertilizer for one set of measurements
    Recommend {
        /// Soil type, e.g. "Loamy Soil"
        #[arg(long, required_unless_present = "input")]
        soil: Option<String>,

        /// Crop, e.g. "rice"
        #[arg(long, required_unless_present = "input")]
        crop: Option<String>,

        /// Temperature in °C (0-50)
        #[arg(long, default_value = "25.0")]
        temperature: f64,

        /// Soil moisture fraction (0-1)
        #[arg(long, default_value = "0.5")]
        moisture: f64,

        /// Rainfall in mm (0-1000)
        #[arg(long, default_value = "200")]
        rainfall: u32,

        /// Soil pH (0-14)
        #[arg(long, default_value = "6.5")]
        ph: f64,

        /// Organic carbon (0-5)
        #[arg(long, default_value = "1.0")]
        carbon: f64,

        /// Nitrogen level (0-200)
        #[arg(long, default_value = "50")]
        nitrogen: u32,

        /// Phosphorous level (0-200)
        #[arg(long, default_value = "50")]
        phosphorous: u32,

        /// Potassium level (0-200)
        #[arg(long, default_value = "50")]
        potassium: u32,

        /// Read the measurements from a JSON file instead of flags
        #[arg(short, long, conflicts_with_all = ["soil", "crop"])]
        input: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Recommend for every JSON record in a file (one per line)
    Batch {
        /// Path to the JSON Lines file
        file: PathBuf,

        /// Number of worker threads (overrides AFRIGROW_WORKERS)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// List the soil types, crops and fertilizers the artifacts know
    Vocab,
}

fn init_logging(settings: &Settings, verbose: bool) -> Result<WorkerGuard> {
    // Stdout carries results, so logs go to stderr or the log file.
    let (writer, guard) = match settings.log_mode {
        LogMode::File => {
            if let Some(parent) = settings.log_file.parent() {
                // Best-effort: opening the file reports the real failure.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&settings.log_file)
                .with_context(|| format!("Failed to open log file {:?}", settings.log_file))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    let default_level = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    Ok(guard)
}

fn report_failure(cause: &dyn std::fmt::Display) -> ExitCode {
    eprintln!("Could not generate recommendation: {cause}");
    eprintln!("Please check your inputs and try again.");
    ExitCode::FAILURE
}

fn read_input_file(path: &Path) -> Result<MeasurementInput> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {path:?}"))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {path:?}"))
}

fn run_recommend(
    service: &DefaultRecommender,
    input: &MeasurementInput,
    json: bool,
) -> Result<ExitCode> {
    match service.recommend_checked(input) {
        Ok(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{result}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::warn!("Recommendation failed at {} stage", e.stage());
            Ok(report_failure(&e.detail()))
        }
    }
}

fn run_batch(service: DefaultRecommender, file: &Path, workers: usize) -> Result<ExitCode> {
    let rows = BatchRunner::new(service, workers)
        .run_file(file)
        .with_context(|| format!("Failed to read {file:?}"))?;

    let mut failures = 0usize;
    for row in &rows {
        if row.is_failure() {
            failures += 1;
        }
        println!("{}", row.to_json_line()?);
    }

    tracing::info!("Batch finished: {} records, {} failed", rows.len(), failures);

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_vocab(service: &DefaultRecommender) {
    for field in CategoricalField::ALL {
        println!("{field}:");
        for class in service.encoder().classes(field) {
            println!("  {class}");
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(dir) = cli.model_dir {
        settings.model_dir = dir;
    }
    settings.require_manifest |= cli.require_manifest;

    let _guard = init_logging(&settings, cli.verbose)?;

    let service = DefaultRecommender::load(&settings.model_dir, settings.require_manifest)
        .with_context(|| format!("Failed to load artifacts from {:?}", settings.model_dir))?;

    match cli.command {
        Commands::Recommend {
            soil,
            crop,
            temperature,
            moisture,
            rainfall,
            ph,
            carbon,
            nitrogen,
            phosphorous,
            potassium,
            input,
            json,
        } => {
            let input = match input {
                Some(path) => read_input_file(&path)?,
                None => MeasurementInput {
                    temperature: Some(temperature),
                    moisture: Some(moisture),
                    rainfall: Some(rainfall),
                    ph: Some(ph),
                    nitrogen: Some(nitrogen),
                    phosphorous: Some(phosphorous),
                    potassium: Some(potassium),
                    carbon: Some(carbon),
                    soil,
                    crop,
                },
            };
            run_recommend(&service, &input, json)
        }
        Commands::Batch { file, workers } => {
            run_batch(service, &file, workers.unwrap_or(settings.workers))
        }
        Commands::Vocab => {
            print_vocab(&service);
            Ok(ExitCode::SUCCESS)
        }
    }
}
