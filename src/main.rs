//! Fraud Batch Scorer - Main Entry Point
//!
//! Scores CSV uploads or synthetic samples against the configured model and
//! writes the augmented tables and JSON reports.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fraud_batch_scorer::{
    config::{AppConfig, LoggingConfig},
    models::shared_model,
    pipeline::ScoringPipeline,
    samples::SampleKind,
    ScoringError, Verdict,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fraud-scorer")]
#[command(about = "Score transaction uploads with a pre-trained fraud model", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score one or more CSV uploads; each file is an independent request
    Score {
        /// CSV files to score
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Directory for scored tables (defaults to output.output_dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Also write a JSON report per upload
        #[arg(long)]
        report: bool,
    },
    /// Score a synthetic transaction
    Sample {
        /// legit (all features 0) or fraud (all features 1)
        #[arg(short, long, default_value = "legit")]
        kind: SampleKind,
    },
    /// Print the model's expected feature order
    Features,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    init_tracing(&config.logging)?;

    info!("Starting Fraud Batch Scorer");

    let model = shared_model(&config).context("Failed to load fraud model")?;
    let pipeline = ScoringPipeline::new(model, &config);

    let ok = match cli.command {
        Command::Score {
            input,
            output_dir,
            report,
        } => {
            let output_dir =
                output_dir.unwrap_or_else(|| PathBuf::from(&config.output.output_dir));
            score_files(&pipeline, &input, &output_dir, report)?
        }
        Command::Sample { kind } => score_sample(&pipeline, kind),
        Command::Features => {
            for (position, name) in pipeline.feature_names().iter().enumerate() {
                println!("{:>3}  {}", position, name);
            }
            true
        }
    };

    pipeline.metrics().print_summary();

    if !ok {
        std::process::exit(2);
    }
    Ok(())
}

/// Initialize logging from config; `RUST_LOG` takes precedence over `logging.level`
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => tracing_subscriber::EnvFilter::new("warn")
            .add_directive(format!("fraud_batch_scorer={}", logging.level).parse()?)
            .add_directive(format!("fraud_scorer={}", logging.level).parse()?),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// Score each file independently; returns false if any upload failed
fn score_files(
    pipeline: &ScoringPipeline,
    inputs: &[PathBuf],
    output_dir: &Path,
    write_report: bool,
) -> Result<bool> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

    let mut all_ok = true;
    for path in inputs {
        let source = path.display().to_string();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let result = pipeline.score_file(path).and_then(|outcome| {
            pipeline
                .export(&outcome, output_dir, &stem, write_report)
                .map(|exported| (outcome, exported))
        });

        match result {
            Ok((outcome, exported)) => println!(
                "{}: {} rows | legit {} | fraud {} ({:.2}%) -> {}",
                source,
                outcome.summary.total,
                outcome.summary.legit_count,
                outcome.summary.fraud_count,
                outcome.summary.fraud_rate() * 100.0,
                exported.table.display()
            ),
            Err(e) => {
                report_failure(&source, &e);
                all_ok = false;
            }
        }
    }

    info!(
        scored = pipeline.metrics().batches_scored.load(Ordering::Relaxed),
        failed = pipeline.metrics().batches_failed.load(Ordering::Relaxed),
        "Finished scoring uploads"
    );

    Ok(all_ok)
}

fn score_sample(pipeline: &ScoringPipeline, kind: SampleKind) -> bool {
    match pipeline.score_sample(kind) {
        Ok(single) => {
            match single.verdict {
                Verdict::Fraud => println!(
                    "Fraudulent Transaction Detected\nConfidence: {:.2}%",
                    single.confidence * 100.0
                ),
                Verdict::Legit => println!(
                    "Legitimate Transaction\nConfidence: {:.2}%",
                    single.confidence * 100.0
                ),
            }
            true
        }
        Err(e) => {
            report_failure(&format!("{} sample", kind), &e);
            false
        }
    }
}

/// User-facing error line; the pipeline has already logged the details
fn report_failure(source: &str, e: &ScoringError) {
    eprintln!("{}: {}", source, e);
}
