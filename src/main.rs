use analyzer::{SummaryCell, TestOutcome};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use configuration::{Config, LoggingSettings, ParameterOverrides, load_config};
use core_types::Dataset;
use engine::{BatteryReport, Engine};
use indicatif::{ProgressBar, ProgressStyle};
use simulator::SyntheticDataset;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// The main entry point for the FraudLens application.
fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    // Keep the guard alive so the file writer flushes on exit.
    let _log_guard = init_tracing(&config.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Run(args) => handle_run(args, config),
        Commands::Demo(args) => handle_demo(args, config),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Statistical screening of reported fund returns for signs of misreporting.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./fraudlens.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the test battery over a JSON dataset.
    Run(RunArgs),
    /// Run the test battery over a generated clean dataset.
    Demo(DemoArgs),
}

#[derive(Parser)]
struct RunArgs {
    /// Dataset file: { dates, entities: [{ name, returns, group? }], factors: { names, columns } }.
    #[arg(long)]
    dataset: PathBuf,

    /// Print the full report as JSON instead of the summary table.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    overrides: ParameterOverrides,
}

#[derive(Parser)]
struct DemoArgs {
    /// Number of generated entities.
    #[arg(long, default_value_t = 3)]
    entities: usize,

    /// Monthly observations per entity.
    #[arg(long, default_value_t = 252)]
    observations: usize,

    /// Number of style factors.
    #[arg(long, default_value_t = 3)]
    factors: usize,

    /// Print the full report as JSON instead of the summary table.
    #[arg(long)]
    json: bool,

    // `--seed` seeds both the generated dataset and the Monte Carlo draws.
    #[command(flatten)]
    overrides: ParameterOverrides,
}

// ==============================================================================
// Logging
// ==============================================================================

/// Installs the stderr subscriber, plus a daily-rolling file when a log directory is set.
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .context("Invalid log filter")?;

    let (file_layer, guard) = match &settings.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "fraudlens.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    Ok(guard)
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn handle_run(args: RunArgs, config: Config) -> Result<()> {
    let dataset = load_dataset(&args.dataset)?;
    execute(&dataset, config, &args.overrides, args.json)
}

fn handle_demo(args: DemoArgs, config: Config) -> Result<()> {
    let dataset = SyntheticDataset {
        entities: args.entities,
        observations: args.observations,
        factors: args.factors,
        seed: args.overrides.seed.unwrap_or_default(),
        ..Default::default()
    }
    .build()
    .context("Failed to generate the demo dataset")?;
    execute(&dataset, config, &args.overrides, args.json)
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open dataset '{}'", path.display()))?;
    let dataset: Dataset = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse dataset '{}'", path.display()))?;
    tracing::info!(
        path = %path.display(),
        entities = dataset.entities().len(),
        observations = dataset.observations(),
        "Dataset loaded."
    );
    Ok(dataset)
}

/// Applies the command-line overrides, runs the battery and prints the result.
fn execute(
    dataset: &Dataset,
    mut config: Config,
    overrides: &ParameterOverrides,
    json: bool,
) -> Result<()> {
    config.parameters.apply(overrides);
    let engine = Engine::new(config.parameters, &config.engine)?;

    // Set up the progress bar
    let progress_bar = ProgressBar::new(dataset.entities().len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("=>-"),
    );

    let result = engine.run_with_progress(dataset, |aggregate| {
        progress_bar.set_message(aggregate.entity.clone());
        progress_bar.inc(1);
    });
    progress_bar.finish_and_clear();
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

// ==============================================================================
// Rendering
// ==============================================================================

fn print_summary(report: &BatteryReport) {
    let summary = &report.summary;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("Test")];
    header.extend(summary.columns().iter().map(Cell::new));
    table.set_header(header);

    for (r, label) in summary.rows().iter().enumerate() {
        let mut row = vec![Cell::new(label)];
        row.extend(summary.row(r).unwrap_or_default().iter().map(summary_cell));
        table.add_row(row);
    }

    println!("{table}");
    println!("Seed: {}", report.seed);

    let results = &report.results;
    let mut errors = Vec::new();
    for r in 0..results.rows().len() {
        for c in 0..results.columns().len() {
            if let Some(TestOutcome::Errored {
                kind,
                entity,
                message,
            }) = results.get(r, c)
            {
                errors.push(format!("  {} / {}: {}", entity, kind, message));
            }
        }
    }
    if !errors.is_empty() {
        println!("\nComputation errors:");
        for line in errors {
            println!("{}", line);
        }
    }
}

fn summary_cell(cell: &SummaryCell) -> Cell {
    match (cell.failure, cell.coefficient) {
        (Some(true), Some(coefficient)) => {
            Cell::new(format!("FAIL ({:.2})", coefficient)).fg(Color::Red)
        }
        (Some(false), Some(coefficient)) => {
            Cell::new(format!("PASS ({:.2})", coefficient)).fg(Color::Green)
        }
        _ => Cell::new("ERROR").fg(Color::Yellow),
    }
}
