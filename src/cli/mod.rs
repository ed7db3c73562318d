//! Command-line interface for the streaming clustering pipeline.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::DenStreamConfig;
use crate::core::loaders::load_points_csv;
use crate::core::writers::{write_macro_clusters_csv, write_micro_clusters_csv};
use crate::processors::engine::DenStream;
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "denstream-pipeline")]
#[command(about = "Streaming density-based clustering pipeline", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a points CSV through the engine and write cluster snapshots
    Run {
        /// Input CSV file (one point per row, one attribute per column)
        input: PathBuf,
        /// Output directory for snapshot CSVs
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Decay rate
        #[arg(long)]
        lambda: Option<f64>,
        /// Merge radius
        #[arg(long)]
        epsilon: Option<f64>,
        /// Minimum neighborhood size
        #[arg(long)]
        min_points: Option<usize>,
        /// Core-cluster weight scale
        #[arg(long)]
        mu: Option<f64>,
        /// Potential-cluster weight fraction
        #[arg(long)]
        beta: Option<f64>,
        /// Warm-up buffer size
        #[arg(long)]
        init_points: Option<usize>,
        /// Offline grouping radius as a multiple of epsilon
        #[arg(long)]
        offline_multiplier: Option<f64>,
        /// Points per logical time unit
        #[arg(long)]
        processing_speed: Option<usize>,
        /// Maximum points to ingest (0 = unbounded)
        #[arg(long)]
        max_points: Option<usize>,
    },

    /// Write a default YAML config file
    InitConfig {
        /// Destination path for the config file
        path: PathBuf,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.len() > 39 {
            format!("{}...", &value[..36])
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    // Dispatch to subcommands
    match cli.command {
        Commands::Run {
            input,
            output_dir,
            lambda,
            epsilon,
            min_points,
            mu,
            beta,
            init_points,
            offline_multiplier,
            processing_speed,
            max_points,
        } => {
            let denstream = DenStreamConfig {
                lambda: lambda.unwrap_or(config.denstream.lambda),
                epsilon: epsilon.unwrap_or(config.denstream.epsilon),
                min_points: min_points.unwrap_or(config.denstream.min_points),
                mu: mu.unwrap_or(config.denstream.mu),
                beta: beta.unwrap_or(config.denstream.beta),
                init_points: init_points.unwrap_or(config.denstream.init_points),
                offline_multiplier: offline_multiplier
                    .unwrap_or(config.denstream.offline_multiplier),
                processing_speed: processing_speed.unwrap_or(config.denstream.processing_speed),
            };
            let limit = max_points.unwrap_or(config.stream.max_points);
            cmd_run(&input, output_dir, denstream, config.stream.has_headers, limit);
        }
        Commands::InitConfig { path } => {
            cmd_init_config(&path);
        }
    }
}

fn cmd_run(
    input: &PathBuf,
    output_dir: Option<PathBuf>,
    denstream: DenStreamConfig,
    has_headers: Option<bool>,
    max_points: usize,
) {
    let start = Instant::now();

    let mut engine = match DenStream::new(denstream) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    println!("Running streaming clustering...");
    println!("Input: {}", input.display());
    println!("Parameters:");
    println!("  lambda: {}", engine.config().lambda);
    println!("  epsilon: {}", engine.config().epsilon);
    println!("  min_points: {}", engine.config().min_points);
    println!("  beta*mu: {}", engine.config().weight_bound());
    println!("  init_points: {}", engine.config().init_points);
    println!("  processing_speed: {}", engine.config().processing_speed);

    let spinner = create_spinner("Loading points CSV...");

    let mut points = match load_points_csv(input, has_headers) {
        Ok(points) => points,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed to load points: {}", e);
            std::process::exit(1);
        }
    };

    if max_points > 0 && points.len() > max_points {
        info!("Capping input at {} of {} points", max_points, points.len());
        points.truncate(max_points);
    }

    spinner.set_message("Streaming points through the engine...");

    for (idx, point) in points.iter().enumerate() {
        if let Err(e) = engine.ingest(point) {
            spinner.finish_and_clear();
            error!("Ingest failed at point {}: {}", idx + 1, e);
            std::process::exit(1);
        }
    }

    spinner.set_message("Extracting macro clusters...");
    let macro_clusters = engine.extract();

    spinner.finish_and_clear();

    // Default output directory to the input's parent
    let out_dir = output_dir
        .unwrap_or_else(|| input.parent().unwrap_or(std::path::Path::new(".")).to_path_buf());
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    let micro_path = out_dir.join(format!("{}_micro_clusters.csv", stem));
    let macro_path = out_dir.join(format!("{}_macro_clusters.csv", stem));

    if let Err(e) =
        write_micro_clusters_csv(&micro_path, engine.potential_clusters(), engine.timestamp())
    {
        error!("Failed to write micro snapshot: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = write_macro_clusters_csv(&macro_path, &macro_clusters) {
        error!("Failed to write macro snapshot: {}", e);
        std::process::exit(1);
    }

    info!("Micro snapshot -> {}", micro_path.display());
    info!("Macro snapshot -> {}", macro_path.display());

    print_summary(
        "Streaming Clustering Complete",
        &[
            ("Input file", input.display().to_string()),
            ("Points ingested", points.len().to_string()),
            ("Warm-up points", engine.num_init_points().to_string()),
            ("Logical time", engine.timestamp().to_string()),
            ("Potential clusters", engine.potential_clusters().len().to_string()),
            ("Outlier clusters", engine.outlier_clusters().len().to_string()),
            ("Macro clusters", macro_clusters.len().to_string()),
            ("Micro CSV", micro_path.display().to_string()),
            ("Macro CSV", macro_path.display().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn cmd_init_config(path: &PathBuf) {
    let config = PipelineConfig::default();
    match config.to_yaml(path) {
        Ok(()) => {
            print_summary(
                "Config Written",
                &[("Path", path.display().to_string())],
            );
        }
        Err(e) => {
            error!("Failed to write config: {}", e);
            std::process::exit(1);
        }
    }
}
