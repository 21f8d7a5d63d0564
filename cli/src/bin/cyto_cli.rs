use clap::{Parser, Subcommand};
use cli::BatchJob;
use color_eyre::eyre::Result;
use roi::{BatchConfig, BatchRunner};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch using an existing job file
    Process {
        /// Path to the TOML or JSON job file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run a batch configured entirely from the command line
    Run {
        /// Root directory searched recursively for annotation archives
        #[arg(short, long)]
        input: PathBuf,
        /// Root directory for derived archives and the measurement table
        #[arg(short, long)]
        output: PathBuf,
        /// Filename suffix a source must carry
        #[arg(long, default_value = ".geojson")]
        ext: String,
        /// Substring a source filename must contain
        #[arg(long, default_value = "RoiSet")]
        contains: String,
        /// Treat the first region of each set as data, not background
        #[arg(long)]
        no_background: bool,
        /// Pixels to dilate the nucleus before carving cytoplasm
        #[arg(long, default_value = "3.0")]
        dilate: f64,
        /// Pixel size in physical units (e.g. microns per pixel)
        #[arg(long)]
        pixel_size: Option<f64>,
        /// Radius in physical units for the constrained cytoplasm disk
        #[arg(long)]
        radius: Option<f64>,
        /// Flatten all outputs into the output root instead of mirroring
        /// the input directory structure
        #[arg(long)]
        flatten: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process { config } => {
            let job = BatchJob::from_file(&config)?;
            if let Some(description) = &job.description {
                info!("Job: {description}");
            }
            run_batch(job.batch)?;
        }
        Commands::Run {
            input,
            output,
            ext,
            contains,
            no_background,
            dilate,
            pixel_size,
            radius,
            flatten,
        } => {
            let mut config = BatchConfig::new(input, output);
            config.extension = ext;
            config.contains = contains;
            config.background = !no_background;
            config.dilate = dilate;
            config.pixel_size = pixel_size;
            config.radius = radius;
            config.keep_directories = !flatten;
            run_batch(config)?;
        }
    }

    Ok(())
}

fn run_batch(config: BatchConfig) -> Result<()> {
    if config.radius.is_some() && config.pixel_size.is_none() {
        warn!("--radius given without --pixel-size; treating the radius as pixels");
    }

    let runner = BatchRunner::new(config);
    let summary = runner.run()?;

    if summary.skipped > 0 {
        warn!(
            "{} ROI set(s) were skipped; see the log above for reasons",
            summary.skipped
        );
    }
    info!(
        "✅ Batch completed: {} set(s) processed, {} measurement row(s)",
        summary.processed, summary.measured_rows
    );
    Ok(())
}
