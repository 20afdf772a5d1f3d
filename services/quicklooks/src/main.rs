//! Radar quicklook generator.
//!
//! Renders multi-panel PPI quicklooks for every CF/Radial file in a date
//! range, or for a single file.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use radar_common::JobDescriptor;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use quicklooks::driver::{
    default_concurrency, run_batch, BatchDriver, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_DIR,
    MAX_CONCURRENCY,
};
use quicklooks::job::{self, JobSuccess};
use quicklooks::logging::{self, LogFormat};
use quicklooks::RunConfig;

/// Grace period for jobs still running after the batch has finished.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "quicklooks")]
#[command(about = "PPI quicklook generator for CF/Radial radar archives")]
struct Cli {
    /// Log level
    #[arg(long, global = true, env = "QUICKLOOKS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every file in a date range
    Run(RunArgs),
    /// Render a single file
    File(FileArgs),
    /// Print the effective layout as YAML
    Layout {
        #[arg(long, env = "QUICKLOOKS_LAYOUT")]
        layout: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct StyleArgs {
    /// Panel layout YAML (built-in 3x3 layout when absent)
    #[arg(long, env = "QUICKLOOKS_LAYOUT")]
    layout: Option<PathBuf>,

    /// TrueType font for panel titles (titles omitted when absent)
    #[arg(long, env = "QUICKLOOKS_FONT")]
    font: Option<PathBuf>,

    /// Sweep index to render from each volume
    #[arg(long, env = "QUICKLOOKS_SWEEP", default_value_t = 0)]
    sweep: usize,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Starting date, YYYYMMDD
    #[arg(short = 's', long = "start-date")]
    start_date: String,

    /// Ending date, YYYYMMDD (inclusive)
    #[arg(short = 'e', long = "end-date")]
    end_date: String,

    /// Input root holding <YYYY>/<YYYYMMDD>/ directories
    #[arg(short, long, env = "QUICKLOOKS_INPUT_DIR", default_value = DEFAULT_INPUT_DIR)]
    input_dir: PathBuf,

    /// Output root for <YYYY>/<YYYYMMDD>/<YYYYMMDD_HHMM>.png
    #[arg(short, long, env = "QUICKLOOKS_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Concurrent jobs (defaults to the number of CPUs)
    #[arg(
        long,
        env = "QUICKLOOKS_CONCURRENCY",
        value_parser = clap::value_parser!(u64).range(1..=MAX_CONCURRENCY as u64)
    )]
    concurrency: Option<u64>,

    /// Per-file time limit in seconds
    #[arg(
        long,
        env = "QUICKLOOKS_TIMEOUT_SECS",
        default_value_t = 180,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_secs: u64,

    /// Decode every file without writing images
    #[arg(long)]
    no_output: bool,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Args, Debug)]
struct FileArgs {
    /// CF/Radial file to render
    input: PathBuf,

    #[arg(short, long, env = "QUICKLOOKS_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    #[command(flatten)]
    style: StyleArgs,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level, cli.log_format) {
        eprintln!("Failed to initialise logging: {e:#}");
        return ExitCode::FAILURE;
    }
    logging::install_panic_hook();

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = format!("{e:#}"), "Quicklooks aborted");
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command) -> Result<()> {
    match command {
        Command::Run(args) => run_range(args),
        Command::File(args) => run_file(args),
        Command::Layout { layout } => {
            let layout = quicklooks::config::load_layout(layout.as_deref())?;
            print!("{}", layout.to_yaml()?);
            Ok(())
        }
    }
}

fn run_range(args: RunArgs) -> Result<()> {
    let config = RunConfig {
        input_dir: args.input_dir,
        output_dir: args.output_dir,
        no_output: args.no_output,
        concurrency: args
            .concurrency
            .map_or_else(default_concurrency, |n| n as usize),
        job_timeout: Duration::from_secs(args.timeout_secs),
        layout_path: args.style.layout,
        font_path: args.style.font,
        sweep: args.style.sweep,
    };
    let context = config.job_context()?;
    let mut driver = BatchDriver::new(config.driver_config(), context);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let summary = runtime.block_on(run_batch(&args.start_date, &args.end_date, &mut driver));
    // Timed-out jobs may still be winding down on the blocking pool.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    let summary = summary.context("Invalid dates")?;

    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        timed_out = summary.timed_out,
        "Batch finished"
    );
    Ok(())
}

fn run_file(args: FileArgs) -> Result<()> {
    let config = RunConfig {
        input_dir: args
            .input
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default(),
        output_dir: args.output_dir,
        no_output: false,
        concurrency: 1,
        job_timeout: Duration::MAX,
        layout_path: args.style.layout,
        font_path: args.style.font,
        sweep: args.style.sweep,
    };
    let context = config.job_context()?;
    let job = JobDescriptor::new(args.input, Some(config.output_dir.clone()));

    match job::run_isolated(&job, &context, &CancellationToken::new()) {
        Ok(JobSuccess::Rendered(report)) => {
            println!("{}", report.path.display());
            Ok(())
        }
        Ok(JobSuccess::NoOutput) => Ok(()),
        Err(e) => Err(anyhow!("{}: {}", job.file_name(), job::error_chain(&e))),
    }
}
