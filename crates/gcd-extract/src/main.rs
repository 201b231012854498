//! GCD Extract - character and credit extraction tool

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use gcd_common::logging::{init_logging, LogConfig, LogLevel};
use gcd_extract::config::ExtractConfig;
use gcd_extract::extractor::ExtractionKind;
use gcd_extract::pipeline::{DriverError, ExtractionSummary};
use gcd_extract::progress::{self, format_duration, ProgressTracker};
use gcd_extract::{db, passes};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "gcd-extract")]
#[command(author, version, about = "Extract characters and credits from GCD story annotations")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract characters and their appearances
    Characters(RunArgs),

    /// Extract creator credits
    Credits(RunArgs),

    /// Character pass, then credit pass
    All(RunArgs),

    /// Inspect or reset saved progress
    Progress {
        #[command(subcommand)]
        action: ProgressAction,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    /// Rows per page [env: EXTRACT_BATCH_SIZE]
    #[arg(long)]
    batch_size: Option<u32>,

    /// Start after this story id when no progress is saved [env: EXTRACT_START_ID]
    #[arg(long)]
    start_id: Option<i64>,

    /// Progress file [env: EXTRACT_PROGRESS_FILE]
    #[arg(long)]
    progress_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum ProgressAction {
    /// Print the saved cursor of every extraction type
    Show {
        #[arg(long)]
        progress_file: Option<PathBuf>,
    },

    /// Forget one extraction type's progress so the next run starts over
    Reset {
        #[arg(long = "type", value_enum)]
        kind: ExtractionKind,

        #[arg(long)]
        progress_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("gcd-extract")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    let _guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialise logging: {e:#}");
            None
        },
    };

    match execute(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let driver_error = e.downcast_ref::<DriverError>();
            error!(
                row_id = driver_error.and_then(DriverError::row_id),
                retryable = driver_error.is_some_and(DriverError::is_retryable),
                error = %format!("{e:#}"),
                "Command failed"
            );
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

async fn execute(command: Command) -> Result<()> {
    match command {
        Command::Characters(args) => {
            let config = run_config(&args)?;
            let pool = db::create_pool(&config).await?;
            report(ExtractionKind::Character, &passes::run_character_pass(&pool, &config).await?);
        },
        Command::Credits(args) => {
            let config = run_config(&args)?;
            let pool = db::create_pool(&config).await?;
            report(ExtractionKind::Credit, &passes::run_credit_pass(&pool, &config).await?);
        },
        Command::All(args) => {
            let config = run_config(&args)?;
            let pool = db::create_pool(&config).await?;
            report(ExtractionKind::Character, &passes::run_character_pass(&pool, &config).await?);
            report(ExtractionKind::Credit, &passes::run_credit_pass(&pool, &config).await?);
        },
        Command::Progress { action } => match action {
            ProgressAction::Show { progress_file } => {
                let config = ExtractConfig::from_env()?;
                show_progress(&progress_file.unwrap_or(config.progress_file))?;
            },
            ProgressAction::Reset {
                kind,
                progress_file,
            } => {
                let config = ExtractConfig::from_env()?;
                let path = progress_file.unwrap_or(config.progress_file);
                let mut tracker = ProgressTracker::open(&path, kind.as_str())?;
                tracker.reset_progress_info()?;
                info!(extraction_type = %kind, path = %path.display(), "Progress reset");
                println!("Reset {kind} progress in {}", path.display());
            },
        },
    }

    Ok(())
}

/// Environment configuration with CLI overrides applied
fn run_config(args: &RunArgs) -> Result<ExtractConfig> {
    let mut config = ExtractConfig::from_env()?;
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(start_id) = args.start_id {
        config.start_id = start_id;
    }
    if let Some(path) = &args.progress_file {
        config.progress_file = path.clone();
    }
    config.validate()?;
    Ok(config)
}

fn report(kind: ExtractionKind, summary: &ExtractionSummary) {
    println!(
        "{kind}: {} rows in {} pages, {} records written, {} rows skipped, {} unresolved names ({})",
        summary.rows_processed,
        summary.pages,
        summary.records_written,
        summary.rows_skipped,
        summary.unresolved_names,
        format_duration(summary.elapsed),
    );
}

fn show_progress(path: &Path) -> Result<()> {
    let entries = progress::read_all(path)?;
    if entries.is_empty() {
        println!("No progress saved in {}", path.display());
        return Ok(());
    }

    println!("Progress in {}", path.display());
    for (kind, info) in entries {
        let updated = info
            .updated_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {kind:<10} last id {:>10}  completed {:>10}  avg {:>8.2} ms/row  updated {updated}",
            info.last_processed_item_id,
            info.num_completed,
            info.average_time_millis(),
        );
    }
    Ok(())
}
