use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nichecast::config::Config;
use nichecast::prelude::{ErrorCategory, NichecastErrorTrait};

mod commands;

#[derive(Parser)]
#[command(
    name = "nichecast",
    version,
    about = "Resumable artifact generation and slot-based upload scheduling per content niche",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./nichecast.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory containing the niches (overrides the config file)
    #[arg(long, global = true)]
    niches_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, value_parser = ["text", "json"])]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List niches under the niches directory
    List,

    /// Create the directory structure of a niche
    Init {
        /// Niche name
        niche: String,
    },

    /// Show generation and upload progress of a niche
    Status {
        /// Niche name
        niche: String,
    },

    /// Render new artifacts
    Generate {
        /// Niche name
        niche: String,

        /// Number of artifacts to generate
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Upload and schedule artifacts
    Upload {
        /// Niche name
        niche: String,

        /// Platform id; repeat for several, `all` for every configured one
        #[arg(short, long = "platform", default_value = "all")]
        platforms: Vec<String>,

        /// Number of artifacts per platform
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Use this slot set instead of the configured one
        #[arg(long)]
        slot_set: Option<String>,
    },

    /// Show the next publication time without uploading
    Schedule {
        /// Niche name
        niche: String,

        /// Platform id; repeat for several, `all` for every configured one
        #[arg(short, long = "platform", default_value = "all")]
        platforms: Vec<String>,

        /// Use this slot set instead of the configured one
        #[arg(long)]
        slot_set: Option<String>,
    },
}

/// Exit status when another run holds the niche lock (EX_TEMPFAIL)
const EXIT_BUSY: u8 = 75;
const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_STORAGE: u8 = 3;
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    if let Some(dir) = cli.niches_dir.clone() {
        config.paths.niches_dir = dir;
    }

    // Initialize tracing/logging
    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    if let Err(e) = setup_tracing(&format, &config.logging.level, cli.verbose) {
        eprintln!("Error: {e:#}");
        return ExitCode::from(EXIT_FAILURE);
    }

    tracing::debug!(niches_dir = %config.paths.niches_dir.display(), "nichecast starting");

    // Dropping the command future releases the niche lock and kills any child process
    tokio::select! {
        result = run(cli.command, &config) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => ExitCode::from(report_error(&e)),
        },
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => tracing::warn!("Interrupted, stopping before the next artifact"),
                Err(e) => tracing::error!("Failed to wait for Ctrl+C: {}", e),
            }
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

async fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::List => commands::list(config)?,

        Commands::Init { niche } => commands::init(config, &niche)?,

        Commands::Status { niche } => commands::status(config, &niche)?,

        Commands::Generate { niche, count } => {
            tracing::info!(niche = %niche, count, "Starting generate command");
            commands::generate(config, &niche, count).await?;
        }

        Commands::Upload {
            niche,
            platforms,
            count,
            slot_set,
        } => {
            tracing::info!(
                niche = %niche,
                platforms = ?platforms,
                count,
                slot_set = ?slot_set,
                "Starting upload command"
            );
            commands::upload(config, &niche, &platforms, count, slot_set.as_deref()).await?;
        }

        Commands::Schedule {
            niche,
            platforms,
            slot_set,
        } => commands::schedule(config, &niche, &platforms, slot_set.as_deref())?,
    }

    Ok(())
}

/// Log a failed command and pick its exit status from the error category
fn report_error(err: &anyhow::Error) -> u8 {
    let Some(e) = err.downcast_ref::<nichecast::Error>() else {
        tracing::error!("{:#}", err);
        return EXIT_FAILURE;
    };

    tracing::error!(
        category = e.category().label(),
        recoverable = e.is_recoverable(),
        "{:#}",
        err
    );
    if e.is_recoverable() {
        return EXIT_BUSY;
    }
    match e.category() {
        ErrorCategory::Config => EXIT_CONFIG,
        ErrorCategory::Storage => EXIT_STORAGE,
        ErrorCategory::Scheduler | ErrorCategory::Other => EXIT_FAILURE,
    }
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "nichecast=debug,info".to_string()
    } else {
        format!("nichecast={level},warn")
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
