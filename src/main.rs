//! Reel-Sift main entry point
//!
//! This is the command-line interface for the Reel-Sift video analysis pipeline.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use reel_sift::analyzer::GeminiAnalyzer;
use reel_sift::config::{load_config_with_hash, Config, Credentials, LoginCredentials};
use reel_sift::model::WorkItemList;
use reel_sift::output::{load_statistics, print_statistics};
use reel_sift::pipeline::collect_by_shortcodes;
use reel_sift::source::{
    load_shortcodes, load_video_list, save_video_list, FeedClient, ItemSource, SessionFileProvider,
};
use reel_sift::{ItemProcessor, Pipeline, Shutdown, SiftError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Reel-Sift: resumable video analysis for a profile's posts
///
/// Reel-Sift lists a profile's video posts, downloads each one and asks a
/// vision model for a structured breakdown. Progress is saved after every
/// video, so an interrupted run continues where it stopped.
#[derive(Parser, Debug)]
#[command(name = "reel-sift")]
#[command(version = "1.0.0")]
#[command(about = "Resumable video analysis pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Path to .env file with credentials
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all videos from a profile and save them to a file
    ListVideos {
        /// Profile username
        profile: String,

        /// Output JSON file (default: videos_<profile>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch video URLs for shortcodes from a JSON array or a saved HTML page
    ParseShortcodes {
        /// JSON file with a shortcode array, or a saved profile page
        shortcodes: PathBuf,

        /// Profile name for the output file (default: unknown)
        #[arg(short, long)]
        profile: Option<String>,

        /// Output JSON file (default: videos_<shortcodes_filename>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Start fresh, ignore existing progress
        #[arg(long)]
        fresh: bool,
    },

    /// Analyze videos from a saved list
    Analyze {
        /// Path to video list JSON file
        video_list: PathBuf,

        /// Output directory for results (default: [output] directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum number of videos to process
        #[arg(short, long)]
        max_videos: Option<usize>,
    },

    /// Show what previous runs committed for a profile
    Stats {
        /// Profile username
        profile: String,

        /// Output directory to read (default: [output] directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_interrupted(&e) => {
            tracing::info!("Aborted by user");
            ExitCode::from(130)
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("reel_sift=info,warn"),
            1 => EnvFilter::new("reel_sift=debug,info"),
            2 => EnvFilter::new("reel_sift=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn is_interrupted(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<SiftError>(),
        Some(SiftError::Interrupted)
    )
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    let credentials = Credentials::load(Some(cli.env_file.as_path()));

    match cli.command {
        Command::ListVideos { profile, output } => {
            handle_list_videos(&config, &credentials, &profile, output).await
        }
        Command::ParseShortcodes {
            shortcodes,
            profile,
            output,
            fresh,
        } => {
            handle_parse_shortcodes(&config, &credentials, &shortcodes, profile, output, fresh)
                .await
        }
        Command::Analyze {
            video_list,
            output,
            max_videos,
        } => handle_analyze(&config, &credentials, &video_list, output, max_videos).await,
        Command::Stats { profile, output } => {
            let output_dir = output.unwrap_or_else(|| config.output.directory.clone());
            let stats = load_statistics(&output_dir, &profile)?;
            print_statistics(&stats);
            Ok(())
        }
    }
}

/// Installs the Ctrl-C handler
///
/// An interrupt abandons the item in flight, so the pipeline can still log
/// its summary and remove the temporary video before the process exits.
fn install_interrupt_handler() -> Shutdown {
    let shutdown = Shutdown::new();
    let handle = shutdown.clone();

    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if handle.request() {
                tracing::warn!("Already stopping, waiting for progress to be saved");
            } else {
                tracing::warn!("Interrupt received, stopping");
            }
        }
    });

    shutdown
}

fn feed_login(credentials: &Credentials) -> anyhow::Result<LoginCredentials> {
    credentials
        .login()
        .context("INSTAGRAM_USERNAME and INSTAGRAM_PASSWORD must be set in .env")
}

/// Builds a feed client and authenticates it
async fn connect_feed(config: &Config, login: &LoginCredentials) -> anyhow::Result<FeedClient> {
    let mut client = FeedClient::new(config)?;
    let provider = SessionFileProvider::from_config(&config.source);
    client.authenticate(&provider, login).await?;
    Ok(client)
}

/// Handles the list-videos command
async fn handle_list_videos(
    config: &Config,
    credentials: &Credentials,
    profile: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let login = feed_login(credentials)?;
    let output = output.unwrap_or_else(|| PathBuf::from(format!("videos_{}.json", profile)));

    let client = connect_feed(config, &login).await?;
    let list = tokio::select! {
        result = client.enumerate(profile) => result.context("Failed to list videos")?,
        _ = tokio::signal::ctrl_c() => return Err(SiftError::Interrupted.into()),
    };

    save_video_list(&list, &output)?;
    Ok(())
}

/// Handles the parse-shortcodes command
async fn handle_parse_shortcodes(
    config: &Config,
    credentials: &Credentials,
    shortcodes_file: &Path,
    profile: Option<String>,
    output: Option<PathBuf>,
    fresh: bool,
) -> anyhow::Result<()> {
    let login = feed_login(credentials)?;

    if !shortcodes_file.exists() {
        bail!("Shortcodes file not found: {}", shortcodes_file.display());
    }
    let shortcodes = load_shortcodes(shortcodes_file)?;

    let output = output.unwrap_or_else(|| {
        let stem = shortcodes_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("shortcodes");
        PathBuf::from(format!("videos_{}.json", stem))
    });
    let profile = profile.unwrap_or_else(|| "unknown".to_string());

    let mut list = if output.exists() && !fresh {
        match load_video_list(&output) {
            Ok(existing) => {
                tracing::info!("Resuming: {} already processed", existing.len());
                existing
            }
            Err(e) => {
                tracing::warn!("Could not load existing file: {}", e);
                WorkItemList::new(profile.as_str())
            }
        }
    } else {
        WorkItemList::new(profile.as_str())
    };
    list.profile = profile;

    let client = connect_feed(config, &login).await?;
    let shutdown = install_interrupt_handler();
    collect_by_shortcodes(&client, &shortcodes, &mut list, &output, &shutdown).await?;

    tracing::info!("Saved to {}", output.display());
    Ok(())
}

/// Handles the analyze command
async fn handle_analyze(
    config: &Config,
    credentials: &Credentials,
    video_list: &Path,
    output: Option<PathBuf>,
    max_videos: Option<usize>,
) -> anyhow::Result<()> {
    let api_key = credentials
        .api_key()
        .context("GEMINI_API_KEY not found in .env")?;
    let login = feed_login(credentials)?;

    if !video_list.exists() {
        bail!("Video list file not found: {}", video_list.display());
    }
    let list = load_video_list(video_list)
        .with_context(|| format!("Failed to read {}", video_list.display()))?;
    tracing::info!("Loaded {} videos from {}", list.len(), video_list.display());

    let output_dir = output.unwrap_or_else(|| config.output.directory.clone());

    let source = Arc::new(connect_feed(config, &login).await?);
    let analyzer = Arc::new(GeminiAnalyzer::new(config, api_key)?);
    let pipeline = Pipeline::new(ItemProcessor::new(source, analyzer), output_dir)
        .with_max_videos(max_videos)
        .with_shutdown(install_interrupt_handler());

    pipeline.run(&list).await.context("Pipeline failed")?;
    Ok(())
}
