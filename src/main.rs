//! VLC Bridge command line
//!
//! Drives a running VLC through its HTTP interface: opens seek links, pastes
//! timestamp links and snapshots, and renders subtitle transcripts with their
//! snapshots resolved.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vlc_bridge::batch::{BatchOutcome, CancelFlag};
use vlc_bridge::config_file::{generate_default_config, ConfigFile};
use vlc_bridge::fs::LocalFs;
use vlc_bridge::player::{launch_args, PlayerControl, VlcClient};
use vlc_bridge::transcript::CopyRequest;
use vlc_bridge::{BridgeConfig, BridgeError, Result, Session};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "vlc-bridge";

#[derive(Parser, Debug)]
#[command(name = "vlc-bridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "vlc-bridge.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Write a configuration file with the default settings
    InitConfig,

    /// Print the arguments VLC must be started with
    LaunchArgs,

    /// Open a seek link (`obsidian://vlcBridge?mediaPath=...`)
    Open { link: String },

    /// Print a timestamp link for the current playback position
    Link,

    /// Snapshot the current frame and print the link and embed
    Snapshot,

    /// Seek by a number of seconds, negative to go back
    Seek {
        #[arg(allow_hyphen_values = true)]
        seconds: i64,
    },

    /// Toggle pause
    Pause,

    /// Attach a subtitle file to the media being played
    Subtitle {
        path: String,
        #[arg(long)]
        delay: Option<f64>,
    },

    /// Render the transcript of a subtitle file for the media being played
    Transcript {
        subtitle: String,

        /// Start at the dialogue being played
        #[arg(long)]
        from_current: bool,

        /// Use the simple template
        #[arg(long)]
        simple: bool,
    },

    /// Search the transcript of a subtitle file
    Search {
        subtitle: String,
        query: String,

        #[arg(long)]
        case_sensitive: bool,
    },

    /// Render a range of transcript entries with their snapshots resolved
    Snapshots {
        subtitle: String,

        /// First entry, 1-based
        #[arg(long)]
        from: Option<usize>,

        /// Last entry, 1-based and inclusive
        #[arg(long)]
        to: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let (config, load_error) = load_config(&args.config);
    init_logging(&config);
    tracing::debug!("{} v{} starting", APP_NAME, VERSION);
    if let Some(e) = load_error {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            args.config.display(),
            e
        );
    }

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: &Path) -> (BridgeConfig, Option<String>) {
    if !path.exists() {
        return (BridgeConfig::default(), None);
    }
    match ConfigFile::from_file(path) {
        Ok(cf) => (cf.into_bridge_config(), None),
        Err(e) => (BridgeConfig::default(), Some(e.to_string())),
    }
}

/// Initialize logging with tracing
fn init_logging(config: &BridgeConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("vlc_bridge={}", config.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(args: Args, config: BridgeConfig) -> Result<()> {
    match args.command {
        Cmd::InitConfig => {
            generate_default_config(&args.config).map_err(|e| BridgeError::Config(e.to_string()))?;
            tracing::info!("Wrote {}", args.config.display());
            return Ok(());
        }
        Cmd::LaunchArgs => {
            println!("{}", launch_args(&config).join(" "));
            return Ok(());
        }
        _ => {}
    }

    let player = VlcClient::new(&config.player)?;
    let fs = LocalFs::new(config.snapshot.vault_root.clone());
    let session = Session::new(config, player, fs);

    match args.command {
        Cmd::Open { link } => session.open_link(&link).await?,
        Cmd::Link => println!("{}", session.timestamp_link().await?),
        Cmd::Snapshot => println!("{}", session.take_snapshot().await?),
        Cmd::Seek { seconds } => session.seek_relative(seconds).await?,
        Cmd::Pause => session.toggle_pause().await?,
        Cmd::Subtitle { path, delay } => session.add_subtitle(&path, delay).await?,
        Cmd::Transcript {
            subtitle,
            from_current,
            simple,
        } => {
            let transcript = session.load_transcript(&subtitle).await?;
            let entries = if from_current {
                let position = session.player().status().await?.position;
                transcript.from_position(position)
            } else {
                transcript.entries()
            };
            let texts = transcript
                .view_with_snapshots(session.fs(), &session.config().snapshot, entries, simple)
                .await?;
            println!("{}", texts.join(transcript.separator()));
        }
        Cmd::Search {
            subtitle,
            query,
            case_sensitive,
        } => {
            let transcript = session.load_transcript(&subtitle).await?;
            for hit in transcript.search(&query, case_sensitive)? {
                let entry = &transcript.entries()[hit.index];
                println!("{}: {}", hit.index + 1, entry.entry.text.replace('\n', " "));
            }
        }
        Cmd::Snapshots { subtitle, from, to } => {
            let transcript = session.load_transcript(&subtitle).await?;
            let first = from.unwrap_or(1).max(1) - 1;
            let last = to.unwrap_or(transcript.len()).min(transcript.len());
            let indices: Vec<usize> = (first..last).collect();

            let items = match transcript.copy(&indices) {
                CopyRequest::Ready(text) => {
                    println!("{}", text);
                    return Ok(());
                }
                CopyRequest::NeedsSnapshots(items) => items,
            };

            let cancel = CancelFlag::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, finishing the current entry");
                    on_interrupt.cancel();
                }
            });

            tracing::info!("Resolving snapshots for {} entries", items.len());
            let report = session
                .snapshots(&transcript, &indices, &cancel, |progress| {
                    eprintln!("{}", progress);
                })
                .await;
            println!("{}", report.text);
            if let BatchOutcome::Failed(e) = report.outcome {
                return Err(e);
            }
        }
        Cmd::InitConfig | Cmd::LaunchArgs => {}
    }
    Ok(())
}
