//! cfstream: command-line client for the video hosting API.
//!
//! Credentials come from CFSTREAM_ACCOUNT_ID and CFSTREAM_API_TOKEN (or the
//! config file). Results are printed as JSON on stdout; logs go to stderr.

use anyhow::Context;
use cfstream_api_client::ApiClient;
use cfstream_cli::{
    init_tracing, parse_duration, parse_metadata, parse_state, wait_until_ready, ProgressDisplay,
};
use cfstream_core::models::{
    DirectUploadOptions, ListOptions, ProcessingState, UpdateOptions, UploadOptions,
};
use cfstream_core::Config;
use cfstream_upload::strategy::DEFAULT_MAX_DURATION_SECONDS;
use cfstream_upload::{progress_channel, AccountApi, Uploader};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const WAIT_ATTEMPTS: u32 = 60;
const WAIT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "cfstream", version, about = "Upload and manage hosted videos")]
struct Cli {
    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log progress of each step to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload videos
    Upload {
        #[command(subcommand)]
        sub: UploadCommands,
    },
    /// Inspect and manage uploaded videos
    Video {
        #[command(subcommand)]
        sub: VideoCommands,
    },
    /// Create a signed playback token
    Token {
        /// Video ID
        id: String,
        /// Token lifetime (e.g. 30m, 1h, 2h30m)
        #[arg(long)]
        expires: Option<String>,
    },
}

#[derive(Subcommand)]
enum UploadCommands {
    /// Upload a local video file
    File {
        /// Path to the video file
        path: PathBuf,
        /// Video name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
        /// Allow playback without signed URLs
        #[arg(long)]
        public: bool,
        /// Wait until the video is ready to stream
        #[arg(long)]
        wait: bool,
    },
    /// Have the service fetch a video from a URL
    Url {
        /// Publicly reachable video URL
        url: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        metadata: Option<String>,
        #[arg(long)]
        public: bool,
    },
    /// Create a one-time upload URL for a third party
    Direct {
        /// How long the URL stays valid
        #[arg(long, default_value = "1h")]
        expires: String,
        /// Longest accepted video, in seconds
        #[arg(long, default_value_t = DEFAULT_MAX_DURATION_SECONDS)]
        max_duration: u32,
        #[arg(long)]
        public: bool,
    },
}

#[derive(Subcommand)]
enum VideoCommands {
    /// List videos
    List {
        /// Search by video name
        #[arg(long)]
        search: Option<String>,
        /// Filter by creator
        #[arg(long)]
        creator: Option<String>,
        /// Filter by processing status
        #[arg(long, value_parser = parse_state)]
        status: Option<ProcessingState>,
        /// Oldest first
        #[arg(long)]
        asc: bool,
        /// Maximum number of videos
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Show a single video
    Get {
        /// Video ID
        id: String,
    },
    /// Delete a video
    Delete {
        /// Video ID
        id: String,
    },
    /// Update name, metadata or access of a video
    Update {
        /// Video ID
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// Metadata as a JSON object; replaces the existing metadata
        #[arg(long)]
        metadata: Option<String>,
        #[arg(long)]
        require_signed_urls: Option<bool>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn upload_options(
    name: Option<String>,
    metadata: Option<&str>,
    public: bool,
) -> anyhow::Result<UploadOptions> {
    Ok(UploadOptions {
        name,
        metadata: parse_metadata(metadata)?,
        require_signed_urls: !public,
    })
}

async fn upload_file(
    client: ApiClient,
    path: PathBuf,
    options: UploadOptions,
    wait: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let size = tokio::fs::metadata(&path)
        .await
        .map(|m| m.len())
        .unwrap_or_default();
    let label = options.display_name().unwrap_or_default().to_string();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling upload");
            on_interrupt.cancel();
        }
    });

    let uploader = Uploader::new(client).with_cancellation(cancel);
    let (relay, receiver) = progress_channel(uploader.policy().progress_capacity);
    let display = ProgressDisplay::start(receiver, &label, size, quiet);

    let result = uploader.upload(&path, &options, Some(relay)).await;
    display.finish().await;
    let video = result.with_context(|| format!("Failed to upload {}", path.display()))?;

    let video = if wait {
        let client = uploader.api();
        let id = video.uid.clone();
        wait_until_ready(video, || client.get_video(&id), WAIT_ATTEMPTS, WAIT_INTERVAL).await?
    } else {
        video
    };

    print_json(&video)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load().context(
        "Failed to load configuration. Set CFSTREAM_ACCOUNT_ID and CFSTREAM_API_TOKEN",
    )?;
    let client = ApiClient::from_config(&config).context("Failed to create API client")?;

    match cli.command {
        Commands::Upload { sub } => match sub {
            UploadCommands::File {
                path,
                name,
                metadata,
                public,
                wait,
            } => {
                let name = name.or_else(|| {
                    path.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                });
                let options = upload_options(name, metadata.as_deref(), public)?;
                upload_file(client, path, options, wait, cli.quiet).await?;
            }
            UploadCommands::Url {
                url,
                name,
                metadata,
                public,
            } => {
                let options = upload_options(name, metadata.as_deref(), public)?;
                let video = client.upload_from_url(&url, &options).await?;
                print_json(&video)?;
            }
            UploadCommands::Direct {
                expires,
                max_duration,
                public,
            } => {
                let expires = parse_duration(&expires)?;
                let expiry = chrono::Duration::from_std(expires)
                    .ok()
                    .map(|d| Utc::now() + d);
                let options = DirectUploadOptions {
                    max_duration_seconds: Some(max_duration),
                    expiry,
                    require_signed_urls: !public,
                    ..Default::default()
                };
                let direct = client.create_direct_upload(&options).await?;
                print_json(&direct)?;
            }
        },
        Commands::Video { sub } => match sub {
            VideoCommands::List {
                search,
                creator,
                status,
                asc,
                limit,
            } => {
                let options = ListOptions {
                    search,
                    creator,
                    status,
                    asc,
                    limit: Some(limit),
                    ..Default::default()
                };
                let videos = client.list_videos(&options).await?;
                print_json(&videos)?;
            }
            VideoCommands::Get { id } => {
                let video = client.get_video(&id).await?;
                print_json(&video)?;
            }
            VideoCommands::Delete { id } => {
                client.delete_video(&id).await?;
                print_json(
                    &serde_json::json!({ "success": true, "message": format!("Video {} deleted", id) }),
                )?;
            }
            VideoCommands::Update {
                id,
                name,
                metadata,
                require_signed_urls,
            } => {
                let mut meta = parse_metadata(metadata.as_deref())?;
                if let Some(name) = name.filter(|n| !n.is_empty()) {
                    meta.insert("name".to_string(), serde_json::Value::String(name));
                }
                let options = UpdateOptions {
                    meta: (!meta.is_empty()).then_some(meta),
                    require_signed_urls,
                };
                let video = client.update_video(&id, &options).await?;
                print_json(&video)?;
            }
        },
        Commands::Token { id, expires } => {
            let expires_in_secs = expires
                .as_deref()
                .map(parse_duration)
                .transpose()?
                .map(|d| d.as_secs());
            let token = client.create_signed_token(&id, expires_in_secs).await?;
            print_json(&serde_json::json!({ "video_id": id, "token": token }))?;
        }
    }

    Ok(())
}
