use anyhow::{bail, Context};
use cfstream_core::models::{ProcessingState, Video};
use cfstream_core::ApiResult;
use cfstream_upload::ProgressReceiver;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value as JsonValue};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Parse durations like `90`, `30s`, `15m`, `1h`, `2h30m` or `1d`. A bare number is seconds.
pub fn parse_duration(input: &str) -> anyhow::Result<Duration> {
    let input = input.trim();
    if input.is_empty() {
        bail!("duration cannot be empty");
    }
    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit = match c {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            'd' => 86_400,
            _ => bail!("invalid duration '{}': unknown unit '{}'", input, c),
        };
        let value: u64 = digits
            .parse()
            .with_context(|| format!("invalid duration '{}'", input))?;
        total = total.saturating_add(value.saturating_mul(unit));
        digits.clear();
    }
    if !digits.is_empty() {
        bail!("invalid duration '{}': missing unit after {}", input, digits);
    }
    Ok(Duration::from_secs(total))
}

/// Parse `--metadata` JSON; it must be an object.
pub fn parse_metadata(input: Option<&str>) -> anyhow::Result<Map<String, JsonValue>> {
    let Some(input) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<JsonValue>(input).context("Invalid metadata JSON")? {
        JsonValue::Object(map) => Ok(map),
        _ => bail!("metadata must be a JSON object"),
    }
}

/// clap value parser for `--status`
pub fn parse_state(input: &str) -> Result<ProcessingState, String> {
    match serde_json::from_value::<ProcessingState>(JsonValue::String(input.to_lowercase())) {
        Ok(ProcessingState::Unknown) | Err(_) => Err(format!(
            "unknown status '{}' (expected pendingupload, downloading, queued, inprogress, ready or error)",
            input
        )),
        Ok(state) => Ok(state),
    }
}

/// Terminal progress bar fed from an upload's progress channel
pub struct ProgressDisplay {
    bar: ProgressBar,
    task: JoinHandle<()>,
}

impl ProgressDisplay {
    pub fn start(receiver: ProgressReceiver, label: &str, total_bytes: u64, hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total_bytes)
        };
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}",
        ) {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.set_message(truncate_string(label, 40));

        let sink = bar.clone();
        let task = receiver.spawn(move |progress| {
            sink.set_length(progress.bytes_total);
            sink.set_position(progress.bytes_sent);
        });

        ProgressDisplay { bar, task }
    }

    /// Wait for the last queued update, then remove the bar.
    pub async fn finish(self) {
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Progress display stopped unexpectedly");
        }
        self.bar.finish_and_clear();
    }
}

/// Re-fetch a video until it can be streamed, fails, or `attempts` run out.
///
/// Running out is not an error: the latest record is returned.
pub async fn wait_until_ready<F, Fut>(
    initial: Video,
    mut fetch: F,
    attempts: u32,
    interval: Duration,
) -> anyhow::Result<Video>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<Video>>,
{
    let mut video = initial;
    for attempt in 1..=attempts {
        if video.ready_to_stream {
            return Ok(video);
        }
        if video.status == ProcessingState::Error {
            bail!(
                "video processing failed: {}",
                video.status_details.as_deref().unwrap_or("unknown reason")
            );
        }

        tokio::time::sleep(interval).await;
        video = fetch().await.context("Failed to refresh video status")?;

        tracing::info!(
            video_id = %video.uid,
            status = %video.status,
            details = video.status_details.as_deref().unwrap_or(""),
            attempt,
            "Processing status"
        );
    }

    if video.status == ProcessingState::Error {
        bail!(
            "video processing failed: {}",
            video.status_details.as_deref().unwrap_or("unknown reason")
        );
    }
    if !video.ready_to_stream {
        tracing::warn!(
            video_id = %video.uid,
            "Video is still processing; check again with 'cfstream video get'"
        );
    }
    Ok(video)
}

/// Initialize tracing for the CLI: stderr, `RUST_LOG` wins over the verbosity flag.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
