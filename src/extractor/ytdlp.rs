use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::{error::ExtractError, stream::StreamCandidate};

use super::{looks_unavailable, watch_url, ExtractOptions, Extraction, Extractor};

// run yt-dlp command line to get video metadata and playback urls.
// requires yt-dlp executable to be in PATH (or YTDLP_PATH).
pub struct Ytdlp {
  program: String,
}

impl Ytdlp {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
    }
  }

  fn command(&self, video_id: &str, options: &ExtractOptions) -> Command {
    let mut cmd = Command::new(&self.program);
    cmd
      // one json object for the video, nothing downloaded
      .arg("-J")
      .arg("--no-playlist")
      .arg("--no-warnings")
      .arg("--quiet")
      // don't leave yt-dlp running when the request goes away
      .kill_on_drop(true);

    if options.insecure_tls {
      cmd.arg("--no-check-certificates");
    }

    if let Some(proxy) = &options.proxy {
      debug!("using proxy: {}", redact_proxy(proxy));
      cmd.arg("--proxy").arg(proxy);
    }

    cmd.arg(watch_url(video_id));
    cmd
  }
}

#[derive(Deserialize, Debug)]
struct YtdlpOutput {
  id: String,
  title: Option<String>,
  uploader: Option<String>,
  channel: Option<String>,
  duration: Option<f64>,
  #[serde(default)]
  formats: Vec<Format>,
}

#[derive(Deserialize, Debug)]
struct Format {
  url: Option<String>,
  vcodec: Option<String>,
  acodec: Option<String>,
  height: Option<u32>,
  tbr: Option<f64>,
  protocol: Option<String>,
}

#[async_trait]
impl Extractor for Ytdlp {
  fn name(&self) -> &'static str {
    "yt-dlp"
  }

  async fn extract(
    &self,
    video_id: &str,
    options: &ExtractOptions,
  ) -> Result<Extraction, ExtractError> {
    let output = self.command(video_id, options).output().await?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(classify_stderr(&stderr));
    }

    parse_output(&output.stdout)
  }
}

fn parse_output(stdout: &[u8]) -> Result<Extraction, ExtractError> {
  let output: YtdlpOutput = serde_json::from_slice(stdout)
    .map_err(|e| ExtractError::Incompatible(e.to_string()))?;

  Ok(output.into())
}

impl From<YtdlpOutput> for Extraction {
  fn from(o: YtdlpOutput) -> Self {
    let streams = o.formats.into_iter().filter_map(Format::candidate).collect();

    Self {
      video_id: o.id,
      title: o.title,
      author: o.uploader.or(o.channel),
      duration_seconds: o.duration.map(|d| d.round() as u64),
      streams,
    }
  }
}

impl Format {
  fn candidate(self) -> Option<StreamCandidate> {
    // hls/dash manifests and storyboards aren't directly fetchable media
    if !matches!(self.protocol.as_deref(), Some("https" | "http")) {
      return None;
    }

    let has_track =
      |codec: &Option<String>| codec.as_deref().is_some_and(|c| c != "none");

    Some(StreamCandidate {
      has_video: has_track(&self.vcodec),
      has_audio: has_track(&self.acodec),
      height: self.height,
      bitrate: self.tbr.map(|kbps| (kbps * 1000.0) as u64),
      url: self.url?,
    })
  }
}

// yt-dlp reports every failure as `ERROR: ...` lines on stderr.
fn classify_stderr(stderr: &str) -> ExtractError {
  const INCOMPATIBLE_MARKERS: &[&str] = &[
    "unable to extract",
    "nsig extraction failed",
    "failed to parse",
    "unsupported url",
    "please report this issue",
  ];

  let message = last_error_line(stderr);
  let lower = stderr.to_lowercase();

  if looks_unavailable(stderr) {
    ExtractError::Unavailable(message)
  } else if INCOMPATIBLE_MARKERS.iter().any(|m| lower.contains(m)) {
    ExtractError::Incompatible(message)
  } else {
    ExtractError::Library(message)
  }
}

fn last_error_line(stderr: &str) -> String {
  let line = stderr
    .lines()
    .rev()
    .map(str::trim)
    .find(|l| l.starts_with("ERROR:"))
    .map(|l| l.trim_start_matches("ERROR:").trim());

  match line {
    Some(line) => line.to_string(),
    None if stderr.trim().is_empty() => "yt-dlp exited with an error".into(),
    None => stderr.trim().chars().take(300).collect(),
  }
}

// used to remove cred info from proxy url before printing
fn redact_proxy(proxy: &str) -> String {
  static AUTH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"//[^:@/]+(:[^@]+)?@").unwrap());

  AUTH_REGEX.replace(proxy, "//<REDACTED>@").into_owned()
}
