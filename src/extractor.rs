mod invidious;
mod piped;
mod rustube;
mod ytdlp;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;

use crate::{
  config::{Backend, Config},
  error::ExtractError,
  stream::StreamCandidate,
};

pub use self::rustube::Rustube;
pub use invidious::Invidious;
pub use piped::Piped;
pub use ytdlp::Ytdlp;

/// Knobs every backend receives alongside the video id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
  pub insecure_tls: bool,
  pub proxy: Option<String>,
}

/// What a backend learned about a video.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Extraction {
  pub video_id: String,
  pub title: Option<String>,
  pub author: Option<String>,
  pub duration_seconds: Option<u64>,
  pub streams: Vec<StreamCandidate>,
}

#[async_trait]
pub trait Extractor: Send + Sync {
  fn name(&self) -> &'static str;

  async fn extract(
    &self,
    video_id: &str,
    options: &ExtractOptions,
  ) -> Result<Extraction, ExtractError>;
}

pub fn watch_url(video_id: &str) -> String {
  format!("https://www.youtube.com/watch?v={video_id}")
}

pub fn from_config(
  config: &Config,
  options: &ExtractOptions,
) -> Result<Arc<dyn Extractor>, ExtractError> {
  let extractor: Arc<dyn Extractor> = match config.backend {
    Backend::Ytdlp => Arc::new(Ytdlp::new(&config.ytdlp_path)),
    Backend::Rustube => Arc::new(Rustube),
    Backend::Invidious => {
      Arc::new(Invidious::new(&config.invidious_instance, options)?)
    }
    Backend::Piped => Arc::new(Piped::new(&config.piped_instance, options)?),
  };

  Ok(extractor)
}

/// Parse an API instance base url, e.g. `https://pipedapi.kavin.rocks`.
pub(crate) fn instance_url(instance: &str) -> Result<Url, ExtractError> {
  let url = Url::parse(instance).map_err(|e| {
    ExtractError::Internal(format!("invalid instance url {instance:?}: {e}"))
  })?;

  if url.cannot_be_a_base() {
    return Err(ExtractError::Internal(format!(
      "invalid instance url {instance:?}: not a base url"
    )));
  }

  Ok(url)
}

/// `base` with `segments` appended, each percent-encoded as exactly one
/// path segment.
pub(crate) fn api_url(base: &Url, segments: &[&str]) -> Url {
  let mut url = base.clone();
  if let Ok(mut path) = url.path_segments_mut() {
    path.pop_if_empty().extend(segments);
  }
  url
}

pub(crate) fn http_client(
  options: &ExtractOptions,
) -> Result<reqwest::Client, ExtractError> {
  let mut builder = reqwest::Client::builder()
    .user_agent("Mozilla/5.0")
    .danger_accept_invalid_certs(options.insecure_tls);

  if let Some(proxy) = &options.proxy {
    let proxy = reqwest::Proxy::all(proxy)
      .map_err(|e| ExtractError::Internal(e.to_string()))?;
    builder = builder.proxy(proxy);
  }

  Ok(builder.build()?)
}

/// Map an HTTP status from a metadata API to an extraction failure.
pub(crate) fn check_status(
  status: reqwest::StatusCode,
  body: &str,
) -> Result<(), ExtractError> {
  use reqwest::StatusCode;

  if status.is_success() {
    return Ok(());
  }

  let reason = api_error_message(body).unwrap_or_else(|| status.to_string());
  match status {
    StatusCode::NOT_FOUND | StatusCode::FORBIDDEN | StatusCode::GONE => {
      Err(ExtractError::Unavailable(reason))
    }
    _ if looks_unavailable(&reason) => Err(ExtractError::Unavailable(reason)),
    _ => Err(ExtractError::Library(reason)),
  }
}

// both Invidious and Piped report failures as `{"error": "..."}`
fn api_error_message(body: &str) -> Option<String> {
  #[derive(serde::Deserialize)]
  struct ApiError {
    error: String,
  }

  serde_json::from_str::<ApiError>(body).ok().map(|e| e.error)
}

pub(crate) fn looks_unavailable(message: &str) -> bool {
  const MARKERS: &[&str] = &[
    "video unavailable",
    "private video",
    "this video is private",
    "not available in your country",
    "not made this video available in your country",
    "has been removed",
    "sign in to confirm your age",
    "members-only",
    "copyright",
    "incomplete youtube id",
    "is not a valid url",
    "does not exist",
  ];

  let lower = message.to_lowercase();
  MARKERS.iter().any(|m| lower.contains(m))
    || (lower.contains("geo") && lower.contains("block"))
}

#[cfg(test)]
mod tests {
  use reqwest::StatusCode;

  use super::*;

  #[test]
  fn test_watch_url() {
    assert_eq!(
      watch_url("dQw4w9WgXcQ"),
      "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
    );
  }

  #[test]
  fn test_api_url_encodes_segments() {
    let base = instance_url("https://inv.example").unwrap();

    let url = api_url(&base, &["api", "v1", "videos", "abc"]);
    assert_eq!(url.as_str(), "https://inv.example/api/v1/videos/abc");

    let url = api_url(&base, &["api", "v1", "videos", "../x"]);
    assert_eq!(url.path(), "/api/v1/videos/..%2Fx");

    let url = api_url(&base, &["streams", "../../../admin"]);
    assert_eq!(url.path(), "/streams/..%2F..%2F..%2Fadmin");

    let url = api_url(&base, &["streams", "abc?region=XX#frag"]);
    assert_eq!(url.query(), None);
    assert_eq!(url.fragment(), None);
    assert_eq!(url.path_segments().unwrap().count(), 2);
  }

  #[test]
  fn test_api_url_keeps_instance_path() {
    let base = instance_url("https://example.org/piped/").unwrap();
    let url = api_url(&base, &["streams", "abc"]);
    assert_eq!(url.as_str(), "https://example.org/piped/streams/abc");
  }

  #[test]
  fn test_instance_url_rejects_garbage() {
    assert!(matches!(
      instance_url("not a url"),
      Err(ExtractError::Internal(_))
    ));
    assert!(matches!(
      instance_url("mailto:admin@example.org"),
      Err(ExtractError::Internal(_))
    ));
  }

  #[test]
  fn test_check_status() {
    assert!(check_status(StatusCode::OK, "").is_ok());
    assert!(matches!(
      check_status(StatusCode::NOT_FOUND, "nope"),
      Err(ExtractError::Unavailable(_))
    ));
    assert!(matches!(
      check_status(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"error": "This video is private"}"#
      ),
      Err(ExtractError::Unavailable(reason)) if reason == "This video is private"
    ));
    assert!(matches!(
      check_status(StatusCode::BAD_GATEWAY, "upstream timeout"),
      Err(ExtractError::Library(_))
    ));
  }

  #[test]
  fn test_looks_unavailable() {
    assert!(looks_unavailable("ERROR: [youtube] abc: Private video"));
    assert!(looks_unavailable(
      "The uploader has not made this video available in your country"
    ));
    assert!(looks_unavailable("Video is geo-blocked"));
    assert!(!looks_unavailable("Unable to extract player response"));
  }
}
