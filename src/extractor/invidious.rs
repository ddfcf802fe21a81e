use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::{error::ExtractError, stream::StreamCandidate};

use super::{
  api_url, check_status, http_client, instance_url, ExtractOptions,
  Extraction, Extractor,
};

// query an invidious instance's video api.
pub struct Invidious {
  instance: Url,
  client: reqwest::Client,
}

impl Invidious {
  pub fn new(
    instance: &str,
    options: &ExtractOptions,
  ) -> Result<Self, ExtractError> {
    Ok(Self {
      instance: instance_url(instance)?,
      client: http_client(options)?,
    })
  }

  pub fn video_url(&self, video_id: &str) -> Url {
    api_url(&self.instance, &["api", "v1", "videos", video_id])
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvidiousVideo {
  video_id: String,
  title: Option<String>,
  author: Option<String>,
  length_seconds: Option<u64>,
  #[serde(default)]
  format_streams: Vec<InvidiousFormat>,
  #[serde(default)]
  adaptive_formats: Vec<InvidiousFormat>,
}

#[derive(Debug, Deserialize)]
struct InvidiousFormat {
  url: String,
  #[serde(rename = "type")]
  mime_type: String,
  resolution: Option<String>,
  bitrate: Option<LooseNumber>,
}

// invidious reports some numbers as strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LooseNumber {
  Number(u64),
  Text(String),
}

impl LooseNumber {
  fn value(&self) -> Option<u64> {
    match self {
      LooseNumber::Number(n) => Some(*n),
      LooseNumber::Text(s) => s.parse().ok(),
    }
  }
}

#[async_trait]
impl Extractor for Invidious {
  fn name(&self) -> &'static str {
    "invidious"
  }

  async fn extract(
    &self,
    video_id: &str,
    _options: &ExtractOptions,
  ) -> Result<Extraction, ExtractError> {
    let resp = self
      .client
      .get(self.video_url(video_id))
      .send()
      .await?;

    let status = resp.status();
    let body = resp.text().await?;
    check_status(status, &body)?;

    parse_video(&body)
  }
}

fn parse_video(body: &str) -> Result<Extraction, ExtractError> {
  let video: InvidiousVideo = serde_json::from_str(body)
    .map_err(|e| ExtractError::Incompatible(e.to_string()))?;

  Ok(video.into())
}

impl From<InvidiousVideo> for Extraction {
  fn from(v: InvidiousVideo) -> Self {
    // formatStreams are always muxed
    let progressive = v.format_streams.into_iter().map(|f| StreamCandidate {
      has_video: true,
      has_audio: true,
      ..StreamCandidate::from(f)
    });
    let adaptive = v.adaptive_formats.into_iter().map(StreamCandidate::from);

    Self {
      video_id: v.video_id,
      title: v.title,
      author: v.author,
      duration_seconds: v.length_seconds,
      streams: progressive.chain(adaptive).collect(),
    }
  }
}

impl From<InvidiousFormat> for StreamCandidate {
  fn from(f: InvidiousFormat) -> Self {
    Self {
      has_video: f.mime_type.starts_with("video/"),
      has_audio: f.mime_type.starts_with("audio/"),
      height: f.resolution.as_deref().and_then(parse_resolution),
      bitrate: f.bitrate.as_ref().and_then(LooseNumber::value),
      url: f.url,
    }
  }
}

/// `"720p60"` -> `720`
pub(super) fn parse_resolution(label: &str) -> Option<u32> {
  let digits: String =
    label.chars().take_while(|c| c.is_ascii_digit()).collect();
  digits.parse().ok()
}
