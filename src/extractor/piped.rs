use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_query::{DeserializeQuery, Query};

use crate::{error::ExtractError, stream::StreamCandidate};

use super::{
  api_url, check_status, http_client, instance_url,
  invidious::parse_resolution, ExtractOptions, Extraction, Extractor,
};

pub struct Piped {
  instance: Url,
  client: reqwest::Client,
}

impl Piped {
  pub fn new(
    instance: &str,
    options: &ExtractOptions,
  ) -> Result<Self, ExtractError> {
    Ok(Self {
      instance: instance_url(instance)?,
      client: http_client(options)?,
    })
  }

  pub fn stream_url(&self, video_id: &str) -> Url {
    api_url(&self.instance, &["streams", video_id])
  }
}

#[derive(DeserializeQuery)]
struct PipedStreamResp {
  #[query(".title")]
  title: String,
  #[query(".uploader")]
  uploader: String,
  #[query(".duration")]
  duration: i64,
  #[query(".videoStreams")]
  video_streams: Vec<PipedStream>,
  #[query(".audioStreams")]
  audio_streams: Vec<PipedStream>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipedStream {
  url: String,
  #[serde(default)]
  video_only: bool,
  quality: Option<String>,
  height: Option<u32>,
  bitrate: Option<u64>,
}

#[async_trait]
impl Extractor for Piped {
  fn name(&self) -> &'static str {
    "piped"
  }

  async fn extract(
    &self,
    video_id: &str,
    _options: &ExtractOptions,
  ) -> Result<Extraction, ExtractError> {
    let resp = self
      .client
      .get(self.stream_url(video_id))
      .send()
      .await?;

    let status = resp.status();
    let body = resp.text().await?;
    check_status(status, &body)?;

    parse_streams(video_id, &body)
  }
}

fn parse_streams(
  video_id: &str,
  body: &str,
) -> Result<Extraction, ExtractError> {
  let resp: PipedStreamResp = serde_json::from_str::<Query<PipedStreamResp>>(
    body,
  )
  .map_err(|e| ExtractError::Incompatible(e.to_string()))?
  .into();

  let video = resp.video_streams.into_iter().map(|s| StreamCandidate {
    has_video: true,
    has_audio: !s.video_only,
    height: s.height.or_else(|| s.quality.as_deref().and_then(parse_resolution)),
    bitrate: s.bitrate,
    url: s.url,
  });
  let audio = resp.audio_streams.into_iter().map(|s| StreamCandidate {
    has_video: false,
    has_audio: true,
    height: None,
    bitrate: s.bitrate,
    url: s.url,
  });

  Ok(Extraction {
    // piped doesn't echo the id back
    video_id: video_id.to_string(),
    title: Some(resp.title),
    author: Some(resp.uploader),
    duration_seconds: u64::try_from(resp.duration).ok(),
    streams: video.chain(audio).collect(),
  })
}
