use async_trait::async_trait;

use crate::{error::ExtractError, stream::StreamCandidate};

use super::{ExtractOptions, Extraction, Extractor};

// parses the watch page in-process; no proxy or tls knobs.
pub struct Rustube;

#[async_trait]
impl Extractor for Rustube {
  fn name(&self) -> &'static str {
    "rustube"
  }

  async fn extract(
    &self,
    video_id: &str,
    _options: &ExtractOptions,
  ) -> Result<Extraction, ExtractError> {
    use rustube::{Id, VideoFetcher};

    let id = Id::from_str(video_id).map_err(classify)?.as_owned();
    let video = VideoFetcher::from_id(id)
      .map_err(classify)?
      .fetch()
      .await
      .map_err(classify)?
      .descramble()
      .map_err(classify)?;

    let details = video.video_details();
    let streams = video
      .streams()
      .iter()
      .map(|stream| StreamCandidate {
        url: stream.signature_cipher.url.to_string(),
        has_video: stream.includes_video_track,
        has_audio: stream.includes_audio_track,
        height: stream.height.map(|h| h as u32),
        bitrate: stream.bitrate,
      })
      .collect();

    Ok(Extraction {
      video_id: video_id.to_string(),
      title: Some(details.title.clone()),
      author: Some(details.author.clone()),
      duration_seconds: Some(details.length_seconds),
      streams,
    })
  }
}

fn classify(err: rustube::Error) -> ExtractError {
  match err {
    rustube::Error::VideoUnavailable(status) => {
      ExtractError::Unavailable(format!("{:?}", status))
    }
    rustube::Error::BadIdFormat => {
      ExtractError::Unavailable("not a valid video id".to_string())
    }
    rustube::Error::Request(e) => ExtractError::Internal(e.to_string()),
    rustube::Error::IO(e) => ExtractError::Internal(e.to_string()),
    // everything else means the page no longer looks the way rustube expects
    other => ExtractError::Incompatible(other.to_string()),
  }
}
