use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
  config::Config,
  error::{ExtractError, Failure},
  extractor::{self, ExtractOptions, Extractor},
  model::VideoInfo,
  stream::StreamPolicy,
};

/// Turns a video id into a [`VideoInfo`] using whichever extractor it was
/// built with. Holds no per-request state.
pub struct Resolver {
  extractor: Arc<dyn Extractor>,
  options: ExtractOptions,
  policy: StreamPolicy,
}

impl Resolver {
  pub fn new(
    extractor: Arc<dyn Extractor>,
    options: ExtractOptions,
    policy: StreamPolicy,
  ) -> Self {
    Self {
      extractor,
      options,
      policy,
    }
  }

  pub fn from_config(config: &Config) -> Result<Self, ExtractError> {
    let options = ExtractOptions {
      insecure_tls: config.insecure_tls,
      proxy: config.ytdlp_proxy.clone(),
    };
    let extractor = extractor::from_config(config, &options)?;

    Ok(Self::new(extractor, options, config.stream_policy))
  }

  pub fn extractor_name(&self) -> &'static str {
    self.extractor.name()
  }

  pub async fn resolve(&self, video_id: &str) -> Result<VideoInfo, Failure> {
    let extractor = self.extractor.name();
    info!(video_id, extractor, "resolving stream");

    let extraction = self
      .extractor
      .extract(video_id, &self.options)
      .await
      .map_err(|err| report(video_id, err))?;

    let stream = self
      .policy
      .select(&extraction.streams)
      .ok_or_else(|| report(video_id, ExtractError::NoStreamUrl))?;

    info!(
      video_id,
      title = extraction.title.as_deref().unwrap_or_default(),
      height = ?stream.height,
      progressive = stream.is_progressive(),
      candidates = extraction.streams.len(),
      "stream resolved"
    );

    Ok(VideoInfo {
      video_id: extraction.video_id,
      title: extraction.title,
      author: extraction.author,
      length_seconds: extraction.duration_seconds,
      stream_url: stream.url.clone(),
    })
  }
}

fn report(video_id: &str, err: ExtractError) -> Failure {
  match &err {
    ExtractError::Unavailable(reason) => {
      warn!(video_id, reason = %reason, "video unavailable")
    }
    ExtractError::Incompatible(reason) => error!(
      video_id,
      reason = %reason,
      critical = true,
      "could not parse upstream response, extractor may be outdated"
    ),
    ExtractError::NoStreamUrl => {
      error!(video_id, "stream found but no URL")
    }
    ExtractError::Library(reason) => {
      error!(video_id, reason = %reason, "extractor failed")
    }
    ExtractError::Internal(_) => {
      error!(video_id, error = ?err, "unexpected error while resolving")
    }
  }

  Failure::from(err)
}

#[cfg(test)]
pub(crate) mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
  };

  use async_trait::async_trait;

  use super::*;
  use crate::{error::ErrorKind, extractor::Extraction, stream::StreamCandidate};

  /// Replays scripted outcomes and counts calls.
  pub(crate) struct FakeExtractor {
    pub calls: AtomicUsize,
    script: Mutex<Vec<Result<Extraction, ExtractError>>>,
  }

  impl FakeExtractor {
    pub fn new(script: Vec<Result<Extraction, ExtractError>>) -> Arc<Self> {
      let mut script = script;
      script.reverse();
      Arc::new(Self {
        calls: AtomicUsize::new(0),
        script: Mutex::new(script),
      })
    }

    pub fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  #[async_trait]
  impl Extractor for FakeExtractor {
    fn name(&self) -> &'static str {
      "fake"
    }

    async fn extract(
      &self,
      _video_id: &str,
      _options: &ExtractOptions,
    ) -> Result<Extraction, ExtractError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self
        .script
        .lock()
        .unwrap()
        .pop()
        .unwrap_or_else(|| Err(ExtractError::Internal("script ran out".into())))
    }
  }

  pub(crate) fn extraction(video_id: &str, urls: &[&str]) -> Extraction {
    Extraction {
      video_id: video_id.to_string(),
      title: Some("Never Gonna Give You Up".into()),
      author: Some("Rick Astley".into()),
      duration_seconds: Some(212),
      streams: urls
        .iter()
        .enumerate()
        .map(|(i, url)| StreamCandidate {
          url: url.to_string(),
          has_video: true,
          has_audio: true,
          height: Some(360 * (i as u32 + 1)),
          bitrate: None,
        })
        .collect(),
    }
  }

  fn resolver(fake: Arc<FakeExtractor>) -> Resolver {
    Resolver::new(fake, ExtractOptions::default(), StreamPolicy::Progressive)
  }

  #[test]
  fn test_from_config_rejects_bad_instance() {
    let config = Config {
      backend: crate::config::Backend::Piped,
      piped_instance: "not a url".into(),
      ..Config::default()
    };

    assert!(matches!(
      Resolver::from_config(&config),
      Err(ExtractError::Internal(_))
    ));
  }

  #[tokio::test]
  async fn test_resolve_success() {
    let fake = FakeExtractor::new(vec![Ok(extraction(
      "dQw4w9WgXcQ",
      &["https://a/360", "https://a/720"],
    ))]);
    let info = resolver(fake.clone()).resolve("dQw4w9WgXcQ").await.unwrap();

    assert_eq!(info.video_id, "dQw4w9WgXcQ");
    assert_eq!(info.stream_url, "https://a/720");
    assert_eq!(info.length_seconds, Some(212));
    assert_eq!(fake.calls(), 1);
  }

  #[tokio::test]
  async fn test_resolve_without_streams() {
    let fake = FakeExtractor::new(vec![Ok(extraction("abc", &[]))]);
    let failure = resolver(fake).resolve("abc").await.unwrap_err();

    assert_eq!(failure.kind, ErrorKind::ProcessingError);
    assert_eq!(failure.message, "Stream found but no URL");
  }

  #[tokio::test]
  async fn test_resolve_maps_extractor_failures() {
    let fake = FakeExtractor::new(vec![
      Err(ExtractError::Unavailable("Private video".into())),
      Err(ExtractError::Incompatible("nsig".into())),
      Err(ExtractError::Internal("spawn failed".into())),
    ]);
    let resolver = resolver(fake.clone());

    let kinds = [
      ErrorKind::VideoUnavailable,
      ErrorKind::YoutubeParseError,
      ErrorKind::InternalServerError,
    ];
    for kind in kinds {
      assert_eq!(resolver.resolve("abc").await.unwrap_err().kind, kind);
    }
    assert_eq!(fake.calls(), 3);
  }
}
