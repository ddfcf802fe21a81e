use std::str::FromStr;

use crate::error::ConfigError;

/// One format offered by the upstream platform.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StreamCandidate {
  pub url: String,
  pub has_video: bool,
  pub has_audio: bool,
  pub height: Option<u32>,
  pub bitrate: Option<u64>,
}

impl StreamCandidate {
  pub fn is_progressive(&self) -> bool {
    self.has_video && self.has_audio
  }

  fn rank(&self) -> (u32, u64) {
    (self.height.unwrap_or(0), self.bitrate.unwrap_or(0))
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StreamPolicy {
  /// Combined audio+video only, highest resolution.
  #[default]
  Progressive,
  /// Progressive if any, else the best video track, else the best audio.
  Best,
}

impl StreamPolicy {
  pub fn select<'a>(
    self,
    streams: &'a [StreamCandidate],
  ) -> Option<&'a StreamCandidate> {
    let usable = || streams.iter().filter(|s| !s.url.trim().is_empty());

    let progressive = usable()
      .filter(|s| s.is_progressive())
      .max_by_key(|s| s.rank());

    match self {
      StreamPolicy::Progressive => progressive,
      StreamPolicy::Best => progressive
        .or_else(|| usable().filter(|s| s.has_video).max_by_key(|s| s.rank()))
        .or_else(|| {
          usable()
            .filter(|s| s.has_audio)
            .max_by_key(|s| s.bitrate.unwrap_or(0))
        }),
    }
  }
}

impl FromStr for StreamPolicy {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "progressive" => Ok(StreamPolicy::Progressive),
      "best" => Ok(StreamPolicy::Best),
      _ => Err(ConfigError::Invalid {
        var: "STREAM_POLICY",
        value: s.to_string(),
        reason: "expected `progressive` or `best`",
      }),
    }
  }
}
