use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};

use crate::model::{ApiResponse, ErrorBody};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fatal errors surfaced by `main` during startup or serving.
#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error("configuration error: {0}")]
  Config(#[from] ConfigError),
  #[error("failed to set up extractor: {0}")]
  Extractor(#[from] ExtractError),
  #[error("server error: {0}")]
  Server(String),
  #[error(transparent)]
  Shutdown(#[from] tokio_graceful_shutdown::errors::GracefulShutdownError),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
  #[error("invalid value for {var}: {value:?} ({reason})")]
  Invalid {
    var: &'static str,
    value: String,
    reason: &'static str,
  },
}

/// Failures reported by an extraction backend.
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
  /// The video is missing, private, removed or region-locked.
  #[error("video unavailable: {0}")]
  Unavailable(String),
  /// The upstream page or API no longer matches what the backend expects.
  #[error("upstream format not understood: {0}")]
  Incompatible(String),
  #[error("stream found but no URL")]
  NoStreamUrl,
  /// The backend ran and reported an error it knows about.
  #[error("extractor error: {0}")]
  Library(String),
  #[error("internal error: {0}")]
  Internal(String),
}

impl From<std::io::Error> for ExtractError {
  fn from(err: std::io::Error) -> Self {
    ExtractError::Internal(err.to_string())
  }
}

impl From<reqwest::Error> for ExtractError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      ExtractError::Incompatible(err.to_string())
    } else {
      ExtractError::Internal(err.to_string())
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  InvalidParameter,
  VideoUnavailable,
  YoutubeParseError,
  ProcessingError,
  InternalServerError,
}

impl ErrorKind {
  pub fn code(self) -> &'static str {
    match self {
      ErrorKind::InvalidParameter => "INVALID_PARAMETER",
      ErrorKind::VideoUnavailable => "VIDEO_UNAVAILABLE",
      ErrorKind::YoutubeParseError => "YOUTUBE_PARSE_ERROR",
      ErrorKind::ProcessingError => "PROCESSING_ERROR",
      ErrorKind::InternalServerError => "INTERNAL_SERVER_ERROR",
    }
  }

  pub fn status(self) -> StatusCode {
    match self {
      ErrorKind::InvalidParameter => StatusCode::BAD_REQUEST,
      ErrorKind::VideoUnavailable => StatusCode::NOT_FOUND,
      ErrorKind::YoutubeParseError => StatusCode::SERVICE_UNAVAILABLE,
      ErrorKind::ProcessingError => StatusCode::INTERNAL_SERVER_ERROR,
      ErrorKind::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

/// A terminal, caller-facing failure for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
  pub kind: ErrorKind,
  pub message: String,
  pub details: Option<String>,
}

impl Failure {
  pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
      details: None,
    }
  }

  pub fn with_details(self, details: impl Into<String>) -> Self {
    Self {
      details: Some(details.into()),
      ..self
    }
  }

  pub fn missing_video_id() -> Self {
    Self::new(
      ErrorKind::InvalidParameter,
      "Query parameter 'i' (video id) is required",
    )
  }
}

impl From<ExtractError> for Failure {
  fn from(err: ExtractError) -> Self {
    match err {
      ExtractError::Unavailable(reason) => Failure::new(
        ErrorKind::VideoUnavailable,
        "The video is unavailable, private or region-restricted",
      )
      .with_details(reason),
      ExtractError::Incompatible(reason) => Failure::new(
        ErrorKind::YoutubeParseError,
        "Could not parse the YouTube response; the extractor may be outdated",
      )
      .with_details(reason),
      ExtractError::NoStreamUrl => {
        Failure::new(ErrorKind::ProcessingError, "Stream found but no URL")
      }
      ExtractError::Library(reason) => Failure::new(
        ErrorKind::ProcessingError,
        "The extractor failed to process the video",
      )
      .with_details(reason),
      // internals stay in the server log
      ExtractError::Internal(_) => Failure::new(
        ErrorKind::InternalServerError,
        "An unexpected error occurred",
      ),
    }
  }
}

impl IntoResponse for Failure {
  fn into_response(self) -> Response {
    let status = self.kind.status();
    let body = ApiResponse::Error {
      error: ErrorBody {
        code: self.kind.code(),
        message: self.message,
        details: self.details,
      },
    };

    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_error_classes() {
    let cases = [
      (ExtractError::Unavailable("private".into()), 404, "VIDEO_UNAVAILABLE"),
      (
        ExtractError::Incompatible("nsig".into()),
        503,
        "YOUTUBE_PARSE_ERROR",
      ),
      (ExtractError::NoStreamUrl, 500, "PROCESSING_ERROR"),
      (ExtractError::Library("boom".into()), 500, "PROCESSING_ERROR"),
      (ExtractError::Internal("io".into()), 500, "INTERNAL_SERVER_ERROR"),
    ];

    for (err, status, code) in cases {
      let failure = Failure::from(err);
      assert_eq!(failure.kind.status().as_u16(), status);
      assert_eq!(failure.kind.code(), code);
    }
  }

  #[test]
  fn test_internal_failure_hides_details() {
    let failure =
      Failure::from(ExtractError::Internal("/usr/bin/yt-dlp: ENOENT".into()));
    assert_eq!(failure.details, None);
    assert_eq!(failure.message, "An unexpected error occurred");
  }

  #[test]
  fn test_missing_video_id_is_client_error() {
    let failure = Failure::missing_video_id();
    assert_eq!(failure.kind, ErrorKind::InvalidParameter);
    assert_eq!(failure.kind.status(), StatusCode::BAD_REQUEST);
  }
}
