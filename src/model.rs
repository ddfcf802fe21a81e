use serde::Serialize;

/// Metadata returned to the caller on success.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct VideoInfo {
  pub video_id: String,
  pub title: Option<String>,
  pub author: Option<String>,
  pub length_seconds: Option<u64>,
  pub stream_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
  pub code: &'static str,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
}

/// The JSON envelope: `{"status": "success", "data": ..}` or
/// `{"status": "error", "error": ..}`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse {
  Success { data: VideoInfo },
  Error { error: ErrorBody },
}
