use std::sync::Arc;

use axum::{
  extract::{rejection::QueryRejection, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::get,
  Json, Router,
};
use serde::Deserialize;
use tracing::warn;

use crate::{
  error::{ErrorKind, Failure},
  model::ApiResponse,
  resolver::Resolver,
};

pub fn router(resolver: Arc<Resolver>) -> Router {
  Router::new()
    .route("/", get(resolve_stream))
    .route("/healthz", get(health))
    .route("/health", get(health))
    .with_state(resolver)
}

#[derive(Debug, Deserialize)]
pub struct ResolveReq {
  i: Option<String>,
}

impl ResolveReq {
  fn video_id(&self) -> Option<&str> {
    self.i.as_deref().map(str::trim).filter(|id| !id.is_empty())
  }
}

pub async fn resolve_stream(
  State(resolver): State<Arc<Resolver>>,
  query: Result<Query<ResolveReq>, QueryRejection>,
) -> Response {
  let Query(req) = match query {
    Ok(query) => query,
    Err(rejection) => {
      let reason = rejection.body_text();
      warn!(reason = %reason, "malformed query string");
      return Failure::new(ErrorKind::InvalidParameter, "Malformed query string")
        .with_details(reason)
        .into_response();
    }
  };

  let Some(video_id) = req.video_id() else {
    warn!("request without video id");
    return Failure::missing_video_id().into_response();
  };

  match resolver.resolve(video_id).await {
    Ok(data) => {
      (StatusCode::OK, Json(ApiResponse::Success { data })).into_response()
    }
    Err(failure) => failure.into_response(),
  }
}

async fn health() -> impl IntoResponse {
  "OK"
}
