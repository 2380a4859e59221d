//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use webconf_billing::{LifecycleError, UsageError};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// A rejected lifecycle transition, reported field by field.
  #[error(transparent)]
  Lifecycle(LifecycleError),

  #[error(transparent)]
  Usage(#[from] UsageError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

impl From<LifecycleError> for ApiError {
  fn from(e: LifecycleError) -> Self {
    match e {
      LifecycleError::NotFound(id) => Self::NotFound(format!("subscription {id}")),
      LifecycleError::Store(e) => Self::Store(e),
      other => Self::Lifecycle(other),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Lifecycle(e) => {
        let body = Json(json!({ "errors": e.errors() }));
        return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
      }
      ApiError::Usage(UsageError::StatsFetch(m)) => (StatusCode::BAD_GATEWAY, m.clone()),
      ApiError::Usage(UsageError::Gateway(m)) => (StatusCode::BAD_GATEWAY, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
