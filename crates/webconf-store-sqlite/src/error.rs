//! Error type for `webconf-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] webconf_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("decode error: {0}")]
  Decode(String),

  #[error("plan not found: {0}")]
  PlanNotFound(uuid::Uuid),

  #[error("subscription not found: {0}")]
  SubscriptionNotFound(uuid::Uuid),

  #[error("user {0} already has a subscription")]
  DuplicateSubscriber(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
