//! Error type for `onboard-nats`.

use async_nats::jetstream::context::{CreateStreamError, PublishError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to create stream: {0}")]
  CreateStream(#[from] CreateStreamError),

  #[error("failed to create consumer {name}: {reason}")]
  Consumer { name: String, reason: String },

  #[error("failed to start message stream: {0}")]
  Messages(String),

  #[error("publish failed: {0}")]
  Publish(#[from] PublishError),

  #[error("publish not acknowledged within {0:?}")]
  PublishTimeout(std::time::Duration),

  #[error("failed to settle message: {0}")]
  Settle(String),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
