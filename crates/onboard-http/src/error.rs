//! Error type for `onboard-http`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to build HTTP client: {0}")]
  Client(#[from] reqwest::Error),

  #[error("invalid service credential: {0}")]
  InvalidApiKey(#[from] reqwest::header::InvalidHeaderValue),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
